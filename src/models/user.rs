use serde::{Deserialize, Serialize};

use super::enums::Relationship;

/// A family member whose records are kept in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub relationship: Relationship,
    pub color: String,
}
