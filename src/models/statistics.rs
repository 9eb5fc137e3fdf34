use serde::{Deserialize, Serialize};

/// Home-screen counters. Each field comes from its own count query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_records: i64,
    pub chronic_diseases: i64,
    pub pending_reminders: i64,
    pub abnormal_records: i64,
}
