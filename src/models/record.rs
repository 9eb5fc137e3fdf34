use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::enums::RecordType;

/// One medical document (lab report, imaging, prescription...) for a user.
///
/// `key_indicators` is owned by the record: every save replaces the whole
/// set stored for `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub hospital: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub date: NaiveDate,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub key_indicators: Vec<KeyIndicator>,
    #[serde(default)]
    pub is_abnormal: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub disease_id: Option<String>,
}

/// Snapshot measurement attached to a single record. The value keeps the
/// textual form it was captured in ("6.5", "negative", "<0.1").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyIndicator {
    pub name: String,
    pub value: String,
    pub unit: String,
    #[serde(default)]
    pub normal_range: Option<String>,
    #[serde(default)]
    pub is_abnormal: bool,
}

/// Leading decimal number of a reading. Anything after it ("7.2↑",
/// "6.5 H", "120/80") is ignored.
static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid regex")
});

impl KeyIndicator {
    /// Numeric reading of `value`: the longest leading number after
    /// trimming, if it is finite.
    pub fn numeric_value(&self) -> Option<f64> {
        let number = LEADING_NUMBER.find(self.value.trim())?;
        number
            .as_str()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}
