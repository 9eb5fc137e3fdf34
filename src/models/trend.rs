use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point of a reconstructed indicator history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
    /// Record title, or "<disease> - <indicator>" for disease-tracked values.
    pub source: String,
    pub hospital: String,
    pub is_abnormal: bool,
}

/// Look-back window for trend views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

impl TimeRange {
    /// Number of calendar months covered, `None` for `All`.
    pub fn months(self) -> Option<u32> {
        match self {
            TimeRange::OneMonth => Some(1),
            TimeRange::ThreeMonths => Some(3),
            TimeRange::SixMonths => Some(6),
            TimeRange::OneYear => Some(12),
            TimeRange::All => None,
        }
    }
}
