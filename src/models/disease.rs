use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{DiseaseType, ReminderType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChronicDisease {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub disease_type: DiseaseType,
    #[serde(default)]
    pub indicators: Vec<DiseaseIndicator>,
    #[serde(default)]
    pub reminders: Vec<HealthReminder>,
}

/// Longitudinal indicator tracked for a disease (blood pressure, HbA1c...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseIndicator {
    pub name: String,
    pub unit: String,
    pub normal_range: String,
    #[serde(default)]
    pub values: Vec<IndicatorValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorValue {
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default)]
    pub is_abnormal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReminder {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_repeating: bool,
    /// Days between occurrences when `is_repeating`.
    #[serde(default)]
    pub repeat_interval: Option<i64>,
}

impl ChronicDisease {
    pub fn pending_reminders(&self) -> impl Iterator<Item = &HealthReminder> {
        self.reminders.iter().filter(|r| !r.is_completed)
    }

    pub fn indicator(&self, name: &str) -> Option<&DiseaseIndicator> {
        self.indicators.iter().find(|i| i.name == name)
    }
}
