use super::enums::RecordType;

/// Optional, AND-combined filters for medical record queries.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub user_id: Option<String>,
    pub record_type: Option<RecordType>,
    pub disease_id: Option<String>,
}

impl RecordFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn for_disease(disease_id: impl Into<String>) -> Self {
        Self {
            disease_id: Some(disease_id.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }
}
