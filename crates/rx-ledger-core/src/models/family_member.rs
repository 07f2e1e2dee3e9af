//! Family member (patient) models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::parser::normalize_key;

/// Patient identity as read from the header block of a pharmacy export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PatientContext {
    /// Patient name (required to resolve a family member)
    pub name: String,
    /// Date of birth
    pub date_of_birth: Option<NaiveDate>,
    /// Mailing address
    pub address: Option<String>,
    /// Phone number
    pub phone: Option<String>,
}

impl PatientContext {
    /// Lookup key for the patient name.
    pub fn name_key(&self) -> String {
        normalize_key(&self.name)
    }

    /// Lookup key for the date of birth (`""` when unknown).
    pub fn dob_key(&self) -> String {
        dob_key(self.date_of_birth)
    }
}

/// A family member whose medication history is tracked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyMember {
    /// Local UUID
    pub id: String,
    /// Display name as it appeared on first import
    pub name: String,
    /// Normalized name used for matching
    pub name_key: String,
    /// Date of birth
    pub date_of_birth: Option<NaiveDate>,
    /// Mailing address
    pub address: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl FamilyMember {
    /// Create a new family member from an export's patient header.
    pub fn from_context(context: &PatientContext) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: context.name.split_whitespace().collect::<Vec<_>>().join(" "),
            name_key: context.name_key(),
            date_of_birth: context.date_of_birth,
            address: context.address.clone(),
            phone: context.phone.clone(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Lookup key for the date of birth (`""` when unknown).
    pub fn dob_key(&self) -> String {
        dob_key(self.date_of_birth)
    }
}

pub(crate) fn dob_key(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_context() {
        let context = PatientContext {
            name: "  John   Smith ".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1960, 1, 15),
            address: None,
            phone: Some("(555) 123-4567".into()),
        };
        let member = FamilyMember::from_context(&context);

        assert_eq!(member.name, "John Smith");
        assert_eq!(member.name_key, "john smith");
        assert_eq!(member.dob_key(), "1960-01-15");
        assert_eq!(member.id.len(), 36);
    }

    #[test]
    fn test_unknown_dob_key_is_empty() {
        let context = PatientContext {
            name: "Jane Doe".into(),
            ..Default::default()
        };
        assert_eq!(context.dob_key(), "");
    }
}
