//! Medicine models.

use serde::{Deserialize, Serialize};

use crate::parser::{normalize_key, ParsedMedication};

/// A medicine known to the ledger, unique by normalized (name, strength, form).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    /// Local UUID
    pub id: String,
    /// Display name (title-cased)
    pub name: String,
    /// Strength (e.g., "10mg"), empty when the export omitted it
    pub strength: String,
    /// Dosage form (e.g., "Tablet"), empty when unknown
    pub form: String,
    /// Creation timestamp
    pub created_at: String,
}

/// Normalized identity of a medicine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MedicineKey {
    pub name: String,
    pub strength: String,
    pub form: String,
}

impl MedicineKey {
    pub fn new(name: &str, strength: &str, form: &str) -> Self {
        Self {
            name: normalize_key(name),
            strength: normalize_key(strength),
            form: normalize_key(form),
        }
    }
}

impl Medicine {
    /// Create a new medicine from a parsed drug description.
    pub fn from_parsed(parsed: &ParsedMedication) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: parsed.name.clone(),
            strength: parsed.strength.clone(),
            form: parsed.form.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn key(&self) -> MedicineKey {
        MedicineKey::new(&self.name, &self.strength, &self.form)
    }

    /// Human-readable label, e.g. "Atorvastatin 20mg Tablet".
    pub fn label(&self) -> String {
        [self.name.as_str(), self.strength.as_str(), self.form.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_case_and_spacing() {
        let a = MedicineKey::new("Lisinopril", "10mg", "");
        let b = MedicineKey::new("  lisinopril ", "10MG", "");
        assert_eq!(a, b);
    }

    #[test]
    fn test_label_skips_empty_parts() {
        let medicine = Medicine {
            id: "m1".into(),
            name: "Lisinopril".into(),
            strength: "10mg".into(),
            form: String::new(),
            created_at: String::new(),
        };
        assert_eq!(medicine.label(), "Lisinopril 10mg");
    }
}
