//! Medication log models (one row per pharmacy fill).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of a fill event used to make re-imports idempotent.
///
/// Quantity, price and the other fill attributes are not part of the key:
/// the same Rx Number filled on the same day for the same person is one fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportKey {
    pub rx_number: String,
    pub fill_date: NaiveDate,
    pub family_member_id: String,
}

impl ImportKey {
    pub fn new(rx_number: &str, fill_date: NaiveDate, family_member_id: &str) -> Self {
        Self {
            rx_number: rx_number.trim().to_string(),
            fill_date,
            family_member_id: family_member_id.to_string(),
        }
    }

    /// Hex SHA-256 digest stored in the unique `import_key` column.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.rx_number.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.fill_date.format("%Y-%m-%d").to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.family_member_id.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A fill ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedicationLog {
    pub medicine_id: String,
    pub family_member_id: String,
    pub fill_date: NaiveDate,
    pub quantity: Option<f64>,
    pub day_supply: Option<u32>,
    pub prescriber: Option<String>,
    pub price: Option<f64>,
    pub generic: Option<bool>,
    pub rx_number: String,
}

impl NewMedicationLog {
    pub fn import_key(&self) -> ImportKey {
        ImportKey::new(&self.rx_number, self.fill_date, &self.family_member_id)
    }
}

/// A persisted fill event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationLog {
    /// Local UUID
    pub id: String,
    pub medicine_id: String,
    pub family_member_id: String,
    pub fill_date: NaiveDate,
    pub quantity: Option<f64>,
    pub day_supply: Option<u32>,
    pub prescriber: Option<String>,
    pub price: Option<f64>,
    pub generic: Option<bool>,
    pub rx_number: String,
    /// Digest of the [`ImportKey`]
    pub import_key: String,
    /// Creation timestamp
    pub created_at: String,
}

impl MedicationLog {
    pub fn from_new(new: &NewMedicationLog) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            medicine_id: new.medicine_id.clone(),
            family_member_id: new.family_member_id.clone(),
            fill_date: new.fill_date,
            quantity: new.quantity,
            day_supply: new.day_supply,
            prescriber: new.prescriber.clone(),
            price: new.price,
            generic: new.generic,
            rx_number: new.rx_number.trim().to_string(),
            import_key: new.import_key().digest(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
