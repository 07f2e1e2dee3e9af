//! Medication log database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{is_constraint_violation, Database, DbError, DbResult};
use crate::models::{MedicationLog, NewMedicationLog};

const SELECT_COLUMNS: &str = r#"
    SELECT id, medicine_id, family_member_id, fill_date, quantity, day_supply,
           prescriber, price, generic, rx_number, import_key, created_at
    FROM medication_logs
"#;

/// Outcome of writing a fill.
#[derive(Debug, Clone, PartialEq)]
pub enum LogInsert {
    /// A new log row was written
    Inserted(MedicationLog),
    /// A log with the same import key already exists
    AlreadyImported { existing_id: String },
}

impl Database {
    /// Write a fill unless one with the same import key exists.
    pub fn insert_medication_log(&self, new: &NewMedicationLog) -> DbResult<LogInsert> {
        let log = MedicationLog::from_new(new);

        if let Some(existing) = self.find_medication_log_by_key(&log.import_key)? {
            return Ok(LogInsert::AlreadyImported {
                existing_id: existing.id,
            });
        }

        let result = self.conn.execute(
            r#"
            INSERT INTO medication_logs (
                id, medicine_id, family_member_id, fill_date, quantity, day_supply,
                prescriber, price, generic, rx_number, import_key, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                log.id,
                log.medicine_id,
                log.family_member_id,
                log.fill_date.format("%Y-%m-%d").to_string(),
                log.quantity,
                log.day_supply,
                log.prescriber,
                log.price,
                log.generic,
                log.rx_number,
                log.import_key,
                log.created_at,
            ],
        );

        match result {
            Ok(_) => Ok(LogInsert::Inserted(log)),
            Err(e) if is_constraint_violation(&e) => {
                match self.find_medication_log_by_key(&log.import_key)? {
                    Some(existing) => Ok(LogInsert::AlreadyImported {
                        existing_id: existing.id,
                    }),
                    None => Err(DbError::Constraint(e.to_string())),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find a log by its import key digest.
    pub fn find_medication_log_by_key(&self, import_key: &str) -> DbResult<Option<MedicationLog>> {
        let sql = format!("{} WHERE import_key = ?", SELECT_COLUMNS);
        self.conn
            .query_row(&sql, [import_key], MedicationLogRow::from_row)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// List a family member's fills, oldest first.
    pub fn list_medication_logs(&self, family_member_id: &str) -> DbResult<Vec<MedicationLog>> {
        let sql = format!(
            "{} WHERE family_member_id = ? ORDER BY fill_date, rx_number",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([family_member_id], MedicationLogRow::from_row)?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?.try_into()?);
        }
        Ok(logs)
    }

    /// Count all medication logs.
    pub fn count_medication_logs(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM medication_logs", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Intermediate row struct for database mapping.
struct MedicationLogRow {
    id: String,
    medicine_id: String,
    family_member_id: String,
    fill_date: String,
    quantity: Option<f64>,
    day_supply: Option<u32>,
    prescriber: Option<String>,
    price: Option<f64>,
    generic: Option<bool>,
    rx_number: String,
    import_key: String,
    created_at: String,
}

impl MedicationLogRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            medicine_id: row.get(1)?,
            family_member_id: row.get(2)?,
            fill_date: row.get(3)?,
            quantity: row.get(4)?,
            day_supply: row.get(5)?,
            prescriber: row.get(6)?,
            price: row.get(7)?,
            generic: row.get(8)?,
            rx_number: row.get(9)?,
            import_key: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl TryFrom<MedicationLogRow> for MedicationLog {
    type Error = DbError;

    fn try_from(row: MedicationLogRow) -> Result<Self, Self::Error> {
        Ok(MedicationLog {
            id: row.id,
            medicine_id: row.medicine_id,
            family_member_id: row.family_member_id,
            fill_date: NaiveDate::parse_from_str(&row.fill_date, "%Y-%m-%d")?,
            quantity: row.quantity,
            day_supply: row.day_supply,
            prescriber: row.prescriber,
            price: row.price,
            generic: row.generic,
            rx_number: row.rx_number,
            import_key: row.import_key,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientContext;
    use crate::parser::MedicationParser;

    fn setup() -> (Database, String, String) {
        let db = Database::open_in_memory().unwrap();
        let member = db
            .find_or_create_family_member(&PatientContext {
                name: "John Smith".into(),
                ..Default::default()
            })
            .unwrap()
            .record;
        let medicine = db
            .find_or_create_medicine(&MedicationParser::new().parse("Lisinopril 10mg").unwrap())
            .unwrap()
            .record;
        (db, member.id, medicine.id)
    }

    fn fill(member_id: &str, medicine_id: &str, quantity: f64) -> NewMedicationLog {
        NewMedicationLog {
            medicine_id: medicine_id.into(),
            family_member_id: member_id.into(),
            fill_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            quantity: Some(quantity),
            day_supply: Some(30),
            prescriber: Some("Dr. Jane Doe".into()),
            price: Some(4.0),
            generic: Some(true),
            rx_number: "1234567".into(),
        }
    }

    #[test]
    fn test_insert_and_list() {
        let (db, member_id, medicine_id) = setup();

        let result = db.insert_medication_log(&fill(&member_id, &medicine_id, 30.0)).unwrap();
        let LogInsert::Inserted(log) = result else {
            panic!("expected insert, got {:?}", result);
        };

        let logs = db.list_medication_logs(&member_id).unwrap();
        assert_eq!(logs, vec![log]);
    }

    #[test]
    fn test_same_key_different_quantity_is_duplicate() {
        let (db, member_id, medicine_id) = setup();

        let first = db.insert_medication_log(&fill(&member_id, &medicine_id, 30.0)).unwrap();
        let second = db.insert_medication_log(&fill(&member_id, &medicine_id, 90.0)).unwrap();

        let LogInsert::Inserted(log) = first else {
            panic!("expected insert");
        };
        assert_eq!(second, LogInsert::AlreadyImported { existing_id: log.id });
        assert_eq!(db.count_medication_logs().unwrap(), 1);
    }

    #[test]
    fn test_unknown_medicine_is_constraint_error() {
        let (db, member_id, _) = setup();
        let result = db.insert_medication_log(&fill(&member_id, "no-such-medicine", 30.0));
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }
}
