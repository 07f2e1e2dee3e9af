//! Medicine database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{is_constraint_violation, Database, DbError, DbResult, Resolved};
use crate::models::{Medicine, MedicineKey};
use crate::parser::ParsedMedication;

const SELECT_COLUMNS: &str = "SELECT id, name, strength, form, created_at FROM medicines";

fn medicine_from_row(row: &Row<'_>) -> rusqlite::Result<Medicine> {
    Ok(Medicine {
        id: row.get(0)?,
        name: row.get(1)?,
        strength: row.get(2)?,
        form: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    /// Insert a new medicine.
    pub fn insert_medicine(&self, medicine: &Medicine) -> DbResult<()> {
        let key = medicine.key();
        self.conn.execute(
            r#"
            INSERT INTO medicines (
                id, name, strength, form, name_key, strength_key, form_key, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                medicine.id,
                medicine.name,
                medicine.strength,
                medicine.form,
                key.name,
                key.strength,
                key.form,
                medicine.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a medicine by ID.
    pub fn get_medicine(&self, id: &str) -> DbResult<Option<Medicine>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        self.conn
            .query_row(&sql, [id], medicine_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Find a medicine by its normalized key.
    pub fn find_medicine(&self, key: &MedicineKey) -> DbResult<Option<Medicine>> {
        let sql = format!(
            "{} WHERE name_key = ?1 AND strength_key = ?2 AND form_key = ?3",
            SELECT_COLUMNS
        );
        self.conn
            .query_row(
                &sql,
                params![key.name, key.strength, key.form],
                medicine_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Find the medicine for a parsed description, creating it if absent.
    pub fn find_or_create_medicine(
        &self,
        parsed: &ParsedMedication,
    ) -> DbResult<Resolved<Medicine>> {
        let key = MedicineKey::new(&parsed.name, &parsed.strength, &parsed.form);
        if key.name.is_empty() {
            return Err(DbError::Constraint("medicine name is empty".into()));
        }

        if let Some(existing) = self.find_medicine(&key)? {
            return Ok(Resolved::found(existing));
        }

        self.insert_or_find_medicine(Medicine::from_parsed(parsed))
    }

    /// Insert a new medicine. When another writer already inserted the same
    /// (name, strength, form) key, that record is returned instead.
    fn insert_or_find_medicine(&self, medicine: Medicine) -> DbResult<Resolved<Medicine>> {
        match self.insert_medicine(&medicine) {
            Ok(()) => Ok(Resolved::created(medicine)),
            Err(DbError::Sqlite(e)) if is_constraint_violation(&e) => {
                tracing::warn!(
                    medicine = %medicine.label(),
                    "Medicine insert raced another writer, retrying as lookup"
                );
                self.find_medicine(&medicine.key())?
                    .map(Resolved::found)
                    .ok_or_else(|| DbError::Constraint(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Search medicines by name (prefix match on the normalized name).
    pub fn search_medicines(&self, query: &str, limit: usize) -> DbResult<Vec<Medicine>> {
        let pattern = format!("{}%", crate::parser::normalize_key(query));
        let sql = format!(
            "{} WHERE name_key LIKE ? ORDER BY name, strength, form LIMIT ?",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern, limit as i64], medicine_from_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count all medicines.
    pub fn count_medicines(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM medicines", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MedicationParser;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn parsed(text: &str) -> ParsedMedication {
        MedicationParser::new().parse(text).unwrap()
    }

    #[test]
    fn test_find_or_create_dedupes_variants() {
        let db = setup_db();

        let first = db.find_or_create_medicine(&parsed("Lisinopril 10mg")).unwrap();
        let second = db.find_or_create_medicine(&parsed("LISINOPRIL   10MG")).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.record.id, second.record.id);
        assert_eq!(db.count_medicines().unwrap(), 1);
    }

    #[test]
    fn test_form_distinguishes_medicines() {
        let db = setup_db();
        db.find_or_create_medicine(&parsed("Lisinopril 10mg")).unwrap();
        let tablet = db.find_or_create_medicine(&parsed("Lisinopril 10mg Tab")).unwrap();

        assert!(tablet.created);
        assert_eq!(tablet.record.form, "Tablet");
        assert_eq!(db.count_medicines().unwrap(), 2);
    }

    #[test]
    fn test_get_and_search() {
        let db = setup_db();
        let created = db
            .find_or_create_medicine(&parsed("Atorvastatin 20mg Tablet"))
            .unwrap();

        let fetched = db.get_medicine(&created.record.id).unwrap().unwrap();
        assert_eq!(fetched.label(), "Atorvastatin 20mg Tablet");

        assert_eq!(db.search_medicines("ator", 10).unwrap().len(), 1);
        assert!(db.search_medicines("lisin", 10).unwrap().is_empty());
    }

    #[test]
    fn test_insert_conflict_falls_back_to_lookup() {
        let db = setup_db();
        let first = db.find_or_create_medicine(&parsed("Lisinopril 10mg Tab")).unwrap().record;

        let late = Medicine::from_parsed(&parsed("LISINOPRIL 10 MG TABLET"));
        let resolved = db.insert_or_find_medicine(late).unwrap();

        assert!(!resolved.created);
        assert_eq!(resolved.record.id, first.id);
        assert_eq!(db.count_medicines().unwrap(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let db = setup_db();
        let result = db.find_or_create_medicine(&ParsedMedication::default());
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }
}
