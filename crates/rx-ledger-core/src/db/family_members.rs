//! Family member database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{is_constraint_violation, Database, DbError, DbResult, Resolved};
use crate::models::{FamilyMember, PatientContext};

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, name_key, dob_key, address, phone, created_at, updated_at
    FROM family_members
"#;

impl Database {
    /// Insert a new family member.
    pub fn insert_family_member(&self, member: &FamilyMember) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO family_members (
                id, name, name_key, dob_key, address, phone, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                member.id,
                member.name,
                member.name_key,
                member.dob_key(),
                member.address,
                member.phone,
                member.created_at,
                member.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a family member by ID.
    pub fn get_family_member(&self, id: &str) -> DbResult<Option<FamilyMember>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        self.conn
            .query_row(&sql, [id], FamilyMemberRow::from_row)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Find a family member by normalized name and date-of-birth key.
    pub fn find_family_member(
        &self,
        name_key: &str,
        dob_key: &str,
    ) -> DbResult<Option<FamilyMember>> {
        let sql = format!("{} WHERE name_key = ?1 AND dob_key = ?2", SELECT_COLUMNS);
        self.conn
            .query_row(&sql, [name_key, dob_key], FamilyMemberRow::from_row)
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// Find the family member for a patient header, creating it if absent.
    pub fn find_or_create_family_member(
        &self,
        patient: &PatientContext,
    ) -> DbResult<Resolved<FamilyMember>> {
        let name_key = patient.name_key();
        let dob_key = patient.dob_key();

        if let Some(existing) = self.find_family_member(&name_key, &dob_key)? {
            return Ok(Resolved::found(existing));
        }

        self.insert_or_find_family_member(FamilyMember::from_context(patient))
    }

    /// Insert a new family member. When another writer already inserted the
    /// same (name, date of birth) key, that record is returned instead.
    fn insert_or_find_family_member(
        &self,
        member: FamilyMember,
    ) -> DbResult<Resolved<FamilyMember>> {
        match self.insert_family_member(&member) {
            Ok(()) => Ok(Resolved::created(member)),
            Err(DbError::Sqlite(e)) if is_constraint_violation(&e) => {
                tracing::warn!(
                    name_key = %member.name_key,
                    "Family member insert raced another writer, retrying as lookup"
                );
                self.find_family_member(&member.name_key, &member.dob_key())?
                    .map(Resolved::found)
                    .ok_or_else(|| DbError::Constraint(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// List family members sharing a date-of-birth key.
    pub fn list_family_members_by_dob(&self, dob_key: &str) -> DbResult<Vec<FamilyMember>> {
        let sql = format!("{} WHERE dob_key = ? ORDER BY name", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([dob_key], FamilyMemberRow::from_row)?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?.try_into()?);
        }
        Ok(members)
    }

    /// Search family members by name (prefix match on the normalized name).
    pub fn search_family_members(&self, query: &str, limit: usize) -> DbResult<Vec<FamilyMember>> {
        let pattern = format!("{}%", crate::parser::normalize_key(query));
        let sql = format!("{} WHERE name_key LIKE ? ORDER BY name LIMIT ?", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern, limit as i64], FamilyMemberRow::from_row)?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?.try_into()?);
        }
        Ok(members)
    }

    /// Count all family members.
    pub fn count_family_members(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM family_members", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Intermediate row struct for database mapping.
struct FamilyMemberRow {
    id: String,
    name: String,
    name_key: String,
    dob_key: String,
    address: Option<String>,
    phone: Option<String>,
    created_at: String,
    updated_at: String,
}

impl FamilyMemberRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            name_key: row.get(2)?,
            dob_key: row.get(3)?,
            address: row.get(4)?,
            phone: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TryFrom<FamilyMemberRow> for FamilyMember {
    type Error = DbError;

    fn try_from(row: FamilyMemberRow) -> Result<Self, Self::Error> {
        let date_of_birth = if row.dob_key.is_empty() {
            None
        } else {
            Some(NaiveDate::parse_from_str(&row.dob_key, "%Y-%m-%d")?)
        };

        Ok(FamilyMember {
            id: row.id,
            name: row.name,
            name_key: row.name_key,
            date_of_birth,
            address: row.address,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
