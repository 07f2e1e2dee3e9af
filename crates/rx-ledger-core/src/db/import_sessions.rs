//! Import history database operations.

use rusqlite::{params, Row};

use super::{Database, DbResult};
use crate::models::ImportSession;

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ImportSession> {
    Ok(ImportSession {
        id: row.get(0)?,
        filename: row.get(1)?,
        source_sha256: row.get(2)?,
        format: row.get(3)?,
        family_member_id: row.get(4)?,
        total_rows: row.get(5)?,
        created: row.get(6)?,
        duplicates: row.get(7)?,
        warnings: row.get(8)?,
        errors: row.get(9)?,
        started_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}

impl Database {
    /// Record a completed import.
    pub fn insert_import_session(&self, session: &ImportSession) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO import_sessions (
                id, filename, source_sha256, format, family_member_id,
                total_rows, created, duplicates, warnings, errors,
                started_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                session.id,
                session.filename,
                session.source_sha256,
                session.format,
                session.family_member_id,
                session.total_rows,
                session.created,
                session.duplicates,
                session.warnings,
                session.errors,
                session.started_at,
                session.completed_at,
            ],
        )?;
        Ok(())
    }

    /// Most recent imports first.
    pub fn list_import_sessions(&self, limit: usize) -> DbResult<Vec<ImportSession>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, filename, source_sha256, format, family_member_id,
                   total_rows, created, duplicates, warnings, errors,
                   started_at, completed_at
            FROM import_sessions
            ORDER BY completed_at DESC, rowid DESC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], session_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
