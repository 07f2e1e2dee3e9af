//! SQLite schema definition.

/// Complete database schema for rx-ledger.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Family Members
-- ============================================================================

CREATE TABLE IF NOT EXISTS family_members (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    name_key TEXT NOT NULL CHECK (length(name_key) > 0),
    dob_key TEXT NOT NULL DEFAULT '',            -- YYYY-MM-DD, '' when unknown
    address TEXT,
    phone TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (name_key, dob_key)
);

CREATE INDEX IF NOT EXISTS idx_family_members_dob ON family_members(dob_key);

-- ============================================================================
-- Medicines
-- ============================================================================

CREATE TABLE IF NOT EXISTS medicines (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    strength TEXT NOT NULL DEFAULT '',
    form TEXT NOT NULL DEFAULT '',
    name_key TEXT NOT NULL,
    strength_key TEXT NOT NULL DEFAULT '',
    form_key TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (name_key, strength_key, form_key)
);

-- ============================================================================
-- Medication Logs (one row per fill)
-- ============================================================================

CREATE TABLE IF NOT EXISTS medication_logs (
    id TEXT PRIMARY KEY,
    medicine_id TEXT NOT NULL REFERENCES medicines(id),
    family_member_id TEXT NOT NULL REFERENCES family_members(id),
    fill_date TEXT NOT NULL,                     -- YYYY-MM-DD
    quantity REAL,
    day_supply INTEGER CHECK (day_supply IS NULL OR day_supply >= 0),
    prescriber TEXT,
    price REAL,
    generic INTEGER,
    rx_number TEXT NOT NULL CHECK (length(trim(rx_number)) > 0),
    import_key TEXT NOT NULL UNIQUE,             -- sha256(rx_number, fill_date, family_member_id)
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_logs_member ON medication_logs(family_member_id, fill_date);
CREATE INDEX IF NOT EXISTS idx_logs_medicine ON medication_logs(medicine_id);

-- ============================================================================
-- Import History
-- ============================================================================

CREATE TABLE IF NOT EXISTS import_sessions (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    source_sha256 TEXT NOT NULL,
    format TEXT NOT NULL,
    family_member_id TEXT NOT NULL REFERENCES family_members(id),
    total_rows INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL DEFAULT 0,
    duplicates INTEGER NOT NULL DEFAULT 0,
    warnings INTEGER NOT NULL DEFAULT 0,
    errors INTEGER NOT NULL DEFAULT 0,
    started_at TEXT NOT NULL,
    completed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_import_sessions_sha ON import_sessions(source_sha256);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = setup();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_medicine_key_unique() {
        let conn = setup();
        conn.execute(
            "INSERT INTO medicines (id, name, name_key, strength_key) VALUES ('a', 'Lisinopril', 'lisinopril', '10mg')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO medicines (id, name, name_key, strength_key) VALUES ('b', 'LISINOPRIL', 'lisinopril', '10mg')",
            [],
        );
        assert!(result.is_err());

        // Different form is a different medicine
        let result = conn.execute(
            "INSERT INTO medicines (id, name, name_key, strength_key, form_key) VALUES ('c', 'Lisinopril', 'lisinopril', '10mg', 'tablet')",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_family_member_unknown_dob_unique() {
        let conn = setup();
        conn.execute(
            "INSERT INTO family_members (id, name, name_key) VALUES ('a', 'John Smith', 'john smith')",
            [],
        )
        .unwrap();

        // Unknown DOB is stored as '' so it still participates in the constraint
        let result = conn.execute(
            "INSERT INTO family_members (id, name, name_key) VALUES ('b', 'JOHN SMITH', 'john smith')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_log_requires_rx_number() {
        let conn = setup();
        conn.execute(
            "INSERT INTO family_members (id, name, name_key) VALUES ('fm', 'John Smith', 'john smith')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO medicines (id, name, name_key) VALUES ('m', 'Lisinopril', 'lisinopril')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO medication_logs (id, medicine_id, family_member_id, fill_date, rx_number, import_key)
             VALUES ('l', 'm', 'fm', '2024-01-05', '  ', 'k')",
            [],
        );
        assert!(result.is_err());
    }
}
