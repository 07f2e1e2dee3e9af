//! Database layer for rx-ledger.
//!
//! Every create path is a find-or-create guarded by a UNIQUE constraint: a
//! lookup, then an insert, and on a constraint violation (another writer got
//! there first) a second lookup. No in-memory caches sit in front of it.

mod schema;
mod family_members;
mod medicines;
mod medication_logs;
mod import_sessions;

pub use schema::*;
#[allow(unused_imports)]
pub use family_members::*;
#[allow(unused_imports)]
pub use medicines::*;
pub use medication_logs::*;
#[allow(unused_imports)]
pub use import_sessions::*;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored date is invalid: {0}")]
    Date(#[from] chrono::ParseError),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Outcome of a find-or-create operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub record: T,
    /// True when this call inserted the record
    pub created: bool,
}

impl<T> Resolved<T> {
    pub fn found(record: T) -> Self {
        Self {
            record,
            created: false,
        }
    }

    pub fn created(record: T) -> Self {
        Self {
            record,
            created: true,
        }
    }
}

/// True for SQLite constraint failures (UNIQUE, CHECK, NOT NULL, FOREIGN KEY).
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// A database handle shared between threads.
///
/// The lock is taken per operation, so concurrent imports interleave row by
/// row instead of one import holding the connection for a whole file.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    /// Lock the connection for a single operation.
    pub fn lock(&self) -> DbResult<MutexGuard<'_, Database>> {
        self.inner.lock().map_err(|_| DbError::LockPoisoned)
    }
}

impl From<Database> for SharedDatabase {
    fn from(db: Database) -> Self {
        Self::new(db)
    }
}
