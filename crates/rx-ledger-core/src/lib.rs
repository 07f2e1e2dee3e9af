//! Rx-Ledger Core Library
//!
//! Imports pharmacy prescription-history exports into a local medication
//! ledger of family members, medicines and medication logs.
//!
//! # Architecture
//!
//! ```text
//! bytes + filename
//!        │
//!        ▼
//!   Format Detector ──── unknown layout ──▶ UnrecognizedFormat
//!        │
//!        ▼
//!   Header Extractor ─── no labels / no name ──▶ fatal, nothing written
//!        │
//!        ▼
//!   Row Tokenizer ──▶ PrescriptionFill per row (bad fill date → warning)
//!        │
//!        ▼
//!   Reconciliation ──▶ FamilyMember / Medicine find-or-create,
//!        │             MedicationLog insert or duplicate skip
//!        ▼
//!   Import Report (one per call, rows in source order)
//! ```
//!
//! # Core Principle
//!
//! **Re-importing a file never duplicates history.** Every fill carries an
//! import key of (Rx Number, fill date, family member) guarded by a UNIQUE
//! constraint.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (FamilyMember, Medicine, MedicationLog, ...)
//! - [`parser`]: Export reading, format detection, header and row extraction
//! - [`reconcile`]: Find-or-create against a [`reconcile::RecordStore`]
//! - [`report`]: Per-import outcome report
//! - [`import`]: The end-to-end [`Importer`]

pub mod config;
pub mod db;
pub mod import;
pub mod models;
pub mod parser;
pub mod reconcile;
pub mod report;

// Re-export commonly used types
pub use config::ImportConfig;
pub use db::{Database, DbError, SharedDatabase};
pub use import::{ImportError, Importer};
pub use models::{
    FamilyMember, ImportSession, ImportSource, MedicationLog, Medicine, PatientContext,
};
pub use parser::{DetectedFormat, MedicationParser, ParsedMedication, SourceFormat};
pub use reconcile::RecordStore;
pub use report::{ImportReport, ImportSummary, RowOutcome, RowReport};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum RxLedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Import rejected: {0}")]
    ImportRejected(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for RxLedgerError {
    fn from(e: db::DbError) -> Self {
        RxLedgerError::DatabaseError(e.to_string())
    }
}

impl From<ImportError> for RxLedgerError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::Store(e) => e.into(),
            other => RxLedgerError::ImportRejected(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RxLedgerError {
    fn from(e: serde_json::Error) -> Self {
        RxLedgerError::SerializationError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<RxLedgerCore>, RxLedgerError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(RxLedgerCore::new(db)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<RxLedgerCore>, RxLedgerError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(RxLedgerCore::new(db)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct RxLedgerCore {
    db: SharedDatabase,
    config: ImportConfig,
}

impl RxLedgerCore {
    fn new(db: Database) -> Self {
        Self {
            db: SharedDatabase::new(db),
            config: ImportConfig::default(),
        }
    }

    fn run_import(&self, bytes: Vec<u8>, filename: String) -> Result<ImportReport, RxLedgerError> {
        let importer = Importer::new(self.db.clone(), self.config.clone());
        Ok(importer.import(&ImportSource::new(bytes, filename))?)
    }
}

#[uniffi::export]
impl RxLedgerCore {
    // =========================================================================
    // Import Operations
    // =========================================================================

    /// Import an export file.
    pub fn import_file(
        &self,
        bytes: Vec<u8>,
        filename: String,
    ) -> Result<FfiImportReport, RxLedgerError> {
        Ok(self.run_import(bytes, filename)?.into())
    }

    /// Import an export file and return the full report as JSON.
    pub fn import_file_json(
        &self,
        bytes: Vec<u8>,
        filename: String,
    ) -> Result<String, RxLedgerError> {
        Ok(self.run_import(bytes, filename)?.to_json()?)
    }

    /// Most recent imports first.
    pub fn list_import_sessions(&self, limit: u32) -> Result<Vec<FfiImportSession>, RxLedgerError> {
        let db = self.db.lock()?;
        let sessions = db.list_import_sessions(limit as usize)?;
        Ok(sessions.into_iter().map(|s| s.into()).collect())
    }

    // =========================================================================
    // Family Member Operations
    // =========================================================================

    /// Get a family member by ID.
    pub fn get_family_member(&self, id: String) -> Result<Option<FfiFamilyMember>, RxLedgerError> {
        let db = self.db.lock()?;
        let member = db.get_family_member(&id)?;
        Ok(member.map(|m| m.into()))
    }

    /// Search family members by name.
    pub fn search_family_members(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiFamilyMember>, RxLedgerError> {
        let db = self.db.lock()?;
        let members = db.search_family_members(&query, limit as usize)?;
        Ok(members.into_iter().map(|m| m.into()).collect())
    }

    // =========================================================================
    // Medication Operations
    // =========================================================================

    /// List a family member's fills, oldest first.
    pub fn list_medication_logs(
        &self,
        family_member_id: String,
    ) -> Result<Vec<FfiMedicationLog>, RxLedgerError> {
        let db = self.db.lock()?;
        let logs = db.list_medication_logs(&family_member_id)?;
        Ok(logs.into_iter().map(|l| l.into()).collect())
    }

    /// Search medicines by name.
    pub fn search_medicines(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiMedicine>, RxLedgerError> {
        let db = self.db.lock()?;
        let medicines = db.search_medicines(&query, limit as usize)?;
        Ok(medicines.into_iter().map(|m| m.into()).collect())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe import report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportReport {
    pub import_id: String,
    pub filename: String,
    pub format: String,
    pub family_member_id: String,
    pub member_created: bool,
    pub possible_matches: Vec<FfiPossibleMatch>,
    pub total_rows: u32,
    pub created: u32,
    pub duplicates: u32,
    pub warnings: u32,
    pub errors: u32,
    pub medicines_created: u32,
    pub rows: Vec<FfiRowReport>,
    pub notes: Vec<String>,
}

impl From<ImportReport> for FfiImportReport {
    fn from(report: ImportReport) -> Self {
        Self {
            import_id: report.import_id,
            filename: report.filename,
            format: report.format.kind.as_str().to_string(),
            family_member_id: report.family_member.family_member_id,
            member_created: report.family_member.created,
            possible_matches: report
                .family_member
                .possible_matches
                .into_iter()
                .map(|m| m.into())
                .collect(),
            total_rows: report.summary.total_rows as u32,
            created: report.summary.created as u32,
            duplicates: report.summary.duplicates as u32,
            warnings: report.summary.warnings as u32,
            errors: report.summary.errors as u32,
            medicines_created: report.summary.medicines_created as u32,
            rows: report.rows.into_iter().map(|r| r.into()).collect(),
            notes: report.notes,
        }
    }
}

/// FFI-safe row outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRowReport {
    pub line: u32,
    pub rx_number: String,
    pub drug_name: String,
    /// created, duplicate_skipped, warning or error
    pub status: String,
    /// Log ID for created/duplicate rows, reason otherwise
    pub detail: String,
    pub warnings: Vec<String>,
}

impl From<RowReport> for FfiRowReport {
    fn from(row: RowReport) -> Self {
        let (status, detail) = match row.outcome {
            RowOutcome::Created { log_id, .. } => ("created", log_id),
            RowOutcome::DuplicateSkipped { existing_log_id } => {
                ("duplicate_skipped", existing_log_id)
            }
            RowOutcome::Warning { reason } => ("warning", reason),
            RowOutcome::Error { reason } => ("error", reason),
        };
        Self {
            line: row.line as u32,
            rx_number: row.rx_number,
            drug_name: row.drug_name,
            status: status.to_string(),
            detail,
            warnings: row.warnings,
        }
    }
}

/// FFI-safe possible duplicate family member.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPossibleMatch {
    pub family_member_id: String,
    pub name: String,
    pub similarity: f64,
}

impl From<report::PossibleMatch> for FfiPossibleMatch {
    fn from(m: report::PossibleMatch) -> Self {
        Self {
            family_member_id: m.family_member_id,
            name: m.name,
            similarity: m.similarity,
        }
    }
}

/// FFI-safe family member.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFamilyMember {
    pub id: String,
    pub name: String,
    /// ISO date (YYYY-MM-DD)
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl From<FamilyMember> for FfiFamilyMember {
    fn from(member: FamilyMember) -> Self {
        Self {
            id: member.id,
            name: member.name,
            date_of_birth: member.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            address: member.address,
            phone: member.phone,
        }
    }
}

/// FFI-safe medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicine {
    pub id: String,
    pub name: String,
    pub strength: String,
    pub form: String,
}

impl From<Medicine> for FfiMedicine {
    fn from(medicine: Medicine) -> Self {
        Self {
            id: medicine.id,
            name: medicine.name,
            strength: medicine.strength,
            form: medicine.form,
        }
    }
}

/// FFI-safe medication log.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationLog {
    pub id: String,
    pub medicine_id: String,
    pub family_member_id: String,
    /// ISO date (YYYY-MM-DD)
    pub fill_date: String,
    pub quantity: Option<f64>,
    pub day_supply: Option<u32>,
    pub prescriber: Option<String>,
    pub price: Option<f64>,
    pub generic: Option<bool>,
    pub rx_number: String,
}

impl From<MedicationLog> for FfiMedicationLog {
    fn from(log: MedicationLog) -> Self {
        Self {
            id: log.id,
            medicine_id: log.medicine_id,
            family_member_id: log.family_member_id,
            fill_date: log.fill_date.format("%Y-%m-%d").to_string(),
            quantity: log.quantity,
            day_supply: log.day_supply,
            prescriber: log.prescriber,
            price: log.price,
            generic: log.generic,
            rx_number: log.rx_number,
        }
    }
}

/// FFI-safe import history entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportSession {
    pub id: String,
    pub filename: String,
    pub format: String,
    pub family_member_id: String,
    pub total_rows: u32,
    pub created: u32,
    pub duplicates: u32,
    pub warnings: u32,
    pub errors: u32,
    pub completed_at: String,
}

impl From<ImportSession> for FfiImportSession {
    fn from(session: ImportSession) -> Self {
        Self {
            id: session.id,
            filename: session.filename,
            format: session.format,
            family_member_id: session.family_member_id,
            total_rows: session.total_rows,
            created: session.created,
            duplicates: session.duplicates,
            warnings: session.warnings,
            errors: session.errors,
            completed_at: session.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Confidential Prescription Records\n\
Patient Name:,\"SMITH, JOHN\"\n\
\n\
Fill Date,Drug Name,Prescriber,Qty,Day Supply,Generic,Price,Rx Number\n\
01/05/2024,Atorvastatin 20mg Tablet,Dr. Jane Doe,30,30,Y,$4.00,7654321\n";

    #[test]
    fn test_ffi_import_and_queries() {
        let core = open_database_in_memory().unwrap();

        let report = core
            .import_file(SAMPLE.as_bytes().to_vec(), "records.csv".into())
            .unwrap();
        assert_eq!(report.format, "walgreens_csv");
        assert_eq!(report.created, 1);
        assert_eq!(report.rows[0].status, "created");

        let member = core
            .get_family_member(report.family_member_id.clone())
            .unwrap()
            .unwrap();
        assert_eq!(member.name, "JOHN SMITH");

        let logs = core.list_medication_logs(member.id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].fill_date, "2024-01-05");

        let medicines = core.search_medicines("atorva".into(), 10).unwrap();
        assert_eq!(medicines[0].form, "Tablet");

        assert_eq!(core.list_import_sessions(10).unwrap().len(), 1);
    }

    #[test]
    fn test_ffi_reimport_json() {
        let core = open_database_in_memory().unwrap();
        core.import_file(SAMPLE.as_bytes().to_vec(), "records.csv".into())
            .unwrap();

        let json = core
            .import_file_json(SAMPLE.as_bytes().to_vec(), "records.csv".into())
            .unwrap();
        assert!(json.contains("duplicate_skipped"));
    }

    #[test]
    fn test_ffi_rejects_unknown_format() {
        let core = open_database_in_memory().unwrap();
        let err = core
            .import_file(b"a,b,c\n1,2,3\n".to_vec(), "other.csv".into())
            .unwrap_err();
        assert!(matches!(err, RxLedgerError::ImportRejected(_)));
    }
}
