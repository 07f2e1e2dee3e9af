//! Import orchestration: bytes in, one report out.
//!
//! Every fatal check (format, table header, patient header, patient name)
//! runs before the first write, so a rejected file persists nothing.

use thiserror::Error;

use crate::config::ImportConfig;
use crate::db::DbError;
use crate::models::ImportSource;
use crate::parser::{
    classify_with_header, extract_patient, load_rows, tokenize, Column, MedicationParser,
    PrescriptionFill,
};
use crate::reconcile::{RecordStore, Reconciler};
use crate::report::{ImportReport, ImportReportBuilder, RowOutcome, RowReport};

/// Errors that reject a whole file.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unrecognized format: {0}")]
    UnrecognizedFormat(String),

    #[error("Patient header not found within the first {lookahead} rows")]
    PatientHeaderNotFound { lookahead: usize },

    #[error("Patient name missing from header")]
    PatientNameMissing,

    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Runs imports against a record store.
pub struct Importer<S: RecordStore> {
    store: S,
    config: ImportConfig,
    parser: MedicationParser,
}

impl<S: RecordStore> Importer<S> {
    pub fn new(store: S, config: ImportConfig) -> Self {
        Self {
            store,
            config,
            parser: MedicationParser::new(),
        }
    }

    /// Use a parser with extended unit or form vocabularies.
    pub fn with_parser(mut self, parser: MedicationParser) -> Self {
        self.parser = parser;
        self
    }

    /// Import one export file.
    pub fn import(&self, source: &ImportSource) -> ImportResult<ImportReport> {
        tracing::info!(
            filename = %source.filename(),
            bytes = source.bytes().len(),
            "Starting import"
        );

        let sheet = load_rows(source)?;
        let (format, header) = classify_with_header(&sheet);
        let format = format.require_known()?;
        let header = header.ok_or_else(|| {
            ImportError::UnrecognizedFormat("prescription table header not found".into())
        })?;

        let extracted = extract_patient(
            &sheet.rows,
            Some(header.row_index),
            self.config.header_lookahead,
            &self.config.date_formats,
        )?;
        let raw_rows = tokenize(&sheet.rows, &header);

        let mut notes = Vec::new();
        if let Some(extension) = source.extension() {
            let expected = sheet.container.expected_extensions();
            if !expected.contains(&extension.as_str()) {
                tracing::warn!(
                    filename = %source.filename(),
                    container = ?sheet.container,
                    "File extension does not match contents"
                );
                notes.push(format!(
                    "extension .{} does not match {:?} contents",
                    extension, sheet.container
                ));
            }
        }
        notes.extend(extracted.notes);

        tracing::debug!(
            format = format.kind.as_str(),
            confidence = format.confidence,
            rows = raw_rows.len(),
            "Export parsed"
        );

        // Writes start here.
        let reconciler = Reconciler::new(&self.store, &self.parser);
        let resolution =
            reconciler.resolve_member(&extracted.context, self.config.similar_member_threshold)?;
        let member_id = resolution.family_member_id.clone();

        let mut builder =
            ImportReportBuilder::new(source, format, extracted.context, resolution);
        for note in notes {
            builder.note(note);
        }

        for raw in &raw_rows {
            let row = match PrescriptionFill::from_raw(raw, &self.config.date_formats) {
                Ok((fill, warnings)) => reconciler.reconcile_row(&member_id, &fill, warnings),
                Err(e) => {
                    tracing::warn!(line = raw.line, reason = %e, "Skipping row");
                    RowReport::new(
                        raw.line,
                        raw.get(Column::RxNumber),
                        raw.get(Column::DrugName),
                        RowOutcome::Warning {
                            reason: e.to_string(),
                        },
                    )
                }
            };
            builder.record(row);
        }

        let report = builder.finish();

        if let Err(e) = self.store.record_import_session(&report.to_session()) {
            tracing::warn!(
                import_id = %report.import_id,
                error = %e,
                "Import history not recorded"
            );
        }

        tracing::info!(
            import_id = %report.import_id,
            family_member_id = %report.family_member.family_member_id,
            total = report.summary.total_rows,
            created = report.summary.created,
            duplicates = report.summary.duplicates,
            warnings = report.summary.warnings,
            errors = report.summary.errors,
            "Import finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    const SAMPLE: &str = "Confidential Prescription Records\n\
Patient Name:,John Smith\n\
Date of Birth:,01/15/1960\n\
\n\
Fill Date,Drug Name,Prescriber,Qty,Day Supply,Generic,Price,Rx Number\n\
01/05/2024,Lisinopril 10mg Tablet,Dr. Jane Doe,30,30,Y,$4.00,1234567\n\
02/05/2024,Lisinopril 10mg Tablet,Dr. Jane Doe,30,30,Y,$4.00,1234567\n\
\n\
Total Prescriptions: 2\n";

    #[test]
    fn test_import_sample() {
        let db = Database::open_in_memory().unwrap();
        let importer = Importer::new(&db, ImportConfig::default());

        let report = importer
            .import(&ImportSource::new(SAMPLE, "records.csv"))
            .unwrap();

        assert_eq!(report.summary.total_rows, 2);
        assert_eq!(report.summary.created, 2);
        assert_eq!(report.summary.medicines_created, 1);
        assert!(report.family_member.created);
        assert!(report.notes.is_empty());
        assert_eq!(report.rows[0].line, 6);
        assert_eq!(db.list_import_sessions(10).unwrap().len(), 1);
    }

    #[test]
    fn test_extension_mismatch_noted() {
        let db = Database::open_in_memory().unwrap();
        let importer = Importer::new(&db, ImportConfig::default());

        let report = importer
            .import(&ImportSource::new(SAMPLE, "records.xlsx"))
            .unwrap();

        assert_eq!(report.notes.len(), 1);
        assert!(report.notes[0].contains(".xlsx"));
    }

    #[test]
    fn test_malformed_fill_date_is_warning() {
        let text = SAMPLE.replace("02/05/2024", "someday");
        let db = Database::open_in_memory().unwrap();
        let importer = Importer::new(&db, ImportConfig::default());

        let report = importer.import(&ImportSource::new(text, "records.csv")).unwrap();

        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.warnings, 1);
        assert!(matches!(report.rows[1].outcome, RowOutcome::Warning { .. }));
    }

    #[test]
    fn test_header_beyond_lookahead() {
        let db = Database::open_in_memory().unwrap();
        let config = ImportConfig {
            header_lookahead: 1,
            ..Default::default()
        };
        let importer = Importer::new(&db, config);

        let err = importer
            .import(&ImportSource::new(SAMPLE, "records.csv"))
            .unwrap_err();

        assert!(matches!(
            err,
            ImportError::PatientHeaderNotFound { lookahead: 1 }
        ));
        assert_eq!(db.count_family_members().unwrap(), 0);
    }
}
