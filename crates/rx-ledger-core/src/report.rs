//! Import report.
//!
//! One [`ImportReport`] is produced per import call, after every row has been
//! processed. Rows appear in source order.

use serde::{Deserialize, Serialize};

use crate::models::{ImportSession, ImportSource, PatientContext};
use crate::parser::DetectedFormat;

/// What happened to one prescription row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    /// A new medication log was written
    Created {
        log_id: String,
        medicine_id: String,
        medicine_created: bool,
    },
    /// The fill was already imported
    DuplicateSkipped { existing_log_id: String },
    /// The row could only be partly read and was skipped
    Warning { reason: String },
    /// The row failed to reconcile
    Error { reason: String },
}

/// Report line for one prescription row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowReport {
    /// 1-based row number in the source
    pub line: usize,
    pub rx_number: String,
    pub drug_name: String,
    pub outcome: RowOutcome,
    /// Partial-parse warnings on rows that were still processed
    pub warnings: Vec<String>,
}

impl RowReport {
    pub fn new(line: usize, rx_number: &str, drug_name: &str, outcome: RowOutcome) -> Self {
        Self {
            line,
            rx_number: rx_number.to_string(),
            drug_name: drug_name.to_string(),
            outcome,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_created(&self) -> bool {
        matches!(self.outcome, RowOutcome::Created { .. })
    }
}

/// A pre-existing family member whose name resembles a newly created one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PossibleMatch {
    pub family_member_id: String,
    pub name: String,
    pub similarity: f64,
}

/// How the patient header was resolved to a family member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientResolution {
    pub family_member_id: String,
    pub created: bool,
    /// Advisory only; never merged automatically
    pub possible_matches: Vec<PossibleMatch>,
}

/// Row counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub created: usize,
    pub duplicates: usize,
    pub warnings: usize,
    pub errors: usize,
    pub medicines_created: usize,
}

/// Result of one import call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportReport {
    pub import_id: String,
    pub filename: String,
    pub source_sha256: String,
    pub format: DetectedFormat,
    pub patient: PatientContext,
    pub family_member: PatientResolution,
    pub rows: Vec<RowReport>,
    pub summary: ImportSummary,
    /// File-level observations (extension mismatch, unreadable DOB, ...)
    pub notes: Vec<String>,
    pub started_at: String,
    pub completed_at: String,
}

impl ImportReport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// History record for this import.
    pub fn to_session(&self) -> ImportSession {
        ImportSession {
            id: self.import_id.clone(),
            filename: self.filename.clone(),
            source_sha256: self.source_sha256.clone(),
            format: self.format.kind.as_str().to_string(),
            family_member_id: self.family_member.family_member_id.clone(),
            total_rows: self.summary.total_rows as u32,
            created: self.summary.created as u32,
            duplicates: self.summary.duplicates as u32,
            warnings: self.summary.warnings as u32,
            errors: self.summary.errors as u32,
            started_at: self.started_at.clone(),
            completed_at: self.completed_at.clone(),
        }
    }
}

/// Accumulates row outcomes; [`finish`](ImportReportBuilder::finish) yields the report.
pub struct ImportReportBuilder {
    import_id: String,
    filename: String,
    source_sha256: String,
    format: DetectedFormat,
    patient: PatientContext,
    family_member: PatientResolution,
    rows: Vec<RowReport>,
    notes: Vec<String>,
    started_at: String,
}

impl ImportReportBuilder {
    pub fn new(
        source: &ImportSource,
        format: DetectedFormat,
        patient: PatientContext,
        family_member: PatientResolution,
    ) -> Self {
        Self {
            import_id: uuid::Uuid::new_v4().to_string(),
            filename: source.filename().to_string(),
            source_sha256: source.sha256(),
            format,
            patient,
            family_member,
            rows: Vec::new(),
            notes: Vec::new(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Add a file-level note.
    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Append the next row's outcome.
    pub fn record(&mut self, row: RowReport) {
        self.rows.push(row);
    }

    /// Build the final report.
    pub fn finish(self) -> ImportReport {
        let mut summary = ImportSummary {
            total_rows: self.rows.len(),
            ..Default::default()
        };

        for row in &self.rows {
            match &row.outcome {
                RowOutcome::Created {
                    medicine_created, ..
                } => {
                    summary.created += 1;
                    if *medicine_created {
                        summary.medicines_created += 1;
                    }
                }
                RowOutcome::DuplicateSkipped { .. } => summary.duplicates += 1,
                RowOutcome::Warning { .. } => summary.warnings += 1,
                RowOutcome::Error { .. } => summary.errors += 1,
            }
        }

        ImportReport {
            import_id: self.import_id,
            filename: self.filename,
            source_sha256: self.source_sha256,
            format: self.format,
            patient: self.patient,
            family_member: self.family_member,
            rows: self.rows,
            summary,
            notes: self.notes,
            started_at: self.started_at,
            completed_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceFormat;

    fn builder() -> ImportReportBuilder {
        let source = ImportSource::new(b"bytes".to_vec(), "records.csv");
        let format = DetectedFormat {
            kind: SourceFormat::WalgreensCsv,
            confidence: 1.0,
            matched_markers: vec!["title".into()],
            header_row: Some(3),
        };
        let patient = PatientContext {
            name: "John Smith".into(),
            ..Default::default()
        };
        let resolution = PatientResolution {
            family_member_id: "fm-1".into(),
            created: true,
            possible_matches: vec![],
        };
        ImportReportBuilder::new(&source, format, patient, resolution)
    }

    #[test]
    fn test_summary_counts() {
        let mut builder = builder();
        builder.record(RowReport::new(
            5,
            "1",
            "Lisinopril 10mg",
            RowOutcome::Created {
                log_id: "l1".into(),
                medicine_id: "m1".into(),
                medicine_created: true,
            },
        ));
        builder.record(RowReport::new(
            6,
            "1",
            "Lisinopril 10mg",
            RowOutcome::DuplicateSkipped {
                existing_log_id: "l1".into(),
            },
        ));
        builder.record(RowReport::new(
            7,
            "2",
            "Metformin",
            RowOutcome::Warning {
                reason: "missing fill date".into(),
            },
        ));
        builder.record(RowReport::new(
            8,
            "3",
            "",
            RowOutcome::Error {
                reason: "empty drug name".into(),
            },
        ));
        let report = builder.finish();

        assert_eq!(
            report.summary,
            ImportSummary {
                total_rows: 4,
                created: 1,
                duplicates: 1,
                warnings: 1,
                errors: 1,
                medicines_created: 1,
            }
        );
        assert_eq!(report.rows.iter().map(|r| r.line).collect::<Vec<_>>(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_json_tags_outcomes() {
        let mut builder = builder();
        builder.record(RowReport::new(
            5,
            "1",
            "Lisinopril 10mg",
            RowOutcome::DuplicateSkipped {
                existing_log_id: "l1".into(),
            },
        ));
        let json = builder.finish().to_json().unwrap();
        assert!(json.contains(r#""status": "duplicate_skipped""#));
        assert!(json.contains(r#""kind": "WalgreensCsv""#));
    }

    #[test]
    fn test_to_session() {
        let mut builder = builder();
        builder.note("extension mismatch");
        let report = builder.finish();
        let session = report.to_session();

        assert_eq!(session.id, report.import_id);
        assert_eq!(session.format, "walgreens_csv");
        assert_eq!(session.family_member_id, "fm-1");
        assert_eq!(session.total_rows, 0);
    }
}
