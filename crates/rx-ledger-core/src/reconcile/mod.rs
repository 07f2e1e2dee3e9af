//! Reconciliation of parsed fills against stored records.
//!
//! Pipeline per row: parse medication → find-or-create Medicine → import key
//! → insert MedicationLog or report duplicate. Failures stop at the row.

mod matching;
mod store;

pub use matching::*;
pub use store::*;

use crate::db::{DbResult, LogInsert};
use crate::models::{NewMedicationLog, PatientContext};
use crate::parser::{MedicationParser, PrescriptionFill};
use crate::report::{PatientResolution, RowOutcome, RowReport};

/// Applies parsed rows to a [`RecordStore`].
pub struct Reconciler<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    parser: &'a MedicationParser,
}

impl<'a, S: RecordStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S, parser: &'a MedicationParser) -> Self {
        Self { store, parser }
    }

    /// Find or create the family member for the patient header.
    ///
    /// When a new member is created, existing members born on the same day
    /// with similar names are listed as possible matches.
    pub fn resolve_member(
        &self,
        patient: &PatientContext,
        similarity_threshold: f64,
    ) -> DbResult<PatientResolution> {
        let resolved = self.store.find_or_create_family_member(patient)?;
        let member = resolved.record;

        let possible_matches = if resolved.created {
            let same_dob = self.store.family_members_born_on(&member.dob_key())?;
            similar_members(&member, &same_dob, similarity_threshold)
        } else {
            Vec::new()
        };

        if !possible_matches.is_empty() {
            tracing::warn!(
                family_member_id = %member.id,
                matches = possible_matches.len(),
                "New family member resembles existing members"
            );
        }

        Ok(PatientResolution {
            family_member_id: member.id,
            created: resolved.created,
            possible_matches,
        })
    }

    /// Reconcile one fill for a resolved family member.
    ///
    /// Never fails: errors are captured in the returned row report.
    pub fn reconcile_row(
        &self,
        family_member_id: &str,
        fill: &PrescriptionFill,
        mut warnings: Vec<String>,
    ) -> RowReport {
        let error = |reason: String| {
            tracing::warn!(line = fill.line, rx_number = %fill.rx_number, %reason, "Row failed");
            RowOutcome::Error { reason }
        };

        let rx_number = fill.rx_number.trim();
        if rx_number.is_empty() {
            let outcome = error("missing Rx number".into());
            return RowReport::new(fill.line, rx_number, &fill.drug_name, outcome)
                .with_warnings(warnings);
        }

        let parsed = match self.parser.parse(&fill.drug_name) {
            Ok(parsed) => parsed,
            Err(e) => {
                return RowReport::new(fill.line, rx_number, &fill.drug_name, error(e.to_string()))
                    .with_warnings(warnings);
            }
        };
        warnings.extend(parsed.warnings.iter().cloned());

        let outcome = match self.store.find_or_create_medicine(&parsed) {
            Err(e) => error(format!("medicine could not be resolved: {}", e)),
            Ok(medicine) => {
                let new = NewMedicationLog {
                    medicine_id: medicine.record.id.clone(),
                    family_member_id: family_member_id.to_string(),
                    fill_date: fill.fill_date,
                    quantity: fill.quantity,
                    day_supply: fill.day_supply,
                    prescriber: fill.prescriber.clone(),
                    price: fill.price,
                    generic: fill.generic,
                    rx_number: rx_number.to_string(),
                };

                match self.store.insert_medication_log(&new) {
                    Ok(LogInsert::Inserted(log)) => RowOutcome::Created {
                        log_id: log.id,
                        medicine_id: medicine.record.id,
                        medicine_created: medicine.created,
                    },
                    Ok(LogInsert::AlreadyImported { existing_id }) => {
                        RowOutcome::DuplicateSkipped {
                            existing_log_id: existing_id,
                        }
                    }
                    Err(e) => error(format!("medication log could not be written: {}", e)),
                }
            }
        };

        tracing::debug!(
            line = fill.line,
            rx_number = %rx_number,
            outcome = ?outcome,
            "Row reconciled"
        );

        RowReport::new(fill.line, rx_number, &fill.drug_name, outcome).with_warnings(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::NaiveDate;

    fn fill(line: usize, drug_name: &str, rx_number: &str) -> PrescriptionFill {
        PrescriptionFill {
            line,
            fill_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            drug_name: drug_name.into(),
            prescriber: Some("Dr. Jane Doe".into()),
            quantity: Some(30.0),
            day_supply: Some(30),
            generic: Some(true),
            price: Some(4.0),
            rx_number: rx_number.into(),
        }
    }

    fn john() -> PatientContext {
        PatientContext {
            name: "John Smith".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1960, 1, 15),
            ..Default::default()
        }
    }

    #[test]
    fn test_created_then_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let parser = MedicationParser::new();
        let reconciler = Reconciler::new(&db, &parser);
        let member = reconciler.resolve_member(&john(), 0.92).unwrap();

        let id = &member.family_member_id;
        let first = reconciler.reconcile_row(id, &fill(5, "Lisinopril 10mg", "111"), vec![]);
        let second = reconciler.reconcile_row(id, &fill(6, "Lisinopril 10mg", "111"), vec![]);

        let RowOutcome::Created { log_id, medicine_created, .. } = &first.outcome else {
            panic!("expected created, got {:?}", first.outcome);
        };
        assert!(*medicine_created);
        assert_eq!(
            second.outcome,
            RowOutcome::DuplicateSkipped {
                existing_log_id: log_id.clone()
            }
        );
    }

    #[test]
    fn test_empty_drug_name_is_row_error() {
        let db = Database::open_in_memory().unwrap();
        let parser = MedicationParser::new();
        let reconciler = Reconciler::new(&db, &parser);
        let member = reconciler.resolve_member(&john(), 0.92).unwrap();

        let report =
            reconciler.reconcile_row(&member.family_member_id, &fill(5, "   ", "111"), vec![]);
        assert!(matches!(report.outcome, RowOutcome::Error { .. }));
        assert_eq!(db.count_medication_logs().unwrap(), 0);
    }

    #[test]
    fn test_missing_rx_number_is_row_error() {
        let db = Database::open_in_memory().unwrap();
        let parser = MedicationParser::new();
        let reconciler = Reconciler::new(&db, &parser);
        let member = reconciler.resolve_member(&john(), 0.92).unwrap();

        let report = reconciler.reconcile_row(
            &member.family_member_id,
            &fill(5, "Lisinopril 10mg", " "),
            vec![],
        );
        assert_eq!(
            report.outcome,
            RowOutcome::Error {
                reason: "missing Rx number".into()
            }
        );
    }

    #[test]
    fn test_missing_strength_warning_carried() {
        let db = Database::open_in_memory().unwrap();
        let parser = MedicationParser::new();
        let reconciler = Reconciler::new(&db, &parser);
        let member = reconciler.resolve_member(&john(), 0.92).unwrap();

        let report = reconciler.reconcile_row(
            &member.family_member_id,
            &fill(5, "Metformin", "222"),
            vec!["unreadable price: \"n/a\"".into()],
        );
        assert!(report.is_created());
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_possible_matches_on_new_member() {
        let db = Database::open_in_memory().unwrap();
        let parser = MedicationParser::new();
        let reconciler = Reconciler::new(&db, &parser);

        let existing = reconciler.resolve_member(&john(), 0.92).unwrap();
        assert!(existing.possible_matches.is_empty());

        let mut jon = john();
        jon.name = "Jon Smith".into();
        let resolution = reconciler.resolve_member(&jon, 0.92).unwrap();

        assert!(resolution.created);
        assert_eq!(resolution.possible_matches.len(), 1);
        assert_eq!(
            resolution.possible_matches[0].family_member_id,
            existing.family_member_id
        );

        // Reusing a member never reports matches
        let again = reconciler.resolve_member(&jon, 0.92).unwrap();
        assert!(!again.created);
        assert!(again.possible_matches.is_empty());
    }
}
