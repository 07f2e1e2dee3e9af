//! Persistence boundary used by the reconciler.

use crate::db::{Database, DbResult, LogInsert, Resolved, SharedDatabase};
use crate::models::{FamilyMember, ImportSession, Medicine, NewMedicationLog, PatientContext};
use crate::parser::ParsedMedication;

/// Record store operations needed to reconcile an import.
///
/// Each call is one unit of work; implementations must not hold locks
/// between calls.
pub trait RecordStore {
    fn find_or_create_family_member(
        &self,
        patient: &PatientContext,
    ) -> DbResult<Resolved<FamilyMember>>;

    /// Family members sharing a date-of-birth key ("" for unknown).
    fn family_members_born_on(&self, dob_key: &str) -> DbResult<Vec<FamilyMember>>;

    fn find_or_create_medicine(&self, parsed: &ParsedMedication) -> DbResult<Resolved<Medicine>>;

    fn insert_medication_log(&self, new: &NewMedicationLog) -> DbResult<LogInsert>;

    fn record_import_session(&self, session: &ImportSession) -> DbResult<()>;
}

impl RecordStore for Database {
    fn find_or_create_family_member(
        &self,
        patient: &PatientContext,
    ) -> DbResult<Resolved<FamilyMember>> {
        Database::find_or_create_family_member(self, patient)
    }

    fn family_members_born_on(&self, dob_key: &str) -> DbResult<Vec<FamilyMember>> {
        self.list_family_members_by_dob(dob_key)
    }

    fn find_or_create_medicine(&self, parsed: &ParsedMedication) -> DbResult<Resolved<Medicine>> {
        Database::find_or_create_medicine(self, parsed)
    }

    fn insert_medication_log(&self, new: &NewMedicationLog) -> DbResult<LogInsert> {
        Database::insert_medication_log(self, new)
    }

    fn record_import_session(&self, session: &ImportSession) -> DbResult<()> {
        self.insert_import_session(session)
    }
}

impl RecordStore for SharedDatabase {
    fn find_or_create_family_member(
        &self,
        patient: &PatientContext,
    ) -> DbResult<Resolved<FamilyMember>> {
        self.lock()?.find_or_create_family_member(patient)
    }

    fn family_members_born_on(&self, dob_key: &str) -> DbResult<Vec<FamilyMember>> {
        self.lock()?.list_family_members_by_dob(dob_key)
    }

    fn find_or_create_medicine(&self, parsed: &ParsedMedication) -> DbResult<Resolved<Medicine>> {
        self.lock()?.find_or_create_medicine(parsed)
    }

    fn insert_medication_log(&self, new: &NewMedicationLog) -> DbResult<LogInsert> {
        self.lock()?.insert_medication_log(new)
    }

    fn record_import_session(&self, session: &ImportSession) -> DbResult<()> {
        self.lock()?.insert_import_session(session)
    }
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn find_or_create_family_member(
        &self,
        patient: &PatientContext,
    ) -> DbResult<Resolved<FamilyMember>> {
        (**self).find_or_create_family_member(patient)
    }

    fn family_members_born_on(&self, dob_key: &str) -> DbResult<Vec<FamilyMember>> {
        (**self).family_members_born_on(dob_key)
    }

    fn find_or_create_medicine(&self, parsed: &ParsedMedication) -> DbResult<Resolved<Medicine>> {
        (**self).find_or_create_medicine(parsed)
    }

    fn insert_medication_log(&self, new: &NewMedicationLog) -> DbResult<LogInsert> {
        (**self).insert_medication_log(new)
    }

    fn record_import_session(&self, session: &ImportSession) -> DbResult<()> {
        (**self).record_import_session(session)
    }
}
