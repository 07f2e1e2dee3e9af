//! Patient identity extraction from the free-form header block.

use chrono::{Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{first_cell, parse_date, Row};
use crate::import::ImportError;
use crate::models::PatientContext;

/// Identity fields that appear as label/value pairs above the table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PatientField {
    Name,
    DateOfBirth,
    Address,
    Phone,
}

impl PatientField {
    /// Match a label such as "Patient Name" or "DOB" (case-insensitive).
    pub fn from_label(label: &str) -> Option<PatientField> {
        let label = label
            .trim()
            .trim_end_matches(':')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match label.as_str() {
            "patient name" | "patient" | "name" | "member name" => Some(PatientField::Name),
            "date of birth" | "dob" | "birth date" | "birthdate" | "d.o.b." => {
                Some(PatientField::DateOfBirth)
            }
            "address" | "patient address" | "mailing address" => Some(PatientField::Address),
            "phone" | "phone number" | "telephone" | "tel" | "patient phone" => {
                Some(PatientField::Phone)
            }
            _ => None,
        }
    }
}

/// A recognized label row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMatch {
    pub row_index: usize,
    pub field: PatientField,
    pub value: String,
}

/// Recognize a label row: a known label in the first non-empty cell and the
/// value either after the colon in the same cell or in the following cells.
pub fn match_label_row(row_index: usize, row: &[String]) -> Option<LabelMatch> {
    let (cell_index, cell) = first_cell(row)?;

    let (label, inline_value) = match cell.split_once(':') {
        Some((label, rest)) => (label, rest.trim()),
        None => (cell, ""),
    };
    let field = PatientField::from_label(label)?;

    let value = if !inline_value.is_empty() {
        inline_value.to_string()
    } else {
        let rest = row[cell_index + 1..]
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty());
        match field {
            PatientField::Address => rest.collect::<Vec<_>>().join(", "),
            _ => rest.take(1).collect::<String>(),
        }
    };

    Some(LabelMatch {
        row_index,
        field,
        value,
    })
}

/// Scan the rows above the table header, bounded by `lookahead`.
///
/// Returns every label row found, or `PatientHeaderNotFound` when none is.
pub fn scan_patient_labels(
    rows: &[Row],
    header_row: Option<usize>,
    lookahead: usize,
) -> Result<Vec<LabelMatch>, ImportError> {
    let limit = header_row.unwrap_or(rows.len()).min(lookahead).min(rows.len());
    let labels: Vec<LabelMatch> = rows[..limit]
        .iter()
        .enumerate()
        .filter_map(|(i, row)| match_label_row(i, row))
        .collect();

    if labels.is_empty() {
        Err(ImportError::PatientHeaderNotFound { lookahead })
    } else {
        Ok(labels)
    }
}

/// Extracted patient identity plus notes about fields that could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPatient {
    pub context: PatientContext,
    pub notes: Vec<String>,
}

/// Build a [`PatientContext`] from the header block.
///
/// The first non-empty value of each field wins. A missing name is fatal;
/// an unreadable date of birth is left empty and noted.
pub fn extract_patient(
    rows: &[Row],
    header_row: Option<usize>,
    lookahead: usize,
    date_formats: &[String],
) -> Result<ExtractedPatient, ImportError> {
    let labels = scan_patient_labels(rows, header_row, lookahead)?;
    let mut notes = Vec::new();

    let value_of = |field: PatientField| {
        labels
            .iter()
            .filter(|l| l.field == field)
            .map(|l| l.value.as_str())
            .find(|v| !v.is_empty())
    };

    let name = value_of(PatientField::Name)
        .map(display_name)
        .ok_or(ImportError::PatientNameMissing)?;

    let date_of_birth = value_of(PatientField::DateOfBirth).and_then(|dob| {
        let parsed = parse_date(dob, date_formats).map(past_birth_date);
        if parsed.is_none() {
            notes.push(format!("unreadable date of birth: {:?}", dob));
        }
        parsed
    });

    Ok(ExtractedPatient {
        context: PatientContext {
            name,
            date_of_birth,
            address: value_of(PatientField::Address).map(str::to_string),
            phone: value_of(PatientField::Phone).map(str::to_string),
        },
        notes,
    })
}

/// A two-digit year can read as a future date ("01/15/60" as 2060); move
/// such a date of birth back a century.
fn past_birth_date(date: NaiveDate) -> NaiveDate {
    if date > Utc::now().date_naive() {
        date.checked_sub_months(Months::new(1200)).unwrap_or(date)
    } else {
        date
    }
}

/// "SMITH, JOHN" style names are reordered to "JOHN SMITH"; whitespace is collapsed.
fn display_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.split_once(',') {
        Some((last, first))
            if !last.trim().is_empty() && !first.trim().is_empty() && !first.contains(',') =>
        {
            format!("{} {}", first.trim(), last.trim())
        }
        _ => collapsed,
    }
}
