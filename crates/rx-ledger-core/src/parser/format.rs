//! Vendor format detection.
//!
//! Detection looks for structural fingerprints rather than trusting the file
//! extension: the "Confidential Prescription Records" title and a tabular
//! header row carrying the Walgreens column set.

use serde::{Deserialize, Serialize};

use super::{find_table_header, load_rows, Column, Container, LoadedSheet, TableHeader};
use crate::import::ImportError;
use crate::models::ImportSource;

/// Title printed at the top of Walgreens prescription record exports.
pub const WALGREENS_TITLE: &str = "confidential prescription records";

/// Weight of the column-set fingerprint in the confidence score.
const COLUMN_WEIGHT: f64 = 0.6;

/// Weight of the title fingerprint in the confidence score.
const TITLE_WEIGHT: f64 = 0.4;

/// Source vendor/layout of an export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceFormat {
    WalgreensCsv,
    WalgreensSpreadsheet,
    Unknown,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WalgreensCsv => "walgreens_csv",
            Self::WalgreensSpreadsheet => "walgreens_spreadsheet",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable description, e.g. "Walgreens CSV export".
    pub fn description(&self) -> &'static str {
        match self {
            Self::WalgreensCsv => "Walgreens CSV export",
            Self::WalgreensSpreadsheet => "Walgreens spreadsheet export",
            Self::Unknown => "unknown format",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Result of format detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedFormat {
    pub kind: SourceFormat,
    /// Fingerprint strength (0.0 - 1.0)
    pub confidence: f64,
    /// Fingerprints that matched, for diagnostics
    pub matched_markers: Vec<String>,
    /// Index of the tabular header row
    pub header_row: Option<usize>,
}

impl DetectedFormat {
    /// Reject unknown layouts; downstream extraction never runs against them.
    pub fn require_known(self) -> Result<Self, ImportError> {
        if self.kind.is_known() {
            Ok(self)
        } else if self.matched_markers.is_empty() {
            Err(ImportError::UnrecognizedFormat(
                "no known vendor fingerprint found".into(),
            ))
        } else {
            Err(ImportError::UnrecognizedFormat(format!(
                "prescription table header not found (matched: {})",
                self.matched_markers.join(", ")
            )))
        }
    }
}

/// Classify rows that have already been read. Pure and deterministic.
pub fn classify(sheet: &LoadedSheet) -> DetectedFormat {
    classify_with_header(sheet).0
}

/// [`classify`], also returning the table header the fingerprint matched.
pub fn classify_with_header(sheet: &LoadedSheet) -> (DetectedFormat, Option<TableHeader>) {
    let mut matched_markers = Vec::new();
    let mut confidence = 0.0;

    let has_title = sheet.rows.iter().any(|row| {
        row.iter()
            .any(|cell| cell.to_lowercase().contains(WALGREENS_TITLE))
    });
    if has_title {
        matched_markers.push("title".to_string());
        confidence += TITLE_WEIGHT;
    }

    let header = find_table_header(&sheet.rows);
    if let Some(header) = &header {
        matched_markers.push(format!("columns:{}", header.columns.len()));
        confidence += COLUMN_WEIGHT * header.columns.len() as f64 / Column::ALL.len() as f64;
    }

    let kind = match (&header, sheet.container) {
        (None, _) => SourceFormat::Unknown,
        (Some(_), Container::Text) => SourceFormat::WalgreensCsv,
        (Some(_), Container::Spreadsheet) => SourceFormat::WalgreensSpreadsheet,
    };

    let format = DetectedFormat {
        kind,
        confidence,
        matched_markers,
        header_row: header.as_ref().map(|h| h.row_index),
    };
    (format, header)
}

/// Detect the format of an import source, failing on unknown layouts.
pub fn detect_format(source: &ImportSource) -> Result<DetectedFormat, ImportError> {
    let sheet = load_rows(source)?;
    classify(&sheet).require_known()
}
