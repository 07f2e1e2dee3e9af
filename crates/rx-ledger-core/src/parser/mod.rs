//! Parsing of vendor pharmacy exports.
//!
//! Pipeline: bytes → rows ([`load_rows`]) → [`classify`] → table header
//! ([`find_table_header`]) → patient header ([`extract_patient`]) → body rows
//! ([`tokenize`]) → typed fills ([`PrescriptionFill`]) → drug descriptions
//! ([`MedicationParser`]).
//!
//! Every scan here is a pure function over `&[Row]`; nothing keeps a cursor.

mod format;
mod header;
mod medication;
mod rows;
mod sheet;

pub use format::*;
pub use header::*;
pub use medication::*;
pub use rows::*;
pub use sheet::*;

/// One row of cells as read from a CSV line or spreadsheet row.
pub type Row = Vec<String>;

/// Case-fold and collapse whitespace for use as a lookup key.
pub fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse whitespace and capitalize each word ("LISINOPRIL  hctz" → "Lisinopril Hctz").
///
/// Letters following `-` or `/` are capitalized too.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut out = String::with_capacity(word.len());
            let mut capitalize = true;
            for c in word.chars() {
                if capitalize {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                capitalize = c == '-' || c == '/';
            }
            out
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A row is blank when every cell is empty after trimming.
pub fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Index and trimmed text of the first non-empty cell.
pub(crate) fn first_cell(row: &[String]) -> Option<(usize, &str)> {
    row.iter()
        .enumerate()
        .map(|(i, cell)| (i, cell.trim()))
        .find(|(_, cell)| !cell.is_empty())
}
