//! Reading raw export bytes into rows of cells.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};

use super::Row;
use crate::import::ImportError;
use crate::models::ImportSource;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Physical container of an export file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Container {
    /// Delimited text (CSV)
    Text,
    /// Excel workbook (xlsx, xls, ods)
    Spreadsheet,
}

impl Container {
    /// Sniff the container from magic bytes. Extensions are not consulted.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE2_MAGIC) {
            Container::Spreadsheet
        } else {
            Container::Text
        }
    }

    /// Extensions that are expected to hold this container.
    pub fn expected_extensions(&self) -> &'static [&'static str] {
        match self {
            Container::Text => &["csv", "txt"],
            Container::Spreadsheet => &["xlsx", "xls", "xlsm", "ods"],
        }
    }
}

/// Rows read from an export file.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSheet {
    pub container: Container,
    pub rows: Vec<Row>,
}

/// Read an import source into rows, choosing the reader by container.
pub fn load_rows(source: &ImportSource) -> Result<LoadedSheet, ImportError> {
    let container = Container::sniff(source.bytes());
    let rows = match container {
        Container::Text => read_csv_rows(source.bytes())?,
        Container::Spreadsheet => read_spreadsheet_rows(source.bytes())?,
    };
    Ok(LoadedSheet { container, rows })
}

/// Read CSV text into rows.
///
/// The `csv` reader drops empty lines, so they are restored as blank rows:
/// a blank line is what terminates the prescription table in some exports.
pub fn read_csv_rows(bytes: &[u8]) -> Result<Vec<Row>, ImportError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();

    loop {
        let more = reader
            .read_record(&mut record)
            .map_err(|e| ImportError::UnrecognizedFormat(format!("unreadable CSV: {}", e)))?;
        if !more {
            break;
        }

        if let Some(position) = record.position() {
            let offset = usize::try_from(position.byte()).unwrap_or(usize::MAX);
            for _ in 0..skipped_blank_lines(text.as_bytes(), offset) {
                rows.push(Vec::new());
            }
        }

        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}

/// Empty lines between the previous record and the one whose reported
/// position is `offset`.
///
/// The reader reports a position before the empty lines it skipped, so the
/// whole run of line breaks around `offset` is measured. One break in that
/// run terminates the previous record, unless the run starts the file.
fn skipped_blank_lines(text: &[u8], offset: usize) -> usize {
    let is_break = |b: &u8| matches!(b, b'\r' | b'\n');
    let offset = offset.min(text.len());

    let after = text[offset..].iter().take_while(|b| is_break(b)).count();
    let content_start = offset + after;
    let before = text[..offset].iter().rev().take_while(|b| is_break(b)).count();
    let run_start = offset - before;

    let breaks = text[run_start..content_start]
        .iter()
        .filter(|&&b| b == b'\n')
        .count();
    if run_start == 0 {
        breaks
    } else {
        breaks.saturating_sub(1)
    }
}

/// Read the first worksheet of a workbook into rows.
pub fn read_spreadsheet_rows(bytes: &[u8]) -> Result<Vec<Row>, ImportError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor).map_err(|e| {
        ImportError::UnrecognizedFormat(format!("unreadable spreadsheet: {}", e))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::UnrecognizedFormat("workbook has no worksheets".into()))?
        .map_err(|e| ImportError::UnrecognizedFormat(format!("unreadable worksheet: {}", e)))?;

    // Ranges begin at the first used cell; pad so row and cell indexes match the sheet.
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let padding = vec![String::new(); first_col as usize];

    let mut rows: Vec<Row> = vec![Vec::new(); first_row as usize];
    rows.extend(range.rows().map(|row| {
        padding
            .iter()
            .cloned()
            .chain(row.iter().map(cell_text))
            .collect::<Row>()
    }));
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%m/%d/%Y").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(iso) => iso.split('T').next().unwrap_or_default().to_string(),
        other => other.to_string().trim().to_string(),
    }
}
