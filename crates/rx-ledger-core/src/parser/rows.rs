//! Prescription table tokenizer.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{first_cell, is_blank, Row};

/// Minimum number of recognized columns for a row to count as the table header.
const MIN_HEADER_COLUMNS: usize = 3;

/// Columns of a prescription table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    FillDate,
    DrugName,
    Prescriber,
    Quantity,
    DaySupply,
    Generic,
    Price,
    RxNumber,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::FillDate,
        Column::DrugName,
        Column::Prescriber,
        Column::Quantity,
        Column::DaySupply,
        Column::Generic,
        Column::Price,
        Column::RxNumber,
    ];

    /// Columns without which a table cannot be imported.
    pub const REQUIRED: [Column; 3] = [Column::FillDate, Column::DrugName, Column::RxNumber];

    pub fn label(&self) -> &'static str {
        match self {
            Column::FillDate => "Fill Date",
            Column::DrugName => "Drug Name",
            Column::Prescriber => "Prescriber",
            Column::Quantity => "Qty",
            Column::DaySupply => "Day Supply",
            Column::Generic => "Generic",
            Column::Price => "Price",
            Column::RxNumber => "Rx Number",
        }
    }

    /// Match a header cell against the known column names (case-insensitive).
    pub fn from_header(cell: &str) -> Option<Column> {
        let normalized = normalize_header(cell);
        let column = match normalized.as_str() {
            "fill date" | "date filled" | "fill dt" | "filled" => Column::FillDate,
            "drug name" | "drug" | "medication" | "drug description" | "medication name" => {
                Column::DrugName
            }
            "prescriber" | "prescriber name" | "doctor" | "physician" => Column::Prescriber,
            "qty" | "quantity" | "qty dispensed" | "quantity dispensed" => Column::Quantity,
            "day supply" | "days supply" | "day supplied" | "days supplied" | "ds" => {
                Column::DaySupply
            }
            "generic" | "generic yn" | "is generic" => Column::Generic,
            "price" | "cost" | "patient pay" | "patient price" | "your price" | "amount" => {
                Column::Price
            }
            "rx number" | "rx" | "rx no" | "rx num" | "prescription number" => Column::RxNumber,
            _ => return None,
        };
        Some(column)
    }
}

/// `#` reads as "number"; other punctuation is dropped.
fn normalize_header(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    for c in cell.chars() {
        if c == '#' {
            out.push_str(" number ");
        } else if c.is_alphanumeric() || c.is_whitespace() {
            out.extend(c.to_lowercase());
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Location of the prescription table header and its column positions.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHeader {
    pub row_index: usize,
    /// Column → cell index within each row
    pub columns: BTreeMap<Column, usize>,
}

impl TableHeader {
    /// Recognize a header row. The first occurrence of each column wins.
    pub fn from_row(row_index: usize, row: &[String]) -> Option<TableHeader> {
        let mut columns = BTreeMap::new();
        for (i, cell) in row.iter().enumerate() {
            if let Some(column) = Column::from_header(cell) {
                columns.entry(column).or_insert(i);
            }
        }

        let has_required = Column::REQUIRED.iter().all(|c| columns.contains_key(c));
        if columns.len() >= MIN_HEADER_COLUMNS && has_required {
            Some(TableHeader { row_index, columns })
        } else {
            None
        }
    }
}

/// Find the first row whose cells match the known column set.
pub fn find_table_header(rows: &[Row]) -> Option<TableHeader> {
    rows.iter()
        .enumerate()
        .find_map(|(i, row)| TableHeader::from_row(i, row))
}

/// One body row of the prescription table, keyed by column.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrescriptionRow {
    /// 1-based row number in the source
    pub line: usize,
    pub cells: BTreeMap<Column, String>,
}

impl RawPrescriptionRow {
    /// Cell text for a column (empty when the column is absent).
    pub fn get(&self, column: Column) -> &str {
        self.cells.get(&column).map(String::as_str).unwrap_or("")
    }
}

fn is_footer(row: &[String]) -> bool {
    first_cell(row)
        .map(|(_, cell)| cell.to_lowercase().starts_with("total"))
        .unwrap_or(false)
}

/// Collect body rows after the header until a blank or footer row.
pub fn tokenize(rows: &[Row], header: &TableHeader) -> Vec<RawPrescriptionRow> {
    rows.iter()
        .enumerate()
        .skip(header.row_index + 1)
        .take_while(|(_, row)| !is_blank(row) && !is_footer(row))
        .map(|(i, row)| RawPrescriptionRow {
            line: i + 1,
            cells: header
                .columns
                .iter()
                .map(|(column, &index)| {
                    let value = row.get(index).map(|c| c.trim().to_string()).unwrap_or_default();
                    (*column, value)
                })
                .collect(),
        })
        .collect()
}

/// Reasons a body row cannot be read at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("missing fill date")]
    MissingFillDate,

    #[error("malformed fill date: {0:?}")]
    MalformedFillDate(String),
}

/// Typed view of one prescription fill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionFill {
    pub line: usize,
    pub fill_date: NaiveDate,
    pub drug_name: String,
    pub prescriber: Option<String>,
    pub quantity: Option<f64>,
    pub day_supply: Option<u32>,
    pub generic: Option<bool>,
    pub price: Option<f64>,
    pub rx_number: String,
}

impl PrescriptionFill {
    /// Parse a raw row. Unreadable optional cells become `None` plus a warning.
    pub fn from_raw(
        raw: &RawPrescriptionRow,
        date_formats: &[String],
    ) -> Result<(PrescriptionFill, Vec<String>), RowError> {
        let date_text = raw.get(Column::FillDate);
        if date_text.is_empty() {
            return Err(RowError::MissingFillDate);
        }
        let fill_date = parse_date(date_text, date_formats)
            .ok_or_else(|| RowError::MalformedFillDate(date_text.to_string()))?;

        let mut warnings = Vec::new();

        let quantity = optional_cell(raw, Column::Quantity, parse_number, &mut warnings);
        let day_supply = optional_cell(raw, Column::DaySupply, parse_day_supply, &mut warnings);
        let generic = optional_cell(raw, Column::Generic, parse_flag, &mut warnings);
        let price = optional_cell(raw, Column::Price, parse_number, &mut warnings);

        let prescriber = Some(raw.get(Column::Prescriber))
            .filter(|p| !p.is_empty())
            .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "));

        Ok((
            PrescriptionFill {
                line: raw.line,
                fill_date,
                drug_name: raw.get(Column::DrugName).to_string(),
                prescriber,
                quantity,
                day_supply,
                generic,
                price,
                rx_number: raw.get(Column::RxNumber).to_string(),
            },
            warnings,
        ))
    }
}

fn optional_cell<T>(
    raw: &RawPrescriptionRow,
    column: Column,
    parse: fn(&str) -> Option<T>,
    warnings: &mut Vec<String>,
) -> Option<T> {
    let text = raw.get(column);
    if text.is_empty() {
        return None;
    }
    let value = parse(text);
    if value.is_none() {
        warnings.push(format!("unreadable {}: {:?}", column.label(), text));
    }
    value
}

/// Parse a date using the first matching format. A trailing time part, after
/// whitespace or an ISO `T`, is ignored.
pub fn parse_date(text: &str, formats: &[String]) -> Option<NaiveDate> {
    let date_part = text.split_whitespace().next()?;
    let date_part = match date_part.split_once('T') {
        Some((date, time)) if time.starts_with(|c: char| c.is_ascii_digit()) => date,
        _ => date_part,
    };
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// Parse a number, tolerating currency symbols and thousands separators.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_day_supply(text: &str) -> Option<u32> {
    let days = parse_number(text)?;
    if days >= 0.0 && days.fract() == 0.0 && days <= u32::MAX as f64 {
        Some(days as u32)
    } else {
        None
    }
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" | "1" | "generic" => Some(true),
        "n" | "no" | "false" | "0" | "brand" => Some(false),
        _ => None,
    }
}
