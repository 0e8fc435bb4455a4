//! CSV parsing with per-column type inference.
//!
//! Each column becomes INTEGER, REAL or TEXT. Empty cells are NULL and do not
//! take part in inference. Columns named as datetime columns are parsed and
//! re-rendered in the canonical `%Y-%m-%d %H:%M:%S` form.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quarry_core::error::StoreError;
use std::collections::HashSet;
use std::path::Path;

/// Canonical rendering for datetime columns.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_INPUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_INPUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Storage class inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

/// A typed cell ready to bind into an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// A parsed CSV file.
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub column_types: Vec<ColumnType>,
    pub rows: Vec<Vec<Cell>>,
}

/// Read and type a CSV file.
pub fn read_csv(path: &Path, datetime_columns: &[String]) -> Result<CsvData, StoreError> {
    if !path.exists() {
        return Err(StoreError::DatasetNotFound(path.display().to_string()));
    }
    let unreadable = |reason: String| StoreError::DatasetUnreadable {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| unreadable(e.to_string()))?;

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(|e| unreadable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if raw_headers.is_empty() || raw_headers.iter().all(String::is_empty) {
        return Err(unreadable("no header row".into()));
    }
    let headers = dedupe_headers(raw_headers);

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| unreadable(e.to_string()))?;
        raw_rows.push(record.iter().map(str::to_string).collect());
    }

    let datetime_idx: HashSet<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| datetime_columns.iter().any(|d| d == *h))
        .map(|(i, _)| i)
        .collect();

    for (row_no, row) in raw_rows.iter_mut().enumerate() {
        for &col in &datetime_idx {
            let cell = &mut row[col];
            if cell.trim().is_empty() {
                continue;
            }
            *cell = normalize_datetime(cell).ok_or_else(|| {
                unreadable(format!(
                    "row {}: column '{}' has unparseable datetime '{}'",
                    row_no + 2,
                    headers[col],
                    cell
                ))
            })?;
        }
    }

    let column_types: Vec<ColumnType> = (0..headers.len())
        .map(|col| {
            if datetime_idx.contains(&col) {
                ColumnType::Text
            } else {
                infer_type(raw_rows.iter().map(|r| r[col].as_str()))
            }
        })
        .collect();

    let rows = raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&column_types)
                .map(|(value, ty)| to_cell(value, *ty))
                .collect()
        })
        .collect();

    Ok(CsvData {
        headers,
        column_types,
        rows,
    })
}

/// Parse a datetime in any accepted input form and render it canonically.
pub fn normalize_datetime(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local().format(DATETIME_FORMAT).to_string());
    }
    for fmt in DATETIME_INPUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.format(DATETIME_FORMAT).to_string());
        }
    }
    for fmt in DATE_INPUTS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            let dt = d.and_hms_opt(0, 0, 0)?;
            return Some(dt.format(DATETIME_FORMAT).to_string());
        }
    }
    None
}

fn infer_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut ty = ColumnType::Integer;
    let mut seen = false;
    for v in values.map(str::trim).filter(|v| !v.is_empty()) {
        seen = true;
        if ty == ColumnType::Integer && v.parse::<i64>().is_err() {
            ty = ColumnType::Real;
        }
        if ty == ColumnType::Real && v.parse::<f64>().is_err() {
            return ColumnType::Text;
        }
    }
    if seen { ty } else { ColumnType::Text }
}

fn to_cell(value: String, ty: ColumnType) -> Cell {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Cell::Null;
    }
    match ty {
        ColumnType::Integer => trimmed.parse().map(Cell::Integer).unwrap_or(Cell::Text(value)),
        ColumnType::Real => trimmed.parse().map(Cell::Real).unwrap_or(Cell::Text(value)),
        ColumnType::Text => Cell::Text(value),
    }
}

// Blank headers become column_N; repeats get a .1, .2 suffix.
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.is_empty() { format!("column_{i}") } else { h };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{base}.{n}");
                n += 1;
            }
            name
        })
        .collect()
}
