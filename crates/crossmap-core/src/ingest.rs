//! Row ingestion: CSV and JSON files → rows of raw cell text keyed by column.

use std::collections::HashMap;
use std::path::Path;

use crate::config::column_key;
use crate::error::{CrossmapError, Result};
use crate::graph::identifier::normalize_text;

/// One input row. Column names are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based source line (or record number) for diagnostics.
    pub line: usize,
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            cells: HashMap::new(),
        }
    }

    pub fn from_pairs<I, K, V>(line: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut row = Self::new(line);
        for (column, cell) in pairs {
            row.insert(column.as_ref(), cell);
        }
        row
    }

    pub fn insert(&mut self, column: &str, cell: impl Into<String>) {
        self.cells.insert(column_key(column), cell.into());
    }

    /// `None` means the column is structurally absent; `Some("")` is an empty cell.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(&column_key(column)).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Rows plus the headers as they appeared in the source, in order.
#[derive(Debug, Clone, Default)]
pub struct RowBatch {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Read rows from `path`, choosing the reader by extension (`.json` or CSV).
pub fn read_rows(path: impl AsRef<Path>) -> Result<RowBatch> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        read_rows_json(path)
    } else {
        read_rows_csv(path)
    }
}

/// Read a CSV file whose first record is the header.
///
/// Short records are kept: their missing trailing columns are simply absent
/// from the row, which the builder treats as a structural defect.
pub fn read_rows_csv(path: impl AsRef<Path>) -> Result<RowBatch> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| CrossmapError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_text).collect();
    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(i + 2);
        let mut row = RawRow::new(line);
        for (header, cell) in headers.iter().zip(record.iter()) {
            row.insert(header, cell);
        }
        rows.push(row);
    }
    Ok(RowBatch { headers, rows })
}

/// Read a JSON array of objects mapping column name → cell.
///
/// Strings are taken as-is, numbers and booleans are stringified, and `null`
/// becomes an empty cell.
pub fn read_rows_json(path: impl AsRef<Path>) -> Result<RowBatch> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| CrossmapError::io(path, e))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let serde_json::Value::Array(items) = value else {
        return Err(CrossmapError::InvalidInput {
            path: path.to_path_buf(),
            reason: "expected a JSON array of row objects".to_string(),
        });
    };

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let serde_json::Value::Object(fields) = item else {
            return Err(CrossmapError::InvalidInput {
                path: path.to_path_buf(),
                reason: format!("row {} is not an object", i + 1),
            });
        };
        let mut row = RawRow::new(i + 1);
        for (column, cell) in fields {
            let column = normalize_text(&column);
            if !headers.iter().any(|h| column_key(h) == column_key(&column)) {
                headers.push(column.clone());
            }
            let text = match cell {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            row.insert(&column, text);
        }
        rows.push(row);
    }
    Ok(RowBatch { headers, rows })
}
