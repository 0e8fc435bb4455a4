//! Tabular results shared by the store, the tools and the observation
//! formatter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column name used for the structured error row.
pub const ERROR_COLUMN: &str = "error";

/// A rectangular result set: column names plus rows of scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// A one-cell table reporting a failed query, the way the query tool
    /// hands SQL errors back to the model.
    pub fn error_row(message: impl Into<String>) -> Self {
        Self {
            columns: vec![ERROR_COLUMN.to_string()],
            rows: vec![vec![Value::String(message.into())]],
        }
    }

    /// The error message if this table is a structured error row.
    pub fn error_message(&self) -> Option<&str> {
        match (self.columns.as_slice(), self.rows.as_slice()) {
            ([col], [row]) if col == ERROR_COLUMN => row.first().and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// A copy holding only the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Render as a GitHub-style markdown pipe table.
    ///
    /// Columns are padded to their widest cell. A table with no columns
    /// renders as `(no rows)`.
    pub fn to_markdown(&self) -> String {
        if self.columns.is_empty() {
            return "(no rows)".into();
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                (0..self.columns.len())
                    .map(|i| render_cell(row.get(i).unwrap_or(&Value::Null)))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(col.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let mut out = String::new();
        push_line(&mut out, self.columns.iter().map(String::as_str), &widths);
        out.push('\n');
        out.push('|');
        for w in &widths {
            out.push_str(&format!(" {} |", "-".repeat(*w)));
        }
        for row in &cells {
            out.push('\n');
            push_line(&mut out, row.iter().map(String::as_str), &widths);
        }
        out
    }
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    out.push('|');
    for (cell, w) in cells.zip(widths) {
        let pad = w.saturating_sub(cell.chars().count());
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(pad));
        out.push_str(" |");
    }
}

fn render_cell(value: &Value) -> String {
    let raw = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    // keep every row on one line and pipes out of cell text
    raw.replace('\n', " ").replace('|', "\\|")
}
