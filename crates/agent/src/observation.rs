//! Rendering tool output into observation text for the transcript.

use quarry_core::error::ToolError;
use quarry_core::{Table, ToolOutput};

/// Suffix appended to over-long text output.
pub const TEXT_TRUNCATION_NOTICE: &str = "\n... (output truncated due to length)";

/// Turns tool output into bounded observation text.
///
/// Tables render as markdown. A rendering longer than `limit` characters is
/// replaced by the first `preview_rows` rows plus a notice; text is cut at
/// `limit` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationFormatter {
    limit: usize,
    preview_rows: usize,
}

impl Default for ObservationFormatter {
    fn default() -> Self {
        Self::new(2000, 5)
    }
}

impl ObservationFormatter {
    pub fn new(limit: usize, preview_rows: usize) -> Self {
        Self {
            limit,
            preview_rows,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn format(&self, output: &ToolOutput) -> String {
        match output {
            ToolOutput::Table(table) => self.format_table(table),
            ToolOutput::Text(text) => self.format_text(text),
        }
    }

    pub fn format_table(&self, table: &Table) -> String {
        let full = table.to_markdown();
        if full.chars().count() <= self.limit {
            return full;
        }
        let preview = table.head(self.preview_rows).to_markdown();
        format!(
            "{}{}",
            truncate_chars(&preview, self.limit),
            self.table_notice()
        )
    }

    pub fn format_text(&self, text: &str) -> String {
        if text.chars().count() <= self.limit {
            return text.to_string();
        }
        format!("{}{TEXT_TRUNCATION_NOTICE}", truncate_chars(text, self.limit))
    }

    /// Observation for a tool that failed validation or execution.
    pub fn format_error(error: &ToolError) -> String {
        format!("Tool execution failed: {error}")
    }

    fn table_notice(&self) -> String {
        format!(
            "\n... (results truncated due to length, showing first {} rows)",
            self.preview_rows
        )
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
