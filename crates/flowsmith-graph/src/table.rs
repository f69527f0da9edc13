//! Input table ingestion
//!
//! Reads the CSV export of a flow sheet into raw [`Row`] values. Cells are
//! kept verbatim here; normalization happens in the compiler so that the
//! raw table stays inspectable.
//!
//! Missing required columns are reported as warnings, not errors: an
//! absent column simply yields absent field values on every row.

use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// Columns every flow sheet is expected to carry.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "Page Name",
    "Intent Name",
    "Trigger Type & User Example",
    "Bot Prompt",
    "Next Page / Transition",
    "Parameter Set",
    "Webhook Action",
    "Suggested Chips",
];

/// Columns that may or may not be present.
pub const OPTIONAL_COLUMNS: [&str; 3] = ["Step", "Next Step", "Notes/Comments"];

/// One raw input record. Fields hold the verbatim cell text; `None` means
/// the column was absent from the sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// Page Name
    pub page_name: Option<String>,
    /// Intent Name
    pub intent_name: Option<String>,
    /// Trigger Type & User Example
    pub trigger: Option<String>,
    /// Bot Prompt
    pub bot_prompt: Option<String>,
    /// Next Page / Transition
    pub next_page: Option<String>,
    /// Parameter Set
    pub parameter_set: Option<String>,
    /// Webhook Action
    pub webhook_action: Option<String>,
    /// Suggested Chips
    pub chips: Option<String>,
    /// Step (optional column)
    pub step: Option<String>,
    /// Next Step (optional column)
    pub next_step: Option<String>,
}

/// A parsed input table: raw rows plus what we learned about the header.
#[derive(Debug, Clone)]
pub struct RowTable {
    /// Rows in source order
    pub rows: Vec<Row>,
    /// Required columns the header was missing
    pub missing_columns: Vec<String>,
    /// Whether the sheet carried Step / Next Step columns
    pub has_step_info: bool,
    /// Basename of the source file, carried into graph metadata
    pub source_file: String,
}

impl RowTable {
    /// Read a table from a CSV file on disk.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, &source_file)
    }

    /// Read a table from any CSV reader.
    ///
    /// `source_file` is recorded as-is in the table (and later in graph
    /// metadata) to identify where the rows came from.
    pub fn from_reader<R: Read>(reader: R, source_file: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);

        let missing_columns: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| column(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing_columns.is_empty() {
            tracing::warn!(
                source = source_file,
                "input table is missing columns: {:?}",
                missing_columns
            );
        }

        let page_name = column("Page Name");
        let intent_name = column("Intent Name");
        let trigger = column("Trigger Type & User Example");
        let bot_prompt = column("Bot Prompt");
        let next_page = column("Next Page / Transition");
        let parameter_set = column("Parameter Set");
        let webhook_action = column("Webhook Action");
        let chips = column("Suggested Chips");
        let step = column("Step");
        let next_step = column("Next Step");
        let has_step_info = step.is_some() || next_step.is_some();
        if has_step_info {
            tracing::debug!(source = source_file, "found Step/Next Step columns");
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let cell = |idx: Option<usize>| {
                idx.and_then(|i| record.get(i)).map(|s| s.to_string())
            };
            rows.push(Row {
                page_name: cell(page_name),
                intent_name: cell(intent_name),
                trigger: cell(trigger),
                bot_prompt: cell(bot_prompt),
                next_page: cell(next_page),
                parameter_set: cell(parameter_set),
                webhook_action: cell(webhook_action),
                chips: cell(chips),
                step: cell(step),
                next_step: cell(next_step),
            });
        }

        Ok(Self {
            rows,
            missing_columns,
            has_step_info,
            source_file: source_file.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_HEADER: &str = "Page Name,Intent Name,Trigger Type & User Example,Bot Prompt,Next Page / Transition,Parameter Set,Webhook Action,Suggested Chips";

    #[test]
    fn test_reads_rows_in_source_order() {
        let csv = format!(
            "{FULL_HEADER}\nWelcome,greet,Intent: hi,Hello!,Menu,,,\nMenu,,,Pick one,,,,\n"
        );
        let table = RowTable::from_reader(csv.as_bytes(), "test.csv").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].page_name.as_deref(), Some("Welcome"));
        assert_eq!(table.rows[1].page_name.as_deref(), Some("Menu"));
        assert!(table.missing_columns.is_empty());
        assert!(!table.has_step_info);
    }

    #[test]
    fn test_missing_columns_are_warnings_not_errors() {
        let csv = "Page Name,Bot Prompt\nWelcome,Hello!\n";
        let table = RowTable::from_reader(csv.as_bytes(), "partial.csv").unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(
            table
                .missing_columns
                .contains(&"Suggested Chips".to_string())
        );
        assert_eq!(table.rows[0].chips, None);
        assert_eq!(table.rows[0].bot_prompt.as_deref(), Some("Hello!"));
    }

    #[test]
    fn test_detects_step_columns() {
        let csv = format!("{FULL_HEADER},Step,Next Step\nWelcome,,,Hi,,,,,1,2\n");
        let table = RowTable::from_reader(csv.as_bytes(), "steps.csv").unwrap();
        assert!(table.has_step_info);
        assert_eq!(table.rows[0].step.as_deref(), Some("1"));
        assert_eq!(table.rows[0].next_step.as_deref(), Some("2"));
    }

    #[test]
    fn test_quoted_multiline_chips_cell() {
        let csv = format!("{FULL_HEADER}\nMenu,,,Pick,,,,\"Yes\nNo\"\n");
        let table = RowTable::from_reader(csv.as_bytes(), "chips.csv").unwrap();
        assert_eq!(table.rows[0].chips.as_deref(), Some("Yes\nNo"));
    }

    #[test]
    fn test_from_csv_path_records_basename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, format!("{FULL_HEADER}\nWelcome,,,Hi,,,,\n")).unwrap();
        let table = RowTable::from_csv_path(&path).unwrap();
        assert_eq!(table.source_file, "orders.csv");
        assert_eq!(table.rows.len(), 1);
    }
}
