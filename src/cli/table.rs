//! Table formatting for CLI list commands
//!
//! One formatter renders every list in the requested output format:
//! a boxed table for humans, TSV/CSV for pipes, or bare IDs.

use chrono::NaiveDate;
use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::workflow::SheetStatus;

/// Longest text shown in a table cell
const MAX_TEXT: usize = 48;

/// IDs are shortened in tables; `--format id` prints them whole
const MAX_ID: usize = 16;

/// A typed cell value
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Record ID; the column used for `--format id`
    Id(String),
    /// Plain text, truncated in tables
    Text(String),
    /// Sheet status
    Status(SheetStatus),
    /// Fixed-point number already in canonical form
    Decimal(String),
    Date(NaiveDate),
    Number(u64),
    Empty,
}

impl CellValue {
    fn plain(&self) -> String {
        match self {
            CellValue::Id(s) | CellValue::Text(s) | CellValue::Decimal(s) => s.clone(),
            CellValue::Status(status) => status.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    fn display(&self) -> String {
        match self {
            CellValue::Text(s) => truncate_str(s, MAX_TEXT),
            CellValue::Id(s) => truncate_str(s, MAX_ID),
            CellValue::Empty => "-".to_string(),
            other => other.plain(),
        }
    }
}

/// Rows plus headers, rendered on demand
pub struct TableFormatter {
    headers: Vec<&'static str>,
    rows: Vec<Vec<CellValue>>,
    /// Singular noun for the summary line, e.g. "sheet"
    noun: &'static str,
}

impl TableFormatter {
    pub fn new(headers: Vec<&'static str>, noun: &'static str) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            noun,
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render in a line-oriented format; JSON/YAML are handled by callers
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Id => self
                .rows
                .iter()
                .filter_map(|row| {
                    row.iter().find_map(|c| match c {
                        CellValue::Id(id) => Some(format!("{}\n", id)),
                        _ => None,
                    })
                })
                .collect(),
            OutputFormat::Tsv => self.delimited('\t', |s| s.replace(['\t', '\n'], " ")),
            OutputFormat::Csv => self.delimited(',', escape_csv),
            _ => {
                let mut builder = Builder::default();
                builder.push_record(self.headers.iter().map(|h| h.to_string()));
                for row in &self.rows {
                    builder.push_record(row.iter().map(CellValue::display));
                }
                format!("{}\n", builder.build().with(Style::rounded()))
            }
        }
    }

    fn delimited(&self, sep: char, escape: impl Fn(&str) -> String) -> String {
        let mut out = String::new();
        let sep = sep.to_string();
        out.push_str(&self.headers.join(&sep).to_lowercase());
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|c| escape(&c.plain())).collect();
            out.push_str(&cells.join(&sep));
            out.push('\n');
        }
        out
    }

    /// Print the table, with a count line in table mode unless quiet
    pub fn print(&self, format: OutputFormat, quiet: bool) {
        print!("{}", self.render(format));
        if format == OutputFormat::Auto && !quiet {
            println!(
                "{} {}(s) found",
                style(self.rows.len()).cyan(),
                self.noun
            );
        }
    }
}
