//! Result Normalization
//!
//! Converts the engine's row-oriented raw output into a column-oriented
//! table keyed by variable name, with the reserved `time` column first.
//! The transpose is pure: no I/O, deterministic for a given input.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::model::variable::ScalarValue;

/// Name of the reserved independent-axis column.
pub const TIME_COLUMN: &str = "time";

/// One sample as reported by the engine: field name to value, in the order
/// the engine emitted the fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub fields: Vec<(String, ScalarValue)>,
}

impl RawRow {
    pub fn new(fields: Vec<(String, ScalarValue)>) -> Self {
        Self { fields }
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

/// The engine's raw output for one run: samples in time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub rows: Vec<RawRow>,
}

/// Raised when the engine's output cannot be shaped into a table.
#[derive(Error, Debug)]
pub enum MalformedResultError {
    #[error("engine returned no samples")]
    Empty,

    #[error("sample {row} is missing the 'time' field")]
    MissingTime { row: usize },

    #[error("sample {row} has an inconsistent field set: {detail}")]
    InconsistentRow { row: usize, detail: String },
}

/// Column-oriented simulation result.
///
/// Column order follows the engine's field order with `time` always first;
/// every column holds exactly one value per sample.
#[derive(Debug, Clone)]
pub struct ResultTable {
    columns: Vec<String>,
    values: HashMap<String, Vec<ScalarValue>>,
}

impl ResultTable {
    /// Column names, `time` first.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values of one column, in sample order.
    pub fn column(&self, name: &str) -> Option<&[ScalarValue]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    /// The reserved time column.
    pub fn time(&self) -> &[ScalarValue] {
        // Guaranteed by normalize(); a ResultTable cannot exist without it.
        self.values
            .get(TIME_COLUMN)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the table as delimited text: a header row of column names
    /// followed by one data row per sample. Fields containing the delimiter,
    /// quotes, or line breaks are quoted.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = self.columns.iter().map(|name| csv_field(name)).collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for i in 0..self.len() {
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|name| csv_field(&self.values[name][i].to_string()))
                .collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }

        out
    }

    /// Writes the CSV rendering to a file.
    pub fn write_csv(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_csv())
    }
}

/// Quotes one CSV field if it contains the delimiter, a quote, or a line
/// break; embedded quotes are doubled.
fn csv_field(text: &str) -> String {
    if text
        .chars()
        .any(|c| matches!(c, ',' | '"' | '\n' | '\r'))
    {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Transposes the engine's row-oriented output into a [`ResultTable`].
///
/// The first sample fixes the expected field set and the column order
/// (`time` is moved to the front). Every later sample must carry exactly
/// the same fields; anything else is a malformed result.
pub fn normalize(raw: &RawResult) -> Result<ResultTable, MalformedResultError> {
    let first = raw.rows.first().ok_or(MalformedResultError::Empty)?;

    if first.get(TIME_COLUMN).is_none() {
        return Err(MalformedResultError::MissingTime { row: 0 });
    }

    // Column order: time first, then remaining fields as emitted.
    let mut columns = vec![TIME_COLUMN.to_string()];
    columns.extend(
        first
            .fields
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| name != TIME_COLUMN),
    );

    let mut values: HashMap<String, Vec<ScalarValue>> = columns
        .iter()
        .map(|name| (name.clone(), Vec::with_capacity(raw.rows.len())))
        .collect();

    for (i, row) in raw.rows.iter().enumerate() {
        if row.fields.len() != columns.len() {
            return Err(MalformedResultError::InconsistentRow {
                row: i,
                detail: format!("expected {} fields, found {}", columns.len(), row.fields.len()),
            });
        }

        for name in &columns {
            match row.get(name) {
                Some(value) => values.get_mut(name).expect("column exists").push(value.clone()),
                None if name == TIME_COLUMN => {
                    return Err(MalformedResultError::MissingTime { row: i })
                }
                None => {
                    return Err(MalformedResultError::InconsistentRow {
                        row: i,
                        detail: format!("missing field '{}'", name),
                    })
                }
            }
        }
    }

    Ok(ResultTable { columns, values })
}
