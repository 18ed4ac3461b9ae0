//! Uploaded tabular files to [`Table`]s.
//!
//! Both readers feed a [`TableBuilder`], which normalises the header row and
//! infers a dtype per column: a column is integer when every cell holds an
//! integer, numeric when every non-empty cell is a number, otherwise text.
//! Integer cells are parsed from their raw text so large values stay exact.

mod delimited;
mod spreadsheet;

use crate::table::{Column, Table};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Cell markers read as missing values.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Spreadsheet,
}

impl FileKind {
    /// Picks a reader from the upload's file extension, case-insensitively.
    pub fn from_filename(filename: Option<&str>) -> Result<Self> {
        let extension = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let kind = match extension.as_str() {
            "csv" => Some(Self::Csv),
            "xls" | "xlsx" => Some(Self::Spreadsheet),
            _ => None,
        };

        kind.ok_or_else(|| {
            debug!("Rejected upload {:?} with extension {:?}", filename, extension);
            Error::UnsupportedFileType
        })
    }
}

pub fn read_table(kind: FileKind, bytes: &[u8]) -> Result<Table> {
    let table = match kind {
        FileKind::Csv => delimited::read(bytes)?,
        FileKind::Spreadsheet => spreadsheet::read(bytes)?,
    };

    debug!(
        "Parsed {:?} upload into {} rows with columns {:?}",
        kind,
        table.n_rows(),
        table.column_names()
    );
    Ok(table)
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Number { value: f64, raw: String },
    Text(String),
}

impl Cell {
    /// Classifies a raw text field the way a CSV field is read.
    fn from_field(field: &str) -> Self {
        if NA_VALUES.contains(&field) || NA_VALUES.contains(&field.trim()) {
            return Self::Empty;
        }
        match field.trim().parse::<f64>() {
            Ok(value) => Self::Number {
                value,
                raw: field.to_string(),
            },
            Err(_) => Self::Text(field.to_string()),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Number { raw, .. } => raw.trim().parse().ok(),
            _ => None,
        }
    }
}

struct TableBuilder {
    headers: Vec<String>,
    columns: Vec<Vec<Cell>>,
}

impl TableBuilder {
    fn new(headers: Vec<String>) -> Result<Self> {
        if headers.is_empty() {
            return Err(Error::parse("No columns to parse from file"));
        }
        let headers = normalise_headers(headers);
        let columns = headers.iter().map(|_| Vec::new()).collect();
        Ok(Self { headers, columns })
    }

    fn push_row(&mut self, cells: Vec<Cell>) -> Result<()> {
        if cells.len() > self.headers.len() {
            return Err(Error::parse(format!(
                "Expected {} fields, saw {}",
                self.headers.len(),
                cells.len()
            )));
        }
        if cells.iter().all(Cell::is_empty) {
            return Ok(());
        }

        let width = cells.len();
        for (column, cell) in self.columns.iter_mut().zip(cells) {
            column.push(cell);
        }
        for column in self.columns.iter_mut().skip(width) {
            column.push(Cell::Empty);
        }
        Ok(())
    }

    fn finish(self) -> Result<Table> {
        let mut table = Table::default();
        for (name, cells) in self.headers.into_iter().zip(self.columns) {
            let integers: Option<Vec<i64>> = cells.iter().map(Cell::as_integer).collect();
            let numeric = cells.iter().all(|c| !matches!(c, Cell::Text(_)));
            let column = if let Some(values) = integers {
                Column::integer(name, values)
            } else if numeric {
                let values = cells
                    .into_iter()
                    .map(|cell| match cell {
                        Cell::Number { value, .. } => value,
                        _ => f64::NAN,
                    })
                    .collect();
                Column::numeric(name, values)
            } else {
                let values = cells
                    .into_iter()
                    .map(|cell| match cell {
                        Cell::Empty => String::new(),
                        Cell::Number { raw, .. } => raw,
                        Cell::Text(text) => text,
                    })
                    .collect();
                Column::text(name, values)
            };
            table.push_column(column)?;
        }
        Ok(table)
    }
}

/// Blank headers become `Unnamed: <index>`; repeats get `.1`, `.2`, ...
fn normalise_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = if name.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name
            };
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            unique
        })
        .collect()
}
