use super::{Cell, NA_VALUES, TableBuilder};
use crate::table::Table;
use crate::{Error, Result};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;

/// Reads the first worksheet of an `.xls`/`.xlsx` workbook; its first row is
/// the header.
pub(super) fn read(bytes: &[u8]) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::parse("workbook has no worksheets"))??;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => header.iter().map(|cell| cell.to_string()).collect(),
        None => Vec::new(),
    };
    let mut builder = TableBuilder::new(headers)?;

    for row in rows {
        let cells = row.iter().map(cell).collect::<Result<Vec<_>>>()?;
        builder.push_row(cells)?;
    }

    builder.finish()
}

fn cell(data: &Data) -> Result<Cell> {
    let cell = match data {
        Data::Empty => Cell::Empty,
        Data::Int(value) => Cell::Number {
            value: *value as f64,
            raw: value.to_string(),
        },
        Data::Float(value) => Cell::Number {
            value: *value,
            raw: value.to_string(),
        },
        Data::Bool(value) => Cell::Number {
            value: if *value { 1.0 } else { 0.0 },
            raw: value.to_string(),
        },
        Data::String(text) if NA_VALUES.contains(&text.as_str()) => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::Error(err) => {
            return Err(Error::parse(format!("spreadsheet cell error: {}", err)));
        }
        other => Cell::Text(other.to_string()),
    };
    Ok(cell)
}
