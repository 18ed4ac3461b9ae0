use super::{Cell, TableBuilder};
use crate::Result;
use crate::table::Table;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub(super) fn read(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.headers()?.iter().map(String::from).collect();
    let mut builder = TableBuilder::new(headers)?;

    for record in reader.records() {
        let record = record?;
        builder.push_row(record.iter().map(Cell::from_field).collect())?;
    }

    builder.finish()
}
