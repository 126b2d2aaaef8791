//! Headerless CSV input.

use std::io::Read;
use std::path::Path;

use pic_extract_models::Row;

use crate::{RowSourceError, row_from_cells};

/// Reads every record of the CSV file at `path` as a [`Row`].
///
/// # Errors
///
/// Returns [`RowSourceError`] if the file cannot be opened or a record is
/// malformed.
pub fn read_csv_rows(path: &Path) -> Result<Vec<Row>, RowSourceError> {
    let file = std::fs::File::open(path)?;
    read_csv(file)
}

/// Reads CSV records from any reader. Records may have any number of
/// fields; only the first three are used.
///
/// # Errors
///
/// Returns [`RowSourceError::Csv`] if a record cannot be parsed.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Row>, RowSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(row_from_cells(record.iter()));
    }

    Ok(rows)
}
