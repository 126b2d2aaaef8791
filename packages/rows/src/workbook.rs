//! Workbook input (xlsx, xlsm, xlsb, xls, ods).
//!
//! Only the first worksheet is read. Cells are rendered to text the way a
//! user would read them in the sheet: whole numbers lose their trailing
//! `.0`, and date cells become `YYYY-MM-DD HH:MM:SS`.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use pic_extract_models::Row;

use crate::{RowSourceError, row_from_cells};

/// Format used for date-typed cells.
pub const DATETIME_CELL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reads every row of the first worksheet in the workbook at `path`.
///
/// # Errors
///
/// Returns [`RowSourceError::Spreadsheet`] if the workbook cannot be opened
/// or parsed, and [`RowSourceError::Empty`] if it has no worksheets.
pub fn read_workbook_rows(path: &Path) -> Result<Vec<Row>, RowSourceError> {
    let mut workbook = open_workbook_auto(path)?;

    let Some(range) = workbook.worksheet_range_at(0) else {
        return Err(RowSourceError::Empty);
    };
    let range = range?;

    log::debug!(
        "Worksheet 0 of {} starts at {:?} and spans {:?}",
        path.display(),
        range.start(),
        range.get_size()
    );

    Ok(rows_from_range(&range))
}

/// Converts a worksheet range into rows anchored at cell `A1`.
///
/// A range only covers the used area of the sheet, so blank rows above it
/// become empty [`Row`]s and blank columns to its left become empty cells.
/// Row indices and column positions then match what the user sees.
#[must_use]
pub fn rows_from_range(range: &Range<Data>) -> Vec<Row> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };
    let leading_rows = first_row as usize;
    let leading_cols = first_col as usize;

    let blank_rows = std::iter::repeat_with(|| row_from_cells(std::iter::empty::<&str>()))
        .take(leading_rows);

    let used_rows = range.rows().map(|cells| {
        let texts = std::iter::repeat_n(String::new(), leading_cols)
            .chain(cells.iter().map(cell_text));
        row_from_cells(texts)
    });

    blank_rows.chain(used_rows).collect()
}

/// Renders one cell as text.
#[must_use]
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_datetime().map_or_else(
            || format_number(dt.as_f64()),
            |dt: chrono::NaiveDateTime| dt.format(DATETIME_CELL_FORMAT).to_string(),
        ),
    }
}

/// Formats `value` without a fractional part when it is a whole number.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
