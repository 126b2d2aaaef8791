#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Row sources for the pic-extract pipeline.
//!
//! Input sheets have no header row. Column 1 is the page URL, column 2
//! the destination filename, column 3 an optional caption date. Every
//! physical row becomes one [`Row`], blank ones included, so row indices
//! match the sheet.
//!
//! [`SheetSource`] picks a reader from the file extension: CSV files go
//! through [`csv_source`], workbooks through [`workbook`].

pub mod csv_source;
pub mod workbook;

use std::path::{Path, PathBuf};

use pic_extract_models::Row;

/// Errors that can occur while reading rows.
#[derive(Debug, thiserror::Error)]
pub enum RowSourceError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The workbook could not be opened or parsed.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// The file extension has no reader.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The source holds no rows.
    #[error("Input file is empty")]
    Empty,
}

/// Produces the ordered, finite row sequence for one run.
pub trait RowSource: Send + Sync {
    /// Reads every row, in source order.
    ///
    /// # Errors
    ///
    /// Returns [`RowSourceError`] if the source cannot be read. An empty
    /// source is [`RowSourceError::Empty`].
    fn read_rows(&self) -> Result<Vec<Row>, RowSourceError>;
}

impl RowSource for Vec<Row> {
    fn read_rows(&self) -> Result<Vec<Row>, RowSourceError> {
        if self.is_empty() {
            return Err(RowSourceError::Empty);
        }
        Ok(self.clone())
    }
}

/// A spreadsheet file on disk, read with the reader its extension selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSource {
    path: PathBuf,
}

impl SheetSource {
    /// Creates a source for `path`. Nothing is read until
    /// [`RowSource::read_rows`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// File kinds a [`SheetSource`] can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    /// Comma-separated text.
    Csv,
    /// Excel or OpenDocument workbook (first worksheet).
    Workbook,
}

impl SheetFormat {
    /// Infers the format from `path`'s extension, case-insensitively.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Workbook),
            _ => None,
        }
    }
}

/// Opens the spreadsheet at `path` as a row source, rejecting extensions
/// no reader handles before any file I/O happens.
///
/// # Errors
///
/// Returns [`RowSourceError::UnsupportedFormat`] if the extension is not
/// one of `.csv`, `.xlsx`, `.xlsm`, `.xlsb`, `.xls` or `.ods`.
pub fn open_row_source(path: impl Into<PathBuf>) -> Result<SheetSource, RowSourceError> {
    let source = SheetSource::new(path);
    if SheetFormat::from_path(&source.path).is_none() {
        return Err(RowSourceError::UnsupportedFormat(
            source.path.display().to_string(),
        ));
    }
    Ok(source)
}

impl RowSource for SheetSource {
    fn read_rows(&self) -> Result<Vec<Row>, RowSourceError> {
        let rows = match SheetFormat::from_path(&self.path) {
            Some(SheetFormat::Csv) => csv_source::read_csv_rows(&self.path)?,
            Some(SheetFormat::Workbook) => workbook::read_workbook_rows(&self.path)?,
            None => {
                return Err(RowSourceError::UnsupportedFormat(
                    self.path.display().to_string(),
                ));
            }
        };

        if rows.is_empty() {
            return Err(RowSourceError::Empty);
        }

        log::info!("Read {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }
}

/// Builds a [`Row`] from one record's cells. Missing cells are empty;
/// every cell is trimmed; an empty date is absent.
pub fn row_from_cells<I, S>(cells: I) -> Row
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cells = cells.into_iter();
    let mut next = || {
        cells
            .next()
            .map(|cell| cell.as_ref().trim().to_owned())
            .unwrap_or_default()
    };

    let url = next();
    let filename = next();
    let date = next();

    Row::new(&url, &filename, Some(&date))
}
