#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for the pic-extract batch pipeline.
//!
//! A run consumes an ordered list of [`Row`]s, partitions them into
//! [`Batch`]es, reports one [`ProgressEvent`] per row, tallies per-row
//! [`RowOutcome`]s into a [`RunSummary`], and ends with a single
//! [`RunResult`]. Run tuning lives in [`config::PipelineConfig`].

pub mod config;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use config::{ConfigError, PipelineConfig};

/// One unit of input work: a page URL, the destination filename, and an
/// optional caption date.
///
/// A row's identity is its position in the source sequence; the struct
/// itself carries no index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Page to scrape for the first `.jpg` image.
    pub url: String,
    /// Destination filename (sanitized before writing).
    pub filename: String,
    /// Raw caption date string, if the row has one.
    pub date: Option<String>,
}

impl Row {
    /// Creates a row. An empty `date` is treated as absent.
    #[must_use]
    pub fn new(url: &str, filename: &str, date: Option<&str>) -> Self {
        Self {
            url: url.to_owned(),
            filename: filename.to_owned(),
            date: date.filter(|d| !d.is_empty()).map(str::to_owned),
        }
    }
}

/// A contiguous slice of rows launched together, tagged with the global
/// index of its first row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    /// Global row index of `rows[0]`.
    pub start_index: usize,
    /// The rows in this batch, in source order.
    pub rows: &'a [Row],
}

impl<'a> Batch<'a> {
    /// Splits `rows` into consecutive batches of at most `batch_size`
    /// rows, preserving order. A `batch_size` of zero is treated as one.
    #[must_use]
    pub fn partition(rows: &'a [Row], batch_size: usize) -> Vec<Self> {
        let size = batch_size.max(1);
        rows.chunks(size)
            .enumerate()
            .map(|(i, chunk)| Self {
                start_index: i * size,
                rows: chunk,
            })
            .collect()
    }

    /// Number of rows in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch holds no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates the batch's rows paired with their global row index.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &'a Row)> {
        let start = self.start_index;
        self.rows
            .iter()
            .enumerate()
            .map(move |(offset, row)| (start + offset, row))
    }
}

/// A single progress tick, emitted exactly once per row whatever its
/// outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Rows finished so far in this run, counting this one (`1..=total`).
    pub completed: usize,
    /// Total rows in the run. Fixed once the input has been read.
    pub total: usize,
    /// Zero-based index of the row this event reports.
    pub row_index: usize,
}

/// How a single row ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// An image was written to this path.
    Success(PathBuf),
    /// The row was skipped without an image (invalid input, page fetch
    /// failure, no matching image, or cancellation).
    Skipped(String),
    /// The image download or the row task itself failed.
    Failed(String),
}

impl RowOutcome {
    /// Whether the row produced an image file.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Per-outcome tallies for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Rows read from the source.
    pub total: usize,
    /// Rows that produced an image.
    pub succeeded: usize,
    /// Rows skipped without an image.
    pub skipped: usize,
    /// Rows whose download or task failed.
    pub failed: usize,
}

impl RunSummary {
    /// Creates an empty summary for a run of `total` rows.
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            skipped: 0,
            failed: 0,
        }
    }

    /// Counts one finished row.
    pub const fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Success(_) => self.succeeded += 1,
            RowOutcome::Skipped(_) => self.skipped += 1,
            RowOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Rows accounted for so far.
    #[must_use]
    pub const fn finished(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// The single terminal outcome of one full run.
///
/// Skipped or failed rows do not make a run unsuccessful; only run-fatal
/// conditions (bad input, unwritable output folder, cancellation) do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Whether the run completed.
    pub success: bool,
    /// Why the run failed, when it did.
    pub error: Option<String>,
}

impl RunResult {
    /// A completed run.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed run with the given reason.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
