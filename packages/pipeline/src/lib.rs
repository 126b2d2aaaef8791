#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Concurrent batch pipeline.
//!
//! The [`Coordinator`] reads every row up front, splits them into ordered
//! batches and runs each batch to completion before pausing and starting
//! the next. Inside a batch every row is its own task, but all tasks of
//! the run draw from one shared permit pool, so `max_concurrent` caps
//! in-flight rows across batch boundaries too.
//!
//! Each row is handled by a [`RowProcessor`], which absorbs every
//! row-local failure into a [`RowOutcome`](pic_extract_models::RowOutcome)
//! and always emits exactly one progress event. Only run-fatal problems
//! surface as [`PipelineError`].

pub mod coordinator;
pub mod processor;
pub mod progress;

use std::path::PathBuf;

use pic_extract_models::ConfigError;
use pic_extract_rows::RowSourceError;

pub use coordinator::Coordinator;
pub use processor::RowProcessor;
pub use progress::{
    ProgressReceiver, ProgressReporter, ProgressSender, ProgressTicket, progress_channel,
};

/// Run-fatal errors. Anything row-local is absorbed before it gets here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The run configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The output folder could not be created.
    #[error("Failed to create output folder {}: {source}", path.display())]
    OutputFolder {
        /// Folder that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Rows could not be read, or there were none.
    #[error("Failed to read rows: {0}")]
    RowSource(#[from] RowSourceError),

    /// The blocking task reading the rows panicked or was aborted.
    #[error("Row reader task failed: {0}")]
    RowReader(#[from] tokio::task::JoinError),

    /// The run was cancelled before all batches started.
    #[error("run cancelled")]
    Cancelled,
}
