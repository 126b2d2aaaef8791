#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for pic-extract.
//!
//! Provides [`init_logger`], which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while progress bars redraw, and
//! [`RowProgress`], an `indicatif` bar fed by pipeline progress events.

use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use pic_extract_models::ProgressEvent;

pub use indicatif::MultiProgress;

/// Progress bar for a pipeline run.
///
/// Starts as a spinner while the input is read and switches to a bar once
/// the first event reveals the row total.
pub struct RowProgress {
    bar: ProgressBar,
    bar_style: ProgressStyle,
}

impl RowProgress {
    /// Adds a spinner to `multi` showing `message` until the first event.
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {percent}% [{elapsed_precise}<{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self { bar, bar_style }
    }

    /// Applies one progress event.
    pub fn update(&self, event: &ProgressEvent) {
        let total = event.total as u64;
        if self.bar.length() != Some(total) {
            self.bar.set_length(total);
            self.bar.set_style(self.bar_style.clone());
        }
        self.bar.set_position(event.completed as u64);
        self.bar
            .set_message(format!("Processed {}/{} rows", event.completed, event.total));
    }

    /// Current bar position (rows finished).
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Stops the bar and leaves `message` in its place.
    pub fn finish(&self, message: String) {
        self.bar.finish_with_message(message);
    }

    /// Stops the bar and removes it from the terminal.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Records default to `info` and honour `RUST_LOG`. With `log_file`, they
/// are appended to that file, uncoloured, instead of going to stderr.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
///
/// # Errors
///
/// Returns an error if `log_file` cannot be opened for appending.
pub fn init_logger(log_file: Option<&Path>) -> std::io::Result<MultiProgress> {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG");

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .write_style(env_logger::WriteStyle::Never);
    }

    let logger = builder.build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    Ok(multi)
}
