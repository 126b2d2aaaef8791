//! Single-row processing.
//!
//! A row runs in this order: take a progress ticket, acquire a permit,
//! validate, check for cancellation, fetch the page, extract the image
//! URL, download. Whatever happens after the ticket is taken, the ticket
//! and the permit are dropped on the way out, so the row is always
//! reported and its permit always returned.

use std::path::PathBuf;
use std::sync::Arc;

use pic_extract_fetch::{
    FetchOptions, HttpClient, download_image, extract_image_url, fetch_html, is_valid_url,
};
use pic_extract_models::{PipelineConfig, Row, RowOutcome};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::progress::ProgressReporter;

/// Processes rows against a shared client, permit pool and reporter.
#[derive(Debug)]
pub struct RowProcessor<C> {
    client: Arc<C>,
    permits: Arc<Semaphore>,
    reporter: Arc<ProgressReporter>,
    save_folder: PathBuf,
    options: FetchOptions,
    caption: bool,
    cancel: CancellationToken,
}

impl<C: HttpClient> RowProcessor<C> {
    /// Creates a processor that writes into `save_folder`.
    #[must_use]
    pub fn new(
        client: Arc<C>,
        permits: Arc<Semaphore>,
        reporter: Arc<ProgressReporter>,
        save_folder: PathBuf,
        config: &PipelineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            permits,
            reporter,
            save_folder,
            options: FetchOptions::from(config),
            caption: config.caption,
            cancel,
        }
    }

    /// Processes one row and reports it exactly once.
    pub async fn process_row(&self, row: &Row, row_index: usize) -> RowOutcome {
        let _ticket = self.reporter.ticket(row_index);

        let Ok(_permit) = self.permits.acquire().await else {
            return skipped(row_index, "permit pool closed");
        };

        let outcome = self.process_permitted(row, row_index).await;
        log::debug!("Row {row_index} finished: {outcome:?}");
        outcome
    }

    async fn process_permitted(&self, row: &Row, row_index: usize) -> RowOutcome {
        if row.url.is_empty() || row.filename.is_empty() {
            return skipped(row_index, "empty URL or filename");
        }

        if !is_valid_url(&row.url) {
            return skipped(row_index, &format!("invalid URL: {}", row.url));
        }

        if self.cancel.is_cancelled() {
            return skipped(row_index, "cancelled");
        }

        let html = fetch_html(self.client.as_ref(), &row.url, &self.options).await;
        if html.is_none() {
            return skipped(row_index, "page fetch failed");
        }

        let Some(image_url) = extract_image_url(html.as_deref(), &row.url) else {
            return skipped(row_index, "no .jpg image found");
        };

        let caption_date = row.date.as_deref().filter(|_| self.caption);

        match download_image(
            self.client.as_ref(),
            image_url.as_str(),
            &row.filename,
            &self.save_folder,
            caption_date,
            &self.options,
        )
        .await
        {
            Some(path) => RowOutcome::Success(path),
            None => RowOutcome::Failed(format!("image download failed: {image_url}")),
        }
    }
}

fn skipped(row_index: usize, reason: &str) -> RowOutcome {
    log::warn!("Skipping row {row_index}: {reason}");
    RowOutcome::Skipped(reason.to_owned())
}
