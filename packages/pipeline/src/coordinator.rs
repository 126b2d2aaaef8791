//! Batch coordination.
//!
//! A run moves through `Init -> Reading -> (Batching -> Draining)* ->
//! Done | Failed`. Batches run strictly one after another; the next batch
//! is never launched until every task of the current one has finished,
//! and a fixed pause separates them.

use std::path::Path;
use std::sync::Arc;

use pic_extract_fetch::HttpClient;
use pic_extract_models::{Batch, PipelineConfig, RowOutcome, RunResult, RunSummary};
use pic_extract_rows::{RowSource, RowSourceError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::PipelineError;
use crate::processor::RowProcessor;
use crate::progress::{ProgressReporter, ProgressSender};

/// Drives a full run over a row source.
#[derive(Debug)]
pub struct Coordinator<C> {
    client: Arc<C>,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl<C: HttpClient + 'static> Coordinator<C> {
    /// Creates a coordinator with its own cancellation token.
    #[must_use]
    pub fn new(client: Arc<C>, config: PipelineConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this coordinator's runs.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the pipeline and folds the result into a [`RunResult`].
    pub async fn run<S: RowSource + Clone + 'static>(
        &self,
        source: &S,
        save_folder: &Path,
        progress: ProgressSender,
    ) -> RunResult {
        match self.run_detailed(source, save_folder, progress).await {
            Ok(_) => RunResult::success(),
            Err(e) => {
                log::error!("Run failed: {e}");
                RunResult::failure(e.to_string())
            }
        }
    }

    /// Runs the pipeline and returns per-outcome tallies.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::Config`] if the configuration fails validation
    /// * [`PipelineError::OutputFolder`] if `save_folder` cannot be created
    /// * [`PipelineError::RowSource`] if rows cannot be read or there are none
    /// * [`PipelineError::RowReader`] if the reading task panicked
    /// * [`PipelineError::Cancelled`] if the run was cancelled before its
    ///   last batch started
    pub async fn run_detailed<S: RowSource + Clone + 'static>(
        &self,
        source: &S,
        save_folder: &Path,
        progress: ProgressSender,
    ) -> Result<RunSummary, PipelineError> {
        self.config.validate()?;

        tokio::fs::create_dir_all(save_folder)
            .await
            .map_err(|source| PipelineError::OutputFolder {
                path: save_folder.to_path_buf(),
                source,
            })?;

        let reader = source.clone();
        let rows = tokio::task::spawn_blocking(move || reader.read_rows()).await??;
        if rows.is_empty() {
            return Err(RowSourceError::Empty.into());
        }

        let total = rows.len();
        let batches = Batch::partition(&rows, self.config.batch_size);
        let batch_count = batches.len();
        log::info!(
            "Processing {total} rows in {batch_count} batches (max {} concurrent)",
            self.config.max_concurrent
        );

        let permits = Arc::new(Semaphore::new(
            self.config.max_concurrent.min(Semaphore::MAX_PERMITS),
        ));
        let reporter = Arc::new(ProgressReporter::new(total, progress));
        let processor = Arc::new(RowProcessor::new(
            Arc::clone(&self.client),
            permits,
            reporter,
            save_folder.to_path_buf(),
            &self.config,
            self.cancel.clone(),
        ));

        let mut summary = RunSummary::new(total);

        for (i, batch) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::warn!(
                    "Run cancelled before batch {}/{batch_count}; {} of {total} rows finished",
                    i + 1,
                    summary.finished()
                );
                return Err(PipelineError::Cancelled);
            }

            log::info!(
                "Processing batch {}/{batch_count} ({} rows)",
                i + 1,
                batch.len()
            );

            let mut tasks = JoinSet::new();
            for (row_index, row) in batch.indexed() {
                let processor = Arc::clone(&processor);
                let row = row.clone();
                tasks.spawn(async move { processor.process_row(&row, row_index).await });
            }

            while let Some(joined) = tasks.join_next().await {
                let outcome = joined.unwrap_or_else(|e| {
                    log::error!("Row task failed: {e}");
                    RowOutcome::Failed(format!("row task failed: {e}"))
                });
                summary.record(&outcome);
            }

            if i + 1 < batch_count {
                tokio::select! {
                    () = self.cancel.cancelled() => {}
                    () = tokio::time::sleep(self.config.batch_pause()) => {}
                }
            }
        }

        log::info!(
            "Run finished: {} rows, {} saved, {} skipped, {} failed",
            summary.total,
            summary.succeeded,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::time::Duration;

    use image::{ImageFormat, Rgb, RgbImage};
    use pic_extract_fetch::testing::{MockClient, RecordedCall};
    use pic_extract_fetch::{FetchError, HttpRequest, HttpResponse};
    use pic_extract_models::{ProgressEvent, Row};

    use super::*;
    use crate::progress::{ProgressReceiver, progress_channel};

    fn jpeg_bytes() -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        RgbImage::from_pixel(200, 120, Rgb([30, 60, 90]))
            .write_to(&mut bytes, ImageFormat::Jpeg)
            .unwrap();
        bytes.into_inner()
    }

    fn temp_folder(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pic_extract_coordinator_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn drain(rx: &mut ProgressReceiver) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// `n` rows, each on its own host, each page pointing at `pic.jpg`.
    fn gallery(n: usize) -> (Vec<Row>, MockClient) {
        let bytes = jpeg_bytes();
        let mut client = MockClient::new();
        let mut rows = Vec::new();
        for i in 0..n {
            let page = format!("http://r{i}.test/p");
            client = client
                .html(&page, r#"<html><img src="pic.jpg"></html>"#)
                .bytes(&format!("http://r{i}.test/pic.jpg"), &bytes);
            rows.push(Row::new(&page, &format!("img{i}"), None));
        }
        (rows, client)
    }

    fn host_calls(calls: &[RecordedCall], host: usize) -> Vec<&RecordedCall> {
        let prefix = format!("http://r{host}.test/");
        calls
            .iter()
            .filter(|call| call.request.url.starts_with(&prefix))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_scenario() {
        let dir = temp_folder("end_to_end");
        let bytes = jpeg_bytes();
        let client = Arc::new(
            MockClient::new()
                .html("http://a.test/p", r#"<img src="pic.jpg">"#)
                .bytes("http://a.test/pic.jpg", &bytes)
                .html("http://b.test/p", r#"<img src="pic.jpg">"#)
                .bytes("http://b.test/pic.jpg", &bytes),
        );
        let rows = vec![
            Row::new("http://a.test/p", "img1", Some("2024-01-02")),
            Row::new("", "img2", Some("")),
            Row::new("http://b.test/p", "img3", Some("not-a-date")),
        ];
        let (tx, mut rx) = progress_channel();
        let coordinator = Coordinator::new(Arc::clone(&client), PipelineConfig::default());

        let result = coordinator.run(&rows, &dir, tx).await;

        assert_eq!(result, RunResult::success());

        let img1 = std::fs::read(dir.join("img1.jpg")).unwrap();
        assert_ne!(img1, bytes, "img1 should carry a caption");
        assert!(!dir.join("img2.jpg").exists());
        assert_eq!(std::fs::read(dir.join("img3.jpg")).unwrap(), bytes);

        assert_eq!(client.call_count(), 4);
        assert!(client.calls_to("").is_empty());

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert_eq!(events.last().map(|e| e.completed), Some(3));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn emits_each_completed_count_once() {
        let dir = temp_folder("progress");
        let (mut rows, client) = gallery(5);
        rows.push(Row::new("", "blank", None));
        rows.push(Row::new("ftp//broken", "bad", None));
        rows.push(Row::new("http://missing.test/p", "gone", None));
        let total = rows.len();
        let (tx, mut rx) = progress_channel();
        let config = PipelineConfig {
            batch_size: 3,
            ..PipelineConfig::default()
        };
        let coordinator = Coordinator::new(Arc::new(client), config);

        let summary = coordinator.run_detailed(&rows, &dir, tx).await.unwrap();

        let events = drain(&mut rx);
        let completed: Vec<usize> = events.iter().map(|e| e.completed).collect();
        assert_eq!(completed, (1..=total).collect::<Vec<_>>());
        let indices: BTreeSet<usize> = events.iter().map(|e| e.row_index).collect();
        assert_eq!(indices, (0..total).collect());
        assert!(events.iter().all(|e| e.total == total));

        assert_eq!(summary.total, total);
        assert_eq!(summary.succeeded, 5);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.failed, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn caps_concurrent_rows() {
        let dir = temp_folder("concurrency");
        let (rows, client) = gallery(10);
        let client = Arc::new(client.with_latency(Duration::from_millis(500)));
        let (tx, _rx) = progress_channel();
        let config = PipelineConfig {
            max_concurrent: 2,
            ..PipelineConfig::default()
        };
        let coordinator = Coordinator::new(Arc::clone(&client), config);

        let summary = coordinator.run_detailed(&rows, &dir, tx).await.unwrap();

        assert_eq!(summary.succeeded, 10);
        assert_eq!(client.call_count(), 20);
        assert_eq!(client.peak_in_flight(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_run_sequentially_with_a_pause() {
        let dir = temp_folder("batches");
        let (rows, client) = gallery(5);
        let client = Arc::new(client.with_latency(Duration::from_millis(100)));
        let (tx, _rx) = progress_channel();
        let config = PipelineConfig {
            batch_size: 2,
            ..PipelineConfig::default()
        };
        let coordinator = Coordinator::new(Arc::clone(&client), config);

        coordinator.run_detailed(&rows, &dir, tx).await.unwrap();

        let calls = client.calls();
        let batches: [&[usize]; 3] = [&[0, 1], &[2, 3], &[4]];
        let span = |hosts: &[usize]| {
            let batch_calls: Vec<&RecordedCall> = hosts
                .iter()
                .flat_map(|&host| host_calls(&calls, host))
                .collect();
            let start = batch_calls.iter().map(|c| c.started).min().unwrap();
            let end = batch_calls.iter().map(|c| c.finished).max().unwrap();
            (start, end)
        };

        for pair in batches.windows(2) {
            let (_, previous_end) = span(pair[0]);
            let (next_start, _) = span(pair[1]);
            assert!(next_start >= previous_end);
            assert!(next_start - previous_end >= Duration::from_secs(1));
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn rerun_overwrites_existing_files() {
        let dir = temp_folder("rerun");
        let (rows, client) = gallery(2);
        let client = Arc::new(client);
        let coordinator = Coordinator::new(Arc::clone(&client), PipelineConfig::default());

        let (tx, _rx) = progress_channel();
        assert!(coordinator.run(&rows, &dir, tx).await.success);
        let first = std::fs::read(dir.join("img0.jpg")).unwrap();

        let (tx, _rx) = progress_channel();
        assert!(coordinator.run(&rows, &dir, tx).await.success);
        let second = std::fs::read(dir.join("img0.jpg")).unwrap();

        assert_eq!(first, second);
        assert_eq!(client.call_count(), 8);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn empty_source_fails_the_run() {
        let dir = temp_folder("empty");
        let client = Arc::new(MockClient::new());
        let (tx, mut rx) = progress_channel();
        let coordinator = Coordinator::new(Arc::clone(&client), PipelineConfig::default());

        let result = coordinator.run(&Vec::<Row>::new(), &dir, tx).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("empty"));
        assert_eq!(client.call_count(), 0);
        assert!(drain(&mut rx).is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn creates_a_missing_output_folder() {
        let dir = temp_folder("nested").join("a/b/c");
        let (rows, client) = gallery(1);
        let (tx, _rx) = progress_channel();
        let coordinator = Coordinator::new(Arc::new(client), PipelineConfig::default());

        let result = coordinator.run(&rows, &dir, tx).await;

        assert!(result.success);
        assert!(dir.join("img0.jpg").is_file());

        let _ = std::fs::remove_dir_all(temp_folder("nested"));
    }

    #[tokio::test]
    async fn unusable_output_folder_is_fatal() {
        let dir = temp_folder("blocked");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("not_a_folder");
        std::fs::write(&file, b"").unwrap();
        let (rows, client) = gallery(1);
        let client = Arc::new(client);
        let (tx, _rx) = progress_channel();
        let coordinator = Coordinator::new(Arc::clone(&client), PipelineConfig::default());

        let err = coordinator
            .run_detailed(&rows, &file.join("out"), tx)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::OutputFolder { .. }));
        assert_eq!(client.call_count(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn invalid_config_is_fatal() {
        let dir = temp_folder("config");
        let (rows, client) = gallery(1);
        let (tx, _rx) = progress_channel();
        let config = PipelineConfig {
            max_concurrent: 0,
            ..PipelineConfig::default()
        };
        let coordinator = Coordinator::new(Arc::new(client), config);

        let err = coordinator.run_detailed(&rows, &dir, tx).await.unwrap_err();

        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test]
    async fn cancelled_run_fails_without_network() {
        let dir = temp_folder("cancelled");
        let (rows, client) = gallery(3);
        let client = Arc::new(client);
        let (tx, mut rx) = progress_channel();
        let coordinator = Coordinator::new(Arc::clone(&client), PipelineConfig::default());
        coordinator.cancellation_token().cancel();

        let result = coordinator.run(&rows, &dir, tx).await;

        assert_eq!(result, RunResult::failure("run cancelled"));
        assert_eq!(client.call_count(), 0);
        assert!(drain(&mut rx).is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_mid_run_drains_the_current_batch() {
        let dir = temp_folder("cancel_mid_run");
        let (rows, client) = gallery(4);
        let client = Arc::new(client.with_latency(Duration::from_millis(200)));
        let (tx, mut rx) = progress_channel();
        let config = PipelineConfig {
            batch_size: 2,
            ..PipelineConfig::default()
        };
        let cancel = CancellationToken::new();
        let coordinator =
            Coordinator::new(Arc::clone(&client), config).with_cancellation(cancel.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
        let err = coordinator.run_detailed(&rows, &dir, tx).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, PipelineError::Cancelled));
        assert!(dir.join("img0.jpg").is_file());
        assert!(dir.join("img1.jpg").is_file());
        assert!(!dir.join("img2.jpg").exists());
        assert_eq!(drain(&mut rx).len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    struct PanickingClient;

    impl HttpClient for PanickingClient {
        async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
            panic!("client exploded on {}", request.url);
        }
    }

    #[tokio::test]
    async fn panicking_row_is_failed_and_still_reported() {
        let dir = temp_folder("panic");
        let rows = vec![
            Row::new("http://a.test/p", "img", None),
            Row::new("", "skipped", None),
        ];
        let (tx, mut rx) = progress_channel();
        let coordinator = Coordinator::new(Arc::new(PanickingClient), PipelineConfig::default());

        let summary = coordinator.run_detailed(&rows, &dir, tx).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(drain(&mut rx).len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    /// Panics on one URL and answers everything else from a [`MockClient`].
    struct PanicOn {
        url: &'static str,
        inner: MockClient,
    }

    impl HttpClient for PanicOn {
        async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
            assert_ne!(request.url, self.url, "client exploded");
            self.inner.get(request).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_permit_survives_skips_failures_and_panics() {
        let dir = temp_folder("single_permit");
        let bytes = jpeg_bytes();
        let inner = MockClient::new()
            .html("http://broken.test/p", r#"<img src="pic.jpg">"#)
            .status("http://broken.test/pic.jpg", 500)
            .html("http://good.test/p", r#"<img src="pic.jpg">"#)
            .bytes("http://good.test/pic.jpg", &bytes);
        let client = Arc::new(PanicOn {
            url: "http://boom.test/p",
            inner,
        });
        let rows = vec![
            Row::new("not a url", "invalid", None),
            Row::new("http://missing.test/p", "missing", None),
            Row::new("http://broken.test/p", "broken", None),
            Row::new("http://boom.test/p", "boom", None),
            Row::new("http://good.test/p", "good", None),
        ];
        let config = PipelineConfig {
            max_concurrent: 1,
            batch_size: rows.len(),
            ..PipelineConfig::default()
        };
        let (tx, mut rx) = progress_channel();
        let coordinator = Coordinator::new(client, config);

        let summary = tokio::time::timeout(
            Duration::from_secs(60),
            coordinator.run_detailed(&rows, &dir, tx),
        )
        .await
        .expect("a permit was never returned")
        .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 2);
        assert!(dir.join("good.jpg").exists());
        assert!(!dir.join("broken.jpg").exists());
        assert_eq!(drain(&mut rx).len(), rows.len());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn panicking_reader_fails_the_run() {
        #[derive(Clone)]
        struct ExplodingSource;

        impl RowSource for ExplodingSource {
            fn read_rows(&self) -> Result<Vec<Row>, RowSourceError> {
                panic!("reader exploded");
            }
        }

        let dir = temp_folder("exploding_reader");
        let (tx, mut rx) = progress_channel();
        let client = Arc::new(MockClient::new());
        let coordinator = Coordinator::new(Arc::clone(&client), PipelineConfig::default());

        let err = coordinator
            .run_detailed(&ExplodingSource, &dir, tx)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::RowReader(_)));
        assert_eq!(client.call_count(), 0);
        assert!(drain(&mut rx).is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
