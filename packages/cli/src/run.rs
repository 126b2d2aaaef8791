//! The `run` subcommand and the run itself.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use pic_extract_cli_utils::{MultiProgress, RowProgress};
use pic_extract_fetch::ReqwestClient;
use pic_extract_models::PipelineConfig;
use pic_extract_pipeline::{Coordinator, progress_channel};
use pic_extract_rows::open_row_source;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Spreadsheet of rows (.csv, .xlsx, .xlsm, .xlsb, .xls or .ods)
    #[arg(long)]
    input: PathBuf,
    /// Folder the images are saved into (created if missing)
    #[arg(long)]
    output: PathBuf,
    /// TOML file with pipeline settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Most rows processed at the same time
    #[arg(long)]
    max_concurrent: Option<usize>,
    /// Rows launched together per batch
    #[arg(long)]
    batch_size: Option<usize>,
    /// Page fetch attempts per row
    #[arg(long)]
    retries: Option<u32>,
    /// Base of the exponential retry backoff, in seconds
    #[arg(long)]
    backoff_factor: Option<f64>,
    /// Save images without stamping the date caption
    #[arg(long)]
    no_caption: bool,
    /// Append log records to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl RunArgs {
    /// Resolves the flags into a run request: config file first, then
    /// flag overrides.
    pub fn into_request(self) -> Result<RunRequest, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(max_concurrent) = self.max_concurrent {
            config.max_concurrent = max_concurrent;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(backoff_factor) = self.backoff_factor {
            config.backoff_factor_secs = backoff_factor;
        }
        if self.no_caption {
            config.caption = false;
        }

        Ok(RunRequest {
            input: self.input,
            output: self.output,
            config,
            log_file: self.log_file,
        })
    }
}

/// Everything one run needs, however it was gathered.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: PipelineConfig,
    pub log_file: Option<PathBuf>,
}

/// Runs the pipeline for `request`, showing progress on `multi`, and
/// prints the success report.
pub async fn execute(
    multi: &MultiProgress,
    request: &RunRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = open_row_source(&request.input)?;
    let client = Arc::new(ReqwestClient::new()?);
    let coordinator = Coordinator::new(client, request.config.clone());

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; finishing the current batch before stopping");
            cancel.cancel();
        }
    });

    let (tx, mut rx) = progress_channel();
    let progress = RowProgress::new(multi, "Reading rows...");

    let drain = async {
        while let Some(event) = rx.recv().await {
            progress.update(&event);
        }
    };
    let (result, ()) = tokio::join!(coordinator.run(&source, &request.output, tx), drain);

    if !result.success {
        progress.finish_and_clear();
        let message = result.error.unwrap_or_else(|| "unknown error".to_string());
        return Err(message.into());
    }

    progress.finish(format!("Processed {} rows", progress.position()));

    let count = count_images(&request.output)?;
    println!(
        "Download completed successfully! {count} images in {}",
        request.output.display()
    );

    Ok(())
}

/// Counts regular files directly inside `folder`.
fn count_images(folder: &Path) -> std::io::Result<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(folder)? {
        if entry?.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}
