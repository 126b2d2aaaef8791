#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Network stages of the pic-extract pipeline.
//!
//! - [`fetcher::fetch_html`] GETs a page with retry and exponential backoff.
//! - [`extractor::extract_image_url`] finds the first `.jpg` `<img>` on it.
//! - [`downloader::download_image`] saves that image under a sanitized
//!   name and stamps its caption.
//!
//! All three absorb their own failures: they log and return `None` rather
//! than surfacing errors, so a bad row never aborts a batch. HTTP goes
//! through the [`client::HttpClient`] trait so the stages can be driven
//! by [`client::ReqwestClient`] in production and by an in-memory client
//! in tests.

pub mod client;
pub mod downloader;
pub mod extractor;
pub mod fetcher;
pub mod filename;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use std::time::Duration;

use pic_extract_models::PipelineConfig;

pub use client::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
pub use downloader::download_image;
pub use extractor::extract_image_url;
pub use fetcher::fetch_html;
pub use filename::sanitize_filename;

/// Errors that can occur talking to a remote server or saving its
/// response.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// An HTTP request failed at the transport level.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A non-`reqwest` transport failure (connection refused, reset, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a status the caller cannot use.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request settings shared by the fetch and download stages.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Page fetch attempts.
    pub retries: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_factor_secs: f64,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// `User-Agent` sent with page fetches.
    pub user_agent: String,
}

impl FetchOptions {
    /// Wait before retry number `attempt + 1`: `backoff_factor * 2^attempt`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = self.backoff_factor_secs * 2f64.powf(f64::from(attempt));
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for FetchOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            retries: config.retries,
            backoff_factor_secs: config.backoff_factor_secs,
            timeout: config.request_timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Syntactic URL check applied to every row before any network I/O.
///
/// Accepts absolute `http`, `https` and `ftp` URLs whose host is an IP
/// address or a dotted domain name. Surrounding or embedded whitespace
/// fails the check.
#[must_use]
pub fn is_valid_url(raw: &str) -> bool {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return false;
    }

    let Ok(parsed) = url::Url::parse(raw) else {
        return false;
    };

    if !matches!(parsed.scheme(), "http" | "https" | "ftp") {
        return false;
    }

    match parsed.host() {
        Some(url::Host::Domain(domain)) => {
            let labels: Vec<&str> = domain.split('.').collect();
            labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
        }
        Some(url::Host::Ipv4(_) | url::Host::Ipv6(_)) => true,
        None => false,
    }
}
