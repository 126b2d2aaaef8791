//! Run configuration.
//!
//! A [`PipelineConfig`] is built once per run (defaults, optionally a TOML
//! file, then CLI overrides) and handed to the coordinator explicitly.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Browser-like `User-Agent` sent with every page fetch.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Errors raised while loading or validating a [`PipelineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tuning knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Size of the shared permit pool: the most row operations in flight
    /// at once across the whole run.
    pub max_concurrent: usize,
    /// Rows launched together per wave.
    pub batch_size: usize,
    /// Page fetch attempts per row.
    pub retries: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_factor_secs: f64,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Pause between batches, in milliseconds.
    pub batch_pause_ms: u64,
    /// `User-Agent` header for page fetches.
    pub user_agent: String,
    /// Stamp the row's date onto the saved image.
    pub caption: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 50,
            batch_size: 100,
            retries: 3,
            backoff_factor_secs: 1.0,
            request_timeout_secs: 30,
            batch_pause_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            caption: true,
        }
    }
}

impl PipelineConfig {
    /// Parses a config from TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is not valid for this schema.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that every value can drive a run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "max-concurrent must be at least 1".to_owned(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch-size must be at least 1".to_owned(),
            ));
        }
        if self.retries == 0 {
            return Err(ConfigError::Invalid("retries must be at least 1".to_owned()));
        }
        if !self.backoff_factor_secs.is_finite() || self.backoff_factor_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "backoff-factor-secs must be a non-negative number, got {}",
                self.backoff_factor_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request-timeout-secs must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pause between batches.
    #[must_use]
    pub const fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}
