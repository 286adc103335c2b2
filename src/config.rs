//! Configuration types for amass-dl
//!
//! The configuration file is JSON with two sections, `download_options` (what to
//! fetch) and `download_settings` (where and how). It is loaded and validated once
//! at startup; everything downstream receives an immutable [`EngineConfig`].

use crate::error::{Error, Result};
use crate::resolver;
use crate::types::{BodyModel, Gender};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Download endpoint of the AMASS file server
pub const DEFAULT_BASE_URL: &str = "https://download.is.tue.mpg.de/download.php";

/// User-Agent sent with every request (the server rejects unknown clients)
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Upper bound for `max_workers`
pub const MAX_WORKERS_LIMIT: usize = 10;

/// What to download
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// Body model (SMPL-H or SMPL-X)
    pub body_model: BodyModel,

    /// Gender variant (male, female or neutral)
    pub gender: Gender,

    /// Dataset names, downloaded in this order
    pub datasets: Vec<String>,
}

/// Where and how to download
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Directory receiving the archives
    pub output_dir: PathBuf,

    /// Cookie file holding the authenticated session
    pub cookie_file: PathBuf,

    /// Retries after the first attempt for transient failures (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Timeout for connecting and for each body read, in seconds (default: 300)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Concurrent downloads, 1 to 10 (default: 4)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Download endpoint (default: the AMASS file server)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Delay policy between retries
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Main configuration file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// What to download
    pub download_options: DownloadOptions,

    /// Where and how to download
    pub download_settings: DownloadSettings,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config {
                    message: format!("configuration file not found: {}", path.display()),
                    key: None,
                }
            } else {
                Error::Io(e)
            }
        })?;

        let config = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string
    ///
    /// Invalid enum values and missing fields are reported as configuration
    /// errors; syntactically broken JSON as a serialization error.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content).map_err(|e| {
            if e.is_data() {
                Error::Config {
                    message: e.to_string(),
                    key: None,
                }
            } else {
                Error::Serialization(e)
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let options = &self.download_options;
        let settings = &self.download_settings;

        if options.datasets.is_empty() {
            return Err(Error::config(
                "at least one dataset must be listed",
                "download_options.datasets",
            ));
        }

        let mut seen = HashSet::new();
        for dataset in &options.datasets {
            if !resolver::is_known_dataset(dataset) {
                return Err(Error::config(
                    format!("unknown dataset '{dataset}' (run with --list to see available datasets)"),
                    "download_options.datasets",
                ));
            }
            if !seen.insert(dataset.as_str()) {
                return Err(Error::config(
                    format!("dataset '{dataset}' is listed more than once"),
                    "download_options.datasets",
                ));
            }
        }

        if settings.output_dir.as_os_str().is_empty() {
            return Err(Error::config(
                "output directory must not be empty",
                "download_settings.output_dir",
            ));
        }

        if !(1..=MAX_WORKERS_LIMIT).contains(&settings.max_workers) {
            return Err(Error::config(
                format!(
                    "max_workers must be between 1 and {MAX_WORKERS_LIMIT}, got {}",
                    settings.max_workers
                ),
                "download_settings.max_workers",
            ));
        }

        if settings.timeout.is_zero() {
            return Err(Error::config(
                "timeout must be at least one second",
                "download_settings.timeout",
            ));
        }

        if url::Url::parse(&settings.base_url).is_err() {
            return Err(Error::config(
                format!("invalid base URL '{}'", settings.base_url),
                "download_settings.base_url",
            ));
        }

        if settings.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "backoff_multiplier must be at least 1.0",
                "download_settings.retry.backoff_multiplier",
            ));
        }

        Ok(())
    }

    /// Engine settings derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        let settings = &self.download_settings;
        EngineConfig {
            output_dir: settings.output_dir.clone(),
            max_retries: settings.max_retries,
            timeout: settings.timeout,
            max_workers: settings.max_workers,
            retry: settings.retry.clone(),
            user_agent: settings.user_agent.clone(),
        }
    }
}

/// Retry delay configuration
///
/// The number of retries is `download_settings.max_retries`; this only controls
/// the wait between attempts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry (default: 5 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Immutable settings shared read-only by every download worker
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Directory receiving the archives
    pub output_dir: PathBuf,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Timeout for connecting and for each body read
    pub timeout: Duration,
    /// Requested worker count (clamped by [`EngineConfig::worker_count`])
    pub max_workers: usize,
    /// Delay policy between retries
    pub retry: RetryConfig,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./amass_data"),
            max_retries: default_max_retries(),
            timeout: default_timeout(),
            max_workers: default_max_workers(),
            retry: RetryConfig::default(),
            user_agent: default_user_agent(),
        }
    }
}

impl EngineConfig {
    /// Number of workers actually started, always within 1..=10
    pub fn worker_count(&self) -> usize {
        clamp_workers(self.max_workers)
    }
}

/// Clamp a requested worker count into 1..=[`MAX_WORKERS_LIMIT`]
pub fn clamp_workers(requested: usize) -> usize {
    let clamped = requested.clamp(1, MAX_WORKERS_LIMIT);
    if clamped != requested {
        tracing::warn!(requested, clamped, "worker count out of range, clamping");
    }
    clamped
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_workers() -> usize {
    4
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
