//! Shared test helpers for creating Downloader instances against a mock server.

use crate::auth::AuthContext;
use crate::config::{EngineConfig, RetryConfig};
use crate::downloader::Downloader;
use crate::resolver::Resolver;
use crate::types::{BodyModel, DownloadTask, Gender};
use std::path::Path;
use std::time::Duration;
use wiremock::{Match, MockServer, Request};

/// Path the mock server serves archives under
pub(crate) const DOWNLOAD_PATH: &str = "/download.php";

/// Engine settings with millisecond backoff so retry tests finish quickly
pub(crate) fn fast_config(output_dir: &Path) -> EngineConfig {
    EngineConfig {
        output_dir: output_dir.to_path_buf(),
        max_retries: 2,
        timeout: Duration::from_secs(5),
        max_workers: 2,
        retry: RetryConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        user_agent: "amass-dl-test".to_string(),
    }
}

/// Downloader with a session cookie, using [`fast_config`]
pub(crate) fn create_test_downloader(output_dir: &Path) -> Downloader {
    create_downloader_with(fast_config(output_dir))
}

pub(crate) fn create_downloader_with(config: EngineConfig) -> Downloader {
    Downloader::new(config, AuthContext::from_pairs([("PHPSESSID", "test-session")])).unwrap()
}

/// Task for `dataset` whose URL points at the mock server
pub(crate) fn task_for(server: &MockServer, output_dir: &Path, dataset: &str) -> DownloadTask {
    Resolver::with_base_url(format!("{}{DOWNLOAD_PATH}", server.uri()), output_dir)
        .resolve(BodyModel::SmplX, Gender::Neutral, dataset)
        .unwrap()
}

/// Value of the `sfile` query parameter the resolver produces for `dataset`
pub(crate) fn sfile_for(dataset: &str) -> String {
    format!("amass_per_dataset/smplx/neutral/mosh_results/{dataset}.tar.bz2")
}

/// Deterministic archive content of `len` bytes
pub(crate) fn archive_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Matches requests that carry no `Range` header
pub(crate) struct NoRangeHeader;

impl Match for NoRangeHeader {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("range")
    }
}
