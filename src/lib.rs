//! # amass-dl
//!
//! Resumable, concurrent downloader and extractor for the per-dataset archives
//! of the AMASS motion-capture collection.
//!
//! ## Overview
//!
//! - [`Resolver`] turns (body model, gender, dataset) into a download URL and a
//!   local file name
//! - [`Downloader`] fetches archives with HTTP range resume, bounded retries and
//!   a fixed pool of workers, reporting one result per task
//! - [`extraction`] unpacks the downloaded `.tar.bz2` archives
//!
//! ## Quick Start
//!
//! ```no_run
//! use amass_dl::{AuthContext, Config, Downloader, Resolver};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.json"))?;
//!     let auth = AuthContext::from_cookie_file(&config.download_settings.cookie_file)?;
//!     let tasks = Resolver::from_config(&config).resolve_all(&config)?;
//!
//!     let downloader = Downloader::new(config.engine_config(), auth)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = downloader.run(tasks).await;
//!     println!("{:?}", report.summary());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Session cookies
pub mod auth;
/// Configuration types
pub mod config;
/// Download engine (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Dataset name resolution
pub mod resolver;
/// Retry classification and backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use auth::AuthContext;
pub use config::{Config, EngineConfig, RetryConfig};
pub use downloader::{Downloader, RunStats, StatsSnapshot};
pub use error::{Error, ErrorDetail, Result};
pub use extraction::{
    ExtractState, ExtractionSummary, extract_all, extract_all_with_progress, extract_one,
};
pub use resolver::{KNOWN_DATASETS, Resolver};
pub use types::{
    BodyModel, DownloadResult, DownloadTask, Event, Gender, Outcome, RunReport, RunSummary,
};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use amass_dl::{AuthContext, Downloader, EngineConfig, cancel_on_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = Downloader::new(EngineConfig::default(), AuthContext::default())?;
///     tokio::spawn(cancel_on_signal(downloader.cancellation_token()));
///
///     let report = downloader.run(Vec::new()).await;
///     assert!(report.results.is_empty());
///     Ok(())
/// }
/// ```
pub async fn cancel_on_signal(token: CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => {
            tracing::warn!("interrupted, finishing current chunk and keeping partial files");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            // Never resolve, so the run is not cancelled by a broken handler
            std::future::pending::<()>().await;
        }
    }
}
