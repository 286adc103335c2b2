//! Dataset downloader split into focused submodules.
//!
//! The [`Downloader`] struct and its methods are organized by concern:
//! - [`transfer`] - Single-task download with resume and retry
//! - [`engine`] - Bounded worker pool running a batch of tasks
//! - [`stats`] - Live counters shared by all workers

mod engine;
mod stats;
mod transfer;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use stats::{RunStats, StatsSnapshot};

use crate::auth::AuthContext;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event channel; slow subscribers skip ahead rather than block downloads
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Downloads dataset archives (cloneable - all fields are Arc-wrapped or cheap handles)
///
/// One instance is shared by every worker of a run. Session cookies and engine
/// settings are read-only after construction.
#[derive(Clone)]
pub struct Downloader {
    /// HTTP client (connection pool shared across workers)
    pub(crate) client: reqwest::Client,
    /// Session cookies sent with every request
    pub(crate) auth: Arc<AuthContext>,
    /// Engine settings
    pub(crate) config: Arc<EngineConfig>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Live counters
    pub(crate) stats: RunStats,
    /// Cancels queued and in-flight downloads
    pub(crate) cancel: CancellationToken,
}

impl Downloader {
    /// Create a downloader from engine settings and session cookies
    ///
    /// Only the connect phase gets a client-level timeout; response headers and
    /// each body read are bounded separately so large archives are not cut off.
    pub fn new(config: EngineConfig, auth: AuthContext) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.timeout)
            .build()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            auth: Arc::new(auth),
            config: Arc::new(config),
            event_tx,
            stats: RunStats::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// Subscribe to download events
    ///
    /// Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Live counters for the current run
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Token that cancels this downloader when triggered
    ///
    /// In-flight transfers stop at the next chunk boundary and keep their
    /// partial files; queued tasks are reported as cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel all queued and in-flight downloads
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Engine settings in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
