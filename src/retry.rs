//! Retry classification and exponential backoff
//!
//! [`IsRetryable`] decides which failures are worth another attempt, and
//! [`Backoff`] produces the wait before each retry. The retry loop itself lives
//! in the downloader's per-task state machine, since every attempt has to
//! re-read the partial file size before it starts.
//!
//! # Example
//!
//! ```
//! use amass_dl::config::RetryConfig;
//! use amass_dl::retry::Backoff;
//! use std::time::Duration;
//!
//! let config = RetryConfig {
//!     initial_delay: Duration::from_secs(1),
//!     max_delay: Duration::from_secs(3),
//!     backoff_multiplier: 2.0,
//!     jitter: false,
//! };
//! let mut backoff = Backoff::new(&config);
//! assert_eq!(backoff.next_delay(), Duration::from_secs(1));
//! assert_eq!(backoff.next_delay(), Duration::from_secs(2));
//! assert_eq!(backoff.next_delay(), Duration::from_secs(3));
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, 5xx, truncated bodies) return `true`.
/// Permanent failures (authentication, local disk errors, 4xx, corrupt data) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Request construction and redirect loops will fail the same way again
            Error::Network(e) => !(e.is_builder() || e.is_redirect()),
            Error::Timeout { .. } => true,
            Error::HttpStatus { status } => (500..600).contains(status),
            Error::Truncated { .. } => true,
            // Retrying with the same stale cookie cannot succeed
            Error::Auth { .. } => false,
            // Local disk errors (disk full, permissions) need user action
            Error::Io(_) => false,
            Error::Config { .. } => false,
            Error::Extraction { .. } => false,
            Error::Serialization(_) => false,
            Error::Cancelled => false,
        }
    }
}

/// Exponential backoff delay sequence
///
/// Each call to [`Backoff::next_delay`] returns the wait before the next retry and
/// grows the base delay by `backoff_multiplier`, capped at `max_delay`.
#[derive(Clone, Debug)]
pub struct Backoff {
    delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl Backoff {
    /// Start a new delay sequence
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            delay: config.initial_delay.min(config.max_delay),
            max_delay: config.max_delay,
            multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }

    /// Delay to wait before the next retry
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay;

        let next = Duration::from_secs_f64(current.as_secs_f64() * self.multiplier);
        self.delay = next.min(self.max_delay);

        if self.jitter {
            add_jitter(current)
        } else {
            current
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay.
/// This means the actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
