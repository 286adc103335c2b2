//! Error types for amass-dl
//!
//! This module provides the error handling for the library:
//! - A single domain error enum covering configuration, HTTP, local I/O and extraction
//! - Stable machine-readable error codes for per-task reporting
//! - [`ErrorDetail`], the serializable form stored on failed results

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for amass-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for amass-dl
///
/// Per-task errors (everything except [`Error::Config`] and
/// [`Error::Serialization`]) are captured in that task's result and never abort a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_settings.max_workers")
        key: Option<String>,
    },

    /// The server rejected our session cookies (HTTP 401/403)
    #[error("authentication failed (HTTP {status}): check that the cookie file holds a valid session")]
    Auth {
        /// The HTTP status returned by the server
        status: u16,
    },

    /// Network error reported by the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A network operation exceeded the configured timeout
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// What was being waited on ("response", "read")
        operation: &'static str,
        /// The timeout that elapsed
        after: std::time::Duration,
    },

    /// Unexpected HTTP status
    #[error("unexpected HTTP status {status}")]
    HttpStatus {
        /// The HTTP status returned by the server
        status: u16,
    },

    /// The response body ended before the announced size was received
    #[error("response truncated: expected {expected} bytes, file holds {received}")]
    Truncated {
        /// Total size announced by the server
        expected: u64,
        /// Size of the local file when the stream ended
        received: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive extraction failed
    #[error("extraction failed for {archive}: {reason}")]
    Extraction {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// Serialization error (malformed configuration file)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The run was interrupted before this work finished
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a configuration key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Auth { .. } => "auth_error",
            Error::Network(_) => "network_error",
            Error::Timeout { .. } => "timeout",
            Error::HttpStatus { .. } => "http_status",
            Error::Truncated { .. } => "truncated",
            Error::Io(_) => "io_error",
            Error::Extraction { .. } => "extraction_failed",
            Error::Serialization(_) => "serialization_error",
            Error::Cancelled => "cancelled",
        }
    }
}

/// Error information recorded on a failed result
///
/// Kept separate from [`Error`] so results stay `Clone` and serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "auth_error", "timeout")
    pub code: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorDetail {
    /// Create a new error detail with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this detail describes an authentication problem
    pub fn is_auth(&self) -> bool {
        self.code == "auth_error"
    }
}

impl From<&Error> for ErrorDetail {
    fn from(error: &Error) -> Self {
        Self::new(error.error_code(), error.to_string())
    }
}
