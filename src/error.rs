//! Error types for `issue_threads`.
//!
//! A single [`ThreadsError`] covers both jobs. The variants follow the
//! failure taxonomy of the fetcher and composer:
//!
//! - configuration problems (fatal before any work)
//! - authentication/authorization failures (fatal for the whole run)
//! - transport, HTTP status and decode failures (fatal for one label)
//! - timestamp and record failures (fatal for one issue directory)

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T, E = ThreadsError> = std::result::Result<T, E>;

/// Errors produced by the fetch and compose jobs.
#[derive(Debug, thiserror::Error)]
pub enum ThreadsError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP 401 from the tracker.
    #[error("Invalid authentication token: {body}")]
    Unauthorized { body: String },

    /// HTTP 403 from the tracker.
    #[error("API rate limit exceeded or permission denied: {body}")]
    Forbidden { body: String },

    /// Any other non-success HTTP status.
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// Connection, timeout or body-read failure.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A timestamp that is not in the `YYYY-MM-DDTHH:MM:SSZ` wire format.
    #[error("Invalid timestamp '{value}': expected YYYY-MM-DDTHH:MM:SSZ")]
    Timestamp { value: String },

    /// A record on disk that could not be used.
    #[error("Invalid record {}: {reason}", path.display())]
    Record { path: PathBuf, reason: String },

    /// A fetch run finished but some labels failed.
    #[error("Fetch incomplete; failed labels: {}", labels.join(", "))]
    IncompleteFetch { labels: Vec<String> },

    /// A best-effort compose run finished with failing directories.
    #[error("Compose incomplete; {failed} issue directories failed")]
    IncompleteCompose { failed: usize },
}

impl ThreadsError {
    /// Shorthand for a [`ThreadsError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Attach a path to an error raised while reading a record.
    pub fn record(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Record {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that must abort the entire run rather than one label.
    #[must_use]
    pub const fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::Forbidden { .. } | Self::Config(_)
        )
    }

    /// Exit code used by the binary for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Unauthorized { .. } | Self::Forbidden { .. } => 3,
            _ => 1,
        }
    }
}
