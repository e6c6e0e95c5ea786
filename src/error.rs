//! Error types surfaced to callers of the collector.
//!
//! Field-level and item-level failures never show up here; they are absorbed
//! by the stage that hit them. What remains are operation-level failures.

use thiserror::Error;

/// Operation-level failure of a collection request
#[derive(Debug, Error)]
pub enum CollectError {
    /// A second run was requested while one is still in progress
    #[error("{0} is already in progress")]
    AlreadyRunning(&'static str),

    /// Nothing usable was found for a page action that needs content
    #[error("{0}")]
    NothingFound(String),

    /// The relay to the background agent is gone
    #[error("Background agent is not listening: {0}")]
    RelayClosed(String),

    /// Other errors
    #[error("Collect error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for CollectError {
    fn from(err: anyhow::Error) -> Self {
        // Use {:#} to preserve full error chain with context
        Self::Other(format!("{err:#}"))
    }
}

/// Convenience alias for Result with `CollectError`
pub type CollectResult<T> = Result<T, CollectError>;

/// Failure of a single transfer attempt
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server answered with status {0}")]
    Status(u16),

    /// The server took the request but sent nothing back in time
    #[error("No response within {0:?}")]
    NoResponse(std::time::Duration),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
