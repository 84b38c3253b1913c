//! Error taxonomy for the watcher pipeline
//!
//! Every error here is recoverable. Only `ConfigError` (see `crate::config`) is fatal,
//! and only at startup.

use thiserror::Error;

/// Failure to obtain a snapshot from the observation API.
///
/// The watcher treats any `FetchError` as "skip this cycle".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl FetchError {
    /// The endpoint that failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }
}

/// Failure to deliver a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("chat transport error: {0}")]
    Transport(String),
    #[error("chat API rejected message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
    #[error("could not decode chat API response: {0}")]
    Decode(String),
}

impl DeliveryError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Network failures, rate limiting (429) and server errors (5xx) are transient.
    /// Any other rejection (bad token, unknown chat) will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            DeliveryError::Transport(_) => true,
            DeliveryError::Rejected { status, .. } => *status == 429 || *status >= 500,
            DeliveryError::Decode(_) => false,
        }
    }
}

/// Failure to open or read a log stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("log source {source_name} is unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
    #[error("log stream I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}
