//! Cluster client error types.

use thiserror::Error;

/// Cluster API errors.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cluster API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("injected failure: {0}")]
    Injected(String),
}

/// Result type for cluster operations.
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;
