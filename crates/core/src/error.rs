//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
