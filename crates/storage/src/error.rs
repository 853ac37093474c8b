//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("bucket name is taken by another account: {0}")]
    BucketAlreadyExists(String),

    #[error("bucket is not empty: {0}")]
    BucketNotEmpty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no object store registered for provider {0}")]
    UnsupportedProvider(String),

    #[error("injected failure: {0}")]
    Injected(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
