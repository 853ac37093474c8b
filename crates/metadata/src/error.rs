//! Metadata store error types.

use deepfreeze_cluster::ClusterError;
use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid document {id}: {reason}")]
    InvalidDocument { id: String, reason: String },

    #[error("status index {0} does not exist")]
    IndexMissing(String),

    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
