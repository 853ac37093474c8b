//! Action error types.

use deepfreeze_cluster::ClusterError;
use deepfreeze_metadata::MetadataError;
use deepfreeze_storage::StorageError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by setup, rotate, thaw, refreeze and status.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No settings document: setup has not run against this status index.
    #[error("deepfreeze is not configured: no settings in status index {0}")]
    NotConfigured(String),

    #[error("no repositories match prefix {0}-")]
    NoRepositories(String),

    #[error("repository {0} already exists")]
    DuplicateRepository(String),

    #[error("repositories matching {prefix}- already exist: {}", existing.join(", "))]
    RepositoriesExist { prefix: String, existing: Vec<String> },

    #[error("no record for repository {0}")]
    RepositoryNotFound(String),

    /// Creating the bucket or registering the repository failed.
    #[error("provisioning failed: {context}")]
    Provisioning {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Core(#[from] deepfreeze_core::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl ActionError {
    pub(crate) fn provisioning(
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Provisioning {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Result type for actions.
pub type ActionResult<T> = std::result::Result<T, ActionError>;
