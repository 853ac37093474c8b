//! Object storage abstraction and backends for deepfreeze.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait over the buckets backing snapshot repositories
//! - Backends: S3-compatible and in-memory
//! - A provider registry resolving the configured provider to a backend
//! - Best-effort batch restore and refreeze helpers

pub mod archive;
pub mod backends;
pub mod error;
pub mod registry;
pub mod traits;

pub use archive::{ArchiveReport, RestoreOptions, refreeze_prefix, restore_prefix};
pub use backends::{memory::MemoryBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use registry::ProviderRegistry;
pub use traits::{
    ObjectMeta, ObjectStore, ObjectSummary, RestoreStatus, RetrievalTier, StorageClass,
};

use deepfreeze_core::Provider;
use deepfreeze_core::config::ObjectStoreConfig;
use std::sync::Arc;

/// Build the provider registry from configuration.
///
/// Only `aws` has a backend; other providers stay unregistered and fail when
/// an operation resolves them.
pub fn from_config(config: &ObjectStoreConfig) -> StorageResult<ProviderRegistry> {
    config.validate().map_err(StorageError::Config)?;
    let backend = S3Backend::from_config(config)?;
    Ok(ProviderRegistry::new().with(Provider::Aws, Arc::new(backend)))
}
