//! Search cluster API for deepfreeze.
//!
//! This crate provides:
//! - Document access to the status index
//! - Snapshot repository registration and snapshot listing
//! - Lifecycle policy listing and updates
//! - Implementations: HTTP (Elasticsearch-compatible REST) and in-memory

pub mod error;
pub mod http;
pub mod memory;
pub mod models;
pub mod traits;

pub use error::{ClusterError, ClusterResult};
pub use http::HttpCluster;
pub use memory::MemoryCluster;
pub use models::{
    ClusterHealth, Hit, InUseBy, LifecyclePolicy, Phase, PolicyEntry, Query, RepositoryInfo,
    RepositorySettings, SnapshotInfo, TimestampRange,
};
pub use traits::{Cluster, DocumentApi, LifecycleApi, SnapshotApi};

use deepfreeze_core::config::ClusterConfig;
use std::sync::Arc;

/// Create a cluster client from configuration.
pub fn from_config(config: &ClusterConfig) -> ClusterResult<Arc<dyn Cluster>> {
    let cluster = HttpCluster::new(config)?;
    tracing::debug!(url = %cluster.base_url(), "configured cluster client");
    Ok(Arc::new(cluster))
}
