//! Shared fixtures for metadata store tests.

use deepfreeze_cluster::MemoryCluster;
use deepfreeze_core::RepositoryRecord;
use deepfreeze_core::config::StatusConfig;
use deepfreeze_metadata::{ClusterMetadataStore, MetadataStore};
use std::sync::Arc;
use time::OffsetDateTime;

pub const STATUS_INDEX: &str = "deepfreeze-status";

/// Store over a fresh in-memory cluster with the status index created.
pub async fn setup_store() -> (Arc<MemoryCluster>, ClusterMetadataStore) {
    let cluster = Arc::new(MemoryCluster::default());
    let store = ClusterMetadataStore::new(cluster.clone(), &StatusConfig::default())
        .expect("default status config is valid");
    store.ensure_exists().await.expect("create status index");
    (cluster, store)
}

pub fn decommissioned(
    name: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> RepositoryRecord {
    RepositoryRecord {
        start: Some(start),
        end: Some(end),
        is_mounted: false,
        ..RepositoryRecord::mounted(name, "deepfreeze", format!("snapshots-{name}"))
    }
}
