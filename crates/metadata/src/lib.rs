//! Metadata store for deepfreeze.
//!
//! Every persisted record lives as a document in the status index of the
//! managed cluster:
//! - the singleton rotation settings
//! - one record per snapshot repository, kept after decommission
//! - thaw sets produced by restore requests

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::StatusDoc;
pub use repos::{RepositoryRepo, SettingsRepo, ThawSetRepo};
pub use store::{ClusterMetadataStore, MetadataStore};

use deepfreeze_cluster::Cluster;
use deepfreeze_core::config::StatusConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub fn from_config(
    cluster: Arc<dyn Cluster>,
    config: &StatusConfig,
) -> MetadataResult<Arc<dyn MetadataStore>> {
    let store = ClusterMetadataStore::new(cluster, config)?;
    Ok(Arc::new(store) as Arc<dyn MetadataStore>)
}
