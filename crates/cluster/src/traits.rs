//! Cluster API traits.

use crate::error::ClusterResult;
use crate::models::{
    ClusterHealth, Hit, LifecyclePolicy, PolicyEntry, Query, RepositoryInfo, SnapshotInfo,
    TimestampRange,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Document and index operations.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn index_exists(&self, index: &str) -> ClusterResult<bool>;

    /// Create an index. An index that already exists is not an error.
    async fn create_index(&self, index: &str) -> ClusterResult<()>;

    /// Source of one document, or None when it does not exist.
    async fn get_document(&self, index: &str, id: &str) -> ClusterResult<Option<Value>>;

    /// Create or fully replace a document.
    async fn put_document(&self, index: &str, id: &str, source: &Value) -> ClusterResult<()>;

    /// Merge `partial` into an existing document. Fails with NotFound when absent.
    async fn update_document(&self, index: &str, id: &str, partial: &Value) -> ClusterResult<()>;

    async fn search(&self, index: &str, query: &Query) -> ClusterResult<Vec<Hit>>;

    async fn refresh(&self, index: &str) -> ClusterResult<()>;

    /// Min/max `@timestamp` across `indices`. No indices, or no documents,
    /// yields an empty range.
    async fn timestamp_range(&self, indices: &[String]) -> ClusterResult<TimestampRange>;
}

/// Snapshot repository operations.
#[async_trait]
pub trait SnapshotApi: Send + Sync {
    /// Every registered repository, keyed by name.
    async fn list_repositories(&self) -> ClusterResult<BTreeMap<String, RepositoryInfo>>;

    async fn get_repository(&self, name: &str) -> ClusterResult<Option<RepositoryInfo>>;

    async fn create_repository(&self, name: &str, info: &RepositoryInfo) -> ClusterResult<()>;

    /// Unregister a repository. Stored snapshot data is left in place.
    async fn delete_repository(&self, name: &str) -> ClusterResult<()>;

    async fn list_snapshots(&self, repository: &str) -> ClusterResult<Vec<SnapshotInfo>>;
}

/// Lifecycle policy operations.
#[async_trait]
pub trait LifecycleApi: Send + Sync {
    async fn list_policies(&self) -> ClusterResult<BTreeMap<String, PolicyEntry>>;

    async fn put_policy(&self, name: &str, policy: &LifecyclePolicy) -> ClusterResult<()>;
}

/// Combined cluster trait.
#[async_trait]
pub trait Cluster: DocumentApi + SnapshotApi + LifecycleApi + Send + Sync {
    async fn health(&self) -> ClusterResult<ClusterHealth>;
}
