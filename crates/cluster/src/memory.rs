//! In-process cluster for tests and local experimentation.
//!
//! Holds indices, repositories, snapshots and lifecycle policies in memory and
//! counts every call that would change cluster state.

use crate::error::{ClusterError, ClusterResult};
use crate::models::{
    ClusterHealth, Hit, InUseBy, LifecyclePolicy, PolicyEntry, Query, RepositoryInfo,
    SnapshotInfo, TimestampRange,
};
use crate::traits::{Cluster, DocumentApi, LifecycleApi, SnapshotApi};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;

#[derive(Default)]
struct State {
    indices: BTreeMap<String, BTreeMap<String, Value>>,
    repositories: BTreeMap<String, RepositoryInfo>,
    snapshots: BTreeMap<String, Vec<SnapshotInfo>>,
    policies: BTreeMap<String, PolicyEntry>,
    /// `@timestamp` bounds of data indices, used by `timestamp_range`.
    index_ranges: BTreeMap<String, (OffsetDateTime, OffsetDateTime)>,
    /// Repository names whose registration is rejected.
    rejected_repositories: BTreeSet<String>,
}

/// In-memory [`Cluster`].
pub struct MemoryCluster {
    cluster_name: String,
    state: Mutex<State>,
    mutations: AtomicUsize,
    policy_writes: AtomicUsize,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new("memory-cluster")
    }
}

impl std::fmt::Debug for MemoryCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCluster")
            .field("cluster_name", &self.cluster_name)
            .field("mutations", &self.mutation_count())
            .finish_non_exhaustive()
    }
}

impl MemoryCluster {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            state: Mutex::new(State::default()),
            mutations: AtomicUsize::new(0),
            policy_writes: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }

    /// Register a repository without counting a mutation.
    pub fn seed_repository(&self, name: &str, info: RepositoryInfo) {
        self.state().repositories.insert(name.to_string(), info);
    }

    /// Record a snapshot in `repository` holding `indices`.
    pub fn seed_snapshot(&self, repository: &str, snapshot: &str, indices: &[&str]) {
        self.state()
            .snapshots
            .entry(repository.to_string())
            .or_default()
            .push(SnapshotInfo {
                snapshot: snapshot.to_string(),
                indices: indices.iter().map(|i| i.to_string()).collect(),
            });
    }

    /// Set the `@timestamp` bounds reported for an index.
    pub fn seed_index_range(&self, index: &str, earliest: OffsetDateTime, latest: OffsetDateTime) {
        self.state()
            .index_ranges
            .insert(index.to_string(), (earliest, latest));
    }

    pub fn seed_policy(&self, name: &str, policy: LifecyclePolicy, in_use_by: InUseBy) {
        self.state().policies.insert(
            name.to_string(),
            PolicyEntry {
                version: Some(1),
                modified_date: None,
                policy,
                in_use_by,
            },
        );
    }

    /// Make registration of `name` fail.
    pub fn reject_repository(&self, name: &str) {
        self.state().rejected_repositories.insert(name.to_string());
    }

    pub fn repository_names(&self) -> Vec<String> {
        self.state().repositories.keys().cloned().collect()
    }

    pub fn policy(&self, name: &str) -> Option<LifecyclePolicy> {
        self.state().policies.get(name).map(|entry| entry.policy.clone())
    }

    pub fn documents(&self, index: &str) -> BTreeMap<String, Value> {
        self.state().indices.get(index).cloned().unwrap_or_default()
    }

    /// Total number of calls that could change cluster state.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn policy_writes(&self) -> usize {
        self.policy_writes.load(Ordering::SeqCst)
    }
}

fn merge(target: &mut Value, partial: &Value) {
    match (target, partial) {
        (Value::Object(target), Value::Object(partial)) => {
            for (key, value) in partial {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge(existing, value)
                    }
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, partial) => *target = partial.clone(),
    }
}

#[async_trait]
impl DocumentApi for MemoryCluster {
    async fn index_exists(&self, index: &str) -> ClusterResult<bool> {
        Ok(self.state().indices.contains_key(index))
    }

    async fn create_index(&self, index: &str) -> ClusterResult<()> {
        self.mutated();
        self.state().indices.entry(index.to_string()).or_default();
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> ClusterResult<Option<Value>> {
        Ok(self
            .state()
            .indices
            .get(index)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put_document(&self, index: &str, id: &str, source: &Value) -> ClusterResult<()> {
        self.mutated();
        self.state()
            .indices
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), source.clone());
        Ok(())
    }

    async fn update_document(&self, index: &str, id: &str, partial: &Value) -> ClusterResult<()> {
        self.mutated();
        let mut state = self.state();
        let doc = state
            .indices
            .get_mut(index)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| ClusterError::NotFound(format!("{index}/{id}")))?;
        merge(doc, partial);
        Ok(())
    }

    async fn search(&self, index: &str, query: &Query) -> ClusterResult<Vec<Hit>> {
        let state = self.state();
        let docs = state
            .indices
            .get(index)
            .ok_or_else(|| ClusterError::NotFound(index.to_string()))?;
        Ok(docs
            .iter()
            .filter(|(_, source)| query.matches(source))
            .map(|(id, source)| Hit {
                id: id.clone(),
                source: source.clone(),
            })
            .collect())
    }

    async fn refresh(&self, _index: &str) -> ClusterResult<()> {
        Ok(())
    }

    async fn timestamp_range(&self, indices: &[String]) -> ClusterResult<TimestampRange> {
        let state = self.state();
        let bounds: Vec<_> = indices
            .iter()
            .filter_map(|index| state.index_ranges.get(index))
            .collect();
        Ok(TimestampRange {
            earliest: bounds.iter().map(|(earliest, _)| *earliest).min(),
            latest: bounds.iter().map(|(_, latest)| *latest).max(),
        })
    }
}

#[async_trait]
impl SnapshotApi for MemoryCluster {
    async fn list_repositories(&self) -> ClusterResult<BTreeMap<String, RepositoryInfo>> {
        Ok(self.state().repositories.clone())
    }

    async fn get_repository(&self, name: &str) -> ClusterResult<Option<RepositoryInfo>> {
        Ok(self.state().repositories.get(name).cloned())
    }

    async fn create_repository(&self, name: &str, info: &RepositoryInfo) -> ClusterResult<()> {
        self.mutated();
        let mut state = self.state();
        if state.rejected_repositories.contains(name) {
            return Err(ClusterError::Injected(format!(
                "repository registration rejected: {name}"
            )));
        }
        state.repositories.insert(name.to_string(), info.clone());
        Ok(())
    }

    async fn delete_repository(&self, name: &str) -> ClusterResult<()> {
        self.mutated();
        self.state()
            .repositories
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ClusterError::NotFound(name.to_string()))
    }

    async fn list_snapshots(&self, repository: &str) -> ClusterResult<Vec<SnapshotInfo>> {
        let state = self.state();
        if !state.repositories.contains_key(repository) {
            return Err(ClusterError::NotFound(repository.to_string()));
        }
        Ok(state.snapshots.get(repository).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl LifecycleApi for MemoryCluster {
    async fn list_policies(&self) -> ClusterResult<BTreeMap<String, PolicyEntry>> {
        Ok(self.state().policies.clone())
    }

    async fn put_policy(&self, name: &str, policy: &LifecyclePolicy) -> ClusterResult<()> {
        self.mutated();
        self.policy_writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let entry = state
            .policies
            .entry(name.to_string())
            .or_insert_with(|| PolicyEntry {
                version: Some(0),
                modified_date: None,
                policy: LifecyclePolicy::default(),
                in_use_by: InUseBy::default(),
            });
        entry.policy = policy.clone();
        entry.version = Some(entry.version.unwrap_or(0) + 1);
        Ok(())
    }
}

#[async_trait]
impl Cluster for MemoryCluster {
    async fn health(&self) -> ClusterResult<ClusterHealth> {
        Ok(ClusterHealth {
            cluster_name: self.cluster_name.clone(),
            status: "green".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[tokio::test]
    async fn test_update_merges_fields() {
        let cluster = MemoryCluster::default();
        cluster
            .put_document("status", "1", &json!({"a": 1, "b": {"c": 2, "d": 3}}))
            .await
            .unwrap();
        cluster
            .update_document("status", "1", &json!({"a": 5, "b": {"c": 4}}))
            .await
            .unwrap();
        assert_eq!(
            cluster.get_document("status", "1").await.unwrap(),
            Some(json!({"a": 5, "b": {"c": 4, "d": 3}}))
        );
        assert!(matches!(
            cluster.update_document("status", "2", &json!({})).await,
            Err(ClusterError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_timestamp_range_spans_known_indices() {
        let cluster = MemoryCluster::default();
        cluster.seed_index_range("a", datetime!(2024-01-05 0:00 UTC), datetime!(2024-01-20 0:00 UTC));
        cluster.seed_index_range("b", datetime!(2024-01-01 0:00 UTC), datetime!(2024-01-10 0:00 UTC));

        let range = cluster
            .timestamp_range(&["a".to_string(), "b".to_string(), "gone".to_string()])
            .await
            .unwrap();
        assert_eq!(range.earliest, Some(datetime!(2024-01-01 0:00 UTC)));
        assert_eq!(range.latest, Some(datetime!(2024-01-20 0:00 UTC)));

        assert_eq!(
            cluster.timestamp_range(&[]).await.unwrap(),
            TimestampRange::default()
        );
    }

    #[tokio::test]
    async fn test_reads_do_not_count_as_mutations() {
        let cluster = MemoryCluster::default();
        cluster.seed_repository("df-000001", RepositoryInfo::s3("df", "s", "private", "standard"));
        cluster.list_repositories().await.unwrap();
        cluster.list_snapshots("df-000001").await.unwrap();
        cluster.list_policies().await.unwrap();
        cluster.health().await.unwrap();
        assert_eq!(cluster.mutation_count(), 0);

        cluster.delete_repository("df-000001").await.unwrap();
        assert_eq!(cluster.mutation_count(), 1);
    }
}
