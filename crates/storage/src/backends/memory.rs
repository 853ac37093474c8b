//! In-process object store for tests and dry-run demonstrations.
//!
//! Buckets and objects live in a mutex-guarded map. Every mutating call is
//! counted so callers can assert that a code path performed no writes.

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    ObjectMeta, ObjectStore, ObjectSummary, RestoreStatus, RetrievalTier, StorageClass,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Clone, Debug)]
struct StoredObject {
    size: u64,
    storage_class: StorageClass,
    restore: RestoreStatus,
    /// Days requested by the most recent restore.
    restore_days: Option<u32>,
}

#[derive(Default)]
struct State {
    buckets: BTreeMap<String, BTreeMap<String, StoredObject>>,
    /// Buckets owned by someone else; creating them fails.
    foreign_buckets: BTreeSet<String>,
    /// Keys (as `bucket/key`) whose restore or copy calls fail.
    failing_keys: BTreeSet<String>,
}

/// In-memory [`ObjectStore`].
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    create_bucket_calls: AtomicUsize,
    delete_bucket_calls: AtomicUsize,
    restore_calls: AtomicUsize,
    copy_calls: AtomicUsize,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("mutations", &self.mutation_count())
            .finish_non_exhaustive()
    }
}

fn object_id(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object, creating its bucket if needed. Not counted as a mutation.
    pub fn insert_object(&self, bucket: &str, key: &str, size: u64, class: StorageClass) {
        self.state()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    size,
                    storage_class: class,
                    restore: RestoreStatus::NotRequested,
                    restore_days: None,
                },
            );
    }

    /// Mark a bucket name as owned by another account.
    pub fn reserve_foreign_bucket(&self, bucket: &str) {
        self.state().foreign_buckets.insert(bucket.to_string());
    }

    /// Make restore and copy calls for one object fail.
    pub fn fail_object(&self, bucket: &str, key: &str) {
        self.state().failing_keys.insert(object_id(bucket, key));
    }

    /// Finish a pending restore, as the provider eventually would.
    pub fn complete_restore(&self, bucket: &str, key: &str) {
        let mut state = self.state();
        if let Some(obj) = state
            .buckets
            .get_mut(bucket)
            .and_then(|objects| objects.get_mut(key))
            && obj.restore == RestoreStatus::InProgress
        {
            obj.restore = RestoreStatus::Restored;
        }
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.state().buckets.keys().cloned().collect()
    }

    /// Storage class and restore state of one object.
    pub fn object_state(&self, bucket: &str, key: &str) -> Option<(StorageClass, RestoreStatus)> {
        self.state()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|obj| (obj.storage_class.clone(), obj.restore))
    }

    pub fn restore_days(&self, bucket: &str, key: &str) -> Option<u32> {
        self.state()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .and_then(|obj| obj.restore_days)
    }

    pub fn create_bucket_calls(&self) -> usize {
        self.create_bucket_calls.load(Ordering::SeqCst)
    }

    pub fn restore_calls(&self) -> usize {
        self.restore_calls.load(Ordering::SeqCst)
    }

    pub fn copy_calls(&self) -> usize {
        self.copy_calls.load(Ordering::SeqCst)
    }

    /// Total number of calls that could change provider state.
    pub fn mutation_count(&self) -> usize {
        self.create_bucket_calls.load(Ordering::SeqCst)
            + self.delete_bucket_calls.load(Ordering::SeqCst)
            + self.restore_calls.load(Ordering::SeqCst)
            + self.copy_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.create_bucket_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if state.foreign_buckets.contains(bucket) {
            return Err(StorageError::BucketAlreadyExists(bucket.to_string()));
        }
        state.buckets.entry(bucket.to_string()).or_default();
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        Ok(self.state().buckets.contains_key(bucket))
    }

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.delete_bucket_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        match state.buckets.get(bucket) {
            None => Err(StorageError::BucketNotFound(bucket.to_string())),
            Some(objects) if !objects.is_empty() => {
                Err(StorageError::BucketNotEmpty(bucket.to_string()))
            }
            Some(_) => {
                state.buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn list_buckets(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .state()
            .buckets
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectSummary>> {
        let state = self.state();
        let objects = state
            .buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectSummary {
                key: key.clone(),
                size: obj.size,
                storage_class: obj.storage_class.clone(),
            })
            .collect())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMeta> {
        self.state()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|obj| ObjectMeta {
                size: obj.size,
                storage_class: obj.storage_class.clone(),
                restore: obj.restore,
            })
            .ok_or_else(|| StorageError::NotFound(object_id(bucket, key)))
    }

    async fn restore_object(
        &self,
        bucket: &str,
        key: &str,
        days: u32,
        _tier: RetrievalTier,
    ) -> StorageResult<()> {
        self.restore_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let id = object_id(bucket, key);
        if state.failing_keys.contains(&id) {
            return Err(StorageError::Injected(id));
        }
        let obj = state
            .buckets
            .get_mut(bucket)
            .and_then(|objects| objects.get_mut(key))
            .ok_or(StorageError::NotFound(id))?;
        if obj.restore == RestoreStatus::NotRequested {
            obj.restore = RestoreStatus::InProgress;
        }
        obj.restore_days = Some(days);
        Ok(())
    }

    async fn copy_object_with_storage_class(
        &self,
        bucket: &str,
        key: &str,
        class: &StorageClass,
    ) -> StorageResult<()> {
        self.copy_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let id = object_id(bucket, key);
        if state.failing_keys.contains(&id) {
            return Err(StorageError::Injected(id));
        }
        let obj = state
            .buckets
            .get_mut(bucket)
            .and_then(|objects| objects.get_mut(key))
            .ok_or(StorageError::NotFound(id))?;
        obj.storage_class = class.clone();
        obj.restore = RestoreStatus::NotRequested;
        obj.restore_days = None;
        Ok(())
    }
}
