//! Batch restore and refreeze over every object under a repository prefix.
//!
//! Both helpers are best-effort: a failing object is logged and counted and
//! the batch continues. Only a failed listing aborts the batch.

use crate::error::StorageResult;
use crate::traits::{ObjectStore, RetrievalTier, StorageClass};
use tracing::instrument;

/// Outcome of a batch over one bucket prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub bucket: String,
    pub prefix: String,
    /// Objects found under the prefix.
    pub listed: usize,
    /// Objects a request was sent for (or would be, in dry-run).
    pub requested: usize,
    /// Objects left alone because no request was needed.
    pub skipped: usize,
    /// Objects whose request failed.
    pub failed: usize,
}

impl ArchiveReport {
    fn new(bucket: &str, prefix: &str, listed: usize) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            listed,
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Options for [`restore_prefix`].
#[derive(Clone, Copy, Debug)]
pub struct RestoreOptions {
    /// Days the restored copy stays readable.
    pub days: u32,
    pub tier: RetrievalTier,
    pub dry_run: bool,
}

/// Request restoration of every archival object under `bucket/prefix`.
///
/// Objects outside an archival class, and objects already restored or
/// restoring, are skipped.
#[instrument(skip(store), fields(backend = store.backend_name()))]
pub async fn restore_prefix(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    options: RestoreOptions,
) -> StorageResult<ArchiveReport> {
    let objects = store.list_objects(bucket, prefix).await?;
    let mut report = ArchiveReport::new(bucket, prefix, objects.len());

    for object in objects {
        if !object.storage_class.is_archival() {
            tracing::debug!(key = %object.key, class = %object.storage_class, "skipping non-archival object");
            report.skipped += 1;
            continue;
        }

        let meta = match store.head_object(bucket, &object.key).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::error!(key = %object.key, error = %e, "failed to read object state");
                report.failed += 1;
                continue;
            }
        };
        if meta.restore.is_pending_or_done() {
            tracing::debug!(key = %object.key, restore = ?meta.restore, "skipping object with existing restore");
            report.skipped += 1;
            continue;
        }

        if options.dry_run {
            tracing::info!(key = %object.key, class = %object.storage_class, "dry-run: would restore");
            report.requested += 1;
            continue;
        }

        match store
            .restore_object(bucket, &object.key, options.days, options.tier)
            .await
        {
            Ok(()) => {
                tracing::debug!(key = %object.key, tier = %options.tier, "restore requested");
                report.requested += 1;
            }
            Err(e) => {
                tracing::error!(key = %object.key, error = %e, "restore request failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        bucket = %bucket,
        prefix = %prefix,
        requested = report.requested,
        skipped = report.skipped,
        failed = report.failed,
        "restore batch finished"
    );
    Ok(report)
}

/// Move every object under `bucket/prefix` to `class`.
///
/// Objects already listed in `class` are skipped, since copying an object onto
/// itself without any change is rejected by the provider.
#[instrument(skip(store), fields(backend = store.backend_name(), class = %class))]
pub async fn refreeze_prefix(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    class: &StorageClass,
    dry_run: bool,
) -> StorageResult<ArchiveReport> {
    let objects = store.list_objects(bucket, prefix).await?;
    let mut report = ArchiveReport::new(bucket, prefix, objects.len());

    for object in objects {
        if object.storage_class == *class {
            report.skipped += 1;
            continue;
        }

        if dry_run {
            tracing::info!(key = %object.key, from = %object.storage_class, "dry-run: would refreeze");
            report.requested += 1;
            continue;
        }

        match store
            .copy_object_with_storage_class(bucket, &object.key, class)
            .await
        {
            Ok(()) => {
                tracing::debug!(key = %object.key, "refrozen");
                report.requested += 1;
            }
            Err(e) => {
                tracing::error!(key = %object.key, error = %e, "refreeze failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        bucket = %bucket,
        prefix = %prefix,
        requested = report.requested,
        skipped = report.skipped,
        failed = report.failed,
        "refreeze batch finished"
    );
    Ok(report)
}
