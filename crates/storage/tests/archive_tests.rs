mod common;

use common::{BUCKET, seeded_repository};
use deepfreeze_storage::{
    MemoryBackend, ObjectStore, RestoreOptions, RestoreStatus, RetrievalTier, StorageClass,
    StorageError, refreeze_prefix, restore_prefix,
};

fn restore_options(dry_run: bool) -> RestoreOptions {
    RestoreOptions {
        days: 7,
        tier: RetrievalTier::Bulk,
        dry_run,
    }
}

#[tokio::test]
async fn restore_requests_every_archival_object() {
    let store = MemoryBackend::new();
    let keys = seeded_repository(&store, "snapshots-000001", StorageClass::Glacier);
    seeded_repository(&store, "snapshots-000002", StorageClass::Glacier);

    let report = restore_prefix(&store, BUCKET, "snapshots-000001", restore_options(false))
        .await
        .unwrap();

    assert_eq!(report.listed, keys.len());
    assert_eq!(report.requested, keys.len());
    assert_eq!(report.skipped, 0);
    assert!(report.is_clean());
    for key in &keys {
        assert_eq!(
            store.object_state(BUCKET, key).map(|(_, restore)| restore),
            Some(RestoreStatus::InProgress)
        );
        assert_eq!(store.restore_days(BUCKET, key), Some(7));
    }
    // The neighbouring repository is untouched.
    assert_eq!(
        store
            .object_state(BUCKET, "snapshots-000002/index-0")
            .map(|(_, restore)| restore),
        Some(RestoreStatus::NotRequested)
    );
}

#[tokio::test]
async fn restore_skips_non_archival_and_already_restoring() {
    let store = MemoryBackend::new();
    store.insert_object(BUCKET, "snapshots/a", 1, StorageClass::Standard);
    store.insert_object(BUCKET, "snapshots/b", 1, StorageClass::DeepArchive);
    store.insert_object(BUCKET, "snapshots/c", 1, StorageClass::GlacierIr);
    store.insert_object(BUCKET, "snapshots/d", 1, StorageClass::Glacier);
    store
        .restore_object(BUCKET, "snapshots/d", 3, RetrievalTier::Standard)
        .await
        .unwrap();
    let calls_before = store.restore_calls();

    let report = restore_prefix(&store, BUCKET, "snapshots", restore_options(false))
        .await
        .unwrap();

    assert_eq!(report.listed, 4);
    assert_eq!(report.requested, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(store.restore_calls() - calls_before, 2);
}

#[tokio::test]
async fn restore_failures_are_counted_not_fatal() {
    let store = MemoryBackend::new();
    let keys = seeded_repository(&store, "snapshots", StorageClass::Glacier);
    store.fail_object(BUCKET, &keys[1]);

    let report = restore_prefix(&store, BUCKET, "snapshots", restore_options(false))
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.requested, keys.len() - 1);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn restore_dry_run_issues_no_requests() {
    let store = MemoryBackend::new();
    let keys = seeded_repository(&store, "snapshots", StorageClass::Glacier);

    let report = restore_prefix(&store, BUCKET, "snapshots", restore_options(true))
        .await
        .unwrap();

    assert_eq!(report.requested, keys.len());
    assert_eq!(store.mutation_count(), 0);
}

#[tokio::test]
async fn restore_missing_bucket_is_an_error() {
    let store = MemoryBackend::new();
    let err = restore_prefix(&store, "nope", "snapshots", restore_options(false))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::BucketNotFound(_)));
}

#[tokio::test]
async fn refreeze_moves_objects_to_target_class() {
    let store = MemoryBackend::new();
    let keys = seeded_repository(&store, "snapshots", StorageClass::Standard);
    store.insert_object(BUCKET, "snapshots/already", 1, StorageClass::Glacier);

    let report = refreeze_prefix(&store, BUCKET, "snapshots", &StorageClass::Glacier, false)
        .await
        .unwrap();

    assert_eq!(report.requested, keys.len());
    assert_eq!(report.skipped, 1);
    for key in &keys {
        assert_eq!(
            store.object_state(BUCKET, key),
            Some((StorageClass::Glacier, RestoreStatus::NotRequested))
        );
    }
}

#[tokio::test]
async fn refreeze_dry_run_and_failures() {
    let store = MemoryBackend::new();
    let keys = seeded_repository(&store, "snapshots", StorageClass::Standard);

    let dry = refreeze_prefix(&store, BUCKET, "snapshots", &StorageClass::DeepArchive, true)
        .await
        .unwrap();
    assert_eq!(dry.requested, keys.len());
    assert_eq!(store.copy_calls(), 0);

    store.fail_object(BUCKET, &keys[0]);
    let real = refreeze_prefix(&store, BUCKET, "snapshots", &StorageClass::DeepArchive, false)
        .await
        .unwrap();
    assert_eq!(real.failed, 1);
    assert_eq!(real.requested, keys.len() - 1);
}
