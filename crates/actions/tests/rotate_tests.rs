mod common;

use common::Harness;
use deepfreeze_actions::{ActionError, Rotate, RotateOptions, SetupOptions};
use deepfreeze_cluster::{InUseBy, LifecyclePolicy, RepositoryInfo, SnapshotApi};
use deepfreeze_core::{RotateBy, SuffixStyle};
use deepfreeze_metadata::{RepositoryRepo, SettingsRepo};
use serde_json::json;
use time::macros::datetime;

fn frozen_policy(repo: &str, keep_snapshots: bool) -> LifecyclePolicy {
    let delete_snapshot = !keep_snapshots;
    serde_json::from_value(json!({
        "phases": {
            "frozen": {"min_age": "30d", "actions": {"searchable_snapshot": {"snapshot_repository": repo}}},
            "delete": {"min_age": "365d", "actions": {"delete": {"delete_searchable_snapshot": delete_snapshot}}}
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn path_rotation_keeps_bucket_and_moves_base_path() {
    let h = Harness::new();
    h.setup(SetupOptions::default()).await;

    let report = Rotate::prepare(&h.ctx, RotateOptions::default())
        .await
        .unwrap()
        .run(false)
        .await
        .unwrap();

    assert_eq!(report.latest_repo, "deepfreeze-000001");
    assert_eq!(report.target.repo_name, "deepfreeze-000002");
    assert_eq!(report.target.bucket, "deepfreeze");
    assert_eq!(report.target.base_path, "snapshots-000002");
    assert_eq!(h.storage.bucket_names(), vec!["deepfreeze"]);

    let settings = h.ctx.metadata.load_settings().await.unwrap().unwrap();
    assert_eq!(settings.last_suffix.as_deref(), Some("000002"));
    assert!(
        h.ctx
            .metadata
            .get_repository("deepfreeze-000002")
            .await
            .unwrap()
            .unwrap()
            .is_mounted
    );
}

#[tokio::test]
async fn bucket_rotation_moves_bucket_and_keeps_base_path() {
    let h = Harness::new();
    h.setup(SetupOptions {
        rotate_by: RotateBy::Bucket,
        ..SetupOptions::default()
    })
    .await;
    h.rotate(6).await;

    let info = h
        .cluster
        .get_repository("deepfreeze-000002")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info.settings.bucket.as_deref(), Some("deepfreeze-000002"));
    assert_eq!(info.settings.base_path.as_deref(), Some("snapshots"));
    assert_eq!(
        h.storage.bucket_names(),
        vec!["deepfreeze-000001", "deepfreeze-000002"]
    );
}

#[tokio::test]
async fn repeated_rotation_leaves_keep_mounted() {
    let h = Harness::new();
    h.setup(SetupOptions::default()).await;
    for _ in 0..5 {
        h.rotate(3).await;
    }

    assert_eq!(
        h.cluster.repository_names(),
        vec!["deepfreeze-000004", "deepfreeze-000005", "deepfreeze-000006"]
    );

    let records = h.ctx.metadata.list_repositories().await.unwrap();
    assert_eq!(records.len(), 6);
    let unmounted: Vec<_> = h
        .ctx
        .metadata
        .list_unmounted()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(
        unmounted,
        vec!["deepfreeze-000001", "deepfreeze-000002", "deepfreeze-000003"]
    );
}

#[tokio::test]
async fn decommission_without_indices_records_null_range() {
    let h = Harness::new();
    h.setup(SetupOptions::default()).await;

    let report = Rotate::prepare(
        &h.ctx,
        RotateOptions {
            keep: 1,
            ..RotateOptions::default()
        },
    )
    .await
    .unwrap()
    .run(false)
    .await
    .unwrap();

    assert_eq!(report.decommissioned.len(), 1);
    assert_eq!(report.decommissioned[0].index_count, 0);
    let record = h
        .ctx
        .metadata
        .get_repository("deepfreeze-000001")
        .await
        .unwrap()
        .unwrap();
    assert!(!record.is_mounted);
    assert_eq!(record.start, None);
    assert_eq!(record.end, None);
    assert_eq!(record.bucket, "deepfreeze");
    assert_eq!(record.base_path, "snapshots-000001");
}

#[tokio::test]
async fn decommission_records_timestamp_range_of_snapshotted_indices() {
    let h = Harness::new();
    h.setup(SetupOptions::default()).await;
    h.cluster
        .seed_snapshot("deepfreeze-000001", "snap-1", &["logs-a", "logs-b"]);
    h.cluster.seed_snapshot("deepfreeze-000001", "snap-2", &["logs-b"]);
    h.cluster.seed_index_range(
        "logs-a",
        datetime!(2024-01-01 0:00 UTC),
        datetime!(2024-02-01 0:00 UTC),
    );
    h.cluster.seed_index_range(
        "logs-b",
        datetime!(2024-01-15 0:00 UTC),
        datetime!(2024-03-31 0:00 UTC),
    );

    let report = Rotate::prepare(
        &h.ctx,
        RotateOptions {
            keep: 1,
            ..RotateOptions::default()
        },
    )
    .await
    .unwrap()
    .run(false)
    .await
    .unwrap();

    assert_eq!(report.decommissioned[0].index_count, 2);
    let record = h
        .ctx
        .metadata
        .get_repository("deepfreeze-000001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.start, Some(datetime!(2024-01-01 0:00 UTC)));
    assert_eq!(record.end, Some(datetime!(2024-03-31 0:00 UTC)));
    assert_eq!(h.cluster.repository_names(), vec!["deepfreeze-000002"]);
}

#[tokio::test]
async fn duplicate_target_is_rejected_and_leaves_repositories_alone() {
    let h = Harness::new();
    h.setup(SetupOptions::default()).await;
    h.cluster.seed_repository(
        "deepfreeze-000002",
        RepositoryInfo::s3("deepfreeze", "snapshots-000002", "private", "intelligent_tiering"),
    );
    let before = h.cluster.repository_names();
    let mutations = h.mutations();

    let result = Rotate::prepare(&h.ctx, RotateOptions::default()).await;
    assert!(matches!(
        result,
        Err(ActionError::DuplicateRepository(name)) if name == "deepfreeze-000002"
    ));
    assert_eq!(h.cluster.repository_names(), before);
    assert_eq!(h.mutations(), mutations);
}

#[tokio::test]
async fn duplicate_date_suffix_is_rejected() {
    let h = Harness::new();
    h.setup(SetupOptions {
        suffix_style: SuffixStyle::Date,
        year: Some(2024),
        month: Some(3),
        ..SetupOptions::default()
    })
    .await;

    let result = Rotate::prepare(
        &h.ctx,
        RotateOptions {
            year: Some(2024),
            month: Some(3),
            ..RotateOptions::default()
        },
    )
    .await;
    assert!(matches!(result, Err(ActionError::DuplicateRepository(_))));
}

#[tokio::test]
async fn dry_run_reports_same_decisions_without_writes() {
    let dry = Harness::new();
    let real = Harness::new();
    for h in [&dry, &real] {
        h.setup(SetupOptions::default()).await;
        h.rotate(6).await;
        h.rotate(6).await;
        h.cluster.seed_policy(
            "logs",
            frozen_policy("deepfreeze-000003", true),
            InUseBy::default(),
        );
        h.cluster
            .seed_snapshot("deepfreeze-000001", "snap-1", &["logs-a"]);
        h.cluster.seed_index_range(
            "logs-a",
            datetime!(2024-01-01 0:00 UTC),
            datetime!(2024-01-31 0:00 UTC),
        );
    }

    let options = RotateOptions {
        keep: 2,
        ..RotateOptions::default()
    };
    let before = dry.mutations();
    let dry_report = Rotate::prepare(&dry.ctx, options)
        .await
        .unwrap()
        .run(true)
        .await
        .unwrap();
    assert_eq!(dry.mutations(), before);
    assert_eq!(
        dry.cluster.repository_names(),
        vec!["deepfreeze-000001", "deepfreeze-000002", "deepfreeze-000003"]
    );
    assert_eq!(
        dry.cluster.policy("logs").unwrap(),
        frozen_policy("deepfreeze-000003", true)
    );

    let real_report = Rotate::prepare(&real.ctx, options)
        .await
        .unwrap()
        .run(false)
        .await
        .unwrap();

    assert!(dry_report.dry_run);
    assert_eq!(dry_report.target, real_report.target);
    assert_eq!(dry_report.policies, real_report.policies);
    assert_eq!(dry_report.retained, real_report.retained);
    assert_eq!(dry_report.decommissioned, real_report.decommissioned);
    assert_eq!(
        real_report.retained,
        vec!["deepfreeze-000004", "deepfreeze-000003"]
    );
    let names: Vec<_> = real_report
        .decommissioned
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["deepfreeze-000002", "deepfreeze-000001"]);
}

#[tokio::test]
async fn policies_follow_the_new_repository() {
    let h = Harness::new();
    h.setup(SetupOptions::default()).await;
    h.cluster.seed_policy(
        "logs",
        frozen_policy("deepfreeze-000001", true),
        InUseBy::default(),
    );
    h.cluster.seed_policy(
        "metrics",
        frozen_policy("deepfreeze-000001", false),
        InUseBy::default(),
    );
    h.cluster
        .seed_policy("other", frozen_policy("elsewhere", true), InUseBy::default());

    let report = Rotate::prepare(&h.ctx, RotateOptions::default())
        .await
        .unwrap()
        .run(false)
        .await
        .unwrap();

    let updated: Vec<_> = report.policies.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(updated, vec!["logs", "metrics"]);
    assert_eq!(report.policies[0].phases, vec!["frozen"]);
    assert_eq!(report.delete_warnings, vec!["metrics"]);
    assert_eq!(h.cluster.policy_writes(), 2);
    assert!(
        h.cluster
            .policy("logs")
            .unwrap()
            .references_repository("deepfreeze-000002")
    );
    assert_eq!(
        h.cluster.policy("other").unwrap(),
        frozen_policy("elsewhere", true)
    );
}

#[tokio::test]
async fn failed_registration_leaves_settings_untouched() {
    let h = Harness::new();
    h.setup(SetupOptions::default()).await;
    h.cluster.reject_repository("deepfreeze-000002");

    let err = Rotate::prepare(
        &h.ctx,
        RotateOptions {
            keep: 1,
            ..RotateOptions::default()
        },
    )
    .await
    .unwrap()
    .run(false)
    .await
    .unwrap_err();

    assert!(matches!(err, ActionError::Provisioning { .. }));
    let settings = h.ctx.metadata.load_settings().await.unwrap().unwrap();
    assert_eq!(settings.last_suffix.as_deref(), Some("000001"));
    assert_eq!(h.cluster.repository_names(), vec!["deepfreeze-000001"]);
    assert!(
        h.ctx
            .metadata
            .get_repository("deepfreeze-000001")
            .await
            .unwrap()
            .unwrap()
            .is_mounted
    );
}

#[tokio::test]
async fn preconditions_are_checked_before_any_write() {
    let h = Harness::new();
    assert!(matches!(
        Rotate::prepare(
            &h.ctx,
            RotateOptions {
                keep: 0,
                ..RotateOptions::default()
            }
        )
        .await,
        Err(ActionError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        Rotate::prepare(&h.ctx, RotateOptions::default()).await,
        Err(ActionError::NotConfigured(_))
    ));

    h.setup(SetupOptions::default()).await;
    h.cluster.delete_repository("deepfreeze-000001").await.unwrap();
    assert!(matches!(
        Rotate::prepare(&h.ctx, RotateOptions::default()).await,
        Err(ActionError::NoRepositories(prefix)) if prefix == "deepfreeze"
    ));
}

#[tokio::test]
async fn rotation_past_six_digits_keeps_newest_repositories() {
    let h = Harness::new();
    h.setup(SetupOptions::default()).await;
    h.cluster.seed_repository(
        "deepfreeze-999999",
        RepositoryInfo::s3("deepfreeze", "snapshots-999999", "private", "intelligent_tiering"),
    );
    let mut settings = h.ctx.metadata.load_settings().await.unwrap().unwrap();
    settings.last_suffix = Some("999999".to_string());
    h.ctx.metadata.save_settings(&settings).await.unwrap();

    let report = Rotate::prepare(
        &h.ctx,
        RotateOptions {
            keep: 2,
            ..RotateOptions::default()
        },
    )
    .await
    .unwrap()
    .run(false)
    .await
    .unwrap();

    assert_eq!(report.latest_repo, "deepfreeze-999999");
    assert_eq!(report.target.repo_name, "deepfreeze-1000000");
    assert_eq!(
        report.retained,
        vec!["deepfreeze-1000000", "deepfreeze-999999"]
    );
    let retired: Vec<_> = report.decommissioned.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(retired, vec!["deepfreeze-000001"]);

    h.rotate(1).await;
    assert_eq!(h.cluster.repository_names(), vec!["deepfreeze-1000001"]);
}
