mod common;

use common::Harness;
use deepfreeze_actions::{ActionError, SetupOptions, Status, Thaw, ThawOptions};
use deepfreeze_cluster::InUseBy;
use time::macros::datetime;

#[tokio::test]
async fn status_requires_setup() {
    let h = Harness::new();
    assert!(matches!(
        Status::collect(&h.ctx).await,
        Err(ActionError::NotConfigured(index)) if index == "deepfreeze-status"
    ));
}

#[tokio::test]
async fn status_reports_repositories_policies_and_thawsets() {
    let h = Harness::new();
    h.setup(SetupOptions {
        create_sample_ilm_policy: true,
        ..SetupOptions::default()
    })
    .await;
    h.rotate(2).await;
    h.rotate(2).await;
    h.cluster.seed_policy(
        "unrelated",
        serde_json::from_value(serde_json::json!({"phases": {"hot": {"actions": {}}}})).unwrap(),
        InUseBy::default(),
    );
    h.archived_repository(
        "deepfreeze-000000",
        "deepfreeze",
        datetime!(2023-10-01 0:00 UTC),
        datetime!(2023-12-31 0:00 UTC),
    )
    .await;
    Thaw::prepare(
        &h.ctx,
        ThawOptions::new(datetime!(2023-11-01 0:00 UTC), datetime!(2023-11-30 0:00 UTC)),
    )
    .await
    .unwrap()
    .run(false)
    .await
    .unwrap();

    let before = h.mutations();
    let report = Status::collect(&h.ctx).await.unwrap();
    assert_eq!(h.mutations(), before);

    assert_eq!(report.cluster_name, "test-cluster");
    assert_eq!(report.active_repo.as_deref(), Some("deepfreeze-000003"));
    assert_eq!(report.active_bucket.as_deref(), Some("deepfreeze"));
    assert_eq!(report.active_base_path.as_deref(), Some("snapshots-000003"));

    let rows: Vec<_> = report
        .repositories
        .iter()
        .map(|r| (r.name.as_str(), r.state.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("deepfreeze-000000", "T"),
            ("deepfreeze-000001", "U"),
            ("deepfreeze-000002", "M"),
            ("deepfreeze-000003", "M*"),
        ]
    );

    let policies: Vec<_> = report.policies.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(policies, vec!["deepfreeze-sample-policy"]);
    assert_eq!(report.thawsets.len(), 1);
    assert!(report.thawsets[0].1.repos.contains_key("deepfreeze-000000"));
}
