mod common;

use common::{STATUS_INDEX, decommissioned, setup_store};
use deepfreeze_cluster::DocumentApi;
use deepfreeze_core::{Provider, RepositoryRecord, Settings, ThawSet, ThawedRepo};
use deepfreeze_metadata::{MetadataError, RepositoryRepo, SettingsRepo, ThawSetRepo};
use serde_json::json;
use time::macros::datetime;

#[tokio::test]
async fn settings_absent_before_first_save() {
    let (_cluster, store) = setup_store().await;
    assert_eq!(store.load_settings().await.unwrap(), None);
}

#[tokio::test]
async fn settings_save_creates_then_updates_one_document() {
    let (cluster, store) = setup_store().await;

    let mut settings = Settings {
        last_suffix: Some("000001".to_string()),
        ..Settings::default()
    };
    store.save_settings(&settings).await.unwrap();

    settings.last_suffix = Some("000002".to_string());
    store.save_settings(&settings).await.unwrap();

    let docs = cluster.documents(STATUS_INDEX);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs["1"]["doctype"], "settings");
    assert_eq!(docs["1"]["last_suffix"], "000002");
    assert_eq!(store.load_settings().await.unwrap(), Some(settings));
}

#[tokio::test]
async fn repository_record_lifecycle_is_upsert_by_name() {
    let (cluster, store) = setup_store().await;

    let mounted = RepositoryRecord::mounted("deepfreeze-000001", "deepfreeze", "snapshots-000001");
    store.upsert_repository(&mounted).await.unwrap();

    let retired = decommissioned(
        "deepfreeze-000001",
        datetime!(2024-01-01 0:00 UTC),
        datetime!(2024-03-31 0:00 UTC),
    );
    store.upsert_repository(&retired).await.unwrap();

    assert_eq!(cluster.documents(STATUS_INDEX).len(), 1);
    let loaded = store
        .get_repository("deepfreeze-000001")
        .await
        .unwrap()
        .unwrap();
    assert!(!loaded.is_mounted);
    assert_eq!(loaded.start, Some(datetime!(2024-01-01 0:00 UTC)));

    store.set_thawed("deepfreeze-000001", true).await.unwrap();
    let thawed = store.list_thawed().await.unwrap();
    assert_eq!(thawed.len(), 1);
    assert!(thawed[0].is_thawed);
}

#[tokio::test]
async fn listings_filter_and_sort_by_name() {
    let (_cluster, store) = setup_store().await;
    store.save_settings(&Settings::default()).await.unwrap();
    for name in ["deepfreeze-000003", "deepfreeze-000001"] {
        store
            .upsert_repository(&decommissioned(
                name,
                datetime!(2024-01-01 0:00 UTC),
                datetime!(2024-02-01 0:00 UTC),
            ))
            .await
            .unwrap();
    }
    store
        .upsert_repository(&RepositoryRecord::mounted(
            "deepfreeze-000002",
            "deepfreeze",
            "snapshots-000002",
        ))
        .await
        .unwrap();

    let all: Vec<_> = store
        .list_repositories()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(
        all,
        vec!["deepfreeze-000001", "deepfreeze-000002", "deepfreeze-000003"]
    );

    let unmounted: Vec<_> = store
        .list_unmounted()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(unmounted, vec!["deepfreeze-000001", "deepfreeze-000003"]);
    assert!(store.list_thawed().await.unwrap().is_empty());
}

#[tokio::test]
async fn set_thawed_on_unknown_repository_is_not_found() {
    let (_cluster, store) = setup_store().await;
    assert!(matches!(
        store.set_thawed("deepfreeze-000009", true).await,
        Err(MetadataError::NotFound(name)) if name == "deepfreeze-000009"
    ));
}

#[tokio::test]
async fn malformed_repository_document_is_rejected() {
    let (cluster, store) = setup_store().await;
    cluster
        .put_document(
            STATUS_INDEX,
            "deepfreeze-000001",
            &json!({"doctype": "repository", "name": "deepfreeze-000001", "owner": "ops"}),
        )
        .await
        .unwrap();

    assert!(matches!(
        store.list_repositories().await,
        Err(MetadataError::InvalidDocument { id, .. }) if id == "deepfreeze-000001"
    ));
}

#[tokio::test]
async fn thawsets_persist_with_generated_ids() {
    let (_cluster, store) = setup_store().await;

    let record = decommissioned(
        "deepfreeze-000001",
        datetime!(2024-01-01 0:00 UTC),
        datetime!(2024-03-31 0:00 UTC),
    );
    let mut first = ThawSet::new(
        datetime!(2024-02-01 0:00 UTC),
        datetime!(2024-02-28 0:00 UTC),
        7,
    );
    first.created_at = datetime!(2024-06-01 0:00 UTC);
    first.add(ThawedRepo::from_record(&record, Provider::Aws));

    let mut second = first.clone();
    second.created_at = datetime!(2024-06-02 0:00 UTC);

    let second_id = store.save_thawset(&second).await.unwrap();
    let first_id = store.save_thawset(&first).await.unwrap();
    assert_ne!(first_id, second_id);

    let sets = store.list_thawsets().await.unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].0, first_id);
    assert_eq!(sets[1].0, second_id);
    assert_eq!(sets[0].1, first);
    assert!(store.list_repositories().await.unwrap().is_empty());
}
