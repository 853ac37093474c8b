//! Shared harness for action tests: an in-memory cluster and object store.

#![allow(dead_code)]

use deepfreeze_actions::{Deepfreeze, Rotate, RotateOptions, Setup, SetupOptions};
use deepfreeze_cluster::MemoryCluster;
use deepfreeze_core::config::StatusConfig;
use deepfreeze_core::{Provider, RepositoryRecord};
use deepfreeze_metadata::{ClusterMetadataStore, RepositoryRepo};
use deepfreeze_storage::{MemoryBackend, ProviderRegistry, StorageClass};
use std::sync::Arc;
use time::OffsetDateTime;

pub struct Harness {
    pub cluster: Arc<MemoryCluster>,
    pub storage: Arc<MemoryBackend>,
    pub ctx: Deepfreeze,
}

impl Harness {
    pub fn new() -> Self {
        let cluster = Arc::new(MemoryCluster::new("test-cluster"));
        let storage = Arc::new(MemoryBackend::new());
        let config = StatusConfig::default();
        let metadata = ClusterMetadataStore::new(cluster.clone(), &config)
            .expect("default status config is valid");
        let registry = ProviderRegistry::new().with(Provider::Aws, storage.clone());
        let ctx = Deepfreeze::new(cluster.clone(), Arc::new(metadata), registry, &config.index);
        Self {
            cluster,
            storage,
            ctx,
        }
    }

    /// Harness whose registry has no backend at all.
    pub fn without_storage() -> Self {
        let mut harness = Self::new();
        let metadata = ClusterMetadataStore::new(harness.cluster.clone(), &StatusConfig::default())
            .expect("default status config is valid");
        harness.ctx = Deepfreeze::new(
            harness.cluster.clone(),
            Arc::new(metadata),
            ProviderRegistry::new(),
            "deepfreeze-status",
        );
        harness
    }

    pub async fn setup(&self, options: SetupOptions) {
        Setup::prepare(&self.ctx, options)
            .await
            .expect("prepare setup")
            .run(false)
            .await
            .expect("run setup");
    }

    pub async fn rotate(&self, keep: usize) {
        Rotate::prepare(
            &self.ctx,
            RotateOptions {
                keep,
                ..RotateOptions::default()
            },
        )
        .await
        .expect("prepare rotate")
        .run(false)
        .await
        .expect("run rotate");
    }

    /// Total write calls against either collaborator.
    pub fn mutations(&self) -> usize {
        self.cluster.mutation_count() + self.storage.mutation_count()
    }

    /// Store a decommissioned record and archive objects under its prefix.
    pub async fn archived_repository(
        &self,
        name: &str,
        bucket: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> RepositoryRecord {
        let record = RepositoryRecord {
            start: Some(start),
            end: Some(end),
            is_mounted: false,
            ..RepositoryRecord::mounted(name, bucket, format!("snapshots-{name}"))
        };
        self.ctx
            .metadata
            .upsert_repository(&record)
            .await
            .expect("store record");
        for object in ["index-0", "indices/a/0", "indices/a/1"] {
            self.storage.insert_object(
                bucket,
                &format!("{}/{object}", record.base_path),
                128,
                StorageClass::Glacier,
            );
        }
        record
    }
}
