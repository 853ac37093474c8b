//! Collaborators shared by every action.

use crate::error::{ActionError, ActionResult};
use deepfreeze_cluster::{Cluster, RepositoryInfo};
use deepfreeze_core::config::AppConfig;
use deepfreeze_core::naming::{matches_prefix, sort_newest_first};
use deepfreeze_core::{Provider, RepoTarget, Settings};
use deepfreeze_metadata::{MetadataError, MetadataStore};
use deepfreeze_storage::{ObjectStore, ProviderRegistry, StorageError};
use std::sync::Arc;

/// Handles to the cluster, the metadata store and the object stores.
pub struct Deepfreeze {
    pub cluster: Arc<dyn Cluster>,
    pub metadata: Arc<dyn MetadataStore>,
    pub registry: ProviderRegistry,
    status_index: String,
}

impl Deepfreeze {
    pub fn new(
        cluster: Arc<dyn Cluster>,
        metadata: Arc<dyn MetadataStore>,
        registry: ProviderRegistry,
        status_index: impl Into<String>,
    ) -> Self {
        Self {
            cluster,
            metadata,
            registry,
            status_index: status_index.into(),
        }
    }

    /// Wire up the HTTP cluster client, the status index store and the S3 backend.
    pub fn from_config(config: &AppConfig) -> ActionResult<Self> {
        config
            .validate()
            .map_err(ActionError::InvalidConfiguration)?;
        let cluster = deepfreeze_cluster::from_config(&config.cluster)?;
        let metadata = deepfreeze_metadata::from_config(cluster.clone(), &config.status)?;
        let registry = deepfreeze_storage::from_config(&config.object_store)?;
        Ok(Self::new(cluster, metadata, registry, &config.status.index))
    }

    pub fn status_index(&self) -> &str {
        &self.status_index
    }

    /// Stored settings. Missing settings, or a missing status index, mean
    /// setup has not run.
    pub async fn settings(&self) -> ActionResult<Settings> {
        match self.metadata.load_settings().await {
            Ok(Some(settings)) => Ok(settings),
            Ok(None) | Err(MetadataError::IndexMissing(_)) => {
                Err(ActionError::NotConfigured(self.status_index.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Object store registered for `provider`.
    pub fn object_store(&self, provider: Provider) -> ActionResult<Arc<dyn ObjectStore>> {
        self.registry.get(provider).map_err(|e| match e {
            StorageError::UnsupportedProvider(p) => {
                ActionError::InvalidConfiguration(format!("no object store for provider {p}"))
            }
            other => other.into(),
        })
    }

    /// Registered repositories whose names start with `{prefix}-`, newest first.
    pub async fn matching_repositories(&self, prefix: &str) -> ActionResult<Vec<String>> {
        let mut names: Vec<String> = self
            .cluster
            .list_repositories()
            .await?
            .into_keys()
            .filter(|name| matches_prefix(name, prefix))
            .collect();
        sort_newest_first(&mut names, prefix);
        Ok(names)
    }

    /// Create the bucket and register the repository for `target`.
    pub(crate) async fn provision(
        &self,
        store: &dyn ObjectStore,
        settings: &Settings,
        target: &RepoTarget,
    ) -> ActionResult<()> {
        store.create_bucket(&target.bucket).await.map_err(|e| {
            ActionError::provisioning(format!("creating bucket {}", target.bucket), e)
        })?;
        tracing::info!(bucket = %target.bucket, "Bucket ready");

        let info = RepositoryInfo::s3(
            &target.bucket,
            &target.base_path,
            &settings.canned_acl,
            &settings.storage_class,
        );
        self.cluster
            .create_repository(&target.repo_name, &info)
            .await
            .map_err(|e| {
                ActionError::provisioning(
                    format!("registering repository {}", target.repo_name),
                    e,
                )
            })?;
        tracing::info!(
            repo = %target.repo_name,
            bucket = %target.bucket,
            base_path = %target.base_path,
            "Repository registered"
        );
        Ok(())
    }
}
