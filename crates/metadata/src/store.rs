//! Status index backed metadata store.

use crate::error::{MetadataError, MetadataResult};
use crate::models::StatusDoc;
use crate::repos::*;
use async_trait::async_trait;
use deepfreeze_cluster::{Cluster, ClusterError, Hit, Query};
use deepfreeze_core::config::StatusConfig;
use deepfreeze_core::{RepositoryRecord, Settings, ThawSet};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: SettingsRepo + RepositoryRepo + ThawSetRepo + Send + Sync {
    /// Create the status index when it does not exist yet.
    async fn ensure_exists(&self) -> MetadataResult<()>;

    /// Whether the status index exists.
    async fn exists(&self) -> MetadataResult<bool>;

    /// Check cluster connectivity.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// Metadata store keeping every document in one cluster index.
pub struct ClusterMetadataStore {
    cluster: Arc<dyn Cluster>,
    index: String,
    settings_id: String,
}

impl ClusterMetadataStore {
    pub fn new(cluster: Arc<dyn Cluster>, config: &StatusConfig) -> MetadataResult<Self> {
        config.validate().map_err(MetadataError::Config)?;
        Ok(Self {
            cluster,
            index: config.index.clone(),
            settings_id: config.settings_id.clone(),
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    async fn search_docs(&self, query: Query) -> MetadataResult<Vec<Hit>> {
        match self.cluster.search(&self.index, &query).await {
            Ok(hits) => Ok(hits),
            Err(ClusterError::NotFound(_)) => Err(MetadataError::IndexMissing(self.index.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn search_repositories(&self, query: Query) -> MetadataResult<Vec<RepositoryRecord>> {
        let hits = self.search_docs(query).await?;
        let mut records = hits
            .into_iter()
            .map(|hit| StatusDoc::from_value(&hit.id, hit.source)?.into_repository(&hit.id))
            .collect::<MetadataResult<Vec<_>>>()?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

fn repository_query() -> Query {
    Query::field("doctype", "repository")
}

#[async_trait]
impl SettingsRepo for ClusterMetadataStore {
    #[instrument(skip(self), fields(index = %self.index))]
    async fn load_settings(&self) -> MetadataResult<Option<Settings>> {
        let Some(source) = self
            .cluster
            .get_document(&self.index, &self.settings_id)
            .await?
        else {
            return Ok(None);
        };
        let settings = StatusDoc::from_value(&self.settings_id, source)?
            .into_settings(&self.settings_id)?;
        Ok(Some(settings))
    }

    #[instrument(skip(self, settings), fields(index = %self.index))]
    async fn save_settings(&self, settings: &Settings) -> MetadataResult<()> {
        let body = StatusDoc::Settings(settings.clone()).to_value()?;
        let existing = self
            .cluster
            .get_document(&self.index, &self.settings_id)
            .await?;
        if existing.is_some() {
            tracing::debug!(id = %self.settings_id, "Updating settings document");
            self.cluster
                .update_document(&self.index, &self.settings_id, &body)
                .await?;
        } else {
            tracing::debug!(id = %self.settings_id, "Creating settings document");
            self.cluster
                .put_document(&self.index, &self.settings_id, &body)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RepositoryRepo for ClusterMetadataStore {
    #[instrument(skip(self, record), fields(repo = %record.name))]
    async fn upsert_repository(&self, record: &RepositoryRecord) -> MetadataResult<()> {
        let body = StatusDoc::Repository(record.clone()).to_value()?;
        self.cluster
            .put_document(&self.index, &record.name, &body)
            .await?;
        Ok(())
    }

    async fn get_repository(&self, name: &str) -> MetadataResult<Option<RepositoryRecord>> {
        let Some(source) = self.cluster.get_document(&self.index, name).await? else {
            return Ok(None);
        };
        let record = StatusDoc::from_value(name, source)?.into_repository(name)?;
        Ok(Some(record))
    }

    async fn list_repositories(&self) -> MetadataResult<Vec<RepositoryRecord>> {
        self.search_repositories(repository_query()).await
    }

    async fn list_unmounted(&self) -> MetadataResult<Vec<RepositoryRecord>> {
        self.search_repositories(repository_query().and(Query::field("is_mounted", false)))
            .await
    }

    async fn list_thawed(&self) -> MetadataResult<Vec<RepositoryRecord>> {
        self.search_repositories(repository_query().and(Query::field("is_thawed", true)))
            .await
    }

    #[instrument(skip(self))]
    async fn set_thawed(&self, name: &str, thawed: bool) -> MetadataResult<()> {
        match self
            .cluster
            .update_document(&self.index, name, &json!({ "is_thawed": thawed }))
            .await
        {
            Ok(()) => Ok(()),
            Err(ClusterError::NotFound(_)) => Err(MetadataError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ThawSetRepo for ClusterMetadataStore {
    #[instrument(skip(self, thawset), fields(repos = thawset.len()))]
    async fn save_thawset(&self, thawset: &ThawSet) -> MetadataResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let body = StatusDoc::Thawset(thawset.clone()).to_value()?;
        self.cluster.put_document(&self.index, &id, &body).await?;
        Ok(id)
    }

    async fn list_thawsets(&self) -> MetadataResult<Vec<(String, ThawSet)>> {
        let hits = self.search_docs(Query::field("doctype", "thawset")).await?;
        let mut sets = hits
            .into_iter()
            .map(|hit| {
                let set = StatusDoc::from_value(&hit.id, hit.source)?.into_thawset(&hit.id)?;
                Ok((hit.id, set))
            })
            .collect::<MetadataResult<Vec<_>>>()?;
        sets.sort_by(|(a_id, a), (b_id, b)| (a.created_at, a_id).cmp(&(b.created_at, b_id)));
        Ok(sets)
    }
}

#[async_trait]
impl MetadataStore for ClusterMetadataStore {
    #[instrument(skip(self), fields(index = %self.index))]
    async fn ensure_exists(&self) -> MetadataResult<()> {
        if !self.cluster.index_exists(&self.index).await? {
            tracing::info!(index = %self.index, "Creating status index");
            self.cluster.create_index(&self.index).await?;
        }
        Ok(())
    }

    async fn exists(&self) -> MetadataResult<bool> {
        Ok(self.cluster.index_exists(&self.index).await?)
    }

    async fn health_check(&self) -> MetadataResult<()> {
        self.cluster.health().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepfreeze_cluster::MemoryCluster;

    fn store(cluster: Arc<MemoryCluster>) -> ClusterMetadataStore {
        ClusterMetadataStore::new(cluster, &StatusConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_exists_is_idempotent() {
        let cluster = Arc::new(MemoryCluster::default());
        let store = store(cluster.clone());
        assert!(!store.exists().await.unwrap());
        store.ensure_exists().await.unwrap();
        store.ensure_exists().await.unwrap();
        assert!(store.exists().await.unwrap());
        assert_eq!(cluster.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_listing_without_index_reports_missing_index() {
        let store = store(Arc::new(MemoryCluster::default()));
        assert!(matches!(
            store.list_repositories().await,
            Err(MetadataError::IndexMissing(index)) if index == "deepfreeze-status"
        ));
    }

    #[test]
    fn test_rejects_invalid_status_config() {
        let config = StatusConfig {
            index: "Upper".to_string(),
            ..StatusConfig::default()
        };
        assert!(matches!(
            ClusterMetadataStore::new(Arc::new(MemoryCluster::default()), &config),
            Err(MetadataError::Config(_))
        ));
    }
}
