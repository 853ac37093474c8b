//! Repository record trait.

use crate::error::MetadataResult;
use async_trait::async_trait;
use deepfreeze_core::RepositoryRecord;

/// Repository for per-repository records. Records are never deleted.
#[async_trait]
pub trait RepositoryRepo: Send + Sync {
    /// Create or replace the record keyed by `record.name`.
    async fn upsert_repository(&self, record: &RepositoryRecord) -> MetadataResult<()>;

    async fn get_repository(&self, name: &str) -> MetadataResult<Option<RepositoryRecord>>;

    /// All records, sorted by name.
    async fn list_repositories(&self) -> MetadataResult<Vec<RepositoryRecord>>;

    /// Records with `is_mounted = false`, sorted by name.
    async fn list_unmounted(&self) -> MetadataResult<Vec<RepositoryRecord>>;

    /// Records with `is_thawed = true`, sorted by name.
    async fn list_thawed(&self) -> MetadataResult<Vec<RepositoryRecord>>;

    /// Flip the thawed flag on an existing record.
    async fn set_thawed(&self, name: &str, thawed: bool) -> MetadataResult<()>;
}
