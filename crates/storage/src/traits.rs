//! Storage trait definitions.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// Object storage class as reported by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Standard,
    IntelligentTiering,
    StandardIa,
    Glacier,
    GlacierIr,
    DeepArchive,
    /// Any class this crate does not model explicitly.
    Other(String),
}

impl StorageClass {
    /// Parse a provider-reported class name. Matching is case-insensitive so
    /// repository-style names (`intelligent_tiering`) map to the same value.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "" | "STANDARD" => Self::Standard,
            "INTELLIGENT_TIERING" => Self::IntelligentTiering,
            "STANDARD_IA" => Self::StandardIa,
            "GLACIER" => Self::Glacier,
            "GLACIER_IR" => Self::GlacierIr,
            "DEEP_ARCHIVE" => Self::DeepArchive,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Standard => "STANDARD",
            Self::IntelligentTiering => "INTELLIGENT_TIERING",
            Self::StandardIa => "STANDARD_IA",
            Self::Glacier => "GLACIER",
            Self::GlacierIr => "GLACIER_IR",
            Self::DeepArchive => "DEEP_ARCHIVE",
            Self::Other(name) => name,
        }
    }

    /// Whether objects in this class must be restored before they can be read.
    pub fn is_archival(&self) -> bool {
        matches!(self, Self::Glacier | Self::GlacierIr | Self::DeepArchive)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval speed requested for an archival restore.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetrievalTier {
    #[default]
    Standard,
    Expedited,
    Bulk,
}

impl RetrievalTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Expedited => "Expedited",
            Self::Bulk => "Bulk",
        }
    }
}

impl fmt::Display for RetrievalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalTier {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "expedited" => Ok(Self::Expedited),
            "bulk" => Ok(Self::Bulk),
            other => Err(StorageError::Config(format!(
                "invalid retrieval tier: {other} (expected Standard, Expedited or Bulk)"
            ))),
        }
    }
}

/// Restore state of an archival object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreStatus {
    NotRequested,
    InProgress,
    Restored,
}

impl RestoreStatus {
    /// Interpret the S3 `x-amz-restore` header.
    ///
    /// `ongoing-request="true"` means a restore is running; `"false"` means a
    /// temporary copy is available. A missing header means no restore exists.
    pub fn from_restore_header(header: Option<&str>) -> Self {
        match header {
            None => Self::NotRequested,
            Some(value) if value.contains("ongoing-request=\"true\"") => Self::InProgress,
            Some(value) if value.contains("ongoing-request=\"false\"") => Self::Restored,
            Some(_) => Self::NotRequested,
        }
    }

    /// True when a restore request would be redundant.
    pub fn is_pending_or_done(&self) -> bool {
        matches!(self, Self::InProgress | Self::Restored)
    }
}

/// One entry from a bucket listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub storage_class: StorageClass,
}

/// Metadata about a stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    pub storage_class: StorageClass,
    pub restore: RestoreStatus,
}

/// Object store abstraction over the buckets that back snapshot repositories.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "s3", "memory").
    fn backend_name(&self) -> &'static str;

    /// Create a bucket. A bucket that already exists and is owned by the
    /// caller is treated as success.
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Delete an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// List bucket names starting with `prefix`.
    async fn list_buckets(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// List every object under `prefix`, following continuation tokens.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectSummary>>;

    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMeta>;

    /// Submit a restore request for an archival object. Does not wait for completion.
    async fn restore_object(
        &self,
        bucket: &str,
        key: &str,
        days: u32,
        tier: RetrievalTier,
    ) -> StorageResult<()>;

    /// Copy an object onto itself with a different storage class.
    async fn copy_object_with_storage_class(
        &self,
        bucket: &str,
        key: &str,
        class: &StorageClass,
    ) -> StorageResult<()>;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
