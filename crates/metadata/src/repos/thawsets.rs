//! Thaw set repository trait.

use crate::error::MetadataResult;
use async_trait::async_trait;
use deepfreeze_core::ThawSet;

/// Repository for thaw sets produced by restore requests.
#[async_trait]
pub trait ThawSetRepo: Send + Sync {
    /// Persist a new thaw set and return its identifier.
    async fn save_thawset(&self, thawset: &ThawSet) -> MetadataResult<String>;

    /// All thaw sets with their identifiers, oldest first.
    async fn list_thawsets(&self) -> MetadataResult<Vec<(String, ThawSet)>>;
}
