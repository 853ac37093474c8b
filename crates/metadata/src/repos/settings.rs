//! Settings repository trait.

use crate::error::MetadataResult;
use async_trait::async_trait;
use deepfreeze_core::Settings;

/// Repository for the singleton settings document.
#[async_trait]
pub trait SettingsRepo: Send + Sync {
    /// Load the settings, or None before setup has run.
    async fn load_settings(&self) -> MetadataResult<Option<Settings>>;

    /// Upsert the settings: update the existing document field by field, or
    /// create it when absent.
    async fn save_settings(&self, settings: &Settings) -> MetadataResult<()>;
}
