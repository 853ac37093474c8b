//! Maps a configured [`Provider`] to the object store that serves it.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use deepfreeze_core::Provider;
use std::collections::HashMap;
use std::sync::Arc;

/// Registered object store adapters, one per provider.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    stores: HashMap<Provider, Arc<dyn ObjectStore>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<_> = self.stores.keys().map(Provider::as_str).collect();
        providers.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("providers", &providers)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` for `provider`, replacing any previous registration.
    pub fn register(&mut self, provider: Provider, store: Arc<dyn ObjectStore>) -> &mut Self {
        tracing::debug!(provider = %provider, backend = store.backend_name(), "registered object store");
        self.stores.insert(provider, store);
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, provider: Provider, store: Arc<dyn ObjectStore>) -> Self {
        self.register(provider, store);
        self
    }

    /// Look up the store for `provider`.
    pub fn get(&self, provider: Provider) -> StorageResult<Arc<dyn ObjectStore>> {
        self.stores
            .get(&provider)
            .cloned()
            .ok_or_else(|| StorageError::UnsupportedProvider(provider.to_string()))
    }

    pub fn contains(&self, provider: Provider) -> bool {
        self.stores.contains_key(&provider)
    }
}
