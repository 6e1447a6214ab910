//! Adapter registry: one live adapter per `(type, key)`.
//!
//! The registry is an ordinary value owned by whoever drives the searches;
//! tests build their own. It does not notice edits to a backend's config:
//! callers evict with [`AdapterRegistry::clear_cache`] after changing one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::{CatalogAdapter, QuarkAdapter, SourceAdapter};
use crate::config::{BackendConfig, SourceType};
use crate::error::{Error, Result};
use crate::http_client::HttpClient;

/// Memoizing adapter factory.
pub struct AdapterRegistry {
    client: HttpClient,
    adapters: RwLock<HashMap<String, Arc<dyn SourceAdapter>>>,
}

impl AdapterRegistry {
    /// Registry whose adapters share `client`.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            adapters: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached adapter for `config`, building it on first use.
    ///
    /// Two callers racing on the same key may both build an adapter; only
    /// the first one inserted is kept and returned to both.
    pub fn get_adapter(&self, config: &BackendConfig) -> Result<Arc<dyn SourceAdapter>> {
        let cache_key = config.cache_key();

        if let Some(adapter) = self
            .adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key)
        {
            return Ok(Arc::clone(adapter));
        }

        let built = self.build(config)?;

        let mut adapters = self.adapters.write().unwrap_or_else(PoisonError::into_inner);
        let kept = adapters.entry(cache_key).or_insert_with(|| {
            debug!(key = %config.key, source_type = %config.source_type, "Adapter created");
            built
        });
        Ok(Arc::clone(kept))
    }

    fn build(&self, config: &BackendConfig) -> Result<Arc<dyn SourceAdapter>> {
        match config.source_type {
            SourceType::Catalog => Ok(Arc::new(CatalogAdapter::new(
                config.clone(),
                self.client.clone(),
            ))),
            SourceType::Quark => Ok(Arc::new(QuarkAdapter::new(
                config.clone(),
                self.client.clone(),
            ))),
            SourceType::Ali | SourceType::Unknown => {
                Err(Error::UnsupportedSourceType(config.source_type.to_string()))
            }
        }
    }

    /// Evict one backend, or everything when `key` is `None`.
    ///
    /// `key` may be either the backend key or the `<type>_<key>` cache key.
    pub fn clear_cache(&self, key: Option<&str>) {
        let mut adapters = self.adapters.write().unwrap_or_else(PoisonError::into_inner);
        match key {
            Some(key) => adapters.retain(|cache_key, adapter| cache_key != key && adapter.key() != key),
            None => adapters.clear(),
        }
    }

    /// Number of live adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
