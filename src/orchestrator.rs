//! Fan-out search across many backends, plus single-target lookups.
//!
//! Every backend gets its own task and its own timer. A backend that times
//! out, fails, or panics contributes nothing; the others are unaffected.
//! The aggregate is assembled only after every call has settled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::adapter::{AdapterRegistry, SourceAdapter};
use crate::config::{BackendConfig, SearchSettings};
use crate::error::Result;
use crate::model::SearchResult;

/// Merged search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Backend results in config order, each backend's own order preserved.
    pub results: Vec<SearchResult>,
    /// `false` when the aggregate came back empty, so transient failures
    /// are not pinned in a cache.
    pub cacheable: bool,
}

/// Drives searches and lookups through a shared [`AdapterRegistry`].
pub struct Orchestrator {
    registry: Arc<AdapterRegistry>,
    settings: SearchSettings,
}

impl Orchestrator {
    #[must_use]
    pub fn new(registry: Arc<AdapterRegistry>, settings: SearchSettings) -> Self {
        Self { registry, settings }
    }

    #[must_use]
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Search every backend in `configs` for `query`.
    #[instrument(skip(self, configs), fields(backends = configs.len()))]
    pub async fn search(&self, configs: &[BackendConfig], query: &str) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome {
                results: Vec::new(),
                cacheable: true,
            };
        }

        let adapters: Vec<Arc<dyn SourceAdapter>> = configs
            .iter()
            .filter_map(|config| match self.registry.get_adapter(config) {
                Ok(adapter) => Some(adapter),
                Err(e) => {
                    warn!("Skipping backend {}: {}", config.key, e);
                    None
                }
            })
            .collect();

        let start = Instant::now();
        let merged = fan_out(&adapters, query, self.settings.timeout()).await;
        let results = filter_blocked(merged, &self.settings.blocked_classes);

        info!(
            "Search '{}' returned {} results from {} backends in {:?}",
            query,
            results.len(),
            adapters.len(),
            start.elapsed()
        );

        SearchOutcome {
            cacheable: !results.is_empty(),
            results,
        }
    }

    /// Full detail of one title on one backend.
    pub async fn get_detail(&self, config: &BackendConfig, id: &str) -> Result<SearchResult> {
        self.registry.get_adapter(config)?.get_detail(id).await
    }

    /// Playable URI for episode `episode_index` of title `id`.
    pub async fn get_play_url(
        &self,
        config: &BackendConfig,
        id: &str,
        episode_index: usize,
    ) -> Result<String> {
        self.registry
            .get_adapter(config)?
            .get_play_url(id, episode_index)
            .await
    }

    /// Whether the backend's session is usable. Backends the registry
    /// cannot build report `false`.
    pub async fn is_authenticated(&self, config: &BackendConfig) -> bool {
        match self.registry.get_adapter(config) {
            Ok(adapter) => adapter.is_authenticated().await,
            Err(e) => {
                debug!("No adapter for {}: {}", config.key, e);
                false
            }
        }
    }

    /// Drop cached adapters for `key`, or all of them.
    pub fn clear_cache(&self, key: Option<&str>) {
        self.registry.clear_cache(key);
    }
}

/// Run `search` on every adapter concurrently and flatten the results.
///
/// Each call runs in its own task under `budget`. When the timer fires the
/// call is dropped, which cancels its in-flight request.
pub async fn fan_out(
    adapters: &[Arc<dyn SourceAdapter>],
    query: &str,
    budget: Duration,
) -> Vec<SearchResult> {
    let tasks = adapters.iter().map(|adapter| {
        let adapter = Arc::clone(adapter);
        let query = query.to_string();
        tokio::spawn(async move {
            let key = adapter.key().to_string();
            match tokio::time::timeout(budget, adapter.search(&query)).await {
                Ok(results) => results,
                Err(_) => {
                    warn!("Backend {key} timed out after {budget:?}");
                    Vec::new()
                }
            }
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .flat_map(|joined| match joined {
            Ok(results) => results,
            Err(e) => {
                warn!("Backend search task failed: {e}");
                Vec::new()
            }
        })
        .collect()
}

/// Drop results whose class or type name contains a blocked term.
#[must_use]
pub fn filter_blocked(results: Vec<SearchResult>, blocked: &[String]) -> Vec<SearchResult> {
    if blocked.is_empty() {
        return results;
    }
    let blocked: Vec<String> = blocked.iter().map(|b| b.to_lowercase()).collect();

    results
        .into_iter()
        .filter(|r| {
            let class = r.class.to_lowercase();
            let type_name = r.type_name.as_deref().unwrap_or_default().to_lowercase();
            !blocked
                .iter()
                .any(|b| class.contains(b.as_str()) || type_name.contains(b.as_str()))
        })
        .collect()
}
