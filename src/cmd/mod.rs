pub mod auth;
pub mod detail;
pub mod ingest;
pub mod output;
pub mod play;
pub mod search;

use std::sync::Arc;

use anyhow::{anyhow, Result};

use reelgate::{AdapterRegistry, BackendConfig, HttpClient, Orchestrator, Settings};

/// Everything a subcommand needs.
pub struct App {
    pub settings: Settings,
    pub client: HttpClient,
    pub orchestrator: Orchestrator,
}

impl App {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = HttpClient::new()?;
        let registry = Arc::new(AdapterRegistry::new(client.clone()));
        let orchestrator = Orchestrator::new(registry, settings.search.clone());
        Ok(Self {
            settings,
            client,
            orchestrator,
        })
    }

    /// Configured source by key, enabled or not.
    pub fn source(&self, key: &str) -> Result<&BackendConfig> {
        self.settings
            .source(key)
            .ok_or_else(|| anyhow!("no source '{key}' configured"))
    }
}
