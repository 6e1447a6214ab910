//! In-memory subscription bookkeeping.
//!
//! [`SourceBook`] pairs subscriptions with the backend configs derived from
//! them and applies add/refresh/delete/enable/disable. It does not persist
//! anything; callers serialize it wherever their configuration lives.
//!
//! Every `*_with` method takes an already-computed ingestion outcome so the
//! bookkeeping can be driven without a network. The async wrappers fetch
//! through a [`SubscriptionIngester`] and delegate.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::SubscriptionIngester;
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::model::Subscription;

/// Subscriptions plus every configured backend, derived or not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceBook {
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub sources: Vec<BackendConfig>,
}

impl SourceBook {
    #[must_use]
    pub fn new(subscriptions: Vec<Subscription>, sources: Vec<BackendConfig>) -> Self {
        Self {
            subscriptions,
            sources,
        }
    }

    #[must_use]
    pub fn subscription(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| s.id == id)
    }

    /// Backends produced by subscription `id`.
    pub fn derived_sources<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a BackendConfig> + 'a {
        self.sources
            .iter()
            .filter(move |s| s.subscription_id.as_deref() == Some(id))
    }

    /// Register `url` and ingest it immediately.
    ///
    /// A failed fetch still registers the subscription, with the failure
    /// recorded in `last_error`.
    pub async fn add(
        &mut self,
        ingester: &SubscriptionIngester,
        name: &str,
        url: &str,
    ) -> Result<&Subscription> {
        self.validate_new(name, url)?;
        let outcome = ingester.ingest(url).await;
        self.add_with(name, url, outcome)
    }

    pub fn add_with(
        &mut self,
        name: &str,
        url: &str,
        outcome: Result<Vec<BackendConfig>>,
    ) -> Result<&Subscription> {
        self.validate_new(name, url)?;

        let id = format!("sub_{}", Uuid::new_v4().simple());
        let (derived, last_error) = split_outcome(outcome);
        self.subscriptions.push(Subscription {
            id: id.clone(),
            name: name.to_string(),
            url: url.to_string(),
            enabled: true,
            last_update: Utc::now(),
            last_error,
            auto_update: true,
        });

        let installed = self.install(&id, derived, true);
        info!("Added subscription {name} ({id}) with {installed} backends");

        let index = self.subscriptions.len() - 1;
        Ok(&self.subscriptions[index])
    }

    /// Re-ingest subscription `id`, replacing its derived backends.
    ///
    /// Returns how many backends were installed.
    pub async fn refresh(&mut self, ingester: &SubscriptionIngester, id: &str) -> Result<usize> {
        let url = self.find(id)?.url.clone();
        let outcome = ingester.ingest(&url).await;
        self.refresh_with(id, outcome)
    }

    /// The previously derived backends are always discarded. A failed
    /// ingestion installs nothing and records `last_error`.
    pub fn refresh_with(&mut self, id: &str, outcome: Result<Vec<BackendConfig>>) -> Result<usize> {
        let subscription = self.find_mut(id)?;
        let (derived, last_error) = split_outcome(outcome);
        subscription.last_update = Utc::now();
        subscription.last_error = last_error;
        let enabled = subscription.enabled;

        self.sources
            .retain(|s| s.subscription_id.as_deref() != Some(id));
        let installed = self.install(id, derived, enabled);
        info!("Refreshed subscription {id}: {installed} backends");
        Ok(installed)
    }

    /// Remove subscription `id` and every backend derived from it.
    pub fn delete(&mut self, id: &str) -> Result<Subscription> {
        let index = self
            .subscriptions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| unknown(id))?;

        let removed = self.subscriptions.remove(index);
        self.sources
            .retain(|s| s.subscription_id.as_deref() != Some(id));
        info!("Deleted subscription {} ({id})", removed.name);
        Ok(removed)
    }

    /// Show or hide the backends of subscription `id` without deleting
    /// them. Returns how many backends were toggled.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<usize> {
        self.find_mut(id)?.enabled = enabled;

        let mut toggled = 0;
        for source in &mut self.sources {
            if source.subscription_id.as_deref() == Some(id) {
                source.disabled = !enabled;
                toggled += 1;
            }
        }
        Ok(toggled)
    }

    /// Append derived backends whose keys are still free.
    fn install(&mut self, id: &str, derived: Vec<BackendConfig>, enabled: bool) -> usize {
        let mut installed = 0;
        for mut config in derived {
            if self.sources.iter().any(|s| s.key == config.key) {
                info!("Skipping derived backend {}: key already in use", config.key);
                continue;
            }
            config.subscription_id = Some(id.to_string());
            config.disabled = !enabled;
            self.sources.push(config);
            installed += 1;
        }
        installed
    }

    fn validate_new(&self, name: &str, url: &str) -> Result<()> {
        if name.trim().is_empty() || url.trim().is_empty() {
            return Err(Error::Subscription("name and url are required".into()));
        }
        Url::parse(url).map_err(|e| Error::Subscription(format!("invalid url {url}: {e}")))?;
        if self.subscriptions.iter().any(|s| s.url == url) {
            return Err(Error::Subscription(format!("{url} is already subscribed")));
        }
        Ok(())
    }

    fn find(&self, id: &str) -> Result<&Subscription> {
        self.subscription(id).ok_or_else(|| unknown(id))
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Subscription> {
        self.subscriptions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| unknown(id))
    }
}

fn split_outcome(outcome: Result<Vec<BackendConfig>>) -> (Vec<BackendConfig>, Option<String>) {
    match outcome {
        Ok(derived) => (derived, None),
        Err(e) => {
            warn!("Subscription fetch failed: {e}");
            (Vec::new(), Some(e.to_string()))
        }
    }
}

fn unknown(id: &str) -> Error {
    Error::Subscription(format!("no subscription with id {id}"))
}
