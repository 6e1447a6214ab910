//! Backend configuration records and local settings.
//!
//! [`BackendConfig`] is owned by an external store; this crate only reads
//! it. [`Settings`] is loaded from `~/.config/reelgate/config.toml` and is
//! what the binary uses to assemble a source list.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Subscription;

/// Closed set of backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Paginated catalog API (`?ac=videolist`).
    #[serde(alias = "applecms")]
    Catalog,
    /// Cloud drive, variant A.
    Quark,
    /// Cloud drive, variant B. Recognised, no adapter yet.
    Ali,
    /// Any tag this build does not know.
    #[serde(other)]
    Unknown,
}

impl SourceType {
    /// Whether sources of this type need a session credential.
    #[must_use]
    pub fn is_netdrive(self) -> bool {
        matches!(self, SourceType::Quark | SourceType::Ali)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Catalog => "catalog",
            SourceType::Quark => "quark",
            SourceType::Ali => "ali",
            SourceType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session material for authenticated backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Opaque per-backend payload: either raw text or a structured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extension {
    Text(String),
    Structured(serde_json::Value),
}

impl Extension {
    /// Structured view of the payload. Text that holds a JSON document is
    /// parsed; other text yields `None`.
    #[must_use]
    pub fn as_value(&self) -> Option<serde_json::Value> {
        match self {
            Extension::Structured(v) => Some(v.clone()),
            Extension::Text(s) => serde_json::from_str(s.trim()).ok(),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Extension::Text(s) => Some(s),
            Extension::Structured(_) => None,
        }
    }
}

/// One configured backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub key: String,
    pub name: String,
    /// Primary endpoint.
    pub api: String,
    #[serde(default = "default_source_type")]
    pub source_type: SourceType,
    /// Secondary endpoint. For catalog backends this is a detail *page*
    /// base URL and switches detail resolution to scraping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Extension>,
    /// Subscription that produced this entry, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

fn default_source_type() -> SourceType {
    SourceType::Catalog
}

impl BackendConfig {
    /// Minimal catalog config, mostly for tests and the CLI.
    #[must_use]
    pub fn catalog(key: &str, name: &str, api: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            api: api.to_string(),
            source_type: SourceType::Catalog,
            detail: None,
            auth: None,
            ext: None,
            subscription_id: None,
            disabled: false,
        }
    }

    /// Registry key: one live adapter per `(type, key)`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.source_type, self.key)
    }
}

/// Fan-out search tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Per-backend budget for one search call.
    pub timeout_secs: u64,
    /// Results whose classification contains any of these (case-insensitive)
    /// are dropped from the aggregate.
    pub blocked_classes: Vec<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            blocked_classes: Vec::new(),
        }
    }
}

impl SearchSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub sources: Vec<BackendConfig>,
}

impl Settings {
    /// Load settings from `path`, or from the default location.
    ///
    /// A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(default_path, Path::to_path_buf);
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid TOML in {}: {e}", path.display())))
    }

    /// Sources that are not disabled, in file order.
    #[must_use]
    pub fn active_sources(&self) -> Vec<BackendConfig> {
        self.sources.iter().filter(|s| !s.disabled).cloned().collect()
    }

    #[must_use]
    pub fn source(&self, key: &str) -> Option<&BackendConfig> {
        self.sources.iter().find(|s| s.key == key)
    }
}

/// Return the path to the settings file.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelgate")
        .join("config.toml")
}
