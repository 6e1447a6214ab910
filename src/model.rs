//! Data produced by the aggregation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Year placeholder used when a backend gives no usable year.
pub const UNKNOWN_YEAR: &str = "unknown";

/// One title returned by a backend, with its playable units.
///
/// `episodes` holds backend-specific playable references. It may be empty
/// for a container that has not been expanded yet; `get_detail` always
/// returns it expanded. `episode_titles` is either empty or the same
/// length as `episodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub poster: String,
    #[serde(default)]
    pub episodes: Vec<String>,
    #[serde(default, alias = "episodes_titles")]
    pub episode_titles: Vec<String>,
    /// Key of the backend that produced this entry.
    pub source: String,
    pub source_name: String,
    #[serde(default)]
    pub class: String,
    /// Four-digit year, or [`UNKNOWN_YEAR`].
    pub year: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Id in an external catalog (e.g. a ratings site), when the backend knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl SearchResult {
    /// Returns the playable reference at `index`.
    pub fn episode(&self, index: usize) -> crate::Result<&str> {
        self.episodes
            .get(index)
            .map(String::as_str)
            .ok_or(crate::Error::EpisodeIndexOutOfRange {
                index,
                len: self.episodes.len(),
            })
    }
}

/// A remote subscription document and its sync state.
///
/// Backends derived from it carry its `id` in
/// [`BackendConfig::subscription_id`](crate::config::BackendConfig::subscription_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub last_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,
}

fn default_auto_update() -> bool {
    true
}
