//! Backend adapters.
//!
//! A [`SourceAdapter`] puts one backend behind the uniform
//! search/detail/play interface. Adapters are built from a
//! [`BackendConfig`](crate::config::BackendConfig) snapshot and handed out
//! by the [`AdapterRegistry`].
//!
//! # Architecture
//!
//! - [`SourceAdapter`]: async capability set every backend implements
//! - [`AdapterRegistry`]: memoizes one live adapter per `(type, key)`
//! - [`CatalogAdapter`]: paginated catalog APIs, with an HTML scrape mode
//! - [`QuarkAdapter`]: cloud-drive share links and personal library

pub mod catalog;
pub mod netdrive;
pub mod playlist;
pub mod registry;
pub mod scrape;

use async_trait::async_trait;

use crate::config::SourceType;
use crate::error::Result;
use crate::model::SearchResult;

pub use catalog::CatalogAdapter;
pub use netdrive::QuarkAdapter;
pub use registry::AdapterRegistry;

/// Capability set of a content backend.
///
/// `search` takes part in a fan-out and must never fail: implementations
/// log and return an empty list instead. `get_detail` and `get_play_url`
/// are single-target calls and surface typed errors.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Backend type this adapter serves.
    fn source_type(&self) -> SourceType;

    /// Key of the backend config this instance is bound to.
    fn key(&self) -> &str;

    /// Search the backend. Never fails; errors yield an empty list.
    async fn search(&self, query: &str) -> Vec<SearchResult>;

    /// Full detail for `id`, with containers expanded into episodes.
    async fn get_detail(&self, id: &str) -> Result<SearchResult>;

    /// Resolve the playable URI of one episode of `id`.
    async fn get_play_url(&self, id: &str, episode_index: usize) -> Result<String>;

    /// Whether the backend currently accepts our session. Never fails.
    async fn is_authenticated(&self) -> bool;

    /// Re-derive session state. Backends without sessions do nothing.
    async fn refresh_auth(&self) -> Result<()> {
        Ok(())
    }
}
