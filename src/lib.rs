//! `reelgate` - Video source aggregation
//!
//! # Features
//!
//! - **Adapters**: one interface over catalog APIs and cloud-drive shares
//! - **Registry**: one live adapter per backend, rebuilt only on request
//! - **Fan-out search**: per-backend timers, failures isolated per backend
//! - **Subscriptions**: decode remote site lists (plain, base64, or hidden
//!   in an image) into backend configs
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use reelgate::{AdapterRegistry, BackendConfig, HttpClient, Orchestrator, SearchSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(AdapterRegistry::new(HttpClient::new()?));
//!     let orchestrator = Orchestrator::new(registry, SearchSettings::default());
//!     let sources = [BackendConfig::catalog("demo", "Demo", "https://example.com/api.php/provide/vod")];
//!     let outcome = orchestrator.search(&sources, "documentary").await;
//!     println!("{} results", outcome.results.len());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod http_client;
pub mod model;
pub mod orchestrator;
pub mod subscription;

pub use adapter::{AdapterRegistry, CatalogAdapter, QuarkAdapter, SourceAdapter};
pub use config::{AuthBlock, BackendConfig, Extension, SearchSettings, Settings, SourceType};
pub use error::{Error, Result};
pub use http_client::HttpClient;
pub use model::{SearchResult, Subscription, UNKNOWN_YEAR};
pub use orchestrator::{Orchestrator, SearchOutcome};
pub use subscription::{SourceBook, SubscriptionIngester};

/// Version of reelgate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
