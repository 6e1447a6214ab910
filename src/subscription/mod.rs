//! Subscription ingestion.
//!
//! A subscription is a remote document listing many sites. Ingesting one
//! means: fetch the bytes, find the document inside them
//! ([`cascade::decode`]), then classify each site into a
//! [`BackendConfig`] ([`classify::classify_sites`]).
//!
//! ```rust,no_run
//! use reelgate::{HttpClient, SubscriptionIngester};
//!
//! # async fn example() -> reelgate::Result<()> {
//! let ingester = SubscriptionIngester::new(HttpClient::new()?);
//! let configs = ingester.ingest("https://example.com/tv.json").await?;
//! println!("{} backends", configs.len());
//! # Ok(())
//! # }
//! ```

pub mod cascade;
pub mod classify;
pub mod lifecycle;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use tracing::{info, instrument};

use crate::config::BackendConfig;
use crate::error::Result;
use crate::http_client::{HttpClient, SUBSCRIPTION_TIMEOUT};

pub use cascade::Document;
pub use classify::classify_sites;
pub use lifecycle::SourceBook;

/// Fetches subscription documents and derives backend configs from them.
#[derive(Clone)]
pub struct SubscriptionIngester {
    client: HttpClient,
}

impl SubscriptionIngester {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Download `url` and decode it into a document with a site list.
    #[instrument(skip(self))]
    pub async fn fetch_document(&self, url: &str) -> Result<Document> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        let bytes = self
            .client
            .get_bytes(url, headers, SUBSCRIPTION_TIMEOUT)
            .await?;
        cascade::decode(&bytes)
    }

    /// Fetch, decode and classify `url`.
    pub async fn ingest(&self, url: &str) -> Result<Vec<BackendConfig>> {
        let doc = self.fetch_document(url).await?;
        let configs = classify_sites(&doc);
        let site_count = doc
            .get(cascade::SITE_LIST_FIELD)
            .and_then(|s| s.as_array())
            .map_or(0, Vec::len);
        info!(
            "Subscription {} yielded {} backends from {} sites",
            url,
            configs.len(),
            site_count
        );
        Ok(configs)
    }
}
