//! Shared outbound HTTP client
//!
//! Features:
//! - One pooled `reqwest` client shared by every adapter
//! - Fixed descriptive User-Agent
//! - Brotli/Gzip compression (auto-negotiated)
//! - A per-request timeout on every call; when it fires the request is
//!   dropped and its connection released

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// User-Agent sent with every outbound request.
pub const DEFAULT_USER_AGENT: &str =
    concat!("reelgate/", env!("CARGO_PKG_VERSION"), " (+source aggregation)");

/// Timeout for catalog list/detail calls.
pub const CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for subscription document downloads.
pub const SUBSCRIPTION_TIMEOUT: Duration = Duration::from_secs(15);

/// Cloneable handle over a pooled HTTP client.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with the default User-Agent.
    pub fn new() -> Result<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| Error::Config(format!("invalid user agent: {e}")))?,
        );

        let client = Client::builder()
            // Keep connections alive for reuse across backends
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    /// GET `url` with extra headers, bounded by `timeout`.
    ///
    /// Non-success statuses are returned as [`Error::Transport`].
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn get(&self, url: &str, headers: HeaderMap, timeout: Duration) -> Result<Response> {
        debug!("GET");
        let response = self
            .client
            .get(url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, "Response received");
        if !status.is_success() {
            return Err(Error::Transport(format!("HTTP {status} from {url}")));
        }
        Ok(response)
    }

    /// GET and return the raw body.
    pub async fn get_bytes(&self, url: &str, headers: HeaderMap, timeout: Duration) -> Result<Vec<u8>> {
        let response = self.get(url, headers, timeout).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET and return the body decoded as text.
    pub async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self.get(url, HeaderMap::new(), timeout).await?;
        Ok(response.text().await?)
    }

    /// GET with `Accept: application/json` and deserialize the body.
    ///
    /// The body is read fully before parsing so a bad document surfaces as
    /// [`Error::MalformedPayload`] rather than a transport error.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        mut headers: HeaderMap,
        timeout: Duration,
    ) -> Result<T> {
        headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));
        let bytes = self.get_bytes(url, headers, timeout).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
