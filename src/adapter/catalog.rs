//! Catalog backend adapter
//!
//! Speaks the `?ac=videolist` listing API: `&wd=<query>` searches,
//! `&ids=<id>` looks up one title. When the backend config carries a
//! `detail` page base instead, detail resolution scrapes the HTML page.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use super::playlist::extract_episodes;
use super::scrape::{clean_html, detail_page_url, scrape_detail};
use super::SourceAdapter;
use crate::config::{BackendConfig, SourceType};
use crate::error::{Error, Result};
use crate::http_client::{HttpClient, CATALOG_TIMEOUT};
use crate::model::{SearchResult, UNKNOWN_YEAR};

/// Search calls get a tighter budget than detail calls.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(8);

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());

/// Adapter for paginated catalog APIs.
pub struct CatalogAdapter {
    config: BackendConfig,
    client: HttpClient,
}

impl CatalogAdapter {
    #[must_use]
    pub fn new(config: BackendConfig, client: HttpClient) -> Self {
        Self { config, client }
    }

    /// Endpoints that already pick an `ac=` action keep it.
    fn list_url(&self, param: &str, value: &str) -> String {
        let api = self.config.api.as_str();
        let value = urlencoding::encode(value);
        match api.split_once('?') {
            Some((_, query)) if query.split('&').any(|pair| pair.starts_with("ac=")) => {
                format!("{api}&{param}={value}")
            }
            Some(_) => format!("{api}&ac=videolist&{param}={value}"),
            None => format!("{api}?ac=videolist&{param}={value}"),
        }
    }

    /// Page base for scrape mode, if configured.
    fn detail_page_base(&self) -> Option<&str> {
        self.config.detail.as_deref().filter(|d| !d.trim().is_empty())
    }

    async fn fetch_list(&self, url: &str, timeout: Duration) -> Result<Vec<CatalogItem>> {
        let response: CatalogResponse = self.client.get_json(url, HeaderMap::new(), timeout).await?;
        let Some(list) = response.list else {
            return Err(Error::MalformedPayload(format!(
                "{}: response has no list field",
                self.config.key
            )));
        };

        Ok(list
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<CatalogItem>(raw) {
                Ok(item) => Some(item),
                Err(e) => {
                    debug!(key = %self.config.key, "Skipping malformed record: {e}");
                    None
                }
            })
            .collect())
    }

    async fn try_search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = self.list_url("wd", query);
        let items = self.fetch_list(&url, SEARCH_TIMEOUT).await?;

        Ok(items
            .into_iter()
            .map(|item| self.to_result(item, None))
            .filter(|r| !r.episodes.is_empty())
            .collect())
    }

    async fn api_detail(&self, id: &str) -> Result<SearchResult> {
        let url = self.list_url("ids", id);
        let item = self
            .fetch_list(&url, CATALOG_TIMEOUT)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::MalformedPayload(format!("{}: no record for id {id}", self.config.key))
            })?;

        Ok(self.to_result(item, Some(id)))
    }

    async fn scraped_detail(&self, base: &str, id: &str) -> Result<SearchResult> {
        let url = detail_page_url(base, id);
        let html = self.client.get_text(&url, CATALOG_TIMEOUT).await?;
        let page = scrape_detail(&html, &self.config.key);

        Ok(SearchResult {
            id: id.to_string(),
            title: page.title,
            poster: page.cover,
            episodes: page.episodes,
            episode_titles: page.episode_titles,
            source: self.config.key.clone(),
            source_name: self.config.name.clone(),
            class: String::new(),
            year: page.year,
            desc: page.desc,
            type_name: None,
            external_id: None,
        })
    }

    fn to_result(&self, item: CatalogItem, id: Option<&str>) -> SearchResult {
        let playlist = extract_episodes(item.vod_play_url.as_deref(), item.vod_content.as_deref());

        SearchResult {
            id: id.map_or(item.vod_id, str::to_string),
            title: normalize_title(&item.vod_name),
            poster: item.vod_pic.unwrap_or_default(),
            episodes: playlist.episodes,
            episode_titles: playlist.titles,
            source: self.config.key.clone(),
            source_name: self.config.name.clone(),
            class: item.vod_class.unwrap_or_default(),
            year: normalize_year(item.vod_year.as_deref()),
            desc: clean_html(item.vod_content.as_deref().unwrap_or_default()),
            type_name: item.type_name,
            external_id: item.vod_douban_id.filter(|id| id != "0"),
        }
    }
}

#[async_trait]
impl SourceAdapter for CatalogAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Catalog
    }

    fn key(&self) -> &str {
        &self.config.key
    }

    async fn search(&self, query: &str) -> Vec<SearchResult> {
        match self.try_search(query).await {
            Ok(results) => {
                debug!(key = %self.config.key, count = results.len(), "Catalog search done");
                results
            }
            Err(e) => {
                warn!("Catalog search failed for {}: {}", self.config.name, e);
                Vec::new()
            }
        }
    }

    async fn get_detail(&self, id: &str) -> Result<SearchResult> {
        match self.detail_page_base() {
            Some(base) => self.scraped_detail(base, id).await,
            None => self.api_detail(id).await,
        }
    }

    async fn get_play_url(&self, id: &str, episode_index: usize) -> Result<String> {
        let detail = self.get_detail(id).await?;
        detail.episode(episode_index).map(str::to_string)
    }

    async fn is_authenticated(&self) -> bool {
        true
    }
}

/// Collapse runs of whitespace in a title.
fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First four-digit run, or [`UNKNOWN_YEAR`].
fn normalize_year(raw: Option<&str>) -> String {
    raw.and_then(|y| YEAR.find(y))
        .map_or_else(|| UNKNOWN_YEAR.to_string(), |m| m.as_str().to_string())
}

// ============================================================================
// Catalog API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    list: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct CatalogItem {
    #[serde(deserialize_with = "string_or_number")]
    vod_id: String,
    vod_name: String,
    vod_pic: Option<String>,
    vod_play_url: Option<String>,
    vod_class: Option<String>,
    vod_year: Option<String>,
    vod_content: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    vod_douban_id: Option<String>,
    type_name: Option<String>,
}

/// Catalog backends disagree on whether ids are numbers or strings.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected id, got {other}"))),
    }
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
