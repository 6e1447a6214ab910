//! Cloud-drive backend adapter (Quark)
//!
//! Two search surfaces, both tried on every query:
//!
//! 1. Share links from the config's `ext` payload, listed through the
//!    share-page detail call and filtered by file name.
//! 2. The user's own drive, via the native keyword search, when the
//!    session cookie passes a probe.
//!
//! Result ids are `<shareId>:<fid>` for share hits and `<fid>` for drive
//! hits. Episode references are `quark:<fid>`; they resolve to a signed,
//! short-lived download URL on every [`get_play_url`] call.
//!
//! [`get_play_url`]: SourceAdapter::get_play_url

use std::sync::{LazyLock, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::SourceAdapter;
use crate::config::{BackendConfig, SourceType};
use crate::error::{Error, Result};
use crate::http_client::HttpClient;
use crate::model::{SearchResult, UNKNOWN_YEAR};

/// Drive API host used when a config carries no endpoint of its own.
pub const DEFAULT_API_BASE: &str = "https://drive-pc.quark.cn";
const FILE_SORT_PATH: &str = "/1/clouddrive/file/sort";
const DOWNLOAD_PATH: &str = "/1/clouddrive/file/download";
const SHARE_DETAIL_PATH: &str = "/1/clouddrive/share/sharepage/detail";

/// Prefix marking an episode reference as a drive file id.
pub const EPISODE_PREFIX: &str = "quark:";

const DRIVE_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_PAGE_SIZE: u32 = 50;
const LIST_PAGE_SIZE: u32 = 100;

static SHARE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/s/([a-zA-Z0-9]+)").unwrap());
static EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.\w+$").unwrap());

/// Session material derived from a backend config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveSession {
    pub cookie: Option<String>,
    pub share_links: Vec<String>,
}

impl DriveSession {
    /// Cookie from `auth.cookie`, overridden by `ext.cookie`; share links
    /// from `ext.shares`, `ext.shareUrls`, `ext.share_url`, or `ext` as a
    /// newline-separated list.
    #[must_use]
    pub fn from_config(config: &BackendConfig) -> Self {
        let mut session = Self {
            cookie: config
                .auth
                .as_ref()
                .and_then(|a| a.cookie.clone())
                .filter(|c| !c.trim().is_empty()),
            share_links: Vec::new(),
        };

        let Some(ext) = &config.ext else {
            return session;
        };

        match ext.as_value() {
            Some(serde_json::Value::Object(map)) => {
                if let Some(cookie) = map.get("cookie").and_then(|c| c.as_str()) {
                    if !cookie.trim().is_empty() {
                        session.cookie = Some(cookie.to_string());
                    }
                }
                for field in ["shares", "shareUrls"] {
                    if let Some(links) = map.get(field).and_then(|v| v.as_array()) {
                        session
                            .share_links
                            .extend(links.iter().filter_map(|l| l.as_str()).map(str::to_string));
                    }
                }
                if let Some(links) = map.get("share_url").and_then(|v| v.as_str()) {
                    session.share_links.extend(split_links(links));
                }
            }
            Some(_) => {}
            None => {
                if let Some(text) = ext.as_text() {
                    session.share_links.extend(split_links(text));
                }
            }
        }

        session
    }
}

fn split_links(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// Share identifier from a share link's `/s/<id>` path segment.
#[must_use]
pub fn extract_share_id(link: &str) -> Option<String> {
    SHARE_ID
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Adapter for the Quark cloud drive.
pub struct QuarkAdapter {
    config: BackendConfig,
    client: HttpClient,
    session: RwLock<DriveSession>,
}

impl QuarkAdapter {
    #[must_use]
    pub fn new(config: BackendConfig, client: HttpClient) -> Self {
        let session = DriveSession::from_config(&config);
        Self {
            config,
            client,
            session: RwLock::new(session),
        }
    }

    /// Snapshot of the current session.
    fn session(&self) -> DriveSession {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn require_cookie(&self) -> Result<String> {
        self.session()
            .cookie
            .ok_or_else(|| Error::CredentialMissing(self.config.key.clone()))
    }

    fn api_base(&self) -> &str {
        let api = self.config.api.trim();
        if api.starts_with("http") {
            api.trim_end_matches('/')
        } else {
            DEFAULT_API_BASE
        }
    }

    /// One GET against the drive API. Non-zero `code` is an error.
    async fn call<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let mut url = Url::parse(&format!("{}{path}", self.api_base()))
            .map_err(|e| Error::Config(format!("{}: bad endpoint: {e}", self.config.key)))?;
        url.query_pairs_mut()
            .append_pair("pr", "ucpro")
            .append_pair("fr", "pc")
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));

        let mut headers = HeaderMap::new();
        if let Some(cookie) = self.session().cookie {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| Error::Config(format!("{}: bad cookie: {e}", self.config.key)))?;
            headers.insert(COOKIE, value);
        }

        debug!(key = %self.config.key, path, "Drive API call");
        let envelope: Envelope<T> = self
            .client
            .get_json(url.as_str(), headers, DRIVE_TIMEOUT)
            .await?;

        if envelope.code != 0 {
            return Err(Error::Transport(format!(
                "drive API error {}: {}",
                envelope.code,
                envelope.message.unwrap_or_else(|| "unknown".to_string())
            )));
        }
        envelope
            .data
            .ok_or_else(|| Error::MalformedPayload(format!("{path}: response has no data")))
    }

    async fn list_share(&self, share_id: &str, parent: Option<&str>) -> Result<Vec<DriveFile>> {
        let mut params = vec![("pwd_id", share_id.to_string()), ("passcode", String::new())];
        if let Some(parent) = parent {
            params.push(("pdir_fid", parent.to_string()));
            params.push(("_page", "1".to_string()));
            params.push(("_size", LIST_PAGE_SIZE.to_string()));
        }
        let data: FileList = self.call(SHARE_DETAIL_PATH, &params).await?;
        Ok(data.list)
    }

    async fn list_drive(&self, parent: &str) -> Result<FileList> {
        self.call(
            FILE_SORT_PATH,
            &[
                ("pdir_fid", parent.to_string()),
                ("_page", "1".to_string()),
                ("_size", LIST_PAGE_SIZE.to_string()),
            ],
        )
        .await
    }

    async fn search_share(&self, link: &str, query: &str) -> Result<Vec<SearchResult>> {
        let share_id = extract_share_id(link)
            .ok_or_else(|| Error::MalformedPayload(format!("invalid share link: {link}")))?;
        let needle = query.to_lowercase();

        Ok(self
            .list_share(&share_id, None)
            .await?
            .iter()
            .filter(|f| f.file_name.to_lowercase().contains(&needle) && (f.is_video() || f.dir))
            .map(|f| self.to_result(f, Some(&share_id), None))
            .collect())
    }

    async fn search_drive(&self, query: &str) -> Result<Vec<SearchResult>> {
        let data: FileList = self
            .call(
                FILE_SORT_PATH,
                &[
                    ("pdir_fid", "0".to_string()),
                    ("keyword", query.to_string()),
                    ("_page", "1".to_string()),
                    ("_size", SEARCH_PAGE_SIZE.to_string()),
                ],
            )
            .await?;

        Ok(data
            .list
            .iter()
            .filter(|f| f.is_video() || f.dir)
            .map(|f| self.to_result(f, None, None))
            .collect())
    }

    async fn share_detail(&self, share_id: &str, fid: &str) -> Result<SearchResult> {
        let files = self.list_share(share_id, None).await?;
        let file = files.iter().find(|f| f.fid == fid).ok_or_else(|| {
            Error::MalformedPayload(format!("file {fid} not found in share {share_id}"))
        })?;

        if file.dir {
            let children: Vec<DriveFile> = self
                .list_share(share_id, Some(fid))
                .await?
                .into_iter()
                .filter(DriveFile::is_video)
                .collect();
            return Ok(self.to_result(file, Some(share_id), Some(&children)));
        }
        Ok(self.to_result(file, Some(share_id), None))
    }

    async fn drive_detail(&self, fid: &str) -> Result<SearchResult> {
        self.require_cookie()?;
        let data = self.list_drive(fid).await?;
        let title = data
            .metadata
            .and_then(|m| m.title)
            .unwrap_or_else(|| fid.to_string());

        // A leaf lists no children: it is its own single episode.
        let (episodes, episode_titles) = if data.list.is_empty() {
            (vec![format!("{EPISODE_PREFIX}{fid}")], vec![title.clone()])
        } else {
            data.list
                .iter()
                .filter(|f| f.is_video())
                .map(|f| (format!("{EPISODE_PREFIX}{}", f.fid), f.file_name.clone()))
                .unzip()
        };

        Ok(SearchResult {
            id: fid.to_string(),
            title,
            poster: String::new(),
            episodes,
            episode_titles,
            source: self.config.key.clone(),
            source_name: self.config.name.clone(),
            class: String::new(),
            year: UNKNOWN_YEAR.to_string(),
            desc: String::new(),
            type_name: None,
            external_id: None,
        })
    }

    /// Exchange a file id for a signed direct URL. Never cached.
    async fn download_url(&self, fid: &str) -> Result<String> {
        self.require_cookie()?;
        let links: Vec<DownloadLink> = self.call(DOWNLOAD_PATH, &[("fids", fid.to_string())]).await?;
        links
            .into_iter()
            .next()
            .map(|l| l.download_url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::MalformedPayload(format!("no download URL for {fid}")))
    }

    fn to_result(&self, file: &DriveFile, share_id: Option<&str>, children: Option<&[DriveFile]>) -> SearchResult {
        let (episodes, episode_titles) = match children {
            Some(children) => children
                .iter()
                .map(|c| (format!("{EPISODE_PREFIX}{}", c.fid), c.file_name.clone()))
                .unzip(),
            None if file.dir => (Vec::new(), Vec::new()),
            None => (
                vec![format!("{EPISODE_PREFIX}{}", file.fid)],
                vec![file.file_name.clone()],
            ),
        };

        SearchResult {
            id: match share_id {
                Some(share_id) => format!("{share_id}:{}", file.fid),
                None => file.fid.clone(),
            },
            title: EXTENSION.replace(&file.file_name, "").into_owned(),
            poster: String::new(),
            episodes,
            episode_titles,
            source: self.config.key.clone(),
            source_name: self.config.name.clone(),
            class: if file.format_type.is_empty() {
                "video".to_string()
            } else {
                file.format_type.clone()
            },
            year: year_of(file.created_at),
            desc: format!("Size: {}", format_size(file.size)),
            type_name: None,
            external_id: None,
        }
    }
}

#[async_trait]
impl SourceAdapter for QuarkAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Quark
    }

    fn key(&self) -> &str {
        &self.config.key
    }

    async fn search(&self, query: &str) -> Vec<SearchResult> {
        let session = self.session();
        let mut results = Vec::new();

        let shares = futures::future::join_all(
            session
                .share_links
                .iter()
                .map(|link| self.search_share(link, query)),
        )
        .await;
        for (link, outcome) in session.share_links.iter().zip(shares) {
            match outcome {
                Ok(hits) => results.extend(hits),
                Err(e) => warn!("Share search failed for {}: {}", link, e),
            }
        }

        if self.is_authenticated().await {
            match self.search_drive(query).await {
                Ok(hits) => results.extend(hits),
                Err(e) => warn!("Drive search failed for {}: {}", self.config.name, e),
            }
        }

        results
    }

    async fn get_detail(&self, id: &str) -> Result<SearchResult> {
        let id = id.strip_prefix(EPISODE_PREFIX).unwrap_or(id);
        match id.split_once(':') {
            Some((share_id, fid)) => self.share_detail(share_id, fid).await,
            None => self.drive_detail(id).await,
        }
    }

    async fn get_play_url(&self, id: &str, episode_index: usize) -> Result<String> {
        let episodes = if id.starts_with(EPISODE_PREFIX) {
            vec![id.to_string()]
        } else {
            self.get_detail(id).await?.episodes
        };

        let episode = episodes
            .get(episode_index)
            .ok_or(Error::EpisodeIndexOutOfRange {
                index: episode_index,
                len: episodes.len(),
            })?;
        let fid = episode.strip_prefix(EPISODE_PREFIX).unwrap_or(episode);
        self.download_url(fid).await
    }

    async fn is_authenticated(&self) -> bool {
        if self.session().cookie.is_none() {
            return false;
        }
        let probe: Result<FileList> = self
            .call(
                FILE_SORT_PATH,
                &[
                    ("pdir_fid", "0".to_string()),
                    ("_page", "1".to_string()),
                    ("_size", "1".to_string()),
                ],
            )
            .await;
        match probe {
            Ok(_) => true,
            Err(e) => {
                debug!(key = %self.config.key, "Session probe failed: {e}");
                false
            }
        }
    }

    async fn refresh_auth(&self) -> Result<()> {
        let session = DriveSession::from_config(&self.config);
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
        self.require_cookie()?;
        if self.is_authenticated().await {
            Ok(())
        } else {
            Err(Error::Transport(format!(
                "{}: session rejected by backend",
                self.config.key
            )))
        }
    }
}

/// Human-readable byte size.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}

/// Creation year from a Unix timestamp in seconds or milliseconds.
fn year_of(created_at: i64) -> String {
    if created_at <= 0 {
        return UNKNOWN_YEAR.to_string();
    }
    let secs = if created_at > 100_000_000_000 {
        created_at / 1000
    } else {
        created_at
    };
    DateTime::from_timestamp(secs, 0).map_or_else(|| UNKNOWN_YEAR.to_string(), |d| d.year().to_string())
}

// ============================================================================
// Drive API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    list: Vec<DriveFile>,
    #[serde(default)]
    metadata: Option<ListMetadata>,
}

#[derive(Debug, Deserialize)]
struct ListMetadata {
    title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DriveFile {
    fid: String,
    file_name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    format_type: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    dir: bool,
}

impl DriveFile {
    fn is_video(&self) -> bool {
        self.format_type.starts_with("video")
    }
}

#[derive(Debug, Deserialize)]
struct DownloadLink {
    #[serde(default)]
    download_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthBlock, Extension};

    fn config(ext: Option<Extension>, cookie: Option<&str>) -> BackendConfig {
        let mut config = BackendConfig::catalog("q", "Drive", "http://127.0.0.1:9");
        config.source_type = SourceType::Quark;
        config.ext = ext;
        config.auth = cookie.map(|c| AuthBlock {
            cookie: Some(c.to_string()),
            ..AuthBlock::default()
        });
        config
    }

    fn adapter(ext: Option<Extension>, cookie: Option<&str>) -> QuarkAdapter {
        QuarkAdapter::new(config(ext, cookie), HttpClient::new().unwrap())
    }

    fn file(fid: &str, name: &str, dir: bool) -> DriveFile {
        DriveFile {
            fid: fid.into(),
            file_name: name.into(),
            size: 3 * 1024 * 1024,
            format_type: if dir { String::new() } else { "video".into() },
            created_at: 1_700_000_000,
            dir,
        }
    }

    #[test]
    fn session_from_json_ext_overrides_cookie() {
        let ext = Extension::Text(
            r#"{"cookie":"ext=1","shares":["https://pan.quark.cn/s/aa"],"shareUrls":["https://pan.quark.cn/s/bb"]}"#
                .into(),
        );
        let session = DriveSession::from_config(&config(Some(ext), Some("auth=1")));
        assert_eq!(session.cookie.as_deref(), Some("ext=1"));
        assert_eq!(session.share_links.len(), 2);
    }

    #[test]
    fn session_from_plain_link_list() {
        let ext = Extension::Text("https://pan.quark.cn/s/aa\n\n https://pan.quark.cn/s/bb \n".into());
        let session = DriveSession::from_config(&config(Some(ext), None));
        assert_eq!(
            session.share_links,
            vec!["https://pan.quark.cn/s/aa", "https://pan.quark.cn/s/bb"]
        );
        assert!(session.cookie.is_none());
    }

    #[test]
    fn session_from_structured_share_url() {
        let ext = Extension::Structured(serde_json::json!({"share_url": "https://pan.quark.cn/s/cc"}));
        let session = DriveSession::from_config(&config(Some(ext), Some("  ")));
        assert_eq!(session.share_links, vec!["https://pan.quark.cn/s/cc"]);
        assert!(session.cookie.is_none());
    }

    #[test]
    fn share_id_comes_from_path_segment() {
        assert_eq!(
            extract_share_id("https://pan.quark.cn/s/abc123XYZ#/list/share").as_deref(),
            Some("abc123XYZ")
        );
        assert!(extract_share_id("https://pan.quark.cn/list").is_none());
    }

    #[test]
    fn leaf_result_is_single_episode() {
        let adapter = adapter(None, None);
        let result = adapter.to_result(&file("f1", "Movie.2020.mkv", false), Some("sh"), None);
        assert_eq!(result.id, "sh:f1");
        assert_eq!(result.title, "Movie.2020");
        assert_eq!(result.episodes, vec!["quark:f1"]);
        assert_eq!(result.episode_titles, vec!["Movie.2020.mkv"]);
        assert_eq!(result.year, "2023");
        assert_eq!(result.desc, "Size: 3.00 MB");
    }

    #[test]
    fn container_result_expands_children() {
        let adapter = adapter(None, None);
        let children = [file("c1", "E01.mp4", false), file("c2", "E02.mp4", false)];
        let folder = file("d1", "Series", true);
        let unexpanded = adapter.to_result(&folder, None, None);
        assert!(unexpanded.episodes.is_empty());
        assert_eq!(unexpanded.class, "video");

        let expanded = adapter.to_result(&folder, None, Some(&children));
        assert_eq!(expanded.episodes, vec!["quark:c1", "quark:c2"]);
        assert_eq!(expanded.episode_titles.len(), 2);
    }

    #[test]
    fn sizes_and_years_format() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(2 * 1024 * 1024 * 1024), "2.00 GB");
        assert_eq!(year_of(1_700_000_000_000), "2023");
        assert_eq!(year_of(0), UNKNOWN_YEAR);
    }

    #[tokio::test]
    async fn play_url_index_checked_before_credentials() {
        let adapter = adapter(None, None);
        assert!(matches!(
            adapter.get_play_url("quark:f1", 1).await,
            Err(Error::EpisodeIndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            adapter.get_play_url("quark:f1", 0).await,
            Err(Error::CredentialMissing(_))
        ));
    }

    #[tokio::test]
    async fn drive_detail_requires_credentials() {
        let adapter = adapter(None, None);
        assert!(matches!(
            adapter.get_detail("f1").await,
            Err(Error::CredentialMissing(_))
        ));
    }

    #[tokio::test]
    async fn unauthenticated_without_cookie_and_empty_search() {
        let adapter = adapter(None, None);
        assert!(!adapter.is_authenticated().await);
        assert!(adapter.search("x").await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_false() {
        let adapter = adapter(Some(Extension::Text("https://pan.quark.cn/s/aa".into())), Some("sid=1"));
        assert!(!adapter.is_authenticated().await);
        assert!(adapter.search("x").await.is_empty());
    }
}
