//! Turn a decoded subscription's site list into backend configs.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::adapter::netdrive::DEFAULT_API_BASE;
use crate::config::{BackendConfig, Extension, SourceType};

/// Site type tag for catalog APIs.
const CATALOG_SITE: i64 = 1;
/// Site type tag for cloud-drive sites.
const DRIVE_SITE: i64 = 3;

const CATALOG_MARKERS: &[&str] = &["api.php", "provide/vod", "?ac="];
const QUARK_MARKERS: &[&str] = &["quark", "夸克"];
const ALI_MARKERS: &[&str] = &["ali", "阿里", "aliyun"];

/// One entry of a subscription's `sites` array.
#[derive(Debug, Deserialize)]
struct SiteDescriptor {
    #[serde(default)]
    key: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    api: String,
    #[serde(default, rename = "type", deserialize_with = "site_type")]
    site_type: Option<i64>,
    #[serde(default)]
    ext: Option<Value>,
}

fn site_type<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Backend configs derived from every usable site in `doc`.
///
/// Sites missing a key, name or endpoint are skipped, as are sites of
/// unsupported or unrecognised kinds. Credentials are never copied.
#[must_use]
pub fn classify_sites(doc: &Value) -> Vec<BackendConfig> {
    let Some(sites) = doc.get("sites").and_then(Value::as_array) else {
        return Vec::new();
    };

    sites
        .iter()
        .filter_map(|raw| match SiteDescriptor::deserialize(raw) {
            Ok(site) => classify(site),
            Err(e) => {
                debug!("Skipping malformed site: {e}");
                None
            }
        })
        .collect()
}

fn classify(site: SiteDescriptor) -> Option<BackendConfig> {
    if site.key.is_empty() || site.name.is_empty() || site.api.is_empty() {
        return None;
    }

    match site.site_type {
        Some(CATALOG_SITE) if contains_any(&site.api, CATALOG_MARKERS) => Some(catalog(site)),
        Some(DRIVE_SITE) => {
            let api = site.api.to_lowercase();
            if contains_any(&api, QUARK_MARKERS) {
                Some(quark(site))
            } else {
                if contains_any(&api, ALI_MARKERS) {
                    debug!(key = %site.key, "Skipping unsupported drive site");
                }
                None
            }
        }
        _ => None,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn catalog(site: SiteDescriptor) -> BackendConfig {
    let mut config = BackendConfig::catalog(&site.key, &site.name, &site.api);
    config.detail = site
        .ext
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| e.starts_with("http"))
        .map(str::to_string);
    config.ext = site.ext.map(to_extension);
    config
}

fn quark(site: SiteDescriptor) -> BackendConfig {
    let structured = site.ext.as_ref().and_then(|ext| match ext {
        Value::String(s) => serde_json::from_str::<Value>(s).ok(),
        other => Some(other.clone()),
    });

    let share_links = structured.as_ref().and_then(|ext| {
        if let Some(urls) = ext.get("shareUrls").and_then(Value::as_array) {
            let links: Vec<&str> = urls.iter().filter_map(Value::as_str).collect();
            return Some(links.join("\n"));
        }
        ext.get("share_url").and_then(Value::as_str).map(str::to_string)
    });

    let ext = match (share_links, structured) {
        (Some(links), _) if !links.is_empty() => Some(Extension::Text(links)),
        (_, Some(Value::Object(mut map))) => {
            map.remove("cookie");
            Some(Extension::Structured(Value::Object(map)))
        }
        _ => site
            .ext
            .filter(|e| e.is_string())
            .map(to_extension),
    };

    BackendConfig {
        source_type: SourceType::Quark,
        ext,
        ..BackendConfig::catalog(&site.key, &site.name, DEFAULT_API_BASE)
    }
}

fn to_extension(value: Value) -> Extension {
    match value {
        Value::String(s) => Extension::Text(s),
        other => Extension::Structured(other),
    }
}
