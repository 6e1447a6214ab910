//! Detail-page scraping for catalog backends without a JSON detail API.
//!
//! Every field is best effort: anything not found comes back empty (or
//! `unknown` for the year) instead of failing the call.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::playlist::numbered_titles;
use crate::model::UNKNOWN_YEAR;

/// Backend whose pages carry date-stamped `index.m3u8` links.
const DATED_INDEX_SOURCE: &str = "ffzy";

static DATED_INDEX_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$(https?://[^"'\s]+?/\d{8}/\d+_[a-f0-9]+/index\.m3u8)"#).unwrap()
});
static STREAM_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\$(https?://[^"'\s]+?\.m3u8)"#).unwrap());
static COVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(https?://[^"'\s]+?\.jpg)"#).unwrap());
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">(\d{4})<").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Fields recovered from a detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedDetail {
    pub title: String,
    pub desc: String,
    pub cover: String,
    pub year: String,
    pub episodes: Vec<String>,
    pub episode_titles: Vec<String>,
}

/// Detail page URL for `id` under a page base.
#[must_use]
pub fn detail_page_url(base: &str, id: &str) -> String {
    format!("{}/index.php/vod/detail/id/{id}.html", base.trim_end_matches('/'))
}

/// Scrape a detail page served by backend `source_key`.
#[must_use]
pub fn scrape_detail(html: &str, source_key: &str) -> ScrapedDetail {
    let episodes = stream_links(html, source_key);
    let document = Html::parse_document(html);

    ScrapedDetail {
        title: first_text(&document, "h1"),
        desc: first_inner_html(&document, "div.sketch")
            .map(|inner| clean_html(&inner))
            .unwrap_or_default(),
        cover: COVER
            .find(html)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        year: YEAR
            .captures(html)
            .and_then(|c| c.get(1))
            .map_or_else(|| UNKNOWN_YEAR.to_string(), |m| m.as_str().to_string()),
        episode_titles: numbered_titles(episodes.len()),
        episodes,
    }
}

/// `$`-prefixed stream links, deduplicated in page order, with trailing
/// `(…)` annotations cut off.
fn stream_links(html: &str, source_key: &str) -> Vec<String> {
    let mut links: Vec<&str> = Vec::new();
    if source_key == DATED_INDEX_SOURCE {
        links = captures(&DATED_INDEX_LINK, html);
    }
    if links.is_empty() {
        links = captures(&STREAM_LINK, html);
    }

    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(*link))
        .map(|link| match link.find('(') {
            Some(i) if i > 0 => link[..i].to_string(),
            _ => link.to_string(),
        })
        .collect()
}

fn captures<'a>(re: &Regex, html: &'a str) -> Vec<&'a str> {
    re.captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

fn first_text(document: &Html, selector: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn first_inner_html(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(|el| el.inner_html())
}

/// Strip markup from a catalog description and collapse whitespace.
#[must_use]
pub fn clean_html(fragment: &str) -> String {
    if fragment.is_empty() {
        return String::new();
    }
    let text: String = Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}
