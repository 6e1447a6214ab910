//! Episode extraction for catalog records.
//!
//! Catalog backends pack every play source of a title into one string:
//!
//! ```text
//! E1$https://a/1.m3u8#E2$https://a/2.m3u8$$$E1$https://b/1.mp4
//! └── pair ──────────┘                   └─ group separator
//! ```
//!
//! Groups are separated by `$$$`, pairs by `#`, and each pair splits into
//! title and URL on `$`. Only the single largest group of streamable pairs
//! is kept.

use std::sync::LazyLock;

use regex::Regex;

const GROUP_DELIMITER: &str = "$$$";
const PAIR_DELIMITER: char = '#';
const FIELD_DELIMITER: char = '$';

/// Extension of a streamable playlist.
pub const STREAM_EXTENSION: &str = ".m3u8";

static STREAM_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\$?(https?://[^"'\s]+?\.m3u8)"#).unwrap());

/// Ordered playable references with their (optional) titles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    pub episodes: Vec<String>,
    pub titles: Vec<String>,
}

impl Playlist {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.episodes.len()
    }
}

/// Pick the group with the most streamable `title$url` pairs.
///
/// Smaller groups are discarded, never merged. On a tie the earlier group
/// wins.
#[must_use]
pub fn extract_largest_group(play_url: &str) -> Playlist {
    let mut best = Playlist::default();

    for group in play_url.split(GROUP_DELIMITER) {
        let candidate = parse_group(group);
        if candidate.len() > best.len() {
            best = candidate;
        }
    }

    best
}

fn parse_group(group: &str) -> Playlist {
    let mut playlist = Playlist::default();

    for pair in group.split(PAIR_DELIMITER) {
        let fields: Vec<&str> = pair.split(FIELD_DELIMITER).collect();
        if let [title, url] = fields.as_slice() {
            if url.ends_with(STREAM_EXTENSION) {
                playlist.titles.push((*title).to_string());
                playlist.episodes.push((*url).to_string());
            }
        }
    }

    playlist
}

/// Scan free text for streamable links.
///
/// Each match becomes one episode, titled by its 1-based position.
#[must_use]
pub fn scan_stream_links(content: &str) -> Playlist {
    let episodes: Vec<String> = STREAM_LINK
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();

    Playlist {
        titles: numbered_titles(episodes.len()),
        episodes,
    }
}

/// Structured field first, free-text content as fallback.
#[must_use]
pub fn extract_episodes(play_url: Option<&str>, content: Option<&str>) -> Playlist {
    let playlist = play_url.map(extract_largest_group).unwrap_or_default();
    if !playlist.is_empty() {
        return playlist;
    }
    content.map(scan_stream_links).unwrap_or_default()
}

/// `["1", "2", …, "n"]`
#[must_use]
pub fn numbered_titles(n: usize) -> Vec<String> {
    (1..=n).map(|i| i.to_string()).collect()
}
