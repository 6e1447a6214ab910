//! Subscription document decoding cascade.
//!
//! Subscription payloads arrive in whatever shape their publisher chose:
//! plain JSON, JSON with comments, base64 text, or base64 appended to a
//! JPEG. Each stage below is a pure `bytes -> Option<Document>` heuristic;
//! [`decode`] runs them in order and keeps the first document that has a
//! `sites` array.

use std::borrow::Cow;
use std::sync::LazyLock;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// A parsed subscription document.
pub type Document = Value;

/// One decoding heuristic.
pub type Stage = fn(&[u8]) -> Option<Document>;

/// Stages in the order they are tried.
pub const STAGES: &[(&str, Stage)] = &[
    ("direct", parse_direct),
    ("image-embedded", parse_image_embedded),
    ("base64-line", parse_base64_lines),
    ("base64-blob", parse_base64_blob),
    ("last-brace", parse_from_last_brace),
];

/// Field every subscription document must carry.
pub const SITE_LIST_FIELD: &str = "sites";

/// Encoded blobs shorter than this are not worth decoding.
const MIN_ENCODED_LEN: usize = 100;

/// Upper bound on decode attempts in the line scan.
const MAX_LINE_ATTEMPTS: usize = 16;

/// JPEG end-of-image marker.
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// An opening brace followed by a quoted key, allowing comments between.
static DOCUMENT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)\{(?:\s+|//[^\n]*\n|/\*.*?\*/)*""#).unwrap());

/// Forgiving base64: padding optional, trailing bits tolerated.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Run every stage; the first document with a site list wins.
pub fn decode(bytes: &[u8]) -> Result<Document> {
    first_success(bytes, STAGES)
        .map(|(stage, doc)| {
            debug!(stage, "Subscription decoded");
            doc
        })
        .ok_or_else(|| {
            Error::UnparseableSubscription(format!(
                "no stage found a '{SITE_LIST_FIELD}' list in {} bytes",
                bytes.len()
            ))
        })
}

/// First-success-wins combinator over `stages`.
#[must_use]
pub fn first_success(bytes: &[u8], stages: &[(&'static str, Stage)]) -> Option<(&'static str, Document)> {
    stages
        .iter()
        .find_map(|(name, stage)| stage(bytes).map(|doc| (*name, doc)))
}

/// Whether `doc` carries a site list.
#[must_use]
pub fn has_site_list(doc: &Document) -> bool {
    doc.get(SITE_LIST_FIELD).is_some_and(Value::is_array)
}

/// Stage 1: the whole payload is the document.
#[must_use]
pub fn parse_direct(bytes: &[u8]) -> Option<Document> {
    let text = std::str::from_utf8(bytes).ok()?;
    parse_document(text)
}

/// Stage 2: base64 document hidden after a JPEG's end-of-image marker.
#[must_use]
pub fn parse_image_embedded(bytes: &[u8]) -> Option<Document> {
    let end = bytes.windows(2).rposition(|w| w == JPEG_EOI)?;
    let tail = &bytes[end + JPEG_EOI.len()..];

    let encoded = base64_bytes(tail);
    if encoded.len() <= MIN_ENCODED_LEN {
        return None;
    }

    let decoded = decode_base64(&encoded)?;
    let decoded = String::from_utf8_lossy(&decoded);
    let start = DOCUMENT_START.find(&decoded)?.start();
    parse_document(&strip_comments(&decoded[start..]))
}

/// Stage 3: a long base64 line, scanning from the end of the payload.
#[must_use]
pub fn parse_base64_lines(bytes: &[u8]) -> Option<Document> {
    let text = String::from_utf8_lossy(bytes);
    text.lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.len() >= MIN_ENCODED_LEN && line.bytes().all(is_base64_byte))
        .take(MAX_LINE_ATTEMPTS)
        .find_map(|line| {
            let decoded = decode_base64(line.as_bytes())?;
            parse_document(&String::from_utf8_lossy(&decoded))
        })
}

/// Stage 4: the whole payload is one base64 blob.
#[must_use]
pub fn parse_base64_blob(bytes: &[u8]) -> Option<Document> {
    let decoded = decode_base64(&base64_bytes(bytes))?;
    parse_document(&String::from_utf8_lossy(&decoded))
}

/// Stage 5: a document appended after other data, starting at the last `{`.
#[must_use]
pub fn parse_from_last_brace(bytes: &[u8]) -> Option<Document> {
    let text = String::from_utf8_lossy(bytes);
    let start = text.rfind('{')?;
    parse_document(&text[start..])
}

/// Strict JSON first, then the comment-tolerant parser. Only documents
/// with a site list count.
fn parse_document(text: &str) -> Option<Document> {
    let text = text.trim_start_matches('\u{feff}').trim();
    let doc = serde_json::from_str::<Value>(text)
        .ok()
        .or_else(|| json5::from_str::<Value>(text).ok())?;
    has_site_list(&doc).then_some(doc)
}

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')
}

/// Keep only base64 alphabet bytes, dropping line breaks and binary noise.
fn base64_bytes(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().copied().filter(|b| is_base64_byte(*b)).collect()
}

/// Decode up to the first padding character, tolerating a ragged tail.
fn decode_base64(encoded: &[u8]) -> Option<Vec<u8>> {
    let body = encoded.split(|b| *b == b'=').next().unwrap_or_default();
    // A lone trailing sextet cannot encode a byte.
    let usable = if body.len() % 4 == 1 { body.len() - 1 } else { body.len() };
    LENIENT_BASE64.decode(&body[..usable]).ok()
}

/// Remove `//` and `/* */` comments outside string literals.
#[must_use]
pub fn strip_comments(text: &str) -> Cow<'_, str> {
    if !text.contains("//") && !text.contains("/*") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    Cow::Owned(out)
}
