//! Tolerant RSS/Atom headline extraction.
//!
//! Feeds in the wild are frequently not well-formed XML (stray `&`, HTML
//! entities XML does not define, truncated documents). A strict parser would
//! reject the whole feed, so this module scans for `<item>` segments with
//! regular expressions instead and pulls the title and link out of each.
//!
//! Link shapes tried, in order:
//! 1. inner text of `<link>...</link>` (RSS 2.0)
//! 2. `href="..."` (Atom)
//! 3. `href='...'` (Atom, single-quoted)
//!
//! Atom `<entry>` segments are scanned only if the document has no `<item>`.
//! Items whose title is too short, equals the literal `undefined`, or whose
//! link is not http(s) are dropped. Segments that match none of the patterns
//! are skipped silently.

use crate::models::{MIN_TITLE_CHARS, RawExtraction};
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").unwrap());
static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<entry\b[^>]*>(.*?)</entry>").unwrap());
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap());
static LINK_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<link(?:\s[^>/]*)?>(.*?)</link>").unwrap());
static HREF_DQ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href="([^"]+)""#).unwrap());
static HREF_SQ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"href='([^']+)'").unwrap());
static CDATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());

/// Extract every acceptable (title, link) pair from a feed, in feed order.
///
/// Pure and deterministic: the same input always yields the same output.
/// Garbage input yields an empty vector.
pub fn parse(xml: &str) -> Vec<RawExtraction> {
    let mut segments: Vec<&str> = ITEM_RE
        .captures_iter(xml)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if segments.is_empty() {
        segments = ENTRY_RE
            .captures_iter(xml)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
    }

    let total = segments.len();
    let out: Vec<RawExtraction> = segments.into_iter().filter_map(parse_segment).collect();
    debug!(segments = total, accepted = out.len(), "Parsed feed");
    out
}

fn parse_segment(segment: &str) -> Option<RawExtraction> {
    let title = TITLE_RE
        .captures(segment)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))?;
    let link = extract_link(segment)?;

    if title.chars().count() <= MIN_TITLE_CHARS || title == "undefined" || !link.starts_with("http")
    {
        return None;
    }
    Some(RawExtraction::new(title, link))
}

fn extract_link(segment: &str) -> Option<String> {
    let from_text = LINK_TEXT_RE
        .captures(segment)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|s| !s.is_empty());
    from_text
        .or_else(|| capture(&HREF_DQ_RE, segment))
        .or_else(|| capture(&HREF_SQ_RE, segment))
}

fn capture(re: &Regex, segment: &str) -> Option<String> {
    re.captures(segment)
        .and_then(|c| c.get(1))
        .map(|m| unescape(m.as_str().trim()))
}

/// Unwrap CDATA, decode XML entities and collapse whitespace.
fn clean_text(raw: &str) -> String {
    let unwrapped = CDATA_RE.replace_all(raw, "$1");
    collapse_whitespace(&unescape(&unwrapped))
}

/// Decode XML entities, leaving the text untouched if it contains an
/// entity XML does not define.
fn unescape(raw: &str) -> String {
    quick_xml::escape::unescape(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
