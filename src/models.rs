//! Data models for one digest run.
//!
//! This module defines the record types that flow through the pipeline:
//! - [`RawExtraction`]: a (title, link) pair straight out of a parser
//! - [`NewsItem`]: a validated headline attributed to its source
//! - [`VulnerabilityRecord`]: one entry of the known-exploited vulnerability feed
//! - [`Digest`]: news items grouped by source, ready for formatting
//!
//! Nothing here outlives a run. There is no identity across runs and no
//! persistence; every value is rebuilt from scratch on each invocation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Titles must be strictly longer than this many characters.
pub const MIN_TITLE_CHARS: usize = 10;

/// A raw (title, link) pair produced by a format parser.
///
/// The link may still be relative at this point for HTML sources; it is
/// resolved before the extraction leaves the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtraction {
    /// Headline text with whitespace collapsed.
    pub title: String,
    /// Absolute link to the story.
    pub link: String,
}

impl RawExtraction {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
        }
    }

    /// True when the title is long enough and the link is an http(s) URL.
    pub fn is_valid(&self) -> bool {
        self.title.trim().chars().count() > MIN_TITLE_CHARS && self.link.starts_with("http")
    }
}

/// A validated headline attributed to the source that produced it.
///
/// Invariants (enforced by [`NewsItem::new`]):
/// - `title` has more than [`MIN_TITLE_CHARS`] characters
/// - `url` starts with `http`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub source_name: String,
}

impl NewsItem {
    /// Build an item, returning `None` if the title or URL is not acceptable.
    pub fn new(title: &str, url: &str, source_name: &str) -> Option<Self> {
        let title = title.trim();
        if title.chars().count() <= MIN_TITLE_CHARS || !url.starts_with("http") {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            url: url.to_string(),
            source_name: source_name.to_string(),
        })
    }
}

/// One known-exploited vulnerability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    /// CVE identifier, e.g. `CVE-2024-3400`.
    pub cve_id: String,
    /// Vendor and product joined by a space, e.g. `Palo Alto Networks PAN-OS`.
    pub vendor_product: String,
    /// Human-readable vulnerability name.
    pub description: String,
    pub date_added: NaiveDate,
    pub due_date: NaiveDate,
    /// Link to the NVD detail page.
    pub reference_url: String,
}

/// A block of headlines from a single source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSection {
    pub source_name: String,
    pub items: Vec<NewsItem>,
}

/// News items grouped by source.
///
/// Sections appear in the order their source was first seen in the input,
/// and items keep their relative order within a section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digest {
    pub sections: Vec<DigestSection>,
}

impl Digest {
    pub fn from_items(items: &[NewsItem]) -> Self {
        let mut sections: Vec<DigestSection> = Vec::new();
        for item in items {
            match sections
                .iter_mut()
                .find(|s| s.source_name == item.source_name)
            {
                Some(section) => section.items.push(item.clone()),
                None => sections.push(DigestSection {
                    source_name: item.source_name.clone(),
                    items: vec![item.clone()],
                }),
            }
        }
        Self { sections }
    }

    /// Total number of items across all sections.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, source: &str) -> NewsItem {
        NewsItem::new(title, "https://example.com/story", source).unwrap()
    }

    #[test]
    fn test_news_item_rejects_short_title() {
        assert!(NewsItem::new("Too short", "https://example.com", "A").is_none());
        assert!(NewsItem::new("exactly10c", "https://example.com", "A").is_none());
        assert!(NewsItem::new("Eleven char", "https://example.com", "A").is_some());
    }

    #[test]
    fn test_news_item_rejects_non_http_url() {
        assert!(NewsItem::new("A perfectly fine headline", "/relative/path", "A").is_none());
        assert!(NewsItem::new("A perfectly fine headline", "ftp://host/file", "A").is_none());
    }

    #[test]
    fn test_news_item_trims_title() {
        let item = NewsItem::new("   Ransomware gang hits hospital  ", "https://x.io", "A").unwrap();
        assert_eq!(item.title, "Ransomware gang hits hospital");
    }

    #[test]
    fn test_raw_extraction_validity() {
        assert!(RawExtraction::new("Critical flaw in VPN appliance", "https://a.b/c").is_valid());
        assert!(!RawExtraction::new("Short", "https://a.b/c").is_valid());
        assert!(!RawExtraction::new("Critical flaw in VPN appliance", "mailto:x@y").is_valid());
    }

    #[test]
    fn test_digest_groups_in_first_seen_order() {
        let items = vec![
            item("Alpha headline number one", "Alpha"),
            item("Beta headline number one", "Beta"),
            item("Alpha headline number two", "Alpha"),
        ];
        let digest = Digest::from_items(&items);
        assert_eq!(digest.sections.len(), 2);
        assert_eq!(digest.sections[0].source_name, "Alpha");
        assert_eq!(digest.sections[0].items.len(), 2);
        assert_eq!(digest.sections[0].items[1].title, "Alpha headline number two");
        assert_eq!(digest.sections[1].source_name, "Beta");
        assert_eq!(digest.len(), 3);
    }

    #[test]
    fn test_empty_digest() {
        let digest = Digest::from_items(&[]);
        assert!(digest.is_empty());
        assert_eq!(digest.len(), 0);
    }

    #[test]
    fn test_vulnerability_record_serialization() {
        let rec = VulnerabilityRecord {
            cve_id: "CVE-2024-3400".to_string(),
            vendor_product: "Palo Alto Networks PAN-OS".to_string(),
            description: "PAN-OS Command Injection Vulnerability".to_string(),
            date_added: NaiveDate::from_ymd_opt(2024, 4, 12).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 4, 19).unwrap(),
            reference_url: "https://nvd.nist.gov/vuln/detail/CVE-2024-3400".to_string(),
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("2024-04-12"));
        let back: VulnerabilityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
