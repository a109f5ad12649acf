//! The source registry.
//!
//! A source is described entirely by data: where to fetch it, which format
//! it is in, and (for HTML pages) which selectors pick out the headlines.
//! No source carries code of its own, so the registry can be loaded from a
//! YAML file and every rule can be tested against a fixture in isolation.
//!
//! # Built-in Sources
//!
//! | Id | Format | Notes |
//! |----|--------|-------|
//! | `bleepingcomputer` | HTML | Front page listing |
//! | `thehackernews` | HTML | Front page story list |
//! | `securityweek` | HTML | Views rows |
//! | `ithome` | HTML | Taiwanese IT news front page |
//! | `ithome-security` | HTML | iThome security category |
//! | `krebsonsecurity` | RSS | WordPress feed |
//! | `darkreading` | RSS | Site-wide feed |
//!
//! # YAML Shape
//!
//! ```yaml
//! - id: securityweek
//!   display_name: SecurityWeek
//!   url: https://www.securityweek.com/
//!   format:
//!     kind: html
//!     item_selector: .views-row
//!     title_selector: h2 a
//!     link_selector: h2 a
//! - id: krebsonsecurity
//!   display_name: Krebs on Security
//!   url: https://krebsonsecurity.com/feed/
//!   max_items: 3
//!   format:
//!     kind: rss
//! ```

use crate::fetch::FetchKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::{info, instrument};
use url::Url;

/// Default per-source cap on accepted headlines.
pub const DEFAULT_MAX_ITEMS: usize = 5;

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

/// Selector rule for an HTML listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlRule {
    /// Selects one node per story on the listing page.
    pub item_selector: String,
    /// Selects the headline inside a story node.
    pub title_selector: String,
    /// Selects the anchor carrying the story link inside a story node.
    pub link_selector: String,
    /// Base used to resolve relative links; the origin of the page URL when
    /// absent.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// How a source is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceFormat {
    Html(HtmlRule),
    Rss,
}

/// One configured news source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Stable identifier used in logs.
    pub id: String,
    /// Name shown as the section heading in the digest.
    pub display_name: String,
    /// Page or feed to fetch.
    pub url: String,
    pub format: SourceFormat,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl SourceDescriptor {
    pub fn html(id: &str, display_name: &str, url: &str, rule: HtmlRule) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            url: url.to_string(),
            format: SourceFormat::Html(rule),
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    pub fn rss(id: &str, display_name: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            url: url.to_string(),
            format: SourceFormat::Rss,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    pub fn fetch_kind(&self) -> FetchKind {
        match self.format {
            SourceFormat::Html(_) => FetchKind::Html,
            SourceFormat::Rss => FetchKind::Rss,
        }
    }

    /// URL that relative links on this source are resolved against: the
    /// rule's `base_url` when set, otherwise the origin of `url`.
    pub fn base_url(&self) -> Option<Url> {
        if let SourceFormat::Html(HtmlRule {
            base_url: Some(base),
            ..
        }) = &self.format
        {
            return Url::parse(base).ok();
        }
        Url::parse(&self.url).ok()?.join("/").ok()
    }
}

fn rule(item: &str, title: &str, link: &str) -> HtmlRule {
    HtmlRule {
        item_selector: item.to_string(),
        title_selector: title.to_string(),
        link_selector: link.to_string(),
        base_url: None,
    }
}

/// The built-in source catalogue, in fetch order.
pub fn default_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::html(
            "bleepingcomputer",
            "BleepingComputer",
            "https://www.bleepingcomputer.com/",
            rule(".news-listing .news-summary", "a.news-link", "a.news-link"),
        ),
        SourceDescriptor::html(
            "thehackernews",
            "The Hacker News",
            "https://thehackernews.com/",
            rule(".story-list .story", "h2.title a", "h2.title a"),
        ),
        SourceDescriptor::html(
            "securityweek",
            "SecurityWeek",
            "https://www.securityweek.com/",
            rule(".views-row", "h2 a", "h2 a"),
        ),
        SourceDescriptor::html(
            "ithome",
            "iThome",
            "https://www.ithome.com.tw/",
            rule(".news-list .news-item", "h3 a", "h3 a"),
        ),
        SourceDescriptor::html(
            "ithome-security",
            "iThome 資安",
            "https://www.ithome.com.tw/category/security",
            rule(".news-list .news-item", "h3 a", "h3 a"),
        ),
        SourceDescriptor::rss(
            "krebsonsecurity",
            "Krebs on Security",
            "https://krebsonsecurity.com/feed/",
        ),
        SourceDescriptor::rss(
            "darkreading",
            "Dark Reading",
            "https://www.darkreading.com/rss.xml",
        ),
    ]
}

/// Parse a YAML source list and check that every entry is usable.
pub fn parse_sources(yaml: &str) -> Result<Vec<SourceDescriptor>, Box<dyn Error>> {
    let sources: Vec<SourceDescriptor> = serde_yaml::from_str(yaml)?;
    if sources.is_empty() {
        return Err("source list is empty".into());
    }
    for source in &sources {
        Url::parse(&source.url)
            .map_err(|e| format!("source `{}` has invalid url `{}`: {}", source.id, source.url, e))?;
        if source.max_items == 0 {
            return Err(format!("source `{}` has max_items = 0", source.id).into());
        }
    }
    Ok(sources)
}

/// Load the source list from a YAML file.
#[instrument(level = "info")]
pub async fn load_sources(path: &str) -> Result<Vec<SourceDescriptor>, Box<dyn Error>> {
    let yaml = tokio::fs::read_to_string(path).await?;
    let sources = parse_sources(&yaml)?;
    info!(count = sources.len(), path, "Loaded source registry");
    Ok(sources)
}
