//! Selector-driven headline extraction from HTML listing pages.
//!
//! The primary path applies the source's [`HtmlRule`]: the item selector
//! enumerates story nodes, the title selector picks the headline text (or
//! its `title` attribute when the text is empty) and the link selector
//! picks the anchor.
//!
//! When the item selector matches nothing, usually because the site changed
//! its markup, the page is re-scanned with a generic set of article
//! container patterns. Within each container the first heading (or the
//! container's own text, capped at [`FALLBACK_TITLE_CHARS`]) becomes the
//! title and the first anchor's `href` the link.
//!
//! Relative links are resolved against [`SourceDescriptor::base_url`].

use super::SourcePass;
use crate::error::ParseError;
use crate::models::RawExtraction;
use crate::sources::{HtmlRule, SourceDescriptor, SourceFormat};
use crate::utils::{collapse_whitespace, take_chars};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Cap on fallback titles taken from a container's full text.
pub const FALLBACK_TITLE_CHARS: usize = 100;

static FALLBACK_CONTAINERS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"article, .post, .entry, .news-item, .story, .card, [class*="article"]"#,
    )
    .unwrap()
});
static FALLBACK_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Extract up to `source.max_items` headlines from `markup`.
///
/// Returns an error only when one of the source's own selectors does not
/// compile. Individual story nodes that lack a usable title or link are
/// skipped.
pub fn parse(markup: &str, source: &SourceDescriptor) -> Result<Vec<RawExtraction>, ParseError> {
    let document = Html::parse_document(markup);
    let base = source.base_url();
    let mut pass = SourcePass::new(source.max_items);

    let mut matched = 0usize;
    if let SourceFormat::Html(rule) = &source.format {
        let compiled = CompiledRule::new(rule)?;
        for node in document.select(&compiled.item) {
            matched += 1;
            if pass.is_full() {
                break;
            }
            if let Some(candidate) = compiled.extract(node, base.as_ref()) {
                pass.offer(candidate);
            }
        }
    }

    if matched == 0 {
        debug!(source = %source.id, "Primary selector matched nothing; scanning generic containers");
        for node in document.select(&FALLBACK_CONTAINERS) {
            if pass.is_full() {
                break;
            }
            if let Some(candidate) = extract_fallback(node, base.as_ref()) {
                pass.offer(candidate);
            }
        }
    }

    Ok(pass.finish())
}

struct CompiledRule {
    item: Selector,
    title: Selector,
    link: Selector,
}

impl CompiledRule {
    fn new(rule: &HtmlRule) -> Result<Self, ParseError> {
        Ok(Self {
            item: compile(&rule.item_selector)?,
            title: compile(&rule.title_selector)?,
            link: compile(&rule.link_selector)?,
        })
    }

    fn extract(&self, node: ElementRef<'_>, base: Option<&Url>) -> Option<RawExtraction> {
        let title_el = node.select(&self.title).next()?;
        let mut title = element_text(title_el);
        if title.is_empty() {
            title = collapse_whitespace(title_el.value().attr("title")?);
        }

        let href = node
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .or_else(|| node.value().attr("href"))?;
        let link = resolve_link(base, href)?;

        Some(RawExtraction::new(title, link))
    }
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn extract_fallback(node: ElementRef<'_>, base: Option<&Url>) -> Option<RawExtraction> {
    let title = node
        .select(&FALLBACK_HEADING)
        .map(element_text)
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| take_chars(&element_text(node), FALLBACK_TITLE_CHARS));

    let href = node.select(&ANCHOR).next()?.value().attr("href")?;
    let link = resolve_link(base, href)?;
    Some(RawExtraction::new(title, link))
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Resolve `href` to an absolute http(s) URL.
pub fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
