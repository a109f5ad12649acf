//! Per-source ingestion: fetch, parse, filter.
//!
//! Each source goes through the same three steps:
//!
//! 1. **Fetch** the page or feed through a [`Fetch`] implementation
//! 2. **Parse** it with the parser for its format ([`html`] or [`rss`])
//! 3. **Filter** the candidates through a [`SourcePass`]: validation,
//!    duplicate suppression and the per-source cap
//!
//! The batch-wide step that turns accepted extractions into attributed
//! [`NewsItem`](crate::models::NewsItem)s lives in [`normalize`].
//!
//! # Failure Containment
//!
//! [`scrape_source`] never returns an error. A fetch or parse failure is
//! logged with the source id and a truncated reason, and the source simply
//! contributes nothing to the run.

pub mod html;
pub mod normalize;
pub mod rss;

use crate::fetch::Fetch;
use crate::models::RawExtraction;
use crate::sources::{SourceDescriptor, SourceFormat};
use crate::utils::truncate_for_log;
use tracing::{info, instrument, warn};

/// Longest error text written to the log for a failed source.
const MAX_REASON_CHARS: usize = 200;

/// Two titles are near-duplicates when their lengths differ by fewer than
/// five characters and one contains the other.
pub fn is_near_duplicate(a: &str, b: &str) -> bool {
    let (la, lb) = (a.chars().count(), b.chars().count());
    la.abs_diff(lb) < 5 && (a.contains(b) || b.contains(a))
}

/// Accumulates the accepted extractions of one source pass.
///
/// A candidate is dropped when it fails [`RawExtraction::is_valid`], when
/// its title exactly matches an already accepted title, or when it is a
/// near-duplicate of one (see [`is_near_duplicate`]). Once `max_items`
/// candidates are accepted the pass is full and refuses everything else.
#[derive(Debug)]
pub struct SourcePass {
    max_items: usize,
    accepted: Vec<RawExtraction>,
}

impl SourcePass {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            accepted: Vec::with_capacity(max_items),
        }
    }

    pub fn is_full(&self) -> bool {
        self.accepted.len() >= self.max_items
    }

    /// Offer a candidate; returns whether it was accepted.
    pub fn offer(&mut self, candidate: RawExtraction) -> bool {
        if self.is_full() || !candidate.is_valid() {
            return false;
        }
        let title = candidate.title.trim();
        let duplicate = self
            .accepted
            .iter()
            .any(|a| a.title == title || is_near_duplicate(&a.title, title));
        if duplicate {
            return false;
        }
        self.accepted.push(RawExtraction::new(title, candidate.link));
        true
    }

    pub fn finish(self) -> Vec<RawExtraction> {
        self.accepted
    }
}

/// Fetch, parse and filter a single source.
///
/// Returns the accepted extractions in page order, or an empty vector if the
/// source could not be fetched or parsed.
#[instrument(level = "info", skip_all, fields(source = %source.id))]
pub async fn scrape_source<F: Fetch>(fetcher: &F, source: &SourceDescriptor) -> Vec<RawExtraction> {
    let body = match fetcher.fetch(&source.url, source.fetch_kind()).await {
        Ok(body) => body,
        Err(e) => {
            warn!(
                source = %source.id,
                reason = %truncate_for_log(&e.to_string(), MAX_REASON_CHARS),
                "Fetch failed; source skipped"
            );
            return Vec::new();
        }
    };

    let extractions = match &source.format {
        SourceFormat::Html(_) => match html::parse(&body, source) {
            Ok(extractions) => extractions,
            Err(e) => {
                warn!(
                    source = %source.id,
                    reason = %truncate_for_log(&e.to_string(), MAX_REASON_CHARS),
                    "Parse failed; source skipped"
                );
                return Vec::new();
            }
        },
        SourceFormat::Rss => {
            let mut pass = SourcePass::new(source.max_items);
            for candidate in rss::parse(&body) {
                if pass.is_full() {
                    break;
                }
                pass.offer(candidate);
            }
            pass.finish()
        }
    };

    info!(
        source = %source.id,
        count = extractions.len(),
        "Scraped source"
    );
    extractions
}
