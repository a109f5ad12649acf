//! Batch-wide normalization of accepted extractions into [`NewsItem`]s.

use crate::models::{NewsItem, RawExtraction};
use itertools::Itertools;

/// The accepted extractions of one source, tagged with its display name.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source_name: String,
    pub extractions: Vec<RawExtraction>,
}

/// Attribute every extraction to its source and build the run's item list.
///
/// Order is source order, then extraction order. A title that already
/// appeared earlier in the run (from any source) is dropped, as is anything
/// that does not satisfy the [`NewsItem`] invariants.
pub fn normalize(batches: Vec<SourceBatch>) -> Vec<NewsItem> {
    batches
        .into_iter()
        .flat_map(|batch| {
            let source_name = batch.source_name;
            batch
                .extractions
                .into_iter()
                .filter_map(move |raw| NewsItem::new(&raw.title, &raw.link, &source_name))
        })
        .unique_by(|item| item.title.clone())
        .collect()
}
