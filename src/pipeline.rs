//! The orchestrator: one digest run from fetch to delivery.
//!
//! A run has two independent branches that are driven together:
//!
//! 1. **News**: every source is scraped strictly one after another, with a
//!    fixed pacing delay between consecutive fetches so upstream sites never
//!    see concurrent or bursty requests from us. The accepted extractions are
//!    normalized batch-wide, formatted and sent.
//! 2. **Vulnerabilities**: the KEV feed is fetched once, the most recent
//!    records are formatted and sent (nothing is sent when there are none).
//!
//! Neither branch can fail the run. A source that errors contributes zero
//! items; a failed send is logged and reported as `false`.
//!
//! Runs never overlap. A trigger that arrives while a run is in flight is
//! dropped with a warning.

use crate::fetch::Fetch;
use crate::kev;
use crate::models::{NewsItem, VulnerabilityRecord};
use crate::notify::{Delivery, Notifier};
use crate::outputs::digest::{DigestStyle, format_news, format_vulnerabilities};
use crate::scrapers::normalize::{SourceBatch, normalize};
use crate::scrapers::scrape_source;
use crate::sources::SourceDescriptor;
use crate::utils::truncate_for_log;
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Default delay between consecutive source fetches.
pub const DEFAULT_PACE: Duration = Duration::from_millis(800);

/// Tunables for a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Delay inserted between consecutive source fetches.
    pub pace: Duration,
    /// KEV catalogue location; `None` disables the vulnerability branch.
    pub kev_url: Option<String>,
    /// Number of KEV records to report.
    pub vuln_count: usize,
    pub style: DigestStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pace: DEFAULT_PACE,
            kev_url: Some(kev::KEV_FEED_URL.to_string()),
            vuln_count: kev::DEFAULT_RECENT,
            style: DigestStyle::default(),
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Accepted extraction count per source id, in fetch order.
    pub per_source: Vec<(String, usize)>,
    pub news: Vec<NewsItem>,
    pub vulnerabilities: Vec<VulnerabilityRecord>,
    pub news_message: String,
    pub vuln_message: Option<String>,
    pub news_sent: bool,
    pub vulns_sent: bool,
}

impl RunReport {
    pub fn news_count(&self) -> usize {
        self.news.len()
    }

    pub fn vuln_count(&self) -> usize {
        self.vulnerabilities.len()
    }

    /// Whether a manual run should be considered successful.
    ///
    /// Fails when no headline was collected at all, or when delivery is
    /// configured and the news digest could not be sent.
    pub fn is_healthy(&self, delivery_enabled: bool) -> bool {
        !self.news.is_empty() && (!delivery_enabled || self.news_sent)
    }
}

/// Owns everything a run needs: the fetcher, the source list, the optional
/// delivery target and the run guard.
pub struct Pipeline<F, N> {
    fetcher: F,
    sources: Vec<SourceDescriptor>,
    delivery: Option<Delivery<N>>,
    config: PipelineConfig,
    run_lock: Mutex<()>,
}

impl<F: Fetch, N: Notifier> Pipeline<F, N> {
    pub fn new(
        fetcher: F,
        sources: Vec<SourceDescriptor>,
        delivery: Option<Delivery<N>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            sources,
            delivery,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn delivery_enabled(&self) -> bool {
        self.delivery.is_some()
    }

    /// Scrape every source in order and return the normalized items along
    /// with the per-source accepted counts.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len()))]
    pub async fn fetch_all_news(&self) -> (Vec<NewsItem>, Vec<(String, usize)>) {
        let mut batches = Vec::with_capacity(self.sources.len());
        let mut per_source = Vec::with_capacity(self.sources.len());

        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 && !self.config.pace.is_zero() {
                sleep(self.config.pace).await;
            }
            let extractions = scrape_source(&self.fetcher, source).await;
            per_source.push((source.id.clone(), extractions.len()));
            batches.push(SourceBatch {
                source_name: source.display_name.clone(),
                extractions,
            });
        }

        let items = normalize(batches);
        info!(total = items.len(), "Collected news items");
        (items, per_source)
    }

    /// Execute one complete run. Returns `None` if another run was already
    /// in progress.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Option<RunReport> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("A run is already in progress; dropping this trigger");
            return None;
        };

        let t0 = Instant::now();
        info!("Digest run starting");

        let ((news, per_source, news_message, news_sent), (vulnerabilities, vuln_message, vulns_sent)) =
            futures::join!(self.news_branch(), self.vulnerability_branch());

        let report = RunReport {
            per_source,
            news,
            vulnerabilities,
            news_message,
            vuln_message,
            news_sent,
            vulns_sent,
        };

        info!(
            news = report.news_count(),
            vulnerabilities = report.vuln_count(),
            news_sent = report.news_sent,
            vulns_sent = report.vulns_sent,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Digest run complete"
        );
        Some(report)
    }

    async fn news_branch(&self) -> (Vec<NewsItem>, Vec<(String, usize)>, String, bool) {
        let (items, per_source) = self.fetch_all_news().await;
        let message = format_news(&items, &self.config.style, Utc::now());
        let sent = self.deliver("news", &message).await;
        (items, per_source, message, sent)
    }

    async fn vulnerability_branch(&self) -> (Vec<VulnerabilityRecord>, Option<String>, bool) {
        let Some(url) = self.config.kev_url.as_deref() else {
            debug!("Vulnerability branch disabled");
            return (Vec::new(), None, false);
        };

        let records = kev::fetch_recent(&self.fetcher, url, self.config.vuln_count).await;
        let message = format_vulnerabilities(&records, &self.config.style, Utc::now());
        let sent = match &message {
            Some(body) => self.deliver("vulnerabilities", body).await,
            None => {
                info!("No vulnerability records; nothing to send");
                false
            }
        };
        (records, message, sent)
    }

    /// Send one message; never fails the run.
    async fn deliver(&self, label: &str, body: &str) -> bool {
        let Some(delivery) = &self.delivery else {
            info!(label, chars = body.chars().count(), "Notifications disabled; digest not sent");
            debug!(label, body, "Digest body");
            return false;
        };

        match delivery.send(body).await {
            Ok(()) => {
                info!(label, "Digest sent");
                true
            }
            Err(e) => {
                error!(label, error = %truncate_for_log(&e.to_string(), 200), "Digest send failed");
                false
            }
        }
    }
}
