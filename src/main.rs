//! # Security News Digest
//!
//! A bot that collects the day's security headlines from a fixed set of news
//! sites and feeds, pulls the most recently added entries from the CISA
//! Known Exploited Vulnerabilities catalogue, and posts both as digests to a
//! Telegram chat.
//!
//! ## Usage
//!
//! ```sh
//! # Daemon: fire every day at 08:00 (+08:00)
//! TELEGRAM_TOKEN=... TELEGRAM_CHAT_ID=... secnews_digest
//!
//! # One manual run
//! secnews_digest --once
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: Sources are downloaded one at a time, paced apart
//! 2. **Extraction**: HTML selector rules or tolerant RSS/Atom parsing,
//!    filtered per source (validity, near-duplicates, cap)
//! 3. **Normalization**: Batch-wide attribution and title dedup
//! 4. **Output**: News and KEV digests in Telegram HTML, sent once each
//!
//! Any single source, the KEV feed, or a send may fail without stopping the
//! run. In daemon mode the process never exits because of a failed run.

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod error;
mod fetch;
mod kev;
mod models;
mod notify;
mod outputs;
mod pipeline;
mod scheduler;
mod scrapers;
mod sources;
mod utils;

use cli::Cli;
use fetch::HttpFetcher;
use notify::{Delivery, TelegramNotifier};
use outputs::digest::DigestStyle;
use pipeline::{Pipeline, PipelineConfig};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "secnews_digest starting up");

    let args = Cli::parse();
    debug!(
        once = args.once,
        at = %args.at,
        utc_offset = %args.utc_offset,
        sources = ?args.sources,
        "Parsed CLI arguments"
    );

    // --- Source registry ---
    let sources = match &args.sources {
        Some(path) => sources::load_sources(path).await?,
        None => sources::default_sources(),
    };

    // --- Delivery ---
    let delivery = match args.telegram() {
        Some((token, chat_id)) => {
            let notifier = TelegramNotifier::new(token)?.with_api_base(&args.telegram_api_base);
            Some(Delivery::new(notifier, chat_id))
        }
        None => {
            warn!("TELEGRAM_TOKEN or TELEGRAM_CHAT_ID not set; digests will only be logged");
            None
        }
    };

    let config = PipelineConfig {
        pace: Duration::from_millis(args.pace_ms),
        kev_url: (!args.no_vulns).then(|| args.kev_url.clone()),
        vuln_count: args.vuln_count,
        style: DigestStyle {
            title_cap: args.title_cap,
            offset: args.utc_offset,
            locale: args.locale,
            ..DigestStyle::default()
        },
    };

    let pipeline = Pipeline::new(HttpFetcher::new()?, sources, delivery, config);
    info!(
        sources = pipeline.sources().len(),
        delivery = pipeline.delivery_enabled(),
        "Pipeline ready"
    );

    if args.once {
        return run_once(&pipeline).await;
    }

    scheduler::run_daily(&pipeline, args.at, args.utc_offset).await;
    Ok(())
}

/// Manual mode: one run, failing the process if nothing useful happened.
async fn run_once(pipeline: &Pipeline<HttpFetcher, TelegramNotifier>) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    let Some(report) = pipeline.run().await else {
        return Err("a run is already in progress".into());
    };

    for (source, count) in &report.per_source {
        info!(source = %source, count, "Source summary");
    }
    info!(
        news = report.news_count(),
        vulnerabilities = report.vuln_count(),
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "Manual run finished"
    );

    if !pipeline.delivery_enabled() {
        info!(body = %report.news_message, "News digest (not sent)");
        if let Some(body) = &report.vuln_message {
            info!(body = %body, "Vulnerability digest (not sent)");
        }
    }

    if !report.is_healthy(pipeline.delivery_enabled()) {
        if report.news_count() == 0 {
            return Err("no news items could be collected".into());
        }
        return Err("news digest could not be delivered".into());
    }
    Ok(())
}
