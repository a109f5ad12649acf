//! Bounded-timeout retrieval of remote documents.
//!
//! All network access in the pipeline goes through the [`Fetch`] trait so
//! the orchestrator can be driven by canned responses in tests. The real
//! implementation, [`HttpFetcher`], wraps a single `reqwest::Client`.
//!
//! Sources reject or degrade requests that do not look like a browser, so
//! every request carries [`USER_AGENT`]. Timeouts depend on the payload:
//!
//! | Kind | Timeout |
//! |------|---------|
//! | HTML page | 10s |
//! | RSS feed | 15s |
//! | JSON feed | 30s |

use crate::error::FetchError;
use reqwest::header::ACCEPT;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Browser-like User-Agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// The shape of document being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Html,
    Rss,
    Json,
}

impl FetchKind {
    pub fn timeout(self) -> Duration {
        match self {
            FetchKind::Html => Duration::from_secs(10),
            FetchKind::Rss => Duration::from_secs(15),
            FetchKind::Json => Duration::from_secs(30),
        }
    }

    fn accept(self) -> &'static str {
        match self {
            FetchKind::Html => "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            FetchKind::Rss => "application/rss+xml,application/atom+xml,application/xml;q=0.9,*/*;q=0.8",
            FetchKind::Json => "application/json",
        }
    }
}

/// One attempt to retrieve a document as text.
///
/// Implementations must not panic; every failure comes back as a
/// [`FetchError`].
pub trait Fetch {
    async fn fetch(&self, url: &str, kind: FetchKind) -> Result<String, FetchError>;
}

/// [`Fetch`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str, kind: FetchKind) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let timeout = kind.timeout();

        let resp = self
            .client
            .get(url)
            .header(ACCEPT, kind.accept())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = resp.text().await.map_err(|e| classify(e, timeout))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched document"
        );
        Ok(body)
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        e.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_gets_longest_timeout() {
        assert!(FetchKind::Json.timeout() > FetchKind::Rss.timeout());
        assert!(FetchKind::Rss.timeout() > FetchKind::Html.timeout());
        assert_eq!(FetchKind::Html.timeout(), Duration::from_secs(10));
        assert_eq!(FetchKind::Json.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_user_agent_is_browser_like() {
        assert!(USER_AGENT.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_network_error() {
        let fetcher = HttpFetcher::new().unwrap();
        // Port 9 on localhost is the discard service; nothing listens there in CI.
        let err = fetcher
            .fetch("http://127.0.0.1:9/", FetchKind::Html)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_) | FetchError::Timeout(_)));
    }
}
