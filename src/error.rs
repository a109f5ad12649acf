//! Error types for the ingestion pipeline.
//!
//! Every failure a source can produce is contained at the source boundary:
//! the orchestrator logs it and continues with the next source. These types
//! exist so that the log lines (and tests) can tell the failure classes apart.
//!
//! | Class | Type |
//! |-------|------|
//! | Network (timeout, DNS, refused) | [`FetchError::Timeout`], [`FetchError::Network`] |
//! | Non-2xx status | [`FetchError::HttpStatus`] |
//! | Malformed markup / JSON | [`ParseError`] |
//! | Transport rejected a send | [`NotifyError`] |
//!
//! Validation failures (short titles, non-http links) are not errors at all;
//! offending items are filtered silently.

use std::time::Duration;
use thiserror::Error;

/// Failure while retrieving a remote document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),
}

/// Failure while interpreting a retrieved document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure while handing a digest to the notification channel.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected with status {status}: {description}")]
    Rejected { status: u16, description: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}

// The Bot API URL embeds the bot token, so it never reaches the message.
impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Transport(e.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(FetchError::HttpStatus(503).to_string(), "HTTP status 503");
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(10)).to_string(),
            "request timed out after 10s"
        );
    }

    #[test]
    fn test_parse_error_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let parse: ParseError = err.into();
        assert!(parse.to_string().starts_with("malformed JSON"));
    }

    #[test]
    fn test_notify_error_display() {
        let e = NotifyError::Rejected {
            status: 400,
            description: "Bad Request: chat not found".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "rejected with status 400: Bad Request: chat not found"
        );
    }
}
