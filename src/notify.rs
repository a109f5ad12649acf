//! Delivery of formatted digests to a chat.
//!
//! The pipeline only knows the [`Notifier`] trait. [`TelegramNotifier`] is
//! the production implementation, posting to the Bot API's `sendMessage`
//! with HTML parse mode. A send is attempted exactly once; failures are
//! returned to the caller, which logs them and moves on.

use crate::error::NotifyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Public Bot API server.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Something that can deliver a message body to a chat.
pub trait Notifier {
    async fn send(&self, chat_id: &str, body: &str) -> Result<(), NotifyError>;
}

impl<T: Notifier> Notifier for &T {
    async fn send(&self, chat_id: &str, body: &str) -> Result<(), NotifyError> {
        (**self).send(chat_id, body).await
    }
}

/// A notifier bound to the chat it delivers to.
#[derive(Debug, Clone)]
pub struct Delivery<N> {
    pub notifier: N,
    pub chat_id: String,
}

impl<N: Notifier> Delivery<N> {
    pub fn new(notifier: N, chat_id: impl Into<String>) -> Self {
        Self {
            notifier,
            chat_id: chat_id.into(),
        }
    }

    pub async fn send(&self, body: &str) -> Result<(), NotifyError> {
        self.notifier.send(&self.chat_id, body).await
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// [`Notifier`] for the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            token: token.into(),
            api_base: TELEGRAM_API_BASE.to_string(),
        })
    }

    /// Point the notifier at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

impl Notifier for TelegramNotifier {
    #[instrument(level = "info", skip_all, fields(%chat_id, chars = body.chars().count()))]
    async fn send(&self, chat_id: &str, body: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id,
            text: body,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let resp = self.client.post(self.endpoint()).json(&payload).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let parsed: Option<BotApiResponse> = serde_json::from_str(&text).ok();

        match parsed {
            Some(r) if status.is_success() && r.ok => {
                debug!("Telegram accepted message");
                Ok(())
            }
            other => Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| crate::utils::truncate_for_log(&text, 200)),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = SendMessage {
            chat_id: "-100123",
            text: "<b>hi</b>",
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["chat_id"], "-100123");
        assert_eq!(json["parse_mode"], "HTML");
        assert_eq!(json["disable_web_page_preview"], true);
    }

    #[test]
    fn test_debug_redacts_token() {
        let n = TelegramNotifier::new("123456:SECRET").unwrap();
        let dbg = format!("{:?}", n);
        assert!(!dbg.contains("SECRET"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_endpoint() {
        let n = TelegramNotifier::new("123:abc")
            .unwrap()
            .with_api_base("http://localhost:8081/");
        assert_eq!(n.endpoint(), "http://localhost:8081/bot123:abc/sendMessage");
    }

    #[test]
    fn test_error_response_parses() {
        let r: BotApiResponse =
            serde_json::from_str(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#)
                .unwrap();
        assert!(!r.ok);
        assert_eq!(r.description.as_deref(), Some("Bad Request: chat not found"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let n = TelegramNotifier::new("1:x")
            .unwrap()
            .with_api_base("http://127.0.0.1:9");
        let err = n.send("42", "hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_token() {
        let n = TelegramNotifier::new("123456:SUPERSECRETTOKEN")
            .unwrap()
            .with_api_base("http://127.0.0.1:9");
        let err = n.send("42", "hello").await.unwrap_err();
        let text = err.to_string();
        assert!(!text.contains("SUPERSECRETTOKEN"), "token leaked: {text}");
        assert!(!format!("{err:?}").contains("SUPERSECRETTOKEN"));
    }
}
