//! Command-line interface definitions.
//!
//! Every option can be given as a flag or, where it carries a secret or a
//! deployment-specific value, through an environment variable.

use crate::outputs::digest::Locale;
use chrono::{FixedOffset, NaiveTime};
use clap::Parser;

/// Command-line arguments for the security digest bot.
///
/// # Examples
///
/// ```sh
/// # Daemon mode, daily at 08:00 (+08:00)
/// TELEGRAM_TOKEN=123:abc TELEGRAM_CHAT_ID=-1001234 secnews_digest
///
/// # One manual run, printing the digest to the log only
/// secnews_digest --once
///
/// # Custom schedule and source list
/// secnews_digest --at 07:30 --utc-offset +09:00 --sources sources.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Telegram bot token; sends are disabled without it
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Bot API server, for a self-hosted Telegram Bot API instance
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = crate::notify::TELEGRAM_API_BASE)]
    pub telegram_api_base: String,

    /// Telegram chat to deliver digests to
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_hyphen_values = true)]
    pub telegram_chat_id: Option<String>,

    /// Run once and exit instead of waiting for the daily trigger
    #[arg(long)]
    pub once: bool,

    /// Daily run time (HH:MM)
    #[arg(long, default_value = "08:00", value_parser = parse_hhmm)]
    pub at: NaiveTime,

    /// UTC offset for the schedule and the digest timestamp (e.g. +08:00)
    #[arg(long, default_value = "+08:00", value_parser = parse_offset, allow_hyphen_values = true)]
    pub utc_offset: FixedOffset,

    /// Language of the digest labels (en, zh-tw)
    #[arg(long, env = "DIGEST_LOCALE", default_value = "en")]
    pub locale: Locale,

    /// Delay between consecutive source fetches, in milliseconds
    #[arg(long, default_value_t = 800)]
    pub pace_ms: u64,

    /// Headlines longer than this are truncated in the digest
    #[arg(long, default_value_t = 50)]
    pub title_cap: usize,

    /// Number of recent KEV entries to report
    #[arg(long, default_value_t = 5)]
    pub vuln_count: usize,

    /// Optional path to a YAML source registry
    #[arg(short, long)]
    pub sources: Option<String>,

    /// KEV catalogue URL
    #[arg(long, env = "KEV_URL", default_value = crate::kev::KEV_FEED_URL)]
    pub kev_url: String,

    /// Skip the vulnerability digest
    #[arg(long)]
    pub no_vulns: bool,
}

impl Cli {
    /// Token and chat id, when both are present and non-empty.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        let token = self.telegram_token.as_deref().map(str::trim)?;
        let chat = self.telegram_chat_id.as_deref().map(str::trim)?;
        (!token.is_empty() && !chat.is_empty()).then_some((token, chat))
    }
}

fn parse_hhmm(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| format!("expected HH:MM, got `{}`: {}", s, e))
}

fn parse_offset(s: &str) -> Result<FixedOffset, String> {
    s.trim()
        .parse::<FixedOffset>()
        .map_err(|e| format!("expected an offset like +08:00, got `{}`: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["secnews_digest"]);

        assert!(!cli.once);
        assert!(!cli.no_vulns);
        assert_eq!(cli.at, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(cli.utc_offset.local_minus_utc(), 8 * 3600);
        assert_eq!(cli.pace_ms, 800);
        assert_eq!(cli.title_cap, 50);
        assert_eq!(cli.vuln_count, 5);
        assert_eq!(cli.kev_url, crate::kev::KEV_FEED_URL);
        assert!(cli.sources.is_none());
        assert_eq!(cli.locale, Locale::En);
        assert_eq!(cli.telegram_api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "secnews_digest",
            "--once",
            "--at",
            "07:30",
            "--utc-offset",
            "-05:00",
            "--pace-ms",
            "0",
            "-s",
            "/etc/secnews/sources.yaml",
            "--no-vulns",
            "--locale",
            "zh-tw",
            "--telegram-api-base",
            "http://localhost:8081",
            "--telegram-token",
            "123:abc",
            "--telegram-chat-id",
            "-1001234",
        ]);

        assert!(cli.once);
        assert!(cli.no_vulns);
        assert_eq!(cli.at, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(cli.utc_offset.local_minus_utc(), -5 * 3600);
        assert_eq!(cli.pace_ms, 0);
        assert_eq!(cli.sources.as_deref(), Some("/etc/secnews/sources.yaml"));
        assert_eq!(cli.telegram(), Some(("123:abc", "-1001234")));
        assert_eq!(cli.locale, Locale::ZhTw);
        assert_eq!(cli.telegram_api_base, "http://localhost:8081");
    }

    #[test]
    fn test_cli_rejects_bad_time() {
        assert!(Cli::try_parse_from(["secnews_digest", "--at", "25:00"]).is_err());
        assert!(Cli::try_parse_from(["secnews_digest", "--at", "eight"]).is_err());
        assert!(Cli::try_parse_from(["secnews_digest", "--utc-offset", "Asia/Taipei"]).is_err());
        assert!(Cli::try_parse_from(["secnews_digest", "--locale", "klingon"]).is_err());
    }

    #[test]
    fn test_telegram_requires_both_values() {
        let cli = Cli::parse_from(["secnews_digest", "--telegram-token", "123:abc", "--telegram-chat-id", " "]);
        assert!(cli.telegram().is_none());
    }
}
