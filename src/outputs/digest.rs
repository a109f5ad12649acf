//! Telegram-ready digest messages.
//!
//! Two messages are produced per run:
//!
//! - **News digest**: a header with the total count, one block per source
//!   (in the order sources were first seen), each headline numbered within
//!   its block, and a timestamp footer. An empty batch still produces a
//!   visible "no news" message.
//! - **Vulnerability digest**: one block per KEV record. An empty list
//!   produces no message at all.
//!
//! Bodies use Telegram's HTML parse mode, so every piece of scraped text is
//! escaped. Titles longer than [`DigestStyle::title_cap`] are cut and
//! suffixed with `...`; URLs are never shortened.
//!
//! # Length Ceiling
//!
//! Telegram rejects messages over 4096 characters. Blocks are appended
//! while they fit under [`DigestStyle::max_chars`]; anything left over is
//! summarized as a single `… and N more` line. Header and footer are always
//! present.
//!
//! # Locale
//!
//! Fixed labels (headers, the "no news" sentinel, the footer) come in
//! English or Traditional Chinese, selected by [`DigestStyle::locale`].

use crate::models::{Digest, NewsItem, VulnerabilityRecord};
use crate::utils::truncate_with_ellipsis;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use quick_xml::escape::partial_escape;
use std::fmt;
use std::str::FromStr;

pub const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━━━";


/// Default display cap for headlines.
pub const DEFAULT_TITLE_CAP: usize = 50;

/// Default soft ceiling, below Telegram's 4096-character limit.
pub const DEFAULT_MAX_CHARS: usize = 4000;

/// Room kept for the omission line.
const OMISSION_RESERVE: usize = 40;

/// Language of the fixed digest labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    ZhTw,
}

/// The fixed strings of one locale.
struct Labels {
    no_news: &'static str,
    news_title: &'static str,
    vuln_title: &'static str,
    added: &'static str,
    due: &'static str,
    updated: &'static str,
}

const EN: Labels = Labels {
    no_news: "❌ No security news could be collected today",
    news_title: "Daily Security News",
    vuln_title: "CISA Known Exploited Vulnerabilities",
    added: "Added",
    due: "Due",
    updated: "Updated",
};

const ZH_TW: Labels = Labels {
    no_news: "❌ 今日沒有取得任何資安新聞",
    news_title: "每日資安新聞",
    vuln_title: "CISA 已知遭利用漏洞",
    added: "新增",
    due: "期限",
    updated: "更新時間",
};

impl Locale {
    fn labels(self) -> &'static Labels {
        match self {
            Locale::En => &EN,
            Locale::ZhTw => &ZH_TW,
        }
    }

    /// The message sent when a run collected no headlines at all.
    pub fn no_news_message(self) -> &'static str {
        self.labels().no_news
    }

    fn item_count(self, n: usize) -> String {
        match self {
            Locale::En => format!("{} items", n),
            Locale::ZhTw => format!("{} 則", n),
        }
    }

    fn latest_count(self, n: usize) -> String {
        match self {
            Locale::En => format!("{} latest", n),
            Locale::ZhTw => format!("最新 {} 則", n),
        }
    }

    fn omitted(self, n: usize) -> String {
        match self {
            Locale::En => format!("… and {} more", n),
            Locale::ZhTw => format!("… 另有 {} 則", n),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" => Ok(Locale::En),
            "zh-tw" => Ok(Locale::ZhTw),
            other => Err(format!("unknown locale `{}` (expected `en` or `zh-tw`)", other)),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Locale::En => "en",
            Locale::ZhTw => "zh-tw",
        })
    }
}

/// Presentation settings shared by both digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestStyle {
    /// Headlines longer than this many characters are truncated.
    pub title_cap: usize,
    /// Soft ceiling on the total message length, in characters.
    pub max_chars: usize,
    /// Offset the footer timestamp is rendered in.
    pub offset: FixedOffset,
    pub locale: Locale,
}

impl Default for DigestStyle {
    fn default() -> Self {
        Self {
            title_cap: DEFAULT_TITLE_CAP,
            max_chars: DEFAULT_MAX_CHARS,
            offset: FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix()),
            locale: Locale::default(),
        }
    }
}

impl DigestStyle {
    fn footer(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.offset);
        format!(
            "{}\n🕐 {}: {}",
            SEPARATOR,
            self.locale.labels().updated,
            local.format("%Y/%m/%d %H:%M:%S (UTC%:z)")
        )
    }
}

/// Appends blocks while they fit in the budget, counting what did not.
struct BudgetedBody {
    locale: Locale,
    budget: usize,
    used: usize,
    omitted: usize,
    body: String,
}

impl BudgetedBody {
    fn new(style: &DigestStyle, header: &str, footer: &str) -> Self {
        let fixed = header.chars().count() + footer.chars().count() + OMISSION_RESERVE;
        Self {
            locale: style.locale,
            budget: style.max_chars.saturating_sub(fixed),
            used: 0,
            omitted: 0,
            body: String::new(),
        }
    }

    /// Append `prefix` + `block` if both fit and nothing was omitted yet.
    fn push(&mut self, prefix: Option<&str>, block: &str) -> bool {
        let prefix = prefix.unwrap_or("");
        let needed = prefix.chars().count() + block.chars().count();
        if self.omitted > 0 || self.used + needed > self.budget {
            self.omitted += 1;
            return false;
        }
        self.body.push_str(prefix);
        self.body.push_str(block);
        self.used += needed;
        true
    }

    fn finish(mut self, header: &str, footer: &str) -> String {
        if self.omitted > 0 {
            self.body.push_str(&self.locale.omitted(self.omitted));
            self.body.push_str("\n\n");
        }
        format!("{}{}{}", header, self.body, footer)
    }
}

/// Build the news digest. Never empty: zero items yields the locale's
/// [`Locale::no_news_message`].
pub fn format_news(items: &[NewsItem], style: &DigestStyle, now: DateTime<Utc>) -> String {
    let digest = Digest::from_items(items);
    if digest.is_empty() {
        return style.locale.no_news_message().to_string();
    }

    let labels = style.locale.labels();
    let header = format!(
        "🔒 <b>{}</b> ({})\n{}\n\n",
        labels.news_title,
        style.locale.item_count(digest.len()),
        SEPARATOR
    );
    let footer = style.footer(now);
    let mut body = BudgetedBody::new(style, &header, &footer);

    for section in &digest.sections {
        let heading = format!("📰 <b>{}</b>\n", partial_escape(section.source_name.as_str()));
        let mut heading_written = false;
        for (i, item) in section.items.iter().enumerate() {
            let title = truncate_with_ellipsis(&item.title, style.title_cap);
            let entry = format!(
                "{}. {}\n   🔗 {}\n\n",
                i + 1,
                partial_escape(title.as_str()),
                partial_escape(item.url.as_str())
            );
            let prefix = (!heading_written).then_some(heading.as_str());
            if body.push(prefix, &entry) {
                heading_written = true;
            }
        }
    }

    body.finish(&header, &footer)
}

/// Build the vulnerability digest, or `None` when there is nothing to send.
pub fn format_vulnerabilities(
    records: &[VulnerabilityRecord],
    style: &DigestStyle,
    now: DateTime<Utc>,
) -> Option<String> {
    if records.is_empty() {
        return None;
    }

    let labels = style.locale.labels();
    let header = format!(
        "🛡️ <b>{}</b> ({})\n{}\n\n",
        labels.vuln_title,
        style.locale.latest_count(records.len()),
        SEPARATOR
    );
    let footer = style.footer(now);
    let mut body = BudgetedBody::new(style, &header, &footer);

    for (i, rec) in records.iter().enumerate() {
        let description = truncate_with_ellipsis(&rec.description, style.title_cap * 2);
        let entry = format!(
            "{}. <b>{}</b> {}\n   {}\n   📅 {} {} · {} {}\n   🔗 {}\n\n",
            i + 1,
            partial_escape(rec.cve_id.as_str()),
            partial_escape(rec.vendor_product.as_str()),
            partial_escape(description.as_str()),
            labels.added,
            rec.date_added.format("%Y-%m-%d"),
            labels.due,
            rec.due_date.format("%Y-%m-%d"),
            partial_escape(rec.reference_url.as_str())
        );
        body.push(None, &entry);
    }

    Some(body.finish(&header, &footer))
}
