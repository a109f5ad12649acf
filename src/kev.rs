//! CISA Known Exploited Vulnerabilities (KEV) feed adapter.
//!
//! The catalogue is a single JSON document with a top-level
//! `vulnerabilities` array. Only the most recently added entries are of
//! interest, so the adapter sorts by `dateAdded` (newest first, ties kept in
//! feed order) and keeps the first `n`.
//!
//! This branch is independent of the news branch: any failure here is
//! logged and produces an empty result.

use crate::error::ParseError;
use crate::fetch::{Fetch, FetchKind};
use crate::models::VulnerabilityRecord;
use crate::utils::truncate_for_log;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// Public location of the KEV catalogue.
pub const KEV_FEED_URL: &str =
    "https://www.cisa.gov/sites/default/files/feeds/known_exploited_vulnerabilities.json";

/// Default number of records kept.
pub const DEFAULT_RECENT: usize = 5;

const NVD_DETAIL_URL: &str = "https://nvd.nist.gov/vuln/detail/";

#[derive(Debug, Deserialize)]
struct KevCatalog {
    vulnerabilities: Vec<KevEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KevEntry {
    #[serde(rename = "cveID")]
    cve_id: String,
    #[serde(default)]
    vendor_project: String,
    #[serde(default)]
    product: String,
    #[serde(default)]
    vulnerability_name: String,
    #[serde(default)]
    short_description: String,
    date_added: String,
    due_date: String,
}

impl KevEntry {
    fn into_record(self) -> Option<VulnerabilityRecord> {
        let date_added = parse_date(&self.date_added)?;
        let due_date = parse_date(&self.due_date)?;
        let description = if self.vulnerability_name.trim().is_empty() {
            self.short_description
        } else {
            self.vulnerability_name
        };
        let vendor_product = format!("{} {}", self.vendor_project.trim(), self.product.trim())
            .trim()
            .to_string();
        Some(VulnerabilityRecord {
            reference_url: format!("{}{}", NVD_DETAIL_URL, self.cve_id),
            cve_id: self.cve_id,
            vendor_product,
            description,
            date_added,
            due_date,
        })
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse the catalogue and return the `n` most recently added records.
///
/// Entries with unparseable dates are skipped.
pub fn parse_recent(json: &str, n: usize) -> Result<Vec<VulnerabilityRecord>, ParseError> {
    let catalog: KevCatalog = serde_json::from_str(json)?;
    let total = catalog.vulnerabilities.len();

    let mut records: Vec<VulnerabilityRecord> = catalog
        .vulnerabilities
        .into_iter()
        .filter_map(KevEntry::into_record)
        .collect();
    if records.len() < total {
        debug!(skipped = total - records.len(), "Skipped KEV entries with bad dates");
    }

    // sort_by is stable: equal dates keep feed order
    records.sort_by(|a, b| b.date_added.cmp(&a.date_added));
    records.truncate(n);
    Ok(records)
}

/// Fetch the catalogue from `url` and return the `n` most recent records,
/// or nothing on any failure.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_recent<F: Fetch>(fetcher: &F, url: &str, n: usize) -> Vec<VulnerabilityRecord> {
    let body = match fetcher.fetch(url, FetchKind::Json).await {
        Ok(body) => body,
        Err(e) => {
            warn!(reason = %truncate_for_log(&e.to_string(), 200), "KEV fetch failed");
            return Vec::new();
        }
    };

    match parse_recent(&body, n) {
        Ok(records) => {
            info!(count = records.len(), "Loaded recent KEV records");
            records
        }
        Err(e) => {
            warn!(reason = %truncate_for_log(&e.to_string(), 200), "KEV parse failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    fn entry(cve: &str, added: &str) -> String {
        format!(
            r#"{{"cveID":"{cve}","vendorProject":"Acme","product":"Widget","vulnerabilityName":"Acme Widget RCE {cve}","dateAdded":"{added}","shortDescription":"desc","requiredAction":"Apply updates","dueDate":"2024-12-31","knownRansomwareCampaignUse":"Unknown","notes":""}}"#
        )
    }

    fn catalog(entries: &[String]) -> String {
        format!(
            r#"{{"title":"CISA Catalog of Known Exploited Vulnerabilities","catalogVersion":"2024.10.01","count":{},"vulnerabilities":[{}]}}"#,
            entries.len(),
            entries.join(",")
        )
    }

    struct CannedFetcher(Result<String, FetchError>);

    impl Fetch for CannedFetcher {
        async fn fetch(&self, _url: &str, kind: FetchKind) -> Result<String, FetchError> {
            assert_eq!(kind, FetchKind::Json);
            self.0.clone()
        }
    }

    #[test]
    fn test_sorted_newest_first() {
        let json = catalog(&[
            entry("CVE-2024-0001", "2024-01-01"),
            entry("CVE-2024-0002", "2024-03-15"),
            entry("CVE-2024-0003", "2024-02-01"),
        ]);
        let recs = parse_recent(&json, 5).unwrap();
        let dates: Vec<String> = recs.iter().map(|r| r.date_added.to_string()).collect();
        assert_eq!(dates, vec!["2024-03-15", "2024-02-01", "2024-01-01"]);
    }

    #[test]
    fn test_capped_at_n() {
        let entries: Vec<String> = (1..=9)
            .map(|d| entry(&format!("CVE-2024-000{d}"), &format!("2024-05-0{d}")))
            .collect();
        let recs = parse_recent(&catalog(&entries), 5).unwrap();
        assert_eq!(recs.len(), 5);
        assert_eq!(recs[0].cve_id, "CVE-2024-0009");
        assert_eq!(recs[4].cve_id, "CVE-2024-0005");
    }

    #[test]
    fn test_ties_keep_feed_order() {
        let json = catalog(&[
            entry("CVE-2024-1111", "2024-06-01"),
            entry("CVE-2024-2222", "2024-06-01"),
            entry("CVE-2024-3333", "2024-06-01"),
        ]);
        let ids: Vec<String> = parse_recent(&json, 5)
            .unwrap()
            .into_iter()
            .map(|r| r.cve_id)
            .collect();
        assert_eq!(ids, vec!["CVE-2024-1111", "CVE-2024-2222", "CVE-2024-3333"]);
    }

    #[test]
    fn test_record_fields() {
        let recs = parse_recent(&catalog(&[entry("CVE-2023-4966", "2023-10-18")]), 5).unwrap();
        let r = &recs[0];
        assert_eq!(r.vendor_product, "Acme Widget");
        assert_eq!(r.description, "Acme Widget RCE CVE-2023-4966");
        assert_eq!(r.due_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(r.reference_url, "https://nvd.nist.gov/vuln/detail/CVE-2023-4966");
    }

    #[test]
    fn test_bad_dates_are_skipped() {
        let json = catalog(&[entry("CVE-2024-0001", "yesterday"), entry("CVE-2024-0002", "2024-01-02")]);
        let recs = parse_recent(&json, 5).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].cve_id, "CVE-2024-0002");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(parse_recent("{\"vulnerabilities\": [", 5).is_err());
        assert!(parse_recent("{\"other\": []}", 5).is_err());
    }

    #[tokio::test]
    async fn test_fetch_recent_failure_is_empty() {
        let fetcher = CannedFetcher(Err(FetchError::Timeout(FetchKind::Json.timeout())));
        assert!(fetch_recent(&fetcher, KEV_FEED_URL, 5).await.is_empty());

        let fetcher = CannedFetcher(Ok("<html>maintenance</html>".to_string()));
        assert!(fetch_recent(&fetcher, KEV_FEED_URL, 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_recent_success() {
        let fetcher = CannedFetcher(Ok(catalog(&[entry("CVE-2024-3400", "2024-04-12")])));
        let recs = fetch_recent(&fetcher, KEV_FEED_URL, 5).await;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].cve_id, "CVE-2024-3400");
    }
}
