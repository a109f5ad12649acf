//! Daily trigger.
//!
//! The bot fires once a day at a wall-clock time in a fixed UTC offset
//! (`08:00` at `+08:00` by default). Every tick calls the same
//! [`Pipeline::run`] entry point the manual mode uses.

use crate::fetch::Fetch;
use crate::notify::Notifier;
use crate::pipeline::Pipeline;
use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeZone, Utc};
use tracing::{info, instrument, warn};

/// The first instant strictly after `now` whose wall-clock time in `offset`
/// equals `at`.
pub fn next_fire(now: DateTime<Utc>, at: NaiveTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local_now = now.with_timezone(&offset);
    let today = local_now.date_naive();

    let candidate = |date: chrono::NaiveDate| {
        // a fixed offset has no gaps or folds, so the mapping is always single
        offset
            .from_local_datetime(&date.and_time(at))
            .single()
            .unwrap_or_else(|| offset.from_utc_datetime(&date.and_time(at)))
    };

    let fire = candidate(today);
    if fire > local_now {
        return fire;
    }
    match today.checked_add_days(Days::new(1)) {
        Some(tomorrow) => candidate(tomorrow),
        None => fire,
    }
}

/// Run the pipeline every day at `at` (in `offset`). Never returns.
#[instrument(level = "info", skip(pipeline))]
pub async fn run_daily<F: Fetch, N: Notifier>(
    pipeline: &Pipeline<F, N>,
    at: NaiveTime,
    offset: FixedOffset,
) {
    loop {
        let now = Utc::now();
        let fire = next_fire(now, at, offset);
        let wait = (fire.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or_default();
        info!(next_run = %fire.to_rfc3339(), wait_secs = wait.as_secs(), "Waiting for next scheduled run");
        tokio::time::sleep(wait).await;

        match pipeline.run().await {
            Some(report) => info!(
                news = report.news_count(),
                vulnerabilities = report.vuln_count(),
                news_sent = report.news_sent,
                vulns_sent = report.vulns_sent,
                "Scheduled run finished"
            ),
            None => warn!("Scheduled run skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plus8() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn eight() -> NaiveTime {
        NaiveTime::from_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn test_fires_later_today() {
        // 2024-10-16 06:30 at +08:00
        let now = Utc.with_ymd_and_hms(2024, 10, 15, 22, 30, 0).unwrap();
        let fire = next_fire(now, eight(), plus8());
        assert_eq!(fire.to_rfc3339(), "2024-10-16T08:00:00+08:00");
    }

    #[test]
    fn test_fires_tomorrow_once_passed() {
        // 2024-10-16 09:15 at +08:00
        let now = Utc.with_ymd_and_hms(2024, 10, 16, 1, 15, 0).unwrap();
        let fire = next_fire(now, eight(), plus8());
        assert_eq!(fire.to_rfc3339(), "2024-10-17T08:00:00+08:00");
    }

    #[test]
    fn test_exact_fire_time_is_not_reused() {
        let now = Utc.with_ymd_and_hms(2024, 10, 16, 0, 0, 0).unwrap();
        let fire = next_fire(now, eight(), plus8());
        assert_eq!(fire.to_rfc3339(), "2024-10-17T08:00:00+08:00");
        assert!(fire.with_timezone(&Utc) > now);
    }

    #[test]
    fn test_local_date_differs_from_utc_date() {
        // 23:00 UTC on the 31st is already 07:00 on Nov 1st at +08:00
        let now = Utc.with_ymd_and_hms(2024, 10, 31, 23, 0, 0).unwrap();
        let fire = next_fire(now, eight(), plus8());
        assert_eq!(fire.to_rfc3339(), "2024-11-01T08:00:00+08:00");
    }

    #[test]
    fn test_negative_offset_and_year_rollover() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let at = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
        // 2024-12-31 20:00 at -05:00
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap();
        let fire = next_fire(now, at, offset);
        assert_eq!(fire.to_rfc3339(), "2025-01-01T06:30:00-05:00");
    }

    #[test]
    fn test_always_within_a_day() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        for minutes in (0..2 * 24 * 60).step_by(37) {
            let now = start + chrono::Duration::minutes(minutes);
            let fire = next_fire(now, eight(), plus8()).with_timezone(&Utc);
            assert!(fire > now);
            assert!(fire - now <= chrono::Duration::days(1));
        }
    }
}
