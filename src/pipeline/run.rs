// src/pipeline/run.rs

//! End-to-end discovery run: scan, resolve, screen.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{AppError, Result};
use crate::models::{Config, ResultRecord};
use crate::pipeline::screen::{ScreenStats, Screener};
use crate::services::{IdentifierCache, IndexScanner, RateLimiter, SourceClient};
use crate::utils::date::DateRange;
use crate::utils::http::Fetcher;
use crate::utils::progress;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub range: DateRange,
    pub days_total: usize,
    pub days_fetched: usize,
    pub days_absent: usize,
    pub days_failed: usize,
    pub malformed_lines: usize,
    pub filings_found: usize,
    pub tickers_loaded: usize,
    pub screen: ScreenStats,
    /// Kept records in report order
    pub records: Vec<ResultRecord>,
    pub elapsed_secs: f64,
}

impl RunReport {
    /// Summary lines for [`progress::summary`].
    pub fn summary_items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Date range", format!("{} to {}", self.range.start, self.range.end)),
            (
                "Index days",
                format!(
                    "{} fetched, {} not published, {} failed (of {})",
                    self.days_fetched, self.days_absent, self.days_failed, self.days_total
                ),
            ),
            ("Filings scanned", self.filings_found.to_string()),
            ("Exhibits located", self.screen.located.to_string()),
            ("Below threshold", self.screen.below_threshold.to_string()),
            ("Unresolved tickers dropped", self.screen.unresolved.to_string()),
            ("Not screened (time limit)", self.screen.skipped.to_string()),
            ("Matches", self.records.len().to_string()),
            ("Elapsed", format!("{:.1}s", self.elapsed_secs)),
        ]
    }
}

/// Run the discovery pipeline over `range`.
///
/// All requests go through `fetcher`, spaced by one shared rate limiter.
/// Fails only when days were requested and none of the daily indexes could
/// be fetched; every per-filing problem is absorbed.
pub async fn run_pipeline(
    config: &Config,
    range: DateRange,
    fetcher: Arc<dyn Fetcher>,
) -> Result<RunReport> {
    let started = Instant::now();
    progress::header(&format!(
        "Exhibit {} discovery: {} to {}",
        config.exhibit.designator, range.start, range.end
    ));

    let limiter = Arc::new(RateLimiter::new(config.crawler.request_interval()));
    let client = Arc::new(SourceClient::new(
        fetcher,
        limiter,
        config.crawler.max_retries,
    ));

    progress::step(1, 3, "Loading ticker mapping");
    let identifiers = Arc::new(IdentifierCache::new(config, Arc::clone(&client)));
    let tickers_loaded = identifiers.load().await;
    if identifiers.is_empty().await {
        log::warn!("Ticker mapping empty; every lookup will use the submissions fallback");
    } else {
        log::info!("Ticker mapping: {} entities", tickers_loaded);
    }

    progress::step(2, 3, "Scanning daily indexes");
    let scanner = IndexScanner::new(config, Arc::clone(&client));
    let scan = scanner.scan(range).await;
    if scan.source_unavailable() {
        return Err(AppError::SourceUnavailable {
            requested: scan.days_total,
            failed: scan.days_failed,
        });
    }
    log::info!(
        "Found {} filings across {} index days",
        scan.filings.len(),
        scan.days_fetched
    );

    progress::step(3, 3, "Screening filings");
    let screener = Screener::new(config, client, identifiers)?;
    let filings_found = scan.filings.len();
    let outcome = screener.run(scan.filings, config.screen.min_metric).await;

    Ok(RunReport {
        range,
        days_total: scan.days_total,
        days_fetched: scan.days_fetched,
        days_absent: scan.days_absent,
        days_failed: scan.days_failed,
        malformed_lines: scan.malformed,
        filings_found,
        tickers_loaded,
        screen: outcome.stats,
        records: outcome.records,
        elapsed_secs: started.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::error::FetchError;
    use crate::models::Identifier;
    use crate::utils::http::testing::ScriptedFetcher;

    const HEADER: &str = "\
Description:           Daily Index of EDGAR Dissemination Feed by Company Name

CIK|Company Name|Form Type|Date Filed|File Name
--------------------------------------------------------------------------------
";

    const BULK: &str = r#"{"0": {"cik_str": 1861449, "ticker": "BYND", "title": "Beyond Meat, Inc."}}"#;

    fn config() -> Config {
        let mut config = Config::default();
        config.crawler.request_interval_ms = 1;
        config.crawler.max_retries = 2;
        config.screen.progress_every = 0;
        config
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
        )
        .unwrap()
    }

    fn day_url(day: u32) -> String {
        format!("https://www.sec.gov/Archives/edgar/daily-index/2024/QTR1/master.202403{day:02}.idx")
    }

    #[tokio::test]
    async fn test_run_absorbs_empty_and_failed_days() {
        let config = config();
        let day_one = format!(
            "{HEADER}\
1861449|Beyond Meat, Inc.|8-K|20240304|edgar/data/1861449/0001861449-24-000012.txt
1740516|Ondas Holdings Inc.|8-K|20240304|edgar/data/1740516/0001740516-24-000003.txt
"
        );
        let exhibit_index = "https://www.sec.gov/Archives/edgar/data/1861449/000186144924000012/0001861449-24-000012-index.htm";
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .ok(&config.sources.tickers_url, BULK)
                .ok(&day_url(4), &day_one)
                .ok(&day_url(5), HEADER)
                .fail(&day_url(6), FetchError::Server(503))
                .ok(
                    exhibit_index,
                    r#"<table><tr><td>EX-99.1</td>
                       <td><a href="/Archives/edgar/data/1861449/000186144924000012/ex991.htm">ex991.htm</a></td>
                       </tr></table>"#,
                ),
        );

        let report = run_pipeline(&config, range(), fetcher.clone()).await.unwrap();

        assert_eq!(report.days_total, 3);
        assert_eq!(report.days_fetched, 2);
        assert_eq!(report.days_failed, 1);
        assert_eq!(fetcher.calls_to(&day_url(6)), 2);
        assert_eq!(report.filings_found, 2);
        assert_eq!(report.records.len(), 1);

        let record = &report.records[0];
        assert_eq!(record.entity_key, "1861449");
        assert_eq!(record.identifier, Identifier::Symbol("BYND".into()));
        assert_eq!(record.metric, 0);
        assert_eq!(record.accession_dashed(), "0001861449-24-000012");
        assert_eq!(
            record.document_url,
            "https://www.sec.gov/Archives/edgar/data/1861449/000186144924000012/ex991.htm"
        );
    }

    #[tokio::test]
    async fn test_every_day_failing_is_fatal() {
        let config = config();
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .fail(&day_url(4), FetchError::Timeout)
                .fail(&day_url(5), FetchError::Server(500))
                .fail(&day_url(6), FetchError::Connect("refused".into())),
        );

        let error = run_pipeline(&config, range(), fetcher).await.unwrap_err();
        assert!(matches!(
            error,
            AppError::SourceUnavailable {
                requested: 3,
                failed: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_unpublished_days_are_not_fatal() {
        let config = config();
        let fetcher = Arc::new(ScriptedFetcher::new());

        let report = run_pipeline(&config, range(), fetcher).await.unwrap();
        assert_eq!(report.days_absent, 3);
        assert!(report.records.is_empty());
    }
}
