// src/services/index.rs

//! Daily index scanner.
//!
//! Fetches the master index of every business day in a range, keeps the lines
//! of the configured form types and turns them into [`FilingRecord`]s.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};

use crate::error::FetchError;
use crate::models::{Config, FilingRecord};
use crate::services::SourceClient;
use crate::utils::date::{DateRange, parse_date, quarter};

/// Summary of a scan run.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub filings: Vec<FilingRecord>,
    pub days_total: usize,
    pub days_fetched: usize,
    pub days_absent: usize,
    pub days_failed: usize,
    pub malformed: usize,
}

impl ScanOutcome {
    /// True when days were requested but every one failed or was missing,
    /// with at least one real failure.
    pub fn source_unavailable(&self) -> bool {
        self.days_total > 0 && self.days_fetched == 0 && self.days_failed > 0
    }
}

/// Lines parsed out of one day's index.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedIndex {
    pub filings: Vec<FilingRecord>,
    pub malformed: usize,
}

enum DayResult {
    Fetched(ParsedIndex),
    Absent,
    Failed(FetchError),
}

/// Service for enumerating filings from the daily indexes.
pub struct IndexScanner {
    client: Arc<SourceClient>,
    archives_base: String,
    form_types: Vec<String>,
    workers: usize,
    timeout: Duration,
}

impl IndexScanner {
    pub fn new(config: &Config, client: Arc<SourceClient>) -> Self {
        Self {
            client,
            archives_base: config.sources.archives_base.trim_end_matches('/').to_string(),
            form_types: config.scan.form_types.clone(),
            workers: config.scan.day_workers.max(1),
            timeout: config.crawler.timeout(),
        }
    }

    /// URL of the master index for `date`.
    pub fn day_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/Archives/edgar/daily-index/{}/QTR{}/master.{}.idx",
            self.archives_base,
            date.year(),
            quarter(date),
            date.format("%Y%m%d")
        )
    }

    /// Scan every business day in `range`.
    pub async fn scan(&self, range: DateRange) -> ScanOutcome {
        let days = range.business_days();
        let mut outcome = ScanOutcome {
            days_total: days.len(),
            ..ScanOutcome::default()
        };

        let mut day_stream = stream::iter(days)
            .map(|date| async move { (date, self.fetch_day(date).await) })
            .buffer_unordered(self.workers);

        let mut unique: HashMap<(String, String), FilingRecord> = HashMap::new();
        while let Some((date, result)) = day_stream.next().await {
            match result {
                DayResult::Fetched(parsed) => {
                    outcome.days_fetched += 1;
                    outcome.malformed += parsed.malformed;
                    log::debug!("Index {}: {} filings", date, parsed.filings.len());
                    for filing in parsed.filings {
                        let key = {
                            let (entity, accession) = filing.key();
                            (entity.to_string(), accession.to_string())
                        };
                        unique.insert(key, filing);
                    }
                }
                DayResult::Absent => {
                    outcome.days_absent += 1;
                    log::debug!("Index {}: not published", date);
                }
                DayResult::Failed(error) => {
                    outcome.days_failed += 1;
                    log::warn!("Skipping index for {}: {}", date, error);
                }
            }
        }

        let mut filings: Vec<_> = unique.into_values().collect();
        filings.sort_by(|a, b| {
            a.filing_date
                .cmp(&b.filing_date)
                .then_with(|| a.entity_key.cmp(&b.entity_key))
                .then_with(|| a.accession.cmp(&b.accession))
        });
        outcome.filings = filings;
        outcome
    }

    async fn fetch_day(&self, date: NaiveDate) -> DayResult {
        match self.client.get(&self.day_url(date), self.timeout).await {
            Ok(body) => DayResult::Fetched(self.parse_index(&body)),
            Err(error) if error.is_absent() => DayResult::Absent,
            Err(error) => DayResult::Failed(error),
        }
    }

    /// Parse a master index body.
    ///
    /// Banner and header lines are ignored. Lines of other form types are
    /// skipped silently; target lines that cannot be turned into a filing
    /// are counted as malformed.
    pub fn parse_index(&self, body: &str) -> ParsedIndex {
        let mut parsed = ParsedIndex::default();

        for line in body.lines() {
            let fields: Vec<&str> = line.split('|').map(str::trim).collect();
            if fields.len() < 5 {
                continue;
            }
            if fields[0].eq_ignore_ascii_case("CIK") {
                continue;
            }
            if !self.form_types.iter().any(|f| f.eq_ignore_ascii_case(fields[2])) {
                continue;
            }

            match self.parse_line(&fields) {
                Some(filing) => parsed.filings.push(filing),
                None => {
                    parsed.malformed += 1;
                    log::debug!("Malformed index line: {}", line);
                }
            }
        }
        parsed
    }

    fn parse_line(&self, fields: &[&str]) -> Option<FilingRecord> {
        let (cik, name, date, filename) = (fields[0], fields[1], fields[3], fields[4]);
        let filing_date = parse_date(date)?;

        let stem = filename.rsplit('/').next()?.strip_suffix(".txt")?;
        let raw_url = format!(
            "{}/Archives/{}",
            self.archives_base,
            filename.trim_start_matches('/')
        );

        FilingRecord::new(cik, name, stem, filing_date, raw_url).ok()
    }
}
