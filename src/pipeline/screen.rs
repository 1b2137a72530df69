// src/pipeline/screen.rs

//! Per-filing screening.
//!
//! A bounded pool of workers takes each filing through exhibit detection,
//! ticker resolution, metric lookup and the threshold decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::Result;
use crate::models::{Config, FilingRecord, ResultRecord, sort_results};
use crate::services::{DocumentLocator, IdentifierCache, MetricFetcher, SourceClient};

/// Whether a metric value passes the filter. A threshold of 0 disables it.
pub fn passes_threshold(metric: u64, min_metric: u64) -> bool {
    min_metric == 0 || metric >= min_metric
}

/// Decision taken for one filing.
#[derive(Debug)]
enum Verdict {
    Keep(ResultRecord),
    NoExhibit,
    Unresolved,
    BelowThreshold,
}

/// Append-only, concurrency-safe collection of kept records.
#[derive(Debug, Default)]
pub struct ResultSink {
    records: Mutex<Vec<ResultRecord>>,
}

impl ResultSink {
    pub async fn push(&self, record: ResultRecord) {
        self.records.lock().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Consume the sink, returning records in report order.
    pub fn into_sorted(self) -> Vec<ResultRecord> {
        let mut records = self.records.into_inner();
        sort_results(&mut records);
        records
    }
}

/// Progress counters, independent of the result sink.
#[derive(Debug, Default)]
struct Progress {
    processed: AtomicUsize,
    located: AtomicUsize,
    matched: AtomicUsize,
    unresolved: AtomicUsize,
    below_threshold: AtomicUsize,
    skipped: AtomicUsize,
}

impl Progress {
    /// Count a finished filing and return the processed total.
    fn record(&self, verdict: &Verdict) -> usize {
        let counter = match verdict {
            Verdict::Keep(_) => Some(&self.matched),
            Verdict::NoExhibit => None,
            Verdict::Unresolved => Some(&self.unresolved),
            Verdict::BelowThreshold => Some(&self.below_threshold),
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        if !matches!(verdict, Verdict::NoExhibit) {
            self.located.fetch_add(1, Ordering::Relaxed);
        }
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn snapshot(&self, total: usize) -> ScreenStats {
        ScreenStats {
            total,
            processed: self.processed.load(Ordering::Relaxed),
            located: self.located.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            unresolved: self.unresolved.load(Ordering::Relaxed),
            below_threshold: self.below_threshold.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Counters of a screening run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScreenStats {
    /// Filings taken from the input after the cap
    pub total: usize,
    pub processed: usize,
    /// Filings where the exhibit was found
    pub located: usize,
    /// Filings kept in the result set
    pub matched: usize,
    /// Filings dropped for lack of a ticker while filtering
    pub unresolved: usize,
    pub below_threshold: usize,
    /// Filings not started because the runtime limit passed
    pub skipped: usize,
}

/// Result of a screening run.
#[derive(Debug, Default)]
pub struct ScreenOutcome {
    pub records: Vec<ResultRecord>,
    pub stats: ScreenStats,
}

/// Bounded worker pool over the scanned filings.
pub struct Screener {
    locator: DocumentLocator,
    identifiers: Arc<IdentifierCache>,
    metrics: MetricFetcher,
    workers: usize,
    max_filings: usize,
    max_runtime: Option<Duration>,
    progress_every: usize,
}

impl Screener {
    pub fn new(
        config: &Config,
        client: Arc<SourceClient>,
        identifiers: Arc<IdentifierCache>,
    ) -> Result<Self> {
        let screen = &config.screen;
        let metrics = MetricFetcher::new(config, Arc::clone(&client));
        if !metrics.is_enabled() {
            log::info!("No metric source configured; every metric is reported as 0");
        }
        Ok(Self {
            locator: DocumentLocator::new(config, client)?,
            identifiers,
            metrics,
            workers: screen.filing_workers.max(1),
            max_filings: screen.max_filings,
            max_runtime: (screen.max_runtime_secs > 0)
                .then(|| Duration::from_secs(screen.max_runtime_secs)),
            progress_every: screen.progress_every,
        })
    }

    /// Screen `filings`, keeping those that carry the exhibit and pass
    /// `min_metric`.
    ///
    /// Filings past `max_filings` are not taken. Once `max_runtime` has
    /// elapsed no new filing is started; filings in flight still finish.
    pub async fn run(&self, filings: Vec<FilingRecord>, min_metric: u64) -> ScreenOutcome {
        let total = match self.max_filings {
            0 => filings.len(),
            cap => filings.len().min(cap),
        };
        if total < filings.len() {
            log::warn!(
                "Filing cap reached: screening {} of {} filings",
                total,
                filings.len()
            );
        }

        let deadline = self.max_runtime.map(|limit| Instant::now() + limit);
        let sink = ResultSink::default();
        let progress = Progress::default();

        stream::iter(filings.into_iter().take(total))
            .for_each_concurrent(self.workers, |filing| {
                let sink = &sink;
                let progress = &progress;
                async move {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        progress.skipped.fetch_add(1, Ordering::Relaxed);
                        return;
                    }

                    let verdict = self.evaluate(&filing, min_metric).await;
                    let done = progress.record(&verdict);
                    if let Verdict::Keep(record) = verdict {
                        sink.push(record).await;
                    }

                    if self.progress_every > 0 && done % self.progress_every == 0 {
                        log::info!(
                            "Screened {}/{} filings, {} matched",
                            done,
                            total,
                            progress.matched.load(Ordering::Relaxed)
                        );
                    }
                }
            })
            .await;

        let stats = progress.snapshot(total);
        if stats.skipped > 0 {
            log::warn!(
                "Runtime limit reached: {} filings not screened",
                stats.skipped
            );
        }

        ScreenOutcome {
            records: sink.into_sorted(),
            stats,
        }
    }

    async fn evaluate(&self, filing: &FilingRecord, min_metric: u64) -> Verdict {
        let detection = self.locator.locate(filing).await;
        if !detection.found {
            return Verdict::NoExhibit;
        }

        let identifier = self.identifiers.resolve(&filing.entity_key).await;
        let metric = if identifier.is_resolved() {
            self.metrics.fetch(&identifier).await
        } else if min_metric == 0 {
            0
        } else {
            return Verdict::Unresolved;
        };

        if !passes_threshold(metric, min_metric) {
            log::debug!(
                "{} ({}) below threshold: {} < {}",
                filing.display_name,
                identifier,
                metric,
                min_metric
            );
            return Verdict::BelowThreshold;
        }

        Verdict::Keep(ResultRecord::new(
            filing,
            identifier,
            metric,
            detection.document_url,
        ))
    }
}
