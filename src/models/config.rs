//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::services::ExhibitPattern;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client behavior shared by every remote source
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Daily index scan settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Target exhibit detection settings
    #[serde(default)]
    pub exhibit: ExhibitConfig,

    /// Per-filing screening settings
    #[serde(default)]
    pub screen: ScreenConfig,

    /// Remote endpoints
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Report output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.metric_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.metric_timeout_secs must be > 0",
            ));
        }
        if self.crawler.max_retries == 0 {
            return Err(AppError::validation("crawler.max_retries must be > 0"));
        }
        if self.scan.day_workers == 0 {
            return Err(AppError::validation("scan.day_workers must be > 0"));
        }
        if self.scan.form_types.is_empty() {
            return Err(AppError::validation("scan.form_types is empty"));
        }
        if self.screen.filing_workers == 0 {
            return Err(AppError::validation("screen.filing_workers must be > 0"));
        }
        ExhibitPattern::new(&self.exhibit.designator)?;
        url::Url::parse(&self.sources.archives_base)?;
        url::Url::parse(&self.sources.data_base)?;
        url::Url::parse(&self.sources.tickers_url)?;
        if self.screen.min_metric > 0 && !self.sources.has_metric_source() {
            return Err(AppError::config(
                "screen.min_metric > 0 requires sources.metric_url",
            ));
        }
        if self.sources.metric_components.len() != 2 {
            return Err(AppError::validation(
                "sources.metric_components must name exactly two fields",
            ));
        }
        Ok(())
    }
}

/// HTTP client and rate limiting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Descriptive User-Agent header, required by the filing source
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout for the filing and identifier sources, in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Shorter timeout for the metric source
    #[serde(default = "defaults::metric_timeout")]
    pub metric_timeout_secs: u64,

    /// Minimum interval between any two outbound requests, in milliseconds
    #[serde(default = "defaults::request_interval")]
    pub request_interval_ms: u64,

    /// Attempts per request for transient failures
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn metric_timeout(&self) -> Duration {
        Duration::from_secs(self.metric_timeout_secs)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            metric_timeout_secs: defaults::metric_timeout(),
            request_interval_ms: defaults::request_interval(),
            max_retries: defaults::max_retries(),
        }
    }
}

/// Daily index scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Days to look back from today when no explicit range is given
    #[serde(default = "defaults::lookback_days")]
    pub lookback_days: u32,

    /// Concurrent day index fetches
    #[serde(default = "defaults::day_workers")]
    pub day_workers: usize,

    /// Form types kept from the index
    #[serde(default = "defaults::form_types")]
    pub form_types: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookback_days: defaults::lookback_days(),
            day_workers: defaults::day_workers(),
            form_types: defaults::form_types(),
        }
    }
}

/// Target exhibit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExhibitConfig {
    /// Exhibit designator such as `99.1`
    #[serde(default = "defaults::designator")]
    pub designator: String,

    /// Lines scanned after a textual mention by the context strategy
    #[serde(default = "defaults::context_lines")]
    pub context_lines: usize,
}

impl Default for ExhibitConfig {
    fn default() -> Self {
        Self {
            designator: defaults::designator(),
            context_lines: defaults::context_lines(),
        }
    }
}

/// Per-filing screening settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Concurrent filings in flight
    #[serde(default = "defaults::filing_workers")]
    pub filing_workers: usize,

    /// Minimum metric value to keep a filing; 0 disables filtering
    #[serde(default)]
    pub min_metric: u64,

    /// Hard ceiling on filings taken from the scan; 0 means unlimited
    #[serde(default)]
    pub max_filings: usize,

    /// Stop starting new filings after this many seconds; 0 means unlimited
    #[serde(default)]
    pub max_runtime_secs: u64,

    /// Log progress every N processed filings
    #[serde(default = "defaults::progress_every")]
    pub progress_every: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            filing_workers: defaults::filing_workers(),
            min_metric: 0,
            max_filings: 0,
            max_runtime_secs: 0,
            progress_every: defaults::progress_every(),
        }
    }
}

/// Remote endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Base of the filing archives (daily indexes, filing index pages)
    #[serde(default = "defaults::archives_base")]
    pub archives_base: String,

    /// Base of the per-entity submissions endpoint
    #[serde(default = "defaults::data_base")]
    pub data_base: String,

    /// Bulk CIK to ticker mapping
    #[serde(default = "defaults::tickers_url")]
    pub tickers_url: String,

    /// Metric endpoint with a `{symbol}` placeholder; empty disables metrics
    #[serde(default)]
    pub metric_url: String,

    /// Field holding the series array in a metric response
    #[serde(default = "defaults::metric_series_field")]
    pub metric_series_field: String,

    /// Field holding a series point's date
    #[serde(default = "defaults::metric_date_field")]
    pub metric_date_field: String,

    /// The two numeric fields summed into the metric
    #[serde(default = "defaults::metric_components")]
    pub metric_components: Vec<String>,
}

impl SourcesConfig {
    pub fn has_metric_source(&self) -> bool {
        !self.metric_url.trim().is_empty()
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            archives_base: defaults::archives_base(),
            data_base: defaults::data_base(),
            tickers_url: defaults::tickers_url(),
            metric_url: String::new(),
            metric_series_field: defaults::metric_series_field(),
            metric_date_field: defaults::metric_date_field(),
            metric_components: defaults::metric_components(),
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV report path
    #[serde(default = "defaults::output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: defaults::output_path(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "exhibit-crawler/0.1 (contact@example.com)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn metric_timeout() -> u64 {
        10
    }
    pub fn request_interval() -> u64 {
        110
    }
    pub fn max_retries() -> u32 {
        3
    }

    // Scan defaults
    pub fn lookback_days() -> u32 {
        30
    }
    pub fn day_workers() -> usize {
        3
    }
    pub fn form_types() -> Vec<String> {
        vec!["8-K".into(), "8-K/A".into()]
    }

    // Exhibit defaults
    pub fn designator() -> String {
        "99.1".into()
    }
    pub fn context_lines() -> usize {
        5
    }

    // Screen defaults
    pub fn filing_workers() -> usize {
        8
    }
    pub fn progress_every() -> usize {
        25
    }

    // Source defaults
    pub fn archives_base() -> String {
        "https://www.sec.gov".into()
    }
    pub fn data_base() -> String {
        "https://data.sec.gov".into()
    }
    pub fn tickers_url() -> String {
        "https://www.sec.gov/files/company_tickers.json".into()
    }
    pub fn metric_series_field() -> String {
        "series".into()
    }
    pub fn metric_date_field() -> String {
        "date".into()
    }
    pub fn metric_components() -> Vec<String> {
        vec!["callVolume".into(), "putVolume".into()]
    }

    // Output defaults
    pub fn output_path() -> String {
        "exhibit_filings.csv".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.screen.filing_workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scan.day_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_threshold_without_metric_source() {
        let mut config = Config::default();
        config.screen.min_metric = 10_000;
        assert!(config.validate().is_err());

        config.sources.metric_url = "https://metrics.example.com/{symbol}".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            request_interval_ms = 250

            [screen]
            min_metric = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.crawler.request_interval_ms, 250);
        assert_eq!(config.crawler.max_retries, 3);
        assert_eq!(config.screen.min_metric, 500);
        assert_eq!(config.screen.filing_workers, 8);
        assert_eq!(config.exhibit.designator, "99.1");
        assert_eq!(config.scan.form_types, vec!["8-K", "8-K/A"]);
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml"));
        assert_eq!(config.crawler.request_interval_ms, 110);
    }
}
