// src/services/metrics.rs

//! Liquidity metric fetcher.
//!
//! Queries the secondary source for an identifier's series, picks the nearest
//! scheduled point and sums its two components. Every failure degrades to 0.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate};
use serde_json::Value;

use crate::models::{Config, Identifier};
use crate::services::SourceClient;
use crate::services::tickers::plausible_symbol;

/// Field names used to read a metric response.
#[derive(Debug, Clone)]
pub struct MetricShape {
    pub series_field: String,
    pub date_field: String,
    pub components: [String; 2],
}

impl MetricShape {
    pub fn from_config(config: &Config) -> Self {
        let sources = &config.sources;
        let component = |i: usize| sources.metric_components.get(i).cloned().unwrap_or_default();
        Self {
            series_field: sources.metric_series_field.clone(),
            date_field: sources.metric_date_field.clone(),
            components: [component(0), component(1)],
        }
    }

    /// Aggregate a response body into a metric value.
    ///
    /// Returns `None` when the body has no usable series.
    pub fn aggregate(&self, doc: &Value, today: NaiveDate) -> Option<u64> {
        let series = match doc {
            Value::Array(points) => points,
            Value::Object(_) => doc.get(&self.series_field)?.as_array()?,
            _ => return None,
        };
        let point = self.nearest_point(series, today)?;

        let total: f64 = self
            .components
            .iter()
            .map(|field| point.get(field).map(component_value).unwrap_or(0.0))
            .sum();
        // f64 to u64 casts saturate
        Some(total.max(0.0) as u64)
    }

    /// Earliest point dated today or later, else the latest dated point,
    /// else the first point.
    fn nearest_point<'a>(&self, series: &'a [Value], today: NaiveDate) -> Option<&'a Value> {
        let dated: Vec<(NaiveDate, &Value)> = series
            .iter()
            .filter_map(|p| p.get(&self.date_field).and_then(point_date).map(|d| (d, p)))
            .collect();

        dated
            .iter()
            .filter(|(d, _)| *d >= today)
            .min_by_key(|(d, _)| *d)
            .or_else(|| dated.iter().max_by_key(|(d, _)| *d))
            .map(|(_, p)| *p)
            .or_else(|| series.first())
    }
}

/// Numeric value of a series component; anything unusable counts as 0.
fn component_value(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if number.is_finite() { number } else { 0.0 }
}

fn point_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => crate::utils::date::parse_date(s),
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0).map(|dt| dt.date_naive()),
        _ => None,
    }
}

/// Service for fetching the liquidity metric of an identifier.
pub struct MetricFetcher {
    client: Arc<SourceClient>,
    url_template: Option<String>,
    shape: MetricShape,
    timeout: Duration,
}

impl MetricFetcher {
    pub fn new(config: &Config, client: Arc<SourceClient>) -> Self {
        let url_template = config
            .sources
            .has_metric_source()
            .then(|| config.sources.metric_url.trim().to_string());
        Self {
            client,
            url_template,
            shape: MetricShape::from_config(config),
            timeout: config.crawler.metric_timeout(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url_template.is_some()
    }

    /// Metric for `identifier`; 0 when unresolved, unavailable or on error.
    pub async fn fetch(&self, identifier: &Identifier) -> u64 {
        let Some(template) = &self.url_template else {
            return 0;
        };
        let Some(symbol) = identifier.symbol().and_then(plausible_symbol) else {
            return 0;
        };

        let url = template.replace("{symbol}", &symbol);
        let body = match self.client.get_once(&url, self.timeout).await {
            Ok(body) => body,
            Err(error) => {
                log::debug!("Metric fetch for {} failed: {}", symbol, error);
                return 0;
            }
        };

        let today = Local::now().date_naive();
        match serde_json::from_str::<Value>(&body) {
            Ok(doc) => self.shape.aggregate(&doc, today).unwrap_or(0),
            Err(error) => {
                log::debug!("Metric response for {} unparsable: {}", symbol, error);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::FetchError;
    use crate::services::RateLimiter;
    use crate::utils::http::testing::ScriptedFetcher;

    const METRIC_URL: &str = "https://metrics.example.com/options/{symbol}";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn shape() -> MetricShape {
        MetricShape::from_config(&Config::default())
    }

    fn fetcher_for(scripted: Arc<ScriptedFetcher>) -> MetricFetcher {
        let mut config = Config::default();
        config.sources.metric_url = METRIC_URL.into();
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1)));
        let client = Arc::new(SourceClient::new(scripted, limiter, 3));
        MetricFetcher::new(&config, client)
    }

    #[test]
    fn test_nan_component_counts_as_zero() {
        let doc = json!({"series": [{"date": "2024-03-08", "callVolume": 1200, "putVolume": "NaN"}]});
        assert_eq!(shape().aggregate(&doc, today()), Some(1200));

        let doc = json!([{"date": "2024-03-08", "callVolume": null, "putVolume": 345.0}]);
        assert_eq!(shape().aggregate(&doc, today()), Some(345));
    }

    #[test]
    fn test_nearest_scheduled_point() {
        let doc = json!({"series": [
            {"date": "2024-03-01", "callVolume": 1, "putVolume": 1},
            {"date": "2024-03-15", "callVolume": 100, "putVolume": 0},
            {"date": "2024-03-08", "callVolume": 10, "putVolume": 5},
        ]});
        assert_eq!(shape().aggregate(&doc, today()), Some(15));

        let past_only = json!({"series": [
            {"date": "2024-02-01", "callVolume": 1, "putVolume": 1},
            {"date": "2024-02-15", "callVolume": 7, "putVolume": 0},
        ]});
        assert_eq!(shape().aggregate(&past_only, today()), Some(7));
    }

    #[test]
    fn test_negative_total_is_clamped() {
        let doc = json!({"series": [{"callVolume": -50, "putVolume": 10}]});
        assert_eq!(shape().aggregate(&doc, today()), Some(0));
    }

    #[test]
    fn test_unusable_body() {
        assert_eq!(shape().aggregate(&json!({"data": []}), today()), None);
        assert_eq!(shape().aggregate(&json!({"series": []}), today()), None);
        assert_eq!(shape().aggregate(&json!("text"), today()), None);
    }

    #[tokio::test]
    async fn test_unresolved_short_circuits() {
        let scripted = Arc::new(ScriptedFetcher::new());
        let fetcher = fetcher_for(Arc::clone(&scripted));

        assert_eq!(fetcher.fetch(&Identifier::Unresolved).await, 0);
        assert_eq!(fetcher.fetch(&Identifier::Symbol("not a symbol".into())).await, 0);
        assert_eq!(scripted.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_never_fails_and_is_not_retried() {
        let url = METRIC_URL.replace("{symbol}", "BYND");
        let scripted = Arc::new(
            ScriptedFetcher::new()
                .fail(&url, FetchError::Timeout)
                .ok(&url, "not json"),
        );
        let fetcher = fetcher_for(Arc::clone(&scripted));
        let id = Identifier::Symbol("BYND".into());

        assert_eq!(fetcher.fetch(&id).await, 0);
        assert_eq!(scripted.calls_to(&url), 1);
        assert_eq!(fetcher.fetch(&id).await, 0);
    }

    #[tokio::test]
    async fn test_fetch_sums_components() {
        let url = METRIC_URL.replace("{symbol}", "ONDS");
        let scripted = Arc::new(ScriptedFetcher::new().ok(
            &url,
            r#"{"series": [{"date": "2999-01-01", "callVolume": 9000, "putVolume": 1000}]}"#,
        ));
        let fetcher = fetcher_for(scripted);

        assert_eq!(fetcher.fetch(&Identifier::Symbol("ONDS".into())).await, 10_000);
    }

    #[tokio::test]
    async fn test_disabled_source_returns_zero() {
        let scripted = Arc::new(ScriptedFetcher::new());
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1)));
        let client = Arc::new(SourceClient::new(scripted.clone(), limiter, 3));
        let fetcher = MetricFetcher::new(&Config::default(), client);

        assert!(!fetcher.is_enabled());
        assert_eq!(fetcher.fetch(&Identifier::Symbol("AAPL".into())).await, 0);
        assert_eq!(scripted.total_calls(), 0);
    }
}
