// src/services/tickers.rs

//! CIK to ticker resolution.
//!
//! A bulk mapping is loaded once per run; misses fall back to the per-entity
//! submissions document.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{Config, Identifier, normalize_entity_key};
use crate::services::SourceClient;

/// Normalize a candidate token, keeping it only if it looks like a ticker.
///
/// A ticker is 1-6 alphanumerics with at least one letter, optionally
/// followed by a `.` or `-` share-class suffix of 1-3 alphanumerics.
pub fn plausible_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    let (base, suffix) = match symbol.split_once(['.', '-']) {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (symbol.as_str(), None),
    };

    let alnum = |part: &str, max: usize| {
        (1..=max).contains(&part.len()) && part.chars().all(|c| c.is_ascii_alphanumeric())
    };
    let shaped = alnum(base, 6) && suffix.is_none_or(|s| alnum(s, 3));
    let has_letter = symbol.chars().any(|c| c.is_ascii_alphabetic());
    (shaped && has_letter).then_some(symbol)
}

/// Pull a ticker out of a submissions document.
///
/// Tries `ticker`, then `tradingSymbol`, then the `tickers` array, then a
/// parenthesized symbol in `name`.
pub fn extract_identifier(doc: &Value) -> Option<String> {
    let scalar = |field: &str| doc.get(field).and_then(Value::as_str).and_then(plausible_symbol);

    scalar("ticker")
        .or_else(|| scalar("tradingSymbol"))
        .or_else(|| {
            doc.get("tickers")
                .and_then(Value::as_array)
                .and_then(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .find_map(plausible_symbol)
                })
        })
        .or_else(|| {
            let name = doc.get("name").and_then(Value::as_str)?;
            let re = Regex::new(r"\(([A-Za-z0-9]{1,6}(?:[.-][A-Za-z0-9]{1,3})?)\)").ok()?;
            let caps = re.captures(name)?;
            plausible_symbol(caps.get(1)?.as_str())
        })
}

/// Parse the bulk mapping, keeping the first ticker listed per entity.
///
/// Accepts an object of entries (the published layout) or a plain array.
pub fn parse_bulk(doc: &Value) -> HashMap<String, String> {
    let entries: Box<dyn Iterator<Item = &Value>> = match doc {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => Box::new(std::iter::empty()),
    };

    let mut mapping = HashMap::new();
    for entry in entries {
        let cik = match entry.get("cik_str").or_else(|| entry.get("cik")) {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => continue,
        };
        let Some(key) = normalize_entity_key(&cik) else {
            continue;
        };
        let Some(symbol) = entry
            .get("ticker")
            .and_then(Value::as_str)
            .and_then(plausible_symbol)
        else {
            continue;
        };
        mapping.entry(key).or_insert(symbol);
    }
    mapping
}

/// In-memory CIK to ticker cache with network fallback.
pub struct IdentifierCache {
    client: Arc<SourceClient>,
    tickers_url: String,
    data_base: String,
    timeout: Duration,
    entries: RwLock<HashMap<String, String>>,
}

impl IdentifierCache {
    pub fn new(config: &Config, client: Arc<SourceClient>) -> Self {
        Self {
            client,
            tickers_url: config.sources.tickers_url.clone(),
            data_base: config.sources.data_base.trim_end_matches('/').to_string(),
            timeout: config.crawler.timeout(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Populate the cache from the bulk mapping.
    ///
    /// Failures are logged and leave the cache empty; every lookup then
    /// falls back to the per-entity document. Returns the entry count.
    pub async fn load(&self) -> usize {
        let mapping = match self.fetch_bulk().await {
            Ok(mapping) => mapping,
            Err(error) => {
                log::warn!("Could not load ticker mapping: {}", error);
                return 0;
            }
        };

        let mut entries = self.entries.write().await;
        for (key, symbol) in mapping {
            entries.entry(key).or_insert(symbol);
        }
        entries.len()
    }

    async fn fetch_bulk(&self) -> Result<HashMap<String, String>> {
        let body = self.client.get(&self.tickers_url, self.timeout).await?;
        let doc: Value = serde_json::from_str(&body)?;
        Ok(parse_bulk(&doc))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Submissions document URL for an entity.
    pub fn submissions_url(&self, entity_key: &str) -> String {
        format!("{}/submissions/CIK{:0>10}.json", self.data_base, entity_key)
    }

    /// Resolve an entity key to its ticker.
    ///
    /// Unresolved lookups are not cached so that a later call may retry.
    pub async fn resolve(&self, entity_key: &str) -> Identifier {
        let Some(key) = normalize_entity_key(entity_key) else {
            return Identifier::Unresolved;
        };

        if let Some(symbol) = self.entries.read().await.get(&key) {
            return Identifier::Symbol(symbol.clone());
        }

        match self.lookup(&key).await {
            Some(symbol) => {
                let mut entries = self.entries.write().await;
                let stored = entries.entry(key).or_insert(symbol);
                Identifier::Symbol(stored.clone())
            }
            None => Identifier::Unresolved,
        }
    }

    async fn lookup(&self, key: &str) -> Option<String> {
        let url = self.submissions_url(key);
        let body = match self.client.get(&url, self.timeout).await {
            Ok(body) => body,
            Err(error) => {
                log::debug!("Ticker lookup for CIK {} failed: {}", key, error);
                return None;
            }
        };
        let doc: Value = serde_json::from_str(&body)
            .map_err(|e| log::debug!("Ticker lookup for CIK {} unparsable: {}", key, e))
            .ok()?;
        extract_identifier(&doc)
    }
}
