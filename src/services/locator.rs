// src/services/locator.rs

//! Exhibit document locator.
//!
//! Walks the candidate pages of a filing in order and applies the detection
//! strategies to each until one yields a document URL.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::Result;
use crate::models::{Config, DetectionResult, FilingRecord};
use crate::services::SourceClient;
use crate::services::strategies::{ExhibitPattern, detect_first};

/// Service for finding the target exhibit of a filing.
pub struct DocumentLocator {
    client: Arc<SourceClient>,
    pattern: ExhibitPattern,
    archives_base: String,
    timeout: Duration,
}

impl DocumentLocator {
    pub fn new(config: &Config, client: Arc<SourceClient>) -> Result<Self> {
        let pattern = ExhibitPattern::new(&config.exhibit.designator)?
            .with_context_lines(config.exhibit.context_lines);
        Ok(Self {
            client,
            pattern,
            archives_base: config.sources.archives_base.trim_end_matches('/').to_string(),
            timeout: config.crawler.timeout(),
        })
    }

    /// Pages to inspect for `filing`, most specific first.
    pub fn candidate_urls(&self, filing: &FilingRecord) -> Vec<String> {
        let dashed = filing.accession_dashed();
        let folder = format!(
            "{}/Archives/edgar/data/{}/{}",
            self.archives_base, filing.entity_key, filing.accession
        );

        let mut urls = vec![
            format!("{folder}/{dashed}-index.htm"),
            format!("{folder}/{dashed}-index.html"),
            format!(
                "{}/cgi-bin/viewer?action=view&cik={}&accession_number={}",
                self.archives_base, filing.entity_key, dashed
            ),
            filing.raw_index_url.clone(),
        ];
        let mut seen = std::collections::HashSet::new();
        urls.retain(|u| !u.is_empty() && seen.insert(u.clone()));
        urls
    }

    /// Locate the exhibit document of `filing`.
    pub async fn locate(&self, filing: &FilingRecord) -> DetectionResult {
        for candidate in self.candidate_urls(filing) {
            let Ok(base) = Url::parse(&candidate) else {
                log::debug!("Skipping unparsable candidate {}", candidate);
                continue;
            };

            let content = match self.client.get(&candidate, self.timeout).await {
                Ok(content) => content,
                Err(error) => {
                    log::debug!("Candidate {} unavailable: {}", candidate, error);
                    continue;
                }
            };

            if let Some((strategy, url)) = detect_first(&self.pattern, &content, &base) {
                log::debug!(
                    "Exhibit {} for {} found by {} strategy on {}",
                    self.pattern.designator(),
                    filing.accession_dashed(),
                    strategy.name(),
                    candidate
                );
                return DetectionResult::found(url.to_string(), strategy.ordinal());
            }
        }
        DetectionResult::not_found()
    }
}
