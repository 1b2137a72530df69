//! Identifier, detection and result types.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;

use super::FilingRecord;

/// Text shown for an identifier that could not be resolved.
pub const UNRESOLVED: &str = "N/A";

/// Public trading symbol of an entity, or the unresolved sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Symbol(String),
    Unresolved,
}

impl Identifier {
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Identifier::Symbol(s) => Some(s),
            Identifier::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Identifier::Symbol(_))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol().unwrap_or(UNRESOLVED))
    }
}

/// Outcome of searching a filing for the target exhibit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    /// Absolute document URL, empty when nothing was found
    pub document_url: String,
    /// 1-based ordinal of the winning strategy, 0 when nothing was found
    pub strategy: u8,
    pub found: bool,
}

impl DetectionResult {
    pub fn found(document_url: impl Into<String>, strategy: u8) -> Self {
        Self {
            document_url: document_url.into(),
            strategy,
            found: true,
        }
    }

    pub fn not_found() -> Self {
        Self {
            document_url: String::new(),
            strategy: 0,
            found: false,
        }
    }
}

/// A filing that carries the target exhibit and passed the metric filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub display_name: String,
    pub entity_key: String,
    pub accession: String,
    pub filing_date: NaiveDate,
    pub raw_index_url: String,
    pub identifier: Identifier,
    pub metric: u64,
    pub document_url: String,
}

impl ResultRecord {
    pub fn new(
        filing: &FilingRecord,
        identifier: Identifier,
        metric: u64,
        document_url: String,
    ) -> Self {
        Self {
            display_name: filing.display_name.clone(),
            entity_key: filing.entity_key.clone(),
            accession: filing.accession.clone(),
            filing_date: filing.filing_date,
            raw_index_url: filing.raw_index_url.clone(),
            identifier,
            metric,
            document_url,
        }
    }

    /// Accession number in its dashed canonical form.
    pub fn accession_dashed(&self) -> String {
        super::canonicalize_accession(&self.accession)
    }
}

/// Report ordering: metric descending, then filing date descending, then
/// entity key ascending.
pub fn rank(a: &ResultRecord, b: &ResultRecord) -> Ordering {
    b.metric
        .cmp(&a.metric)
        .then_with(|| b.filing_date.cmp(&a.filing_date))
        .then_with(|| compare_entity_keys(&a.entity_key, &b.entity_key))
}

/// Sort records into report order.
pub fn sort_results(records: &mut [ResultRecord]) {
    records.sort_by(rank);
}

/// Numeric comparison of normalized CIKs, falling back to text order.
fn compare_entity_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}
