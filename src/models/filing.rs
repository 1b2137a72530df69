//! Filing record data structure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Number of digits in a compact accession number.
const ACCESSION_DIGITS: usize = 18;

/// A filing discovered in a daily index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilingRecord {
    /// Registrant CIK without leading zeros
    pub entity_key: String,

    /// Registrant name as listed in the index
    pub display_name: String,

    /// Accession number without separators (18 digits)
    pub accession: String,

    /// Date the filing was accepted
    pub filing_date: NaiveDate,

    /// URL of the full submission text file
    pub raw_index_url: String,
}

impl FilingRecord {
    /// Build a record, rejecting malformed keys and accession numbers.
    pub fn new(
        entity_key: &str,
        display_name: &str,
        accession: &str,
        filing_date: NaiveDate,
        raw_index_url: impl Into<String>,
    ) -> Result<Self> {
        let entity_key = normalize_entity_key(entity_key)
            .ok_or_else(|| AppError::validation(format!("invalid entity key '{entity_key}'")))?;

        let compact = strip_separators(accession);
        if compact.len() != ACCESSION_DIGITS || !compact.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::validation(format!(
                "invalid accession number '{accession}'"
            )));
        }

        Ok(Self {
            entity_key,
            display_name: display_name.trim().to_string(),
            accession: compact,
            filing_date,
            raw_index_url: raw_index_url.into(),
        })
    }

    /// Accession number in its dashed canonical form.
    pub fn accession_dashed(&self) -> String {
        canonicalize_accession(&self.accession)
    }

    /// De-duplication key.
    pub fn key(&self) -> (&str, &str) {
        (&self.entity_key, &self.accession)
    }
}

fn strip_separators(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// Canonicalize an accession number to the `XXXXXXXXXX-YY-ZZZZZZ` form.
///
/// Inputs shorter than 12 characters once separators are stripped are
/// returned stripped but otherwise unchanged.
pub fn canonicalize_accession(raw: &str) -> String {
    let stripped = strip_separators(raw);
    if stripped.len() < 12 || !stripped.is_ascii() {
        return stripped;
    }
    format!(
        "{}-{}-{}",
        &stripped[..10],
        &stripped[10..12],
        &stripped[12..]
    )
}

/// Normalize a CIK to its digits without leading zeros.
pub fn normalize_entity_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let normalized = trimmed.trim_start_matches('0');
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}
