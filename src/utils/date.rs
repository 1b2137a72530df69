// src/utils/date.rs

//! Date range and business-day helpers.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::{AppError, Result};

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AppError::date_range(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build the scan window from optional explicit bounds.
    ///
    /// Missing `end` defaults to `today`; missing `start` defaults to
    /// `lookback_days` before the end.
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        lookback_days: u32,
        today: NaiveDate,
    ) -> Result<Self> {
        let end = match end {
            Some(raw) => parse_date(raw)
                .ok_or_else(|| AppError::date_range(format!("cannot parse end date '{raw}'")))?,
            None => today,
        };
        let start = match start {
            Some(raw) => parse_date(raw)
                .ok_or_else(|| AppError::date_range(format!("cannot parse start date '{raw}'")))?,
            None => end
                .checked_sub_days(Days::new(u64::from(lookback_days)))
                .ok_or_else(|| AppError::date_range("lookback window underflows"))?,
        };
        Self::new(start, end)
    }

    /// Weekdays in the range, oldest first.
    pub fn business_days(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .filter(|d| is_business_day(*d))
            .collect()
    }
}

/// Monday through Friday. Holidays are not modelled.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Calendar quarter (1-4) of a date.
pub fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// Parse `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}
