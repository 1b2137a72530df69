//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Request spacing (`RateLimiter`) and retrying access (`SourceClient`)
//! - Daily index enumeration (`IndexScanner`)
//! - Exhibit detection (`DocumentLocator`, `ExhibitPattern`, `Strategy`)
//! - Ticker resolution (`IdentifierCache`)
//! - Liquidity metrics (`MetricFetcher`)

mod client;
mod index;
mod locator;
mod metrics;
mod rate_limiter;
pub mod strategies;
pub mod tickers;

pub use client::SourceClient;
pub use index::{IndexScanner, ParsedIndex, ScanOutcome};
pub use locator::DocumentLocator;
pub use metrics::{MetricFetcher, MetricShape};
pub use rate_limiter::RateLimiter;
pub use strategies::{ExhibitPattern, Strategy};
pub use tickers::IdentifierCache;
