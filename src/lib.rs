// src/lib.rs

//! Exhibit Crawler Library
//!
//! Scans the SEC daily indexes for current reports that carry a given
//! press-release exhibit, resolves their tickers and screens them by a
//! liquidity metric.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod services;
pub mod utils;
