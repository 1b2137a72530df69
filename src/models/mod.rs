// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod filing;
mod record;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, ExhibitConfig, OutputConfig, ScanConfig, ScreenConfig, SourcesConfig,
};
pub use filing::{FilingRecord, canonicalize_accession, normalize_entity_key};
pub use record::{
    DetectionResult, Identifier, ResultRecord, UNRESOLVED, rank, sort_results,
};
