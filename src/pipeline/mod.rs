//! Pipeline entry points.
//!
//! - `run_pipeline`: Scan the daily indexes of a date range and screen every
//!   filing for the target exhibit

pub mod run;
pub mod screen;

pub use run::{RunReport, run_pipeline};
pub use screen::{ResultSink, ScreenOutcome, ScreenStats, Screener, passes_threshold};
