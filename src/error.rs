// src/error.rs

//! Unified error handling for the crawler application.

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote fetch failed after classification
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regex compilation failed
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested date range could not be understood
    #[error("Invalid date range: {0}")]
    DateRange(String),

    /// Not a single day index could be obtained from the filing source
    #[error("Filing source unavailable: {failed} of {requested} day indexes failed, none fetched")]
    SourceUnavailable { requested: usize, failed: usize },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a date range error.
    pub fn date_range(message: impl Into<String>) -> Self {
        Self::DateRange(message.into())
    }
}

/// Transport-level failure of a single request.
///
/// The variant decides the retry policy: transient failures are retried up to
/// the configured bound, `NotFound` advances to the next fallback at once, and
/// `Rejected` is treated as permanent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server error (HTTP {0})")]
    Server(u16),

    #[error("not found (HTTP {0})")]
    NotFound(u16),

    #[error("rejected (HTTP {0})")]
    Rejected(u16),

    #[error("failed to read body: {0}")]
    Body(String),
}

impl FetchError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 | 410 => Self::NotFound(status),
            429 | 500..=599 => Self::Server(status),
            _ => Self::Rejected(status),
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connect(_) | Self::Server(_) | Self::Body(_)
        )
    }

    /// Whether the resource definitively does not exist.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<&reqwest::Error> for FetchError {
    fn from(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if let Some(status) = error.status() {
            Self::from_status(status.as_u16())
        } else if error.is_body() || error.is_decode() {
            Self::Body(error.to_string())
        } else {
            Self::Connect(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(FetchError::from_status(404), FetchError::NotFound(404));
        assert_eq!(FetchError::from_status(503), FetchError::Server(503));
        assert_eq!(FetchError::from_status(429), FetchError::Server(429));
        assert_eq!(FetchError::from_status(403), FetchError::Rejected(403));
    }

    #[test]
    fn test_transient_and_absent() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Server(502).is_transient());
        assert!(!FetchError::NotFound(404).is_transient());
        assert!(FetchError::NotFound(404).is_absent());
        assert!(!FetchError::Rejected(403).is_transient());
        assert!(!FetchError::Rejected(403).is_absent());
    }
}
