// src/services/client.rs

//! Rate-limited, retrying access to the remote sources.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::services::RateLimiter;
use crate::utils::http::Fetcher;

/// Shared entry point for every outbound request.
///
/// The limiter is acquired before each attempt, retries included.
#[derive(Clone)]
pub struct SourceClient {
    fetcher: Arc<dyn Fetcher>,
    limiter: Arc<RateLimiter>,
    max_attempts: u32,
}

impl SourceClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, limiter: Arc<RateLimiter>, max_attempts: u32) -> Self {
        Self {
            fetcher,
            limiter,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Fetch `url`, retrying transient failures up to the attempt bound.
    ///
    /// Definitive failures (not found, rejected) return immediately.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            match self.get_once(url, timeout).await {
                Ok(body) => return Ok(body),
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    log::debug!(
                        "Attempt {}/{} for {} failed: {}; retrying",
                        attempt,
                        self.max_attempts,
                        url,
                        error
                    );
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Fetch `url` with a single rate-limited attempt.
    pub async fn get_once(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.limiter.acquire().await;
        self.fetcher.get_text(url, timeout).await
    }
}
