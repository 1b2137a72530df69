// src/services/rate_limiter.rs

//! Process-wide request spacing.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between consecutive grants across all callers.
///
/// Callers queue on a fair mutex guarding the time of the last grant, so
/// grants are handed out in lock acquisition order.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_grant: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until `min_interval` has passed since the previous grant.
    pub async fn acquire(&self) {
        let mut last_grant = self.last_grant.lock().await;
        if let Some(previous) = *last_grant {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_grant = Some(Instant::now());
    }
}
