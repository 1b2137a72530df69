// src/utils/http.rs

//! HTTP client utilities.
//!
//! Every remote source is reached through the [`Fetcher`] trait so that the
//! services can be exercised against scripted responses in tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{FetchError, Result};
use crate::models::CrawlerConfig;

/// A single outbound GET returning the response body as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get_text(&self, url: &str, timeout: Duration) -> std::result::Result<String, FetchError>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// [`Fetcher`] backed by `reqwest`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_text(&self, url: &str, timeout: Duration) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        response.text().await.map_err(|e| FetchError::from(&e))
    }
}
