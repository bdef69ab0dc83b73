//! HTTP fetch capability.
//!
//! The pipeline talks to the network through the [`Fetcher`] trait so the
//! actual client stays a pluggable collaborator; tests substitute a canned
//! implementation and never touch the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Raw payload of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchBody {
    pub body: String,
    pub content_type: String,
}

/// A source of raw payloads for fetch URLs.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one URL. Rate-limit signals and transport hiccups surface as
    /// `AppError::Transient`; anything else non-retryable as
    /// `AppError::Fetch`.
    async fn fetch(&self, url: &str) -> Result<FetchBody>;
}

/// Fetcher backed by a reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchBody> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                AppError::transient(url, e)
            } else {
                AppError::fetch(url, e)
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(AppError::transient(url, format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/plain")
            .split(';')
            .next()
            .unwrap_or("text/plain")
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| AppError::transient(url, format!("body read failed: {e}")))?;

        Ok(FetchBody { body, content_type })
    }
}
