//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests of a mirror run, including:
//! - Building the HTTP client with the configured user agent string
//! - Bounding the number of requests in flight
//! - Retry logic for transient failures
//! - Skip-if-present downloads into the output tree
//! - Error classification

use crate::config::{Config, UserAgentConfig};
use crate::storage::{Storage, StorageError};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Errors returned by the fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Invalid response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Failed to store {url}: {source}")]
    Storage { url: String, source: StorageError },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Outcome of a download into the output tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was fetched and written
    Downloaded,
    /// The file already existed and no request was made
    Skipped,
}

/// Retry and concurrency settings of a [`Fetcher`]
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Base delay, multiplied by the attempt number
    pub base_delay: Duration,
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use wikimirror::config::UserAgentConfig;
/// use wikimirror::mirror::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "wikimirror".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.org/about".to_string(),
///     contact_email: "ops@example.org".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Bounded-retry HTTP client shared by every component of a run
///
/// Cloning is cheap; clones share the client and the concurrency limit.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    permits: Arc<Semaphore>,
    policy: RetryPolicy,
}

enum AttemptError {
    Transient(String),
    Permanent(FetchError),
}

impl Fetcher {
    /// Creates a fetcher allowing `max_in_flight` concurrent requests
    pub fn new(client: Client, max_in_flight: usize, policy: RetryPolicy) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            policy,
        }
    }

    /// Creates a fetcher from the run configuration
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let client = build_http_client(&config.user_agent)?;
        Ok(Self::new(
            client,
            config.mirror.max_concurrent_requests as usize,
            RetryPolicy {
                max_retries: config.mirror.max_retries,
                base_delay: Duration::from_millis(config.mirror.retry_delay_ms),
            },
        ))
    }

    /// Fetches a URL and returns its body
    ///
    /// # Retry Logic
    ///
    /// | Condition              | Action                               |
    /// |------------------------|--------------------------------------|
    /// | HTTP 2xx               | Return the body                      |
    /// | HTTP 429, HTTP 5xx     | Retry after `base_delay * attempt`   |
    /// | Connection / timeout   | Retry after `base_delay * attempt`   |
    /// | Other HTTP status      | Immediate `FetchError::Status`       |
    ///
    /// After `max_retries` retries the result is `FetchError::RetriesExhausted`.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let attempts = self.policy.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(AttemptError::Permanent(e)) => return Err(e),
                Err(AttemptError::Transient(message)) => {
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        url,
                        message
                    );
                    last_error = message;
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }

    async fn attempt(&self, url: &str) -> Result<Vec<u8>, AttemptError> {
        // The permit is only held for the request itself, never during back-off
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(describe_transport_error(&e)))?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::Transient(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(AttemptError::Permanent(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        response
            .bytes()
            .await
            .map(|body| body.to_vec())
            .map_err(|e| AttemptError::Transient(describe_transport_error(&e)))
    }

    /// Fetches a URL and decodes its body as UTF-8 (lossily)
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Fetches a URL and deserializes its JSON body
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.fetch_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Downloads a URL into the output tree
    ///
    /// Existing files are left alone unless `force` is set, in which case
    /// they are replaced once the new body has been fully received.
    pub async fn download_to_file(
        &self,
        storage: &dyn Storage,
        url: &str,
        relative: &Path,
        force: bool,
    ) -> Result<DownloadOutcome, FetchError> {
        if !force && storage.exists(relative) {
            tracing::info!("{} already downloaded, skipping", relative.display());
            return Ok(DownloadOutcome::Skipped);
        }

        tracing::info!("Downloading {} at {}", url, relative.display());
        let body = self.fetch_bytes(url).await?;
        storage
            .write(relative, &body)
            .map_err(|source| FetchError::Storage {
                url: url.to_string(),
                source,
            })?;

        Ok(DownloadOutcome::Downloaded)
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
