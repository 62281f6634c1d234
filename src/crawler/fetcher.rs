//! HTTP fetcher for listing pages
//!
//! This module handles:
//! - Building HTTP clients carrying the site's request headers
//! - GET requests for listing pages
//! - The linear-backoff retry policy for transient failures
//! - Error classification

use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Why a single page request failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request failed for {url}: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = e.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Upper bound on a single backoff sleep
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(600);

/// How often and how patiently a page fetch is retried
///
/// The delay before retry `n` (1-based) is `base_delay * n * multiplier`,
/// capped at [`MAX_RETRY_DELAY`]; there is no delay after the final attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per page, at least 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier,
        }
    }

    /// A policy that retries without sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, 1.0)
    }

    /// Delay to wait after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = self.base_delay.as_secs_f64() * self.multiplier * f64::from(attempt);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs)
            .map(|delay| delay.min(MAX_RETRY_DELAY))
            .unwrap_or(MAX_RETRY_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), 1.0)
    }
}

/// Builds an HTTP client sending `headers` with every request
///
/// # Example
///
/// ```no_run
/// use catalog_crawler::crawler::build_http_client;
/// use reqwest::header::HeaderMap;
/// use std::time::Duration;
///
/// let client = build_http_client(HeaderMap::new(), Duration::from_secs(20)).unwrap();
/// ```
pub fn build_http_client(headers: HeaderMap, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches listing pages
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a page once; any non-2xx status is an error
    pub async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }

    /// Fetches a page, retrying failures according to `policy`
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Timeout | Retry after `delay_for(attempt)` |
    /// | Non-2xx status | Retry after `delay_for(attempt)` |
    /// | Connection / transport error | Retry after `delay_for(attempt)` |
    /// | Final attempt fails | Return the last error |
    pub async fn fetch_with_retry(&self, url: &str, policy: &RetryPolicy) -> Result<String, FetchError> {
        let mut attempt = 1;

        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    tracing::debug!("Fetched {} (attempt {})", url, attempt);
                    return Ok(body);
                }
                Err(e) => {
                    tracing::warn!("{} (attempt {}/{})", e, attempt, policy.max_attempts);

                    if attempt >= policy.max_attempts {
                        tracing::error!("Max retries reached for {}", url);
                        return Err(e);
                    }

                    tokio::time::sleep(policy.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
