//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client from the configured headers and timeout
//! - Full-body GET requests with bounded retry and backoff
//! - Partial preview fetches used for language gating
//! - Bounded-concurrency batches of both

use crate::config::FetchConfig;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised while building the fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("Invalid value for header {0}")]
    InvalidHeaderValue(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Outcome of a full-body fetch
///
/// Failures are values, never errors: every requested address gets one.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub address: String,

    /// Response body, present only on success
    pub body: Option<String>,

    pub succeeded: bool,

    /// Last HTTP status seen, if any response arrived
    pub status: Option<u16>,

    /// Number of requests sent
    pub attempts: u32,
}

impl FetchResult {
    fn success(address: &str, body: String, status: u16, attempts: u32) -> Self {
        Self {
            address: address.to_string(),
            body: Some(body),
            succeeded: true,
            status: Some(status),
            attempts,
        }
    }

    fn failure(address: &str, status: Option<u16>, attempts: u32) -> Self {
        Self {
            address: address.to_string(),
            body: None,
            succeeded: false,
            status,
            attempts,
        }
    }
}

/// How one response status is handled by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    Throttled,
    Terminal,
}

fn classify(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        StatusClass::Throttled
    } else {
        StatusClass::Terminal
    }
}

/// Builds an HTTP client sending `config.headers` on every request
pub fn build_http_client(config: &FetchConfig) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::InvalidHeaderName(name.clone()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| FetchError::InvalidHeaderValue(name.clone()))?;
        headers.insert(header_name, header_value);
    }

    let client = Client::builder()
        .default_headers(headers)
        .timeout(config.timeout())
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Longest single wait between attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Bounded-concurrency fetcher with retry and backoff
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_workers: usize,
    retries: u32,
    backoff_base: Duration,
    transport_backoff: Duration,
    preview_bytes: usize,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(config)?,
            max_workers: config.max_workers.max(1),
            retries: config.retries.max(1),
            backoff_base: config.backoff_base(),
            transport_backoff: config.transport_backoff().min(MAX_BACKOFF),
            preview_bytes: config.preview_bytes,
        })
    }

    /// Default preview size in bytes
    pub fn preview_bytes(&self) -> usize {
        self.preview_bytes
    }

    /// Wait after a throttled response on `attempt` (1-based)
    ///
    /// Saturates at [`MAX_BACKOFF`].
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .checked_mul(attempt)
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }

    /// Fetches the full body of `address`
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Success |
    /// | 403, 429 | Retry after `backoff_base * attempt` |
    /// | Other status | Immediate failure |
    /// | Timeout, connect or body error | Retry after `transport_backoff` |
    ///
    /// No wait follows the final attempt.
    pub async fn fetch_body(&self, address: &str) -> FetchResult {
        let mut last_status = None;

        for attempt in 1..=self.retries {
            let is_last = attempt == self.retries;

            let response = match self.client.get(address).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        "{} -> attempt {}/{} failed: {}",
                        address,
                        attempt,
                        self.retries,
                        e
                    );
                    if !is_last {
                        tokio::time::sleep(self.transport_backoff).await;
                    }
                    continue;
                }
            };

            let status = response.status();
            last_status = Some(status.as_u16());

            match classify(status) {
                StatusClass::Success => match response.text().await {
                    Ok(body) => {
                        tracing::info!("Fetched {} ({})", address, status.as_u16());
                        return FetchResult::success(address, body, status.as_u16(), attempt);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "{} -> body read failed on attempt {}/{}: {}",
                            address,
                            attempt,
                            self.retries,
                            e
                        );
                        if !is_last {
                            tokio::time::sleep(self.transport_backoff).await;
                        }
                    }
                },
                StatusClass::Throttled => {
                    tracing::warn!(
                        "{} -> HTTP {}, attempt {}/{}",
                        address,
                        status.as_u16(),
                        attempt,
                        self.retries
                    );
                    if !is_last {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
                StatusClass::Terminal => {
                    tracing::warn!("{} -> HTTP {}", address, status.as_u16());
                    return FetchResult::failure(address, last_status, attempt);
                }
            }
        }

        tracing::warn!("Giving up on {} after {} attempts", address, self.retries);
        FetchResult::failure(address, last_status, self.retries)
    }

    /// Fetches at most `max_bytes` of the body of `address`
    ///
    /// The body is streamed and the connection dropped once enough bytes
    /// arrived. Any failure yields an empty string.
    pub async fn fetch_preview(&self, address: &str, max_bytes: usize) -> String {
        let response = match self.client.get(address).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Preview failed for {}: {}", address, e);
                return String::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                "Preview failed for {}: HTTP {}",
                address,
                response.status().as_u16()
            );
            return String::new();
        }

        let mut buffer: Vec<u8> = Vec::with_capacity(max_bytes.min(64 * 1024));
        let mut chunks = Box::pin(response.bytes_stream());

        while buffer.len() < max_bytes {
            match chunks.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    tracing::warn!("Preview failed for {}: {}", address, e);
                    return String::new();
                }
                None => break,
            }
        }
        buffer.truncate(max_bytes);

        let preview = String::from_utf8_lossy(&buffer).into_owned();
        tracing::debug!("Preview fetched {} ({} bytes)", address, buffer.len());
        preview
    }

    /// Fetches every distinct address with at most `max_workers` in flight
    ///
    /// The map holds exactly one entry per distinct input address.
    pub async fn fetch_all(&self, addresses: &[String]) -> HashMap<String, FetchResult> {
        let unique = dedupe(addresses);
        let start = Instant::now();

        let results: Vec<FetchResult> = stream::iter(unique.iter())
            .map(|address| self.fetch_body(address))
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        let elapsed = start.elapsed().as_secs_f64();
        let rps = if elapsed > 0.0 {
            unique.len() as f64 / elapsed
        } else {
            0.0
        };
        tracing::info!(
            "Fetch finished ({} addresses in {:.2}s, {:.2} RPS)",
            unique.len(),
            elapsed,
            rps
        );

        results
            .into_iter()
            .map(|result| (result.address.clone(), result))
            .collect()
    }

    /// Preview-fetches every distinct address under the same concurrency bound
    pub async fn fetch_previews(
        &self,
        addresses: &[String],
        max_bytes: usize,
    ) -> HashMap<String, String> {
        let unique = dedupe(addresses);

        stream::iter(unique)
            .map(|address| async move {
                let preview = self.fetch_preview(&address, max_bytes).await;
                (address, preview)
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await
    }
}

fn dedupe(addresses: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    addresses
        .iter()
        .filter(|address| seen.insert(address.as_str()))
        .cloned()
        .collect()
}
