//! HTTP fetching of source listing pages.
//!
//! # Architecture
//!
//! - [`Fetch`]: Core trait, one GET per source page yielding HTML or a typed failure
//! - [`HttpFetcher`]: `reqwest` implementation with a browser-like request profile
//! - [`RetryFetch`]: Decorator that adds bounded retries to any `Fetch`
//!
//! The pipeline never retries on its own. With `max_retries = 0` the decorator
//! is a pass-through, so a failed source is simply skipped for the cycle.
//!
//! # Retry Strategy
//!
//! - Only transient failures (timeout, transport error, 5xx) are retried
//! - Exponential backoff from `base_delay`, capped at 30 seconds
//! - Random jitter (0-250ms) added to every delay

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Why a source page could not be used this cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error status {0}")]
    Status(u16),
    #[error("non-HTML content type: {0:?}")]
    NotHtml(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Failures worth retrying: timeouts, transport errors and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Transport(_) => true,
            FetchError::Status(code) => *code >= 500,
            FetchError::NotHtml(_) | FetchError::Client(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// A successfully fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the body was served from, after redirects.
    pub final_url: Url,
    pub html: String,
}

/// Fetch a single page as HTML.
pub trait Fetch {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// `reqwest` based fetcher that only accepts HTML responses.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with a per-request `timeout` and browser-like headers.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Applied to the whole request, body included
    /// * `user_agent` - Falls back to a desktop Chrome string when `None`
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the client cannot be built, e.g. for a
    /// user agent that is not a valid header value.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .default_headers(headers)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let t0 = Instant::now();
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !content_type.contains("html") {
            return Err(FetchError::NotHtml(content_type));
        }

        let final_url = response.url().clone();
        let html = response.text().await?;
        debug!(
            bytes = html.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            %final_url,
            "Fetched page"
        );
        Ok(FetchedPage { final_url, html })
    }
}

/// Wrapper that adds exponential backoff retries to any [`Fetch`] implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    /// Wrap `inner` with up to `max_retries` extra attempts.
    ///
    /// # Arguments
    ///
    /// * `inner` - Fetcher that performs each attempt
    /// * `max_retries` - Retries after the first attempt; `0` disables retrying
    /// * `base_delay` - Delay before the first retry, doubled for each later one
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch,
{
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(page) => return Ok(page),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            error!(attempt, max = self.max_retries, error = %e, "fetch exhausted retries");
                        }
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
