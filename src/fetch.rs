//! Document fetching with bounded retry.
//!
//! The pipeline never talks to the network directly; it goes through the
//! [`FetchDocument`] trait so tests can hand it fixtures instead.
//!
//! - [`HttpFetcher`]: reqwest-backed fetcher with a hard per-request timeout
//! - [`RetryFetch`]: decorator adding exponential backoff with jitter
//! - [`LocalFileFetch`]: decorator serving `file://` URLs from disk
//! - [`StaticFetcher`]: in-memory fetcher keyed by URL, for fixtures
//!
//! # Retry Strategy
//!
//! - Transport errors, timeouts and 5xx/429 responses are retried
//! - Other 4xx responses fail immediately
//! - Delay doubles from `base_delay`, capped at 5 seconds, plus 0-250ms jitter

use crate::document::Document;
use crate::error::FetchError;
use rand::{Rng, rng};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// User-Agent sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("news_reconcile/", env!("CARGO_PKG_VERSION"));

/// Capability to fetch an arbitrary URL as a [`Document`].
pub trait FetchDocument {
    /// Fetch `url`, returning the body wrapped as a document.
    async fn fetch(&self, url: &str) -> Result<Document, FetchError>;
}

/// Fetcher backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: StdDuration,
}

impl HttpFetcher {
    /// Build a fetcher whose requests are abandoned after `timeout`.
    pub fn new(timeout: StdDuration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout.min(StdDuration::from_secs(5)))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|source| FetchError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { client, timeout })
    }
}

impl FetchDocument for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let http_err = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }
            } else {
                FetchError::Http {
                    url: url.to_string(),
                    source,
                }
            }
        };

        let t0 = Instant::now();
        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(http_err)?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched document"
        );
        Ok(Document::new(final_url, body))
    }
}

/// Wrapper that retries transient fetch failures with exponential backoff.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchDocument,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(5),
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

fn is_transient(e: &FetchError) -> bool {
    match e {
        FetchError::Http { .. } | FetchError::Timeout { .. } => true,
        FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        FetchError::Io { .. } | FetchError::NotFound { .. } => false,
    }
}

impl<T> FetchDocument for RetryFetch<T>
where
    T: FetchDocument,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(doc) => return Ok(doc),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if !is_transient(&e) || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() giving up"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Reads `file://` URLs from disk and passes every other URL to `inner`.
///
/// A saved page that declares `<link rel="canonical">` is returned under its
/// canonical URL, so site matching sees the original address instead of the
/// local path.
#[derive(Debug, Clone)]
pub struct LocalFileFetch<T> {
    inner: T,
}

impl<T> LocalFileFetch<T>
where
    T: FetchDocument,
{
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T> FetchDocument for LocalFileFetch<T>
where
    T: FetchDocument,
{
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let Some(path) = url.strip_prefix("file://") else {
            return self.inner.fetch(url).await;
        };
        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FetchError::Io {
                url: url.to_string(),
                source,
            })?;
        let document = Document::new(url, body);
        match document.canonical_url() {
            Some(canonical) => {
                debug!(%url, %canonical, "Local page mapped to canonical URL");
                Ok(Document::new(canonical, document.into_body()))
            }
            None => Ok(document),
        }
    }
}

/// In-memory fetcher: serves bodies registered per URL, `NotFound` otherwise.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

impl FetchDocument for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        self.pages
            .get(url)
            .map(|body| Document::new(url, body.as_str()))
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with a transient error `failures` times, then succeeds.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
        status: u16,
    }

    impl FetchDocument for Flaky {
        async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: self.status,
                })
            } else {
                Ok(Document::new(url, "<p>ok</p>"))
            }
        }
    }

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticFetcher::new().with_page("https://a.test/1", "<p>x</p>");
        let doc = fetcher.fetch("https://a.test/1").await.unwrap();
        assert_eq!(doc.body(), "<p>x</p>");
        assert!(matches!(
            fetcher.fetch("https://a.test/2").await,
            Err(FetchError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_local_file_fetch() {
        let dir = std::env::temp_dir()
            .join(format!("news_reconcile_local_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let saved = dir.join("saved.html");
        std::fs::write(
            &saved,
            r#"<html><head><link rel="canonical" href="https://www.kompas.com/read/x"></head></html>"#,
        )
        .unwrap();
        let plain = dir.join("plain.html");
        std::fs::write(&plain, "<p>lokal</p>").unwrap();

        let fetcher =
            LocalFileFetch::new(StaticFetcher::new().with_page("https://a.test/1", "<p>x</p>"));

        let doc = fetcher.fetch(&format!("file://{}", saved.display())).await.unwrap();
        assert_eq!(doc.url(), "https://www.kompas.com/read/x");

        let plain_url = format!("file://{}", plain.display());
        let doc = fetcher.fetch(&plain_url).await.unwrap();
        assert_eq!(doc.url(), plain_url);
        assert_eq!(doc.body(), "<p>lokal</p>");

        let doc = fetcher.fetch("https://a.test/1").await.unwrap();
        assert_eq!(doc.body(), "<p>x</p>");

        let missing = format!("file://{}", dir.join("missing.html").display());
        assert!(matches!(fetcher.fetch(&missing).await, Err(FetchError::Io { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient() {
        let inner = Flaky {
            failures: 2,
            calls: AtomicUsize::new(0),
            status: 503,
        };
        let fetcher = RetryFetch::new(inner, 3, StdDuration::from_millis(10));
        let doc = fetcher.fetch("https://a.test/").await.unwrap();
        assert_eq!(doc.body(), "<p>ok</p>");
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_is_bounded() {
        let inner = Flaky {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
            status: 500,
        };
        let fetcher = RetryFetch::new(inner, 2, StdDuration::from_millis(10));
        assert!(fetcher.fetch("https://a.test/").await.is_err());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_skips_permanent_errors() {
        let inner = Flaky {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
            status: 404,
        };
        let fetcher = RetryFetch::new(inner, 5, StdDuration::from_millis(10));
        assert!(fetcher.fetch("https://a.test/").await.is_err());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }
}
