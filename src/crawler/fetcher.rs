//! Page fetching
//!
//! This module handles every request the crawler makes:
//! - Building the session's HTTP client with the configured user agent and timeouts
//! - Plain GET or render-driver fetches, chosen by configuration
//! - Status and transport error classification
//! - Retry with backoff around each fetch
//! - Optional raw snapshots of fetched pages

use crate::config::{Config, FetchConfig, FetchStrategy, SiteConfig};
use crate::crawler::SnapshotStore;
use crate::resources::CrawlSession;
use crate::retry::{error_for_status, error_for_transport, RetryPolicy};
use crate::FetchError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Placeholder replaced by the page number in listing URL templates
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration (user agent and timeouts)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use tidings::config::FetchConfig;
/// use tidings::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends one GET and classifies the outcome
///
/// # Status Handling
///
/// | Condition | Error |
/// |-----------|-------|
/// | 2xx | none, body returned |
/// | HTTP 429 | `Throttled` (retried) |
/// | HTTP 5xx | `ServerError` (retried) |
/// | other non-2xx | `PermanentFetch` |
/// | Timeout / connect / reset | `TransientNetwork` (retried) |
/// | Undecodable body | `Decode` |
pub async fn http_get(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| error_for_transport(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(error_for_status(url, status));
    }

    response
        .text()
        .await
        .map_err(|e| error_for_transport(url, &e))
}

/// Fetches listing and detail pages for one site
#[derive(Debug)]
pub struct PageFetcher {
    strategy: FetchStrategy,
    listing_url: String,
    first_page_url: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
    snapshots: Option<SnapshotStore>,
}

impl PageFetcher {
    pub fn new(fetch: &FetchConfig, site: &SiteConfig, retry: RetryPolicy) -> Self {
        Self {
            strategy: fetch.strategy,
            listing_url: site.listing_url.clone(),
            first_page_url: site.first_page_url.clone(),
            timeout: fetch.timeout(),
            retry,
            snapshots: fetch.snapshot_dir.as_deref().map(SnapshotStore::new),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.fetch,
            &config.site,
            RetryPolicy::from_config(&config.retry),
        )
    }

    pub fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    /// URL of listing page `page` (1-based)
    ///
    /// Page 1 uses the distinct first-page URL when one is configured.
    pub fn listing_url(&self, page: u32) -> String {
        match (&self.first_page_url, page) {
            (Some(first), 1) => first.clone(),
            _ => self.listing_url.replace(PAGE_PLACEHOLDER, &page.to_string()),
        }
    }

    /// Fetches listing page `page`, retrying transient failures
    pub async fn fetch_listing(&self, session: &CrawlSession, page: u32) -> Result<String, FetchError> {
        let url = self.listing_url(page);
        self.fetch(session, &url, "listing").await
    }

    /// Fetches an article page, retrying transient failures
    pub async fn fetch_detail(&self, session: &CrawlSession, url: &str) -> Result<String, FetchError> {
        self.fetch(session, url, "detail").await
    }

    async fn fetch(&self, session: &CrawlSession, url: &str, kind: &str) -> Result<String, FetchError> {
        let label = format!("{} {}", kind, url);
        let outcome = self
            .retry
            .run(&label, |_| self.fetch_once(session, url))
            .await;

        tracing::debug!(
            url,
            attempts = outcome.attempts(),
            success = outcome.is_success(),
            "Fetch finished"
        );

        let html = outcome.into_result()?;
        if let Some(snapshots) = &self.snapshots {
            snapshots.record(url, &html).await;
        }
        Ok(html)
    }

    async fn fetch_once(&self, session: &CrawlSession, url: &str) -> Result<String, FetchError> {
        match self.strategy {
            FetchStrategy::Http => http_get(session.client(), url).await,
            FetchStrategy::Rendered => match session.driver() {
                Some(driver) => driver.render(url, self.timeout).await,
                None => Err(FetchError::PermanentFetch {
                    url: url.to_string(),
                    status: None,
                    reason: "session has no render driver".to_string(),
                }),
            },
        }
    }
}
