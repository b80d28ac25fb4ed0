//! Tidings: a resilient news crawl-and-extraction pipeline
//!
//! This crate pages through the article listings of a single news site,
//! extracts structured records from the detail pages, filters them for
//! relevance and hands accepted records to a downstream sink in batches.

pub mod config;
pub mod crawler;
pub mod dates;
pub mod history;
pub mod models;
pub mod output;
pub mod relevance;
pub mod resources;
pub mod retry;
pub mod url;

use thiserror::Error;

/// Main error type for Tidings operations
#[derive(Debug, Error)]
pub enum TidingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("History error: {0}")]
    History(#[from] history::HistoryError),

    #[error("Resource error: {0}")]
    Resource(#[from] resources::ResourceError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Predictor error: {0}")]
    Predictor(#[from] relevance::PredictorError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors raised while fetching a listing or detail page
///
/// The variants double as the failure taxonomy used by
/// [`retry::RetryPolicy`]: see [`retry::Classify`] for which ones are retried.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Connection reset/refused, timeouts and other transport hiccups
    #[error("Transient network error for {url}: {reason}")]
    TransientNetwork { url: String, reason: String },

    /// HTTP 429
    #[error("Throttled by {url} (HTTP {status})")]
    Throttled { url: String, status: u16 },

    /// HTTP 5xx
    #[error("Server error for {url} (HTTP {status})")]
    ServerError { url: String, status: u16 },

    /// 4xx other than throttling, malformed URLs, missing driver
    #[error("Permanent fetch error for {url}: {reason}")]
    PermanentFetch {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// Response body could not be decoded
    #[error("Failed to decode body from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl FetchError {
    /// The URL the failed fetch was aimed at
    pub fn url(&self) -> &str {
        match self {
            Self::TransientNetwork { url, .. }
            | Self::Throttled { url, .. }
            | Self::ServerError { url, .. }
            | Self::PermanentFetch { url, .. }
            | Self::Decode { url, .. } => url,
        }
    }

    /// HTTP status code, when the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Throttled { status, .. } | Self::ServerError { status, .. } => Some(*status),
            Self::PermanentFetch { status, .. } => *status,
            Self::TransientNetwork { .. } | Self::Decode { .. } => None,
        }
    }
}

/// Field-level extraction failures
///
/// These never abort an article on their own: the affected field is
/// downgraded to missing and the remaining fields are still extracted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("No content selector yielded at least {min_chars} characters ({tried} tried)")]
    ContentNotFound { tried: usize, min_chars: usize },

    #[error("No title found")]
    TitleNotFound,
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Tidings operations
pub type Result<T> = std::result::Result<T, TidingsError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::BatchCrawlOrchestrator;
pub use dates::{DateParser, RecencyWindow};
pub use history::CrawlHistoryStore;
pub use models::ArticleRecord;
pub use output::{CrawlSummary, RecordSink};
pub use relevance::{RelevanceFilter, RelevancePredictor};
pub use retry::RetryPolicy;
pub use url::normalize_url;
