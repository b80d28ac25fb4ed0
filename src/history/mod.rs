//! Persistent crawl history
//!
//! The history is the set of article URLs that have already been accepted.
//! It lives in a single JSON document and is rewritten atomically after every
//! acceptance, so a killed process loses at most the article in flight.

mod store;

pub use store::{CrawlHistoryStore, HISTORY_VERSION};

use thiserror::Error;

/// Errors that can occur while loading or persisting history
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error on history file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize history: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to replace history file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Unsupported history version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;
