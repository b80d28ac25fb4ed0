//! Crawler module for listing traversal and article extraction
//!
//! This module contains the core crawling logic, including:
//! - Page fetching with retry and optional snapshots
//! - Listing parsing and pagination stop conditions
//! - Detail page extraction (content, title, publication date)
//! - Overall crawl orchestration in bounded batches

mod extractor;
mod fetcher;
mod listing;
mod orchestrator;
mod paginator;
mod snapshot;

pub use extractor::{ArticleExtractor, DateStrategy, ExtractedArticle};
pub(crate) use extractor::collapse_whitespace;
pub use fetcher::{build_http_client, http_get, PageFetcher, PAGE_PLACEHOLDER};
pub use listing::ListingParser;
pub use orchestrator::BatchCrawlOrchestrator;
pub use paginator::{ListingPaginator, PaginatorState, StopReason};
pub use snapshot::SnapshotStore;

use crate::config::Config;
use crate::history::CrawlHistoryStore;
use crate::output::{CrawlSummary, RecordSink};
use crate::TidingsError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Load the crawl history (or start from an empty one)
/// 2. Load the relevance model, when configured
/// 3. Acquire the session resources
/// 4. Page through listings and process candidates
/// 5. Deliver accepted records to `sink`
/// 6. Release the session and report
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Ignore and overwrite any existing crawl history
/// * `sink` - Receives accepted records in batches
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed; per-item failures are counted inside
/// * `Err(TidingsError)` - Setup failed before any page was fetched
pub async fn crawl<S>(config: &Config, fresh: bool, sink: &mut S) -> Result<CrawlSummary, TidingsError>
where
    S: RecordSink + ?Sized,
{
    let history = if fresh {
        tracing::info!("Starting with empty crawl history");
        CrawlHistoryStore::new(&config.history.path)
    } else {
        let history = CrawlHistoryStore::open(&config.history.path)?;
        tracing::info!(
            urls = history.len(),
            path = %history.path().display(),
            "Loaded crawl history"
        );
        history
    };

    let mut orchestrator = BatchCrawlOrchestrator::new(config, history)?;
    let summary = orchestrator.run(sink).await?;
    Ok(summary)
}
