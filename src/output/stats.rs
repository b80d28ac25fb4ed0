//! End-of-run crawl statistics
//!
//! The orchestrator fills a [`CrawlSummary`] as it goes. At the end of the
//! run it is logged through tracing and, from the CLI, printed to stdout.

use crate::crawler::StopReason;
use std::time::Duration;

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    // Listing pages
    pub pages_scanned: u32,
    pub listing_failures: u32,

    // Candidates
    pub candidates_seen: u64,
    pub recent_candidates: u64,
    pub undated_listing_entries: u64,
    /// Listing date outside the window; never fetched
    pub stale_listing_entries: u64,
    pub already_seen: u64,

    // Detail pages
    pub detail_failures: u64,
    pub extraction_failures: u64,
    pub undated: u64,
    /// Detail-page date outside the window
    pub stale: u64,

    // Relevance
    pub keyword_accepted: u64,
    pub ml_accepted: u64,
    pub rejected: u64,
    pub accepted: u64,

    // Delivery
    pub history_failures: u64,
    pub sink_failures: u64,
    pub batches: u64,

    pub stop_reason: Option<StopReason>,
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Articles that were fetched but dropped before the relevance check
    pub fn skipped_after_fetch(&self) -> u64 {
        self.extraction_failures + self.undated + self.stale
    }

    /// Share of relevance-checked articles that were accepted, in percent
    pub fn acceptance_rate(&self) -> f64 {
        let checked = self.accepted + self.rejected;
        if checked == 0 {
            return 0.0;
        }
        (self.accepted as f64 / checked as f64) * 100.0
    }

    /// Logs the summary as one structured event
    pub fn log(&self) {
        tracing::info!(
            pages_scanned = self.pages_scanned,
            listing_failures = self.listing_failures,
            candidates_seen = self.candidates_seen,
            recent_candidates = self.recent_candidates,
            undated_listing_entries = self.undated_listing_entries,
            stale_listing_entries = self.stale_listing_entries,
            already_seen = self.already_seen,
            detail_failures = self.detail_failures,
            extraction_failures = self.extraction_failures,
            undated = self.undated,
            stale = self.stale,
            keyword_accepted = self.keyword_accepted,
            ml_accepted = self.ml_accepted,
            rejected = self.rejected,
            accepted = self.accepted,
            history_failures = self.history_failures,
            sink_failures = self.sink_failures,
            batches = self.batches,
            stop_reason = self.stop_reason.map(|r| r.as_str()),
            elapsed_secs = self.elapsed.as_secs_f64(),
            "Crawl finished"
        );
    }
}

/// Prints a summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Listing:");
    println!("  Pages scanned: {}", summary.pages_scanned);
    println!("  Listing failures: {}", summary.listing_failures);
    match summary.stop_reason {
        Some(reason) => println!("  Stop reason: {}", reason),
        None => println!("  Stop reason: (none)"),
    }
    println!();

    println!("Candidates:");
    println!("  Seen: {}", summary.candidates_seen);
    println!("  Recent (listing date): {}", summary.recent_candidates);
    println!("  Without listing date: {}", summary.undated_listing_entries);
    println!("  Stale (listing date): {}", summary.stale_listing_entries);
    println!("  Already in history: {}", summary.already_seen);
    println!();

    println!("Detail Pages:");
    println!("  Fetch failures: {}", summary.detail_failures);
    println!("  Extraction failures: {}", summary.extraction_failures);
    println!("  Undated: {}", summary.undated);
    println!("  Stale: {}", summary.stale);
    println!();

    println!("Relevance:");
    println!("  Keyword matches: {}", summary.keyword_accepted);
    println!("  Model recommendations: {}", summary.ml_accepted);
    println!("  Rejected: {}", summary.rejected);
    println!(
        "  Accepted: {} ({:.1}%)",
        summary.accepted,
        summary.acceptance_rate()
    );
    println!();

    println!("Delivery:");
    println!("  Batches: {}", summary.batches);
    println!("  Sink failures: {}", summary.sink_failures);
    println!("  History write failures: {}", summary.history_failures);
    println!();

    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
}
