//! Listing pagination and stop conditions
//!
//! The paginator walks listing pages 1, 2, 3, ... and decides when to stop:
//! after a run of consecutive pages without any in-window article, or at the
//! hard page cap, whichever comes first.

use crate::config::CrawlerConfig;
use std::fmt;

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// `empty_page_threshold` consecutive pages had no recent articles
    EmptyPages,
    /// `max_pages` pages were visited
    HardCap,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyPages => "empty-pages",
            Self::HardCap => "hard-cap",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paginator lifecycle: `Scanning -> Stopping -> Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorState {
    /// More pages will be requested
    Scanning,
    /// A stop condition fired; the current batch may still be flushed
    Stopping(StopReason),
    /// Finished; no further pages
    Done(StopReason),
}

impl PaginatorState {
    pub fn is_scanning(&self) -> bool {
        matches!(self, Self::Scanning)
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            Self::Scanning => None,
            Self::Stopping(reason) | Self::Done(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for PaginatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scanning => f.write_str("scanning"),
            Self::Stopping(reason) => write!(f, "stopping ({})", reason),
            Self::Done(reason) => write!(f, "done ({})", reason),
        }
    }
}

/// Tracks the listing page cursor and the consecutive-empty counter
#[derive(Debug, Clone)]
pub struct ListingPaginator {
    page: u32,
    consecutive_empty: u32,
    pages_visited: u32,
    empty_page_threshold: u32,
    max_pages: u32,
    state: PaginatorState,
}

impl ListingPaginator {
    /// Creates a paginator positioned at page 1
    ///
    /// Zero limits are raised to 1 so that at least one page is visited.
    pub fn new(empty_page_threshold: u32, max_pages: u32) -> Self {
        Self {
            page: 1,
            consecutive_empty: 0,
            pages_visited: 0,
            empty_page_threshold: empty_page_threshold.max(1),
            max_pages: max_pages.max(1),
            state: PaginatorState::Scanning,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.empty_page_threshold, config.max_pages)
    }

    /// The page to request next, or `None` once a stop condition fired
    pub fn next_page(&self) -> Option<u32> {
        self.state.is_scanning().then_some(self.page)
    }

    /// Records a fetched page with `recent` in-window articles
    ///
    /// # Transitions
    ///
    /// | Condition (checked in order) | Effect |
    /// |------------------------------|--------|
    /// | `recent > 0` | counter reset to 0 |
    /// | `recent == 0` | counter + 1 |
    /// | counter reaches threshold | `Stopping(EmptyPages)` |
    /// | page reaches `max_pages` | `Stopping(HardCap)` |
    /// | otherwise | advance to the next page |
    pub fn record_page(&mut self, recent: usize) -> PaginatorState {
        if !self.state.is_scanning() {
            return self.state;
        }

        if recent > 0 {
            self.consecutive_empty = 0;
        } else {
            self.consecutive_empty += 1;
        }
        self.pages_visited += 1;

        tracing::debug!(
            page = self.page,
            recent,
            consecutive_empty = self.consecutive_empty,
            "Recorded listing page"
        );

        if self.consecutive_empty >= self.empty_page_threshold {
            tracing::info!(
                page = self.page,
                threshold = self.empty_page_threshold,
                "Stopping: consecutive pages without recent articles"
            );
            self.state = PaginatorState::Stopping(StopReason::EmptyPages);
            return self.state;
        }

        self.advance_or_cap()
    }

    /// Records a listing page that could not be fetched
    ///
    /// The page is skipped without touching the consecutive-empty counter;
    /// the hard cap still applies.
    pub fn record_failure(&mut self) -> PaginatorState {
        if !self.state.is_scanning() {
            return self.state;
        }

        self.pages_visited += 1;
        tracing::warn!(page = self.page, "Skipping listing page that could not be fetched");
        self.advance_or_cap()
    }

    fn advance_or_cap(&mut self) -> PaginatorState {
        if self.page >= self.max_pages {
            tracing::warn!(
                max_pages = self.max_pages,
                "Stopping: hard page cap reached before the listing ran dry"
            );
            self.state = PaginatorState::Stopping(StopReason::HardCap);
        } else {
            self.page += 1;
        }
        self.state
    }

    /// Moves `Stopping` to `Done`, returning the stop reason
    ///
    /// Returns `None` while still scanning.
    pub fn finish(&mut self) -> Option<StopReason> {
        match self.state {
            PaginatorState::Scanning => None,
            PaginatorState::Stopping(reason) | PaginatorState::Done(reason) => {
                self.state = PaginatorState::Done(reason);
                Some(reason)
            }
        }
    }

    pub fn state(&self) -> PaginatorState {
        self.state
    }

    /// Current page cursor (1-based)
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty
    }

    /// Pages recorded so far, fetched or failed
    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }
}
