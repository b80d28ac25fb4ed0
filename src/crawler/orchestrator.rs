//! Batch crawl orchestration
//!
//! This module contains the main crawl loop that ties the pipeline together:
//! - Paging through listings until a stop condition fires
//! - Filtering candidates by recency and crawl history
//! - Fetching, extracting and filtering detail pages
//! - Persisting history after every acceptance, before delivery
//! - Delivering each accepted record to the sink as soon as it is recorded
//! - Flushing and sampling memory at bounded batch boundaries

use crate::config::{Config, CrawlerConfig};
use crate::crawler::{ArticleExtractor, ListingPaginator, ListingParser, PageFetcher};
use crate::dates::RecencyWindow;
use crate::history::CrawlHistoryStore;
use crate::models::{ArticleRecord, ListingEntry};
use crate::output::{CrawlSummary, RecordSink};
use crate::relevance::{load_predictor, RelevanceFilter, RelevancePredictor};
use crate::resources::{CrawlSession, ResourceError, ResourceLifecycleManager, SessionTask};
use crate::{ParseError, TidingsError};
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Drives one crawl session end-to-end
pub struct BatchCrawlOrchestrator {
    site_name: String,
    offset: FixedOffset,
    crawler: CrawlerConfig,
    fetcher: PageFetcher,
    listing: ListingParser,
    extractor: ArticleExtractor,
    filter: RelevanceFilter,
    predictor: Option<Box<dyn RelevancePredictor>>,
    history: CrawlHistoryStore,
    resources: Arc<ResourceLifecycleManager>,
}

impl BatchCrawlOrchestrator {
    /// Creates an orchestrator around an already-loaded history
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawl configuration
    /// * `history` - Crawl history to deduplicate against and append to
    ///
    /// # Returns
    ///
    /// * `Ok(BatchCrawlOrchestrator)` - Ready to run
    /// * `Err(TidingsError)` - A selector or the model artifact is invalid
    pub fn new(config: &Config, history: CrawlHistoryStore) -> Result<Self, TidingsError> {
        let predictor = load_predictor(config.filter.model_path.as_deref().map(Path::new))?
            .map(|model| Box::new(model) as Box<dyn RelevancePredictor>);

        Ok(Self {
            site_name: config.site.name.clone(),
            offset: config.site.utc_offset,
            crawler: config.crawler.clone(),
            fetcher: PageFetcher::from_config(config),
            listing: ListingParser::new(&config.site)?,
            extractor: ArticleExtractor::from_site(&config.site)?,
            filter: RelevanceFilter::from_config(&config.filter),
            predictor,
            history,
            resources: Arc::new(ResourceLifecycleManager::from_config(config)),
        })
    }

    /// Creates an orchestrator, loading history from the configured path
    pub fn from_config(config: &Config) -> Result<Self, TidingsError> {
        let history = CrawlHistoryStore::open(&config.history.path)?;
        Self::new(config, history)
    }

    /// Replaces the relevance predictor
    pub fn with_predictor(mut self, predictor: Box<dyn RelevancePredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Replaces the resource manager (custom driver launcher or sampler)
    pub fn with_resources(mut self, resources: ResourceLifecycleManager) -> Self {
        self.resources = Arc::new(resources);
        self
    }

    pub fn history(&self) -> &CrawlHistoryStore {
        &self.history
    }

    pub fn into_history(self) -> CrawlHistoryStore {
        self.history
    }

    /// Runs one crawl, delivering accepted records to `sink`
    ///
    /// Per-item failures are counted in the returned summary and never end
    /// the run. The only error is failing to acquire the session.
    pub async fn run<S>(&mut self, sink: &mut S) -> Result<CrawlSummary, ResourceError>
    where
        S: RecordSink + ?Sized,
    {
        let resources = Arc::clone(&self.resources);
        let mut task = CrawlTask {
            orchestrator: self,
            sink,
        };
        resources.scope(&mut task).await
    }

    async fn crawl<S>(&mut self, session: &CrawlSession, sink: &mut S) -> CrawlSummary
    where
        S: RecordSink + ?Sized,
    {
        let started = Instant::now();
        let window = RecencyWindow::starting_today(self.crawler.recency_days, self.offset);
        let mut paginator = ListingPaginator::from_config(&self.crawler);
        let mut summary = CrawlSummary::new();

        tracing::info!(
            site = %self.site_name,
            earliest = %window.earliest(),
            today = %window.today(),
            history = self.history.len(),
            "Starting crawl"
        );

        while let Some(page) = paginator.next_page() {
            let html = match self.fetcher.fetch_listing(session, page).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(page, error = %e, "Listing page failed");
                    summary.listing_failures += 1;
                    paginator.record_failure();
                    continue;
                }
            };
            summary.pages_scanned += 1;

            let entries = self.listing.parse(&html);
            drop(html);

            let (candidates, recent) = select_candidates(entries, &window, &mut summary);
            tracing::info!(
                page,
                candidates = candidates.len(),
                recent,
                "Scanned listing page"
            );

            for chunk in candidates.chunks(self.crawler.batch_size.max(1)) {
                for entry in chunk {
                    if let Some(record) = self.process_candidate(session, entry, &window, &mut summary).await {
                        self.commit(sink, &record, &mut summary);
                    }
                }
                self.end_batch(sink, &mut summary);
            }

            paginator.record_page(recent);
        }

        if let Err(e) = sink.flush() {
            tracing::warn!("Failed to flush sink: {}", e);
        }

        summary.stop_reason = paginator.finish();
        summary.elapsed = started.elapsed();
        summary.log();
        summary
    }

    /// Takes one candidate from history check to record
    ///
    /// Returns `None` whenever the article is skipped; the reason is
    /// counted in `summary`.
    async fn process_candidate(
        &self,
        session: &CrawlSession,
        entry: &ListingEntry,
        window: &RecencyWindow,
        summary: &mut CrawlSummary,
    ) -> Option<ArticleRecord> {
        let url = entry.url.as_str();

        if self.history.seen(url) {
            tracing::debug!(url, "Already in history");
            summary.already_seen += 1;
            return None;
        }

        let html = match self.fetcher.fetch_detail(session, &entry.link).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url, link = %entry.link, error = %e, "Detail page failed");
                summary.detail_failures += 1;
                return None;
            }
        };
        let article = self.extractor.extract(&html);
        drop(html);

        let content = match article.content {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(url, error = %e, "Skipping article without extractable content");
                summary.extraction_failures += 1;
                return None;
            }
        };

        let title = match article.title.or_else(|| entry.title.clone()) {
            Some(title) => title,
            None => {
                tracing::debug!(url, "{}", ParseError::TitleNotFound);
                String::new()
            }
        };

        let Some(published_at) = article.published_at.or(entry.published_at) else {
            tracing::warn!(
                url,
                title = %title,
                listing_date = entry.date_text.as_deref(),
                "Audit: no parseable publication date; article excluded"
            );
            summary.undated += 1;
            return None;
        };

        if !window.contains(&published_at) {
            tracing::debug!(url, %published_at, "Outside recency window");
            summary.stale += 1;
            return None;
        }

        let verdict = self.filter.accept(&title, &content, self.predictor.as_deref());
        if !verdict.accepted {
            tracing::debug!(url, title = %title, "Rejected as not relevant");
            summary.rejected += 1;
            return None;
        }
        if verdict.keyword_match() {
            summary.keyword_accepted += 1;
        }
        if verdict.ml_recommended {
            summary.ml_accepted += 1;
        }

        summary.accepted += 1;

        tracing::info!(
            url,
            title = %title,
            keywords = ?verdict.matched_keywords,
            ml = verdict.ml_recommended,
            "Accepted article"
        );

        Some(ArticleRecord {
            url: url.to_string(),
            title,
            published_at: Some(published_at),
            source: self.site_name.clone(),
            content,
            matched_keywords: verdict.matched_keywords,
            ml_recommended: verdict.ml_recommended,
            crawled_at: Utc::now(),
        })
    }

    /// Records an accepted article in history, then hands it to the sink
    ///
    /// History is persisted before delivery, so a crash loses at most the
    /// record in flight. A record the sink refuses is taken back out of
    /// history so a later run picks it up again.
    fn commit<S>(&mut self, sink: &mut S, record: &ArticleRecord, summary: &mut CrawlSummary)
    where
        S: RecordSink + ?Sized,
    {
        self.history.add(record.url.as_str());
        self.persist_history(&record.url, summary);

        let failure = sink
            .deliver(std::slice::from_ref(record))
            .into_iter()
            .find_map(Result::err);

        if let Some(e) = failure {
            tracing::warn!(url = %record.url, "Sink failed to take record: {}", e);
            summary.sink_failures += 1;
            if self.history.remove(&record.url) {
                self.persist_history(&record.url, summary);
            }
        }
    }

    fn persist_history(&self, url: &str, summary: &mut CrawlSummary) {
        if let Err(e) = self.history.persist() {
            tracing::warn!(url, path = %self.history.path().display(), "Failed to persist history: {}", e);
            summary.history_failures += 1;
        }
    }

    /// Batch boundary: flushes the sink and samples memory
    fn end_batch<S>(&self, sink: &mut S, summary: &mut CrawlSummary)
    where
        S: RecordSink + ?Sized,
    {
        if let Err(e) = sink.flush() {
            tracing::warn!("Failed to flush sink: {}", e);
        }
        summary.batches += 1;

        tracing::debug!(
            batches = summary.batches,
            rss_mb = self.resources.sample_memory().map(|bytes| bytes / (1024 * 1024)),
            "Batch boundary"
        );
    }
}

/// Splits listing entries into candidates and counts the recent ones
///
/// Entries dated inside the window are recent candidates. Undated entries
/// stay candidates (the detail page decides) but are not recent. Entries
/// dated outside the window are dropped as stale.
fn select_candidates(
    entries: Vec<ListingEntry>,
    window: &RecencyWindow,
    summary: &mut CrawlSummary,
) -> (Vec<ListingEntry>, usize) {
    let mut recent = 0;
    let mut candidates = Vec::with_capacity(entries.len());

    for entry in entries {
        summary.candidates_seen += 1;
        match &entry.published_at {
            Some(ts) if window.contains(ts) => {
                recent += 1;
                summary.recent_candidates += 1;
                candidates.push(entry);
            }
            Some(_) => summary.stale_listing_entries += 1,
            None => {
                summary.undated_listing_entries += 1;
                candidates.push(entry);
            }
        }
    }

    (candidates, recent)
}

/// The orchestrator's share of a session: borrowed for one `scope` call
struct CrawlTask<'a, S: ?Sized> {
    orchestrator: &'a mut BatchCrawlOrchestrator,
    sink: &'a mut S,
}

#[async_trait(?Send)]
impl<'a, S> SessionTask for CrawlTask<'a, S>
where
    S: RecordSink + ?Sized,
{
    type Output = CrawlSummary;

    async fn run(&mut self, session: &mut CrawlSession) -> CrawlSummary {
        self.orchestrator.crawl(session, &mut *self.sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn window() -> RecencyWindow {
        let offset = FixedOffset::east_opt(0).unwrap();
        RecencyWindow::new(3, chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(), offset)
    }

    fn entry(n: u32, days_ago: Option<i64>) -> ListingEntry {
        let offset = FixedOffset::east_opt(0).unwrap();
        let today = offset.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        ListingEntry {
            url: format!("https://news.example.com/a/{}", n),
            link: format!("https://news.example.com/a/{}/", n),
            title: None,
            date_text: None,
            published_at: days_ago.map(|d| today - Duration::days(d)),
        }
    }

    #[test]
    fn test_select_candidates() {
        let mut summary = CrawlSummary::new();
        let entries = vec![
            entry(1, Some(0)),
            entry(2, Some(10)),
            entry(3, None),
            entry(4, Some(3)),
        ];

        let (candidates, recent) = select_candidates(entries, &window(), &mut summary);

        let urls: Vec<&str> = candidates.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://news.example.com/a/1",
                "https://news.example.com/a/3",
                "https://news.example.com/a/4",
            ]
        );
        assert_eq!(recent, 2);
        assert_eq!(summary.candidates_seen, 4);
        assert_eq!(summary.recent_candidates, 2);
        assert_eq!(summary.undated_listing_entries, 1);
        assert_eq!(summary.stale_listing_entries, 1);
        assert_eq!(summary.stale, 0);
    }

    #[test]
    fn test_undated_only_page_counts_as_empty() {
        let mut summary = CrawlSummary::new();
        let (candidates, recent) =
            select_candidates(vec![entry(1, None), entry(2, None)], &window(), &mut summary);
        assert_eq!(candidates.len(), 2);
        assert_eq!(recent, 0);
    }
}
