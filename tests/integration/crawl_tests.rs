//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock news sites and test
//! the full crawl cycle end-to-end.

use async_trait::async_trait;
use chrono::{Duration, FixedOffset, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use tidings::config::{parse_config, Config, FetchStrategy};
use tidings::crawler::{crawl, BatchCrawlOrchestrator, SnapshotStore, StopReason};
use tidings::output::{MemorySink, OutputError};
use tidings::resources::{DriverLauncher, RenderDriver, ResourceError, ResourceLifecycleManager};
use tidings::{ArticleRecord, CrawlHistoryStore, FetchError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &str = "The harbor authority approved the terminal expansion on Monday. \
    Construction of the new berths is expected to begin next spring.";

const UNRELATED: &str = "The city marathon drew a record number of runners this weekend, \
    with organizers reporting clear skies and no major incidents.";

/// Creates a test configuration pointing at the mock server
fn create_test_config(
    base_url: &str,
    history: &Path,
    threshold: u32,
    max_pages: u32,
    snapshot_dir: Option<&Path>,
) -> Config {
    let snapshot = snapshot_dir
        .map(|dir| format!("snapshot-dir = \"{}\"", dir.display()))
        .unwrap_or_default();

    let toml = format!(
        r#"
[crawler]
recency-days = 3
empty-page-threshold = {threshold}
max-pages = {max_pages}
batch-size = 2

[retry]
max-attempts = 3
base-delay-ms = 10
max-delay-ms = 50

[fetch]
user-agent = "TidingsTest/1.0"
timeout-secs = 5
{snapshot}

[site]
name = "Harbor Daily"
base-url = "{base_url}/"
listing-url = "{base_url}/list?page={{page}}"
utc-offset = "+00:00"

[filter]
keywords = ["harbor"]

[history]
path = "{history}"
"#,
        threshold = threshold,
        max_pages = max_pages,
        snapshot = snapshot,
        base_url = base_url,
        history = history.display(),
    );

    parse_config(&toml).expect("Failed to parse test config")
}

/// RFC 3339 timestamp `days_ago` days before now
fn days_ago(days: i64) -> String {
    let offset = FixedOffset::east_opt(0).unwrap();
    (Utc::now() - Duration::days(days))
        .with_timezone(&offset)
        .to_rfc3339()
}

/// A listing entry; `None` leaves the date out
fn listing_item(href: &str, title: &str, date: Option<&str>) -> String {
    let date = date
        .map(|d| format!(r#"<time datetime="{}">{}</time>"#, d, d))
        .unwrap_or_default();
    format!(r#"<li><a href="{}">{}</a> {}</li>"#, href, title, date)
}

fn listing_page(items: &[String]) -> String {
    format!(
        r#"<html><body><ul class="news-list">{}</ul></body></html>"#,
        items.join("\n")
    )
}

fn article_page(title: &str, date: Option<&str>, body: &str) -> String {
    let meta = date
        .map(|d| format!(r#"<meta property="article:published_time" content="{}">"#, d))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>{title}</title>{meta}</head>
        <body><h1>{title}</h1><div class="article-content"><p>{body}</p></div></body></html>"#,
        title = title,
        meta = meta,
        body = body
    )
}

async fn mount_listing(server: &MockServer, page: u32, html: String) {
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

async fn mount_article(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_end_to_end() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();
    let history_path = dir.path().join("history.json");

    let today = days_ago(0);
    let stale = days_ago(30);

    mount_listing(
        &server,
        1,
        listing_page(&[
            listing_item("/a/1", "Harbor expansion", Some(&today)),
            listing_item("/a/2", "Marathon", Some(&today)),
            listing_item("/a/3", "Harbor berths", None),
        ]),
    )
    .await;
    mount_listing(&server, 2, listing_page(&[listing_item("/a/4", "Old news", Some(&stale))])).await;
    // Pages 3..=5 are not mounted and answer 404

    mount_article(&server, "/a/1", article_page("Harbor expansion approved", Some(&today), BODY)).await;
    mount_article(&server, "/a/2", article_page("Marathon weekend", Some(&today), UNRELATED)).await;
    mount_article(&server, "/a/3", article_page("New harbor berths", Some(&days_ago(1)), BODY)).await;

    let config = create_test_config(&base, &history_path, 3, 5, None);
    let mut sink = MemorySink::new();
    let summary = crawl(&config, false, &mut sink).await.expect("Crawl failed");

    let urls: Vec<&str> = sink.records().iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec![format!("{}/a/1", base), format!("{}/a/3", base)]);

    let first = &sink.records()[0];
    assert_eq!(first.title, "Harbor expansion approved");
    assert_eq!(first.source, "Harbor Daily");
    assert!(first.content.contains("terminal expansion"));
    assert!(first.matched_keywords.contains("harbor"));
    assert!(!first.ml_recommended);
    assert!(first.published_at.is_some());

    assert_eq!(summary.stop_reason, Some(StopReason::HardCap));
    assert_eq!(summary.pages_scanned, 2);
    assert_eq!(summary.listing_failures, 3);
    assert_eq!(summary.candidates_seen, 4);
    assert_eq!(summary.recent_candidates, 2);
    assert_eq!(summary.undated_listing_entries, 1);
    assert_eq!(summary.stale_listing_entries, 1);
    assert_eq!(summary.stale, 0);
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.keyword_accepted, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.sink_failures, 0);

    // Accepted URLs are persisted
    let saved = std::fs::read_to_string(&history_path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(doc["version"], 1);
    assert_eq!(doc["urls"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_stops_after_consecutive_empty_pages() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();

    let stale = days_ago(20);
    mount_listing(&server, 1, listing_page(&[listing_item("/a/1", "Harbor", Some(&days_ago(0)))])).await;
    mount_listing(&server, 2, listing_page(&[listing_item("/a/2", "Old", Some(&stale))])).await;
    mount_listing(&server, 3, listing_page(&[listing_item("/a/3", "Older", Some(&stale))])).await;
    mount_article(&server, "/a/1", article_page("Harbor news", Some(&days_ago(0)), BODY)).await;

    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&base, &dir.path().join("history.json"), 2, 10, None);
    let mut sink = MemorySink::new();
    let summary = crawl(&config, false, &mut sink).await.unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::EmptyPages));
    assert_eq!(summary.pages_scanned, 3);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_empty_pages_then_recent_page_keeps_scanning() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();

    let stale = listing_page(&[listing_item("/a/old", "Old", Some(&days_ago(40)))]);

    // Page 3 is the only one with a recent article
    mount_listing(
        &server,
        3,
        listing_page(&[listing_item("/a/3", "Harbor", Some(&days_ago(0)))]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stale))
        .mount(&server)
        .await;
    mount_article(&server, "/a/3", article_page("Harbor news", Some(&days_ago(0)), BODY)).await;

    let config = create_test_config(&base, &dir.path().join("history.json"), 3, 10, None);
    let mut sink = MemorySink::new();
    let summary = crawl(&config, false, &mut sink).await.unwrap();

    assert_eq!(sink.len(), 1);
    assert_eq!(sink.records()[0].url, format!("{}/a/3", base));
    // 1, 2 empty; 3 recent; 4, 5, 6 empty
    assert_eq!(summary.pages_scanned, 6);
    assert_eq!(summary.stop_reason, Some(StopReason::EmptyPages));
}

#[tokio::test]
async fn test_history_skips_articles_across_runs() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();
    let history_path = dir.path().join("history.json");

    let today = days_ago(0);
    mount_listing(&server, 1, listing_page(&[listing_item("/a/1", "Harbor", Some(&today))])).await;
    Mock::given(method("GET"))
        .and(path("/a/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(article_page("Harbor news", Some(&today), BODY)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&base, &history_path, 1, 1, None);

    let mut first = MemorySink::new();
    let summary = crawl(&config, false, &mut first).await.unwrap();
    assert_eq!(summary.accepted, 1);

    let mut second = MemorySink::new();
    let summary = crawl(&config, false, &mut second).await.unwrap();
    assert!(second.is_empty());
    assert_eq!(summary.already_seen, 1);
    assert_eq!(summary.accepted, 0);
}

#[tokio::test]
async fn test_retries_transient_server_errors() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();

    let today = days_ago(0);
    mount_listing(&server, 1, listing_page(&[listing_item("/a/1", "Harbor", Some(&today))])).await;

    Mock::given(method("GET"))
        .and(path("/a/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_article(&server, "/a/1", article_page("Harbor news", Some(&today), BODY)).await;

    let config = create_test_config(&base, &dir.path().join("history.json"), 1, 1, None);
    let mut sink = MemorySink::new();
    let summary = crawl(&config, false, &mut sink).await.unwrap();

    assert_eq!(sink.len(), 1);
    assert_eq!(summary.detail_failures, 0);
}

#[tokio::test]
async fn test_permanent_errors_are_not_retried() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();

    mount_listing(&server, 1, listing_page(&[listing_item("/a/1", "Harbor", Some(&days_ago(0)))])).await;
    Mock::given(method("GET"))
        .and(path("/a/1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&base, &dir.path().join("history.json"), 1, 1, None);
    let mut sink = MemorySink::new();
    let summary = crawl(&config, false, &mut sink).await.unwrap();

    assert!(sink.is_empty());
    assert_eq!(summary.detail_failures, 1);
    // Failed articles are not remembered
    assert!(!dir.path().join("history.json").exists());
}

#[tokio::test]
async fn test_undated_and_thin_articles_are_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();

    let today = days_ago(0);
    mount_listing(
        &server,
        1,
        listing_page(&[
            listing_item("/a/undated", "Harbor", None),
            listing_item("/a/thin", "Harbor brief", Some(&today)),
        ]),
    )
    .await;
    mount_article(&server, "/a/undated", article_page("Harbor news", None, BODY)).await;
    mount_article(&server, "/a/thin", article_page("Harbor brief", Some(&today), "Too short.")).await;

    let config = create_test_config(&base, &dir.path().join("history.json"), 1, 1, None);
    let mut sink = MemorySink::new();
    let summary = crawl(&config, false, &mut sink).await.unwrap();

    assert!(sink.is_empty());
    assert_eq!(summary.undated, 1);
    assert_eq!(summary.extraction_failures, 1);
}

#[tokio::test]
async fn test_sink_failures_are_counted() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();
    let history_path = dir.path().join("history.json");

    let today = days_ago(0);
    mount_listing(&server, 1, listing_page(&[listing_item("/a/1", "Harbor", Some(&today))])).await;
    mount_article(&server, "/a/1", article_page("Harbor news", Some(&today), BODY)).await;

    let config = create_test_config(&base, &history_path, 1, 1, None);
    let mut rejecting = |_: &ArticleRecord| -> Result<(), OutputError> {
        Err(OutputError::Rejected("downstream unavailable".to_string()))
    };
    let summary = crawl(&config, false, &mut rejecting).await.unwrap();

    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.sink_failures, 1);
    assert_eq!(summary.batches, 1);

    // The refused record is not remembered, so the next run delivers it
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&history_path).unwrap()).unwrap();
    assert!(saved["urls"].as_array().unwrap().is_empty());

    let mut sink = MemorySink::new();
    let summary = crawl(&config, false, &mut sink).await.unwrap();
    assert_eq!(summary.already_seen, 0);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_each_record_is_delivered_right_after_history_persist() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();
    let history_path = dir.path().join("history.json");

    let today = days_ago(0);
    mount_listing(
        &server,
        1,
        listing_page(&[
            listing_item("/a/1", "Harbor one", Some(&today)),
            listing_item("/a/2", "Harbor two", Some(&today)),
            listing_item("/a/3", "Harbor three", Some(&today)),
        ]),
    )
    .await;
    for n in 1..=3 {
        mount_article(&server, &format!("/a/{}", n), article_page("Harbor news", Some(&today), BODY)).await;
    }

    let config = create_test_config(&base, &history_path, 1, 1, None);
    let mut history_sizes = Vec::new();
    let mut observing = |record: &ArticleRecord| -> Result<(), OutputError> {
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&history_path).unwrap()).unwrap();
        let urls = saved["urls"].as_array().unwrap();
        assert!(urls.iter().any(|u| u == record.url.as_str()));
        history_sizes.push(urls.len());
        Ok(())
    };
    let summary = crawl(&config, false, &mut observing).await.unwrap();

    assert_eq!(summary.accepted, 3);
    // batch-size 2: delivery does not wait for the batch boundary
    assert_eq!(history_sizes, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_detail_is_fetched_from_the_linked_url() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();

    let today = days_ago(0);
    mount_listing(&server, 1, listing_page(&[listing_item("/news/1/", "Harbor", Some(&today))])).await;
    // Only the trailing-slash form exists
    mount_article(&server, "/news/1/", article_page("Harbor news", Some(&today), BODY)).await;

    let config = create_test_config(&base, &dir.path().join("history.json"), 1, 1, None);
    let mut sink = MemorySink::new();
    let summary = crawl(&config, false, &mut sink).await.unwrap();

    assert_eq!(summary.detail_failures, 0);
    assert_eq!(sink.len(), 1);
    // Identity stays normalized
    assert_eq!(sink.records()[0].url, format!("{}/news/1", base));

    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(requested, vec!["/list", "/news/1/"]);
}

/// Serves canned HTML in place of a browser
struct CannedDriver {
    pages: HashMap<String, String>,
    rendered: Arc<Mutex<Vec<String>>>,
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderDriver for CannedDriver {
    fn name(&self) -> &str {
        "canned"
    }

    async fn render(&self, url: &str, _timeout: StdDuration) -> Result<String, FetchError> {
        self.rendered.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| FetchError::PermanentFetch {
            url: url.to_string(),
            status: Some(404),
            reason: "not rendered".to_string(),
        })
    }

    async fn shutdown(&mut self) -> Result<(), ResourceError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct CannedLauncher {
    pages: HashMap<String, String>,
    rendered: Arc<Mutex<Vec<String>>>,
    shutdowns: Arc<AtomicUsize>,
    launches: AtomicUsize,
}

#[async_trait]
impl DriverLauncher for CannedLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderDriver>, ResourceError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CannedDriver {
            pages: self.pages.clone(),
            rendered: Arc::clone(&self.rendered),
            shutdowns: Arc::clone(&self.shutdowns),
        }))
    }
}

#[tokio::test]
async fn test_rendered_strategy_fetches_through_driver() {
    let dir = tempfile::TempDir::new().unwrap();
    let base = "https://news.example.com";
    let today = days_ago(0);

    let pages: HashMap<String, String> = [
        (
            format!("{}/list?page=1", base),
            listing_page(&[listing_item("/a/1/", "Harbor", Some(&today))]),
        ),
        (
            format!("{}/a/1/", base),
            article_page("Rendered harbor news", Some(&today), BODY),
        ),
    ]
    .into_iter()
    .collect();

    let rendered = Arc::new(Mutex::new(Vec::new()));
    let shutdowns = Arc::new(AtomicUsize::new(0));
    let launcher = Arc::new(CannedLauncher {
        pages,
        rendered: Arc::clone(&rendered),
        shutdowns: Arc::clone(&shutdowns),
        launches: AtomicUsize::new(0),
    });

    let mut config = create_test_config(base, &dir.path().join("history.json"), 1, 2, None);
    config.fetch.strategy = FetchStrategy::Rendered;

    let resources = ResourceLifecycleManager::from_config(&config).with_launcher(launcher.clone());
    let mut orchestrator = BatchCrawlOrchestrator::new(&config, CrawlHistoryStore::new(&config.history.path))
        .unwrap()
        .with_resources(resources);

    let mut sink = MemorySink::new();
    let summary = orchestrator.run(&mut sink).await.unwrap();

    assert_eq!(sink.len(), 1);
    assert_eq!(sink.records()[0].title, "Rendered harbor news");
    assert_eq!(sink.records()[0].url, format!("{}/a/1", base));
    assert_eq!(
        *rendered.lock().unwrap(),
        vec![
            format!("{}/list?page=1", base),
            format!("{}/a/1/", base),
            format!("{}/list?page=2", base),
        ]
    );
    assert_eq!(summary.listing_failures, 1);
    assert_eq!(summary.stop_reason, Some(StopReason::HardCap));

    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    assert!(orchestrator.history().seen(&format!("{}/a/1", base)));
}

#[tokio::test]
async fn test_snapshots_are_written() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::TempDir::new().unwrap();
    let snapshots = dir.path().join("snapshots");

    let today = days_ago(0);
    mount_listing(&server, 1, listing_page(&[listing_item("/a/1", "Harbor", Some(&today))])).await;
    mount_article(&server, "/a/1", article_page("Harbor news", Some(&today), BODY)).await;

    let config = create_test_config(
        &base,
        &dir.path().join("history.json"),
        1,
        1,
        Some(&snapshots),
    );
    let mut sink = MemorySink::new();
    crawl(&config, false, &mut sink).await.unwrap();

    let store = SnapshotStore::new(&snapshots);
    let detail = store.path_for(&format!("{}/a/1", base));
    let saved = std::fs::read_to_string(detail).unwrap();
    assert!(saved.contains("terminal expansion"));
    assert_eq!(std::fs::read_dir(&snapshots).unwrap().count(), 2);
}
