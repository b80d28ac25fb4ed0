use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Main configuration structure for Tidings
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub history: HistoryConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
}

/// Paging and batching behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Trailing number of days an article must fall within
    #[serde(default = "default_recency_days")]
    pub recency_days: u32,

    /// Consecutive listing pages without recent articles before stopping
    #[serde(default = "default_empty_page_threshold")]
    pub empty_page_threshold: u32,

    /// Hard cap on listing pages visited in one run
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Candidates processed between sink deliveries and cleanups
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            recency_days: default_recency_days(),
            empty_page_threshold: default_empty_page_threshold(),
            max_pages: default_max_pages(),
            batch_size: default_batch_size(),
        }
    }
}

/// Retry/backoff settings applied to every fetch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single backoff (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// How pages are retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Plain HTTP GET
    #[default]
    Http,
    /// Load the page in a rendering-capable browser driver
    Rendered,
}

/// Fetch behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    #[serde(default)]
    pub strategy: FetchStrategy,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TCP connect timeout (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Directory for raw page snapshots, keyed by URL hash
    #[serde(default)]
    pub snapshot_dir: Option<String>,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::default(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            snapshot_dir: None,
        }
    }
}

/// Description of the site being crawled
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Source name stamped on every record
    pub name: String,

    /// Base URL used to resolve relative links
    pub base_url: String,

    /// Listing URL template; `{page}` is replaced with the page number
    pub listing_url: String,

    /// Page 1 URL when it differs from the template
    #[serde(default)]
    pub first_page_url: Option<String>,

    /// The site's local UTC offset, e.g. "+08:00"
    #[serde(default = "default_utc_offset", deserialize_with = "deserialize_offset")]
    pub utc_offset: FixedOffset,

    #[serde(default)]
    pub listing: ListingSelectors,

    #[serde(default)]
    pub detail: DetailSelectors,
}

/// Selectors applied to listing pages
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListingSelectors {
    /// One element per article on the listing
    #[serde(default = "default_item_selector")]
    pub item: String,

    /// Link element inside an item
    #[serde(default = "default_link_selector")]
    pub link: String,

    /// Headline element inside an item (falls back to the link text)
    #[serde(default)]
    pub title: Option<String>,

    /// Date element inside an item
    #[serde(default = "default_listing_date_selector")]
    pub date: Option<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item: default_item_selector(),
            link: default_link_selector(),
            title: None,
            date: default_listing_date_selector(),
        }
    }
}

/// Selectors and patterns applied to detail pages
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DetailSelectors {
    /// Content containers, tried in order
    #[serde(default = "default_content_selectors")]
    pub content: Vec<String>,

    /// Title elements, tried in order
    #[serde(default = "default_title_selectors")]
    pub title: Vec<String>,

    /// Date elements in the article header block
    #[serde(default = "default_header_date_selectors")]
    pub header_date: Vec<String>,

    /// Regex with one capture group locating an inline date marker
    #[serde(default = "default_date_marker_pattern")]
    pub date_marker_pattern: String,

    /// Minimum characters for a content candidate to count
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            content: default_content_selectors(),
            title: default_title_selectors(),
            header_date: default_header_date_selectors(),
            date_marker_pattern: default_date_marker_pattern(),
            min_content_chars: default_min_content_chars(),
        }
    }
}

/// Relevance filter configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Case-sensitive keywords matched against title and content
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Path to a trained relevance model artifact
    #[serde(default)]
    pub model_path: Option<String>,
}

/// Crawl history persistence
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HistoryConfig {
    /// Path to the JSON history file
    pub path: String,
}

/// Resource lifecycle settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResourceConfig {
    /// Memory growth over a session above which a leak is suspected
    #[serde(default = "default_leak_threshold_mb")]
    pub leak_threshold_mb: u64,
}

impl ResourceConfig {
    pub fn leak_threshold_bytes(&self) -> u64 {
        self.leak_threshold_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            leak_threshold_mb: default_leak_threshold_mb(),
        }
    }
}

fn deserialize_offset<'de, D>(deserializer: D) -> Result<FixedOffset, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc_offset(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid utc-offset '{}', expected e.g. \"+08:00\"", raw))
    })
}

/// Parses offsets of the form `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Some(Utc.fix());
    }

    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn default_recency_days() -> u32 {
    3
}

fn default_empty_page_threshold() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    50
}

fn default_batch_size() -> usize {
    20
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("tidings/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_utc_offset() -> FixedOffset {
    Utc.fix()
}

fn default_item_selector() -> String {
    "ul.news-list li".to_string()
}

fn default_link_selector() -> String {
    "a[href]".to_string()
}

fn default_listing_date_selector() -> Option<String> {
    Some(".date, time, span.time".to_string())
}

fn default_content_selectors() -> Vec<String> {
    [
        "div.article-content",
        "div.article_content",
        "div#content",
        "div.content",
        "article",
        "main",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_title_selectors() -> Vec<String> {
    ["h1", "meta[property='og:title']", "title"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_header_date_selectors() -> Vec<String> {
    [
        ".article-header .date",
        ".article-info .time",
        ".post-meta time",
        ".pubtime",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_date_marker_pattern() -> String {
    r"(?:发布时间|发布日期|来源时间|Published|Posted|Date)\s*[:：]?\s*(\d{4}[-/.年]\d{1,2}[-/.月]\d{1,2}日?(?:\s*\d{1,2}:\d{2}(?::\d{2})?)?)".to_string()
}

fn default_min_content_chars() -> usize {
    50
}

fn default_leak_threshold_mb() -> u64 {
    200
}
