//! Article detail page extraction
//!
//! This module pulls three fields out of inconsistently formatted article
//! pages, each through its own fallback cascade:
//! - Content: configured container selectors, first one with enough text wins
//! - Title: configured selectors (`h1`, `og:title`, `<title>`)
//! - Publication date: header block, then structured metadata, then an
//!   inline textual marker
//!
//! A field that cannot be extracted is reported as missing; it never stops
//! the other fields from being extracted.

use crate::config::{compile_selector, DetailSelectors, SiteConfig};
use crate::dates::DateParser;
use crate::{ConfigError, ParseError};
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;

/// Metadata tags that carry a publication timestamp, in priority order
const METADATA_SELECTORS: &[&str] = &[
    "meta[property='article:published_time']",
    "meta[itemprop='datePublished']",
    "meta[name='pubdate']",
    "meta[name='publishdate']",
    "meta[name='PubDate']",
    "meta[name='date']",
    "time[datetime]",
];

const JSON_LD_SELECTOR: &str = "script[type='application/ld+json']";

/// Elements whose text is never article prose
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Which date strategy produced `published_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStrategy {
    /// Configured header/byline selectors
    HeaderBlock,
    /// `<meta>` tags, `time[datetime]` or JSON-LD `datePublished`
    MetadataTag,
    /// Regex over the page's visible text
    InlineMarker,
}

/// Fields extracted from one detail page
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub content: Result<String, ParseError>,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub date_strategy: Option<DateStrategy>,
}

/// Extracts article fields from detail pages of one site
#[derive(Debug)]
pub struct ArticleExtractor {
    content: Vec<Selector>,
    title: Vec<Selector>,
    header_date: Vec<Selector>,
    metadata: Vec<Selector>,
    json_ld: Selector,
    paragraph: Selector,
    body: Selector,
    marker: Regex,
    min_content_chars: usize,
    dates: DateParser,
}

impl ArticleExtractor {
    /// Compiles the detail selectors and the inline date marker
    pub fn new(detail: &DetailSelectors, dates: DateParser) -> Result<Self, ConfigError> {
        let compile_all = |selectors: &[String]| -> Result<Vec<Selector>, ConfigError> {
            selectors.iter().map(|s| compile_selector(s)).collect()
        };

        let marker = Regex::new(&detail.date_marker_pattern).map_err(|e| {
            ConfigError::InvalidPattern {
                pattern: detail.date_marker_pattern.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            content: compile_all(&detail.content)?,
            title: compile_all(&detail.title)?,
            header_date: compile_all(&detail.header_date)?,
            metadata: METADATA_SELECTORS
                .iter()
                .map(|s| compile_selector(s))
                .collect::<Result<_, _>>()?,
            json_ld: compile_selector(JSON_LD_SELECTOR)?,
            paragraph: compile_selector("p")?,
            body: compile_selector("body")?,
            marker,
            min_content_chars: detail.min_content_chars,
            dates,
        })
    }

    pub fn from_site(site: &SiteConfig) -> Result<Self, ConfigError> {
        Self::new(&site.detail, DateParser::new(site.utc_offset))
    }

    /// Extracts title, content and publication date from a detail page
    pub fn extract(&self, html: &str) -> ExtractedArticle {
        let document = Html::parse_document(html);

        let title = self.extract_title(&document);
        let content = self.extract_content(&document);
        let (published_at, date_strategy) = match self.extract_date(&document) {
            Some((ts, strategy)) => (Some(ts), Some(strategy)),
            None => (None, None),
        };

        if let Err(e) = &content {
            tracing::debug!("Content extraction failed: {}", e);
        }

        ExtractedArticle {
            title,
            content,
            published_at,
            date_strategy,
        }
    }

    /// Tries each content selector in order; the first element whose text
    /// reaches `min_content_chars` wins
    fn extract_content(&self, document: &Html) -> Result<String, ParseError> {
        for selector in &self.content {
            for element in document.select(selector) {
                let text = self.block_text(element);
                if text.chars().count() >= self.min_content_chars {
                    return Ok(text);
                }
            }
        }

        Err(ParseError::ContentNotFound {
            tried: self.content.len(),
            min_chars: self.min_content_chars,
        })
    }

    /// Paragraph-joined text of a content container
    ///
    /// Containers with `<p>` children yield one line per paragraph; others
    /// yield their whole visible text.
    fn block_text(&self, element: ElementRef<'_>) -> String {
        let paragraphs: Vec<String> = element
            .select(&self.paragraph)
            .map(visible_text)
            .filter(|p| !p.is_empty())
            .collect();

        if paragraphs.is_empty() {
            visible_text(element)
        } else {
            paragraphs.join("\n")
        }
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        self.title.iter().find_map(|selector| {
            document.select(selector).find_map(|element| {
                let text = match element.value().name() {
                    "meta" => collapse_whitespace(element.value().attr("content")?),
                    _ => visible_text(element),
                };
                (!text.is_empty()).then_some(text)
            })
        })
    }

    fn extract_date(&self, document: &Html) -> Option<(DateTime<FixedOffset>, DateStrategy)> {
        if let Some(ts) = self.date_from_selectors(document, &self.header_date) {
            return Some((ts, DateStrategy::HeaderBlock));
        }

        if let Some(ts) = self
            .date_from_selectors(document, &self.metadata)
            .or_else(|| self.date_from_json_ld(document))
        {
            return Some((ts, DateStrategy::MetadataTag));
        }

        if let Some(ts) = self.date_from_marker(document) {
            return Some((ts, DateStrategy::InlineMarker));
        }

        tracing::debug!("No date strategy succeeded");
        None
    }

    fn date_from_selectors(
        &self,
        document: &Html,
        selectors: &[Selector],
    ) -> Option<DateTime<FixedOffset>> {
        selectors.iter().find_map(|selector| {
            document.select(selector).find_map(|element| {
                let value = element.value();
                let raw = value
                    .attr("datetime")
                    .or_else(|| value.attr("content"))
                    .map(str::to_string)
                    .unwrap_or_else(|| visible_text(element));
                self.dates.parse(&raw)
            })
        })
    }

    fn date_from_json_ld(&self, document: &Html) -> Option<DateTime<FixedOffset>> {
        document.select(&self.json_ld).find_map(|script| {
            let raw = script.text().collect::<String>();
            let json = serde_json::from_str::<Value>(raw.trim()).ok()?;
            find_date_published(&json).and_then(|text| self.dates.parse(text))
        })
    }

    fn date_from_marker(&self, document: &Html) -> Option<DateTime<FixedOffset>> {
        let text = match document.select(&self.body).next() {
            Some(body) => visible_text(body),
            None => visible_text(document.root_element()),
        };

        self.marker
            .captures_iter(&text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| self.dates.parse(m.as_str()))
    }
}

/// Finds `datePublished` in a JSON-LD value (object, array or `@graph`)
fn find_date_published(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map
            .get("datePublished")
            .and_then(Value::as_str)
            .or_else(|| map.get("@graph").and_then(find_date_published)),
        Value::Array(items) => items.iter().find_map(find_date_published),
        _ => None,
    }
}

/// Visible text of an element, whitespace-collapsed, without script/style
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();

    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }

    collapse_whitespace(&out)
}

/// Collapses runs of whitespace (including NBSP and ideographic space) to
/// single spaces and trims the ends
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}' || c == '\u{3000}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
