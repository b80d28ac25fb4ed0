//! Data models shared across the pipeline.
//!
//! - [`ArticleRecord`]: an accepted article, the only thing the crawler emits
//! - [`ListingEntry`]: one article link found on a listing page
//!
//! Records serialize with camelCase field names, which is what downstream
//! consumers (summarization, workspace sync) read.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A structured article accepted by the relevance filter.
///
/// `url` is the record's identity. `published_at` is `None` only when no
/// date could be parsed; such records are audited but never emitted by the
/// orchestrator, since they cannot be placed in the recency window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    /// Normalized article URL.
    pub url: String,
    /// Headline.
    pub title: String,
    /// Publication timestamp in the source's offset.
    pub published_at: Option<DateTime<FixedOffset>>,
    /// Name of the source site.
    pub source: String,
    /// Extracted body text.
    pub content: String,
    /// Configured keywords found in title or content.
    #[serde(default)]
    pub matched_keywords: BTreeSet<String>,
    /// Whether the relevance predictor voted for this article.
    #[serde(default)]
    pub ml_recommended: bool,
    /// When the article was extracted.
    pub crawled_at: DateTime<Utc>,
}

impl ArticleRecord {
    /// Returns true when at least one configured keyword matched
    pub fn is_keyword_match(&self) -> bool {
        !self.matched_keywords.is_empty()
    }
}

/// An article link discovered on a listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    /// Normalized article URL; the article's identity.
    pub url: String,
    /// Absolute URL exactly as linked from the listing; this is what gets fetched.
    pub link: String,
    /// Link text or listing headline, when present.
    pub title: Option<String>,
    /// Raw date text shown next to the link.
    pub date_text: Option<String>,
    /// `date_text` run through the date parser.
    pub published_at: Option<DateTime<FixedOffset>>,
}
