//! Listing page parsing
//!
//! Turns one listing page into the article entries it links to, in listing
//! order, with whatever title and date the listing shows next to each link.

use crate::config::{compile_selector, SiteConfig};
use crate::crawler::extractor::collapse_whitespace;
use crate::dates::DateParser;
use crate::models::ListingEntry;
use crate::url::{normalize_url, resolve_link};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts article entries from listing pages of one site
#[derive(Debug)]
pub struct ListingParser {
    base: Url,
    item: Selector,
    link: Selector,
    title: Option<Selector>,
    date: Option<Selector>,
    dates: DateParser,
}

impl ListingParser {
    /// Compiles the site's listing selectors
    ///
    /// # Returns
    ///
    /// * `Ok(ListingParser)` - Ready to parse
    /// * `Err(ConfigError)` - A selector or the base URL is invalid
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&site.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", site.base_url, e)))?;

        Ok(Self {
            base,
            item: compile_selector(&site.listing.item)?,
            link: compile_selector(&site.listing.link)?,
            title: site.listing.title.as_deref().map(compile_selector).transpose()?,
            date: site.listing.date.as_deref().map(compile_selector).transpose()?,
            dates: DateParser::new(site.utc_offset),
        })
    }

    /// Parses a listing page
    ///
    /// # Entry Rules
    ///
    /// - One entry per item element that contains a usable link
    /// - Relative links are resolved against the site base URL
    /// - `javascript:`, `mailto:` and fragment-only links are dropped
    /// - URLs are normalized for identity; a URL seen earlier on the same page
    ///   is dropped. The resolved link is kept as-is for fetching
    /// - Title comes from the title selector, else the link text
    /// - Date text comes from the date element's `datetime` attribute, else its text
    pub fn parse(&self, html: &str) -> Vec<ListingEntry> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for item in document.select(&self.item) {
            let Some(entry) = self.parse_item(item) else {
                continue;
            };
            if seen.insert(entry.url.clone()) {
                entries.push(entry);
            }
        }

        tracing::debug!(entries = entries.len(), "Parsed listing page");
        entries
    }

    fn parse_item(&self, item: ElementRef<'_>) -> Option<ListingEntry> {
        // The item itself may be the link (e.g. `a.news-item`)
        let link = if self.link.matches(&item) {
            item
        } else {
            item.select(&self.link).next()?
        };

        let href = link.value().attr("href")?;
        let mut resolved = resolve_link(&self.base, href)?;
        resolved.set_fragment(None);
        let url = normalize_url(resolved.as_str()).ok()?;

        let title = self
            .title
            .as_ref()
            .and_then(|selector| item.select(selector).next())
            .map(element_text)
            .or_else(|| Some(element_text(link)))
            .filter(|t| !t.is_empty());

        let date_text = self
            .date
            .as_ref()
            .and_then(|selector| item.select(selector).next())
            .map(|el| match el.value().attr("datetime") {
                Some(datetime) => datetime.trim().to_string(),
                None => element_text(el),
            })
            .filter(|t| !t.is_empty());

        let published_at = date_text.as_deref().and_then(|t| self.dates.parse(t));

        Some(ListingEntry {
            url: url.to_string(),
            link: resolved.to_string(),
            title,
            date_text,
            published_at,
        })
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetailSelectors, ListingSelectors};
    use chrono::{Datelike, FixedOffset};

    fn site(listing: ListingSelectors) -> SiteConfig {
        SiteConfig {
            name: "Example News".to_string(),
            base_url: "https://news.example.com/".to_string(),
            listing_url: "https://news.example.com/list?page={page}".to_string(),
            first_page_url: None,
            utc_offset: FixedOffset::east_opt(8 * 3600).unwrap(),
            listing,
            detail: DetailSelectors::default(),
        }
    }

    fn parser() -> ListingParser {
        ListingParser::new(&site(ListingSelectors::default())).unwrap()
    }

    const LISTING: &str = r##"
        <html><body>
          <ul class="news-list">
            <li><a href="/a/1.html">  Port expansion
                approved </a><span class="date">2024-05-06</span></li>
            <li><a href="https://news.example.com/a/2.html?utm_source=list">Rail link opens</a>
                <time datetime="2024-05-05T08:00:00+08:00">May 5</time></li>
            <li><a href="javascript:void(0)">Subscribe</a></li>
            <li><a href="#top">Back to top</a></li>
            <li><a href="/a/1.html#comments">Port expansion (comments)</a></li>
            <li><span>No link here</span></li>
            <li><a href="/a/3.html">Undated story</a></li>
          </ul>
        </body></html>
    "##;

    #[test]
    fn test_parse_entries_in_listing_order() {
        let entries = parser().parse(LISTING);
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://news.example.com/a/1.html",
                "https://news.example.com/a/2.html",
                "https://news.example.com/a/3.html",
            ]
        );
    }

    #[test]
    fn test_link_keeps_the_linked_form() {
        let entries = parser().parse(
            r#"<ul class="news-list"><li><a href="/news/1/?b=2&a=1">Story</a></li></ul>"#,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://news.example.com/news/1?a=1&b=2");
        assert_eq!(entries[0].link, "https://news.example.com/news/1/?b=2&a=1");
    }

    #[test]
    fn test_titles_are_collapsed_link_text() {
        let entries = parser().parse(LISTING);
        assert_eq!(entries[0].title.as_deref(), Some("Port expansion approved"));
        assert_eq!(entries[1].title.as_deref(), Some("Rail link opens"));
    }

    #[test]
    fn test_dates_from_text_and_datetime_attribute() {
        let entries = parser().parse(LISTING);

        assert_eq!(entries[0].date_text.as_deref(), Some("2024-05-06"));
        let first = entries[0].published_at.unwrap();
        assert_eq!((first.year(), first.month(), first.day()), (2024, 5, 6));

        assert_eq!(
            entries[1].date_text.as_deref(),
            Some("2024-05-05T08:00:00+08:00")
        );
        assert!(entries[1].published_at.is_some());

        assert!(entries[2].date_text.is_none());
        assert!(entries[2].published_at.is_none());
    }

    #[test]
    fn test_custom_selectors() {
        let listing = ListingSelectors {
            item: "div.card".to_string(),
            link: "h3 a".to_string(),
            title: Some("h3".to_string()),
            date: Some("em".to_string()),
        };
        let parser = ListingParser::new(&site(listing)).unwrap();

        let html = r#"
            <div class="card"><h3><a href="detail/9">Harbour tariffs</a></h3><em>05-06 10:15</em></div>
            <div class="card"><p>advert</p></div>
        "#;
        let entries = parser.parse(html);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://news.example.com/detail/9");
        assert_eq!(entries[0].title.as_deref(), Some("Harbour tariffs"));
        assert!(entries[0].published_at.is_some());
    }

    #[test]
    fn test_item_can_be_the_link() {
        let listing = ListingSelectors {
            item: "a.story".to_string(),
            link: "a[href]".to_string(),
            title: None,
            date: None,
        };
        let parser = ListingParser::new(&site(listing)).unwrap();

        let entries = parser.parse(r#"<a class="story" href="/s/1">One</a><a class="story" href="/s/2">Two</a>"#);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].title.as_deref(), Some("Two"));
    }

    #[test]
    fn test_empty_page_has_no_entries() {
        assert!(parser().parse("<html><body><p>Nothing today</p></body></html>").is_empty());
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let listing = ListingSelectors {
            item: "ul[[".to_string(),
            ..ListingSelectors::default()
        };
        assert!(matches!(
            ListingParser::new(&site(listing)),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }
}
