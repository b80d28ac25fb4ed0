use crate::config::types::{
    Config, CrawlerConfig, FetchConfig, FilterConfig, HistoryConfig, RetryConfig, SiteConfig,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_fetch_config(&config.fetch)?;
    validate_site_config(&config.site)?;
    validate_filter_config(&config.filter)?;
    validate_history_config(&config.history)?;
    Ok(())
}

/// Validates paging and batching limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.recency_days < 1 {
        return Err(ConfigError::Validation(format!(
            "recency-days must be >= 1, got {}",
            config.recency_days
        )));
    }

    if config.empty_page_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "empty-page-threshold must be >= 1, got {}",
            config.empty_page_threshold
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    Ok(())
}

/// Validates retry attempts and delays
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.max_delay_ms < config.base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-delay-ms ({}) must be >= base-delay-ms ({})",
            config.max_delay_ms, config.base_delay_ms
        )));
    }

    Ok(())
}

/// Validates fetch timeouts and user agent
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be > 0".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be > 0".to_string(),
        ));
    }

    if let Some(dir) = &config.snapshot_dir {
        if dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "snapshot-dir cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates site URLs, selectors and the inline date pattern
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    validate_http_url("base-url", &config.base_url)?;

    if !config.listing_url.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "listing-url must contain a {{page}} placeholder, got '{}'",
            config.listing_url
        )));
    }
    validate_http_url("listing-url", &config.listing_url.replace("{page}", "1"))?;

    if let Some(first) = &config.first_page_url {
        validate_http_url("first-page-url", first)?;
    }

    validate_selector(&config.listing.item)?;
    validate_selector(&config.listing.link)?;
    if let Some(title) = &config.listing.title {
        validate_selector(title)?;
    }
    if let Some(date) = &config.listing.date {
        validate_selector(date)?;
    }

    if config.detail.content.is_empty() {
        return Err(ConfigError::Validation(
            "at least one content selector is required".to_string(),
        ));
    }
    for selector in config
        .detail
        .content
        .iter()
        .chain(&config.detail.title)
        .chain(&config.detail.header_date)
    {
        validate_selector(selector)?;
    }

    validate_marker_pattern(&config.detail.date_marker_pattern)?;

    if config.detail.min_content_chars == 0 {
        return Err(ConfigError::Validation(
            "min-content-chars must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates keyword list entries
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if let Some(blank) = config.keywords.iter().position(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "keyword #{} is empty",
            blank + 1
        )));
    }

    if let Some(path) = &config.model_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "model-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates history file location
fn validate_history_config(config: &HistoryConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "history path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses http(s)
fn validate_http_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, raw
        )));
    }

    Ok(())
}

/// Validates a CSS selector
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    compile_selector(selector).map(|_| ())
}

/// Parses a configured CSS selector
pub(crate) fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

/// Validates the inline date marker regex (must capture the date text)
fn validate_marker_pattern(pattern: &str) -> Result<(), ConfigError> {
    let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    if regex.captures_len() < 2 {
        return Err(ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "pattern needs a capture group around the date text".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("base-url", "https://news.example.com/").is_ok());
        assert!(validate_http_url("base-url", "http://127.0.0.1:8080").is_ok());

        assert!(validate_http_url("base-url", "not a url").is_err());
        assert!(validate_http_url("base-url", "ftp://news.example.com/").is_err());
    }

    #[test]
    fn test_validate_selector() {
        assert!(validate_selector("div.article-content").is_ok());
        assert!(validate_selector("meta[property='og:title']").is_ok());

        assert!(matches!(
            validate_selector("div[[["),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_validate_marker_pattern() {
        assert!(validate_marker_pattern(r"Published:\s*(\d{4}-\d{2}-\d{2})").is_ok());

        assert!(validate_marker_pattern(r"Published:\s*\d{4}").is_err());
        assert!(validate_marker_pattern(r"(unclosed").is_err());
    }

    #[test]
    fn test_validate_retry_config() {
        let mut config = RetryConfig::default();
        assert!(validate_retry_config(&config).is_ok());

        config.max_attempts = 0;
        assert!(validate_retry_config(&config).is_err());

        config.max_attempts = 3;
        config.max_delay_ms = 10;
        config.base_delay_ms = 100;
        assert!(validate_retry_config(&config).is_err());
    }

    #[test]
    fn test_validate_filter_rejects_blank_keyword() {
        let config = FilterConfig {
            keywords: vec!["port".to_string(), "  ".to_string()],
            model_path: None,
        };
        assert!(validate_filter_config(&config).is_err());
    }
}
