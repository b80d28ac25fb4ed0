//! Configuration module for Tidings
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The parsed [`Config`] is passed explicitly into every component constructor;
//! nothing reads configuration from global state.
//!
//! # Example
//!
//! ```no_run
//! use tidings::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tidings.toml")).unwrap();
//! println!("Recency window: {} days", config.crawler.recency_days);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    parse_utc_offset, Config, CrawlerConfig, DetailSelectors, FetchConfig, FetchStrategy,
    FilterConfig, HistoryConfig, ListingSelectors, ResourceConfig, RetryConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
pub(crate) use validation::compile_selector;
