//! Lifetime management for expensive fetch resources
//!
//! A crawl session bundles the HTTP client, the optional render driver and
//! memory baselines. [`ResourceLifecycleManager`] acquires one per run and
//! guarantees it is released on every exit path, logging memory growth so
//! slow leaks in long-running deployments show up in the logs.

mod driver;
mod lifecycle;
mod memory;

pub use driver::{DriverLauncher, RenderDriver};
#[cfg(feature = "render")]
pub use driver::{ChromiumDriver, ChromiumLauncher};
pub use lifecycle::{CrawlSession, ResourceLifecycleManager, SessionTask, TeardownReport};
pub use memory::{parse_vm_rss, MemorySampler, ProcessMemorySampler};

use thiserror::Error;

/// Errors acquiring or releasing session resources
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Render driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("Failed to launch render driver: {0}")]
    DriverLaunch(String),

    #[error("Failed to shut down render driver: {0}")]
    DriverShutdown(String),
}
