use crate::config::{Config, FetchConfig, FetchStrategy, ResourceConfig};
use crate::crawler::build_http_client;
use crate::resources::memory::as_mb;
use crate::resources::{
    DriverLauncher, MemorySampler, ProcessMemorySampler, RenderDriver, ResourceError,
};
use async_trait::async_trait;
use futures::FutureExt;
use reqwest::Client;
use std::fmt;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Everything a single crawl run fetches with
///
/// A session is created by [`ResourceLifecycleManager::acquire`] and must be
/// handed back to [`ResourceLifecycleManager::release`]. Release consumes the
/// session, so teardown cannot run twice. Sessions are never reused across
/// runs.
pub struct CrawlSession {
    client: Client,
    driver: Option<Box<dyn RenderDriver>>,
    baseline_bytes: Option<u64>,
    started: Instant,
    released: bool,
}

impl CrawlSession {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The render driver, when the fetch strategy needs one
    pub fn driver(&self) -> Option<&dyn RenderDriver> {
        self.driver.as_deref()
    }

    /// Resident memory sampled right after acquisition
    pub fn baseline_bytes(&self) -> Option<u64> {
        self.baseline_bytes
    }
}

impl fmt::Debug for CrawlSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlSession")
            .field("driver", &self.driver.as_ref().map(|d| d.name().to_string()))
            .field("baseline_bytes", &self.baseline_bytes)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for CrawlSession {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                has_driver = self.driver.is_some(),
                "Crawl session dropped without release; render driver was not shut down"
            );
        }
    }
}

/// What teardown observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    pub baseline_bytes: Option<u64>,
    pub final_bytes: Option<u64>,
    /// `final - baseline`, when both samples exist
    pub delta_bytes: Option<i64>,
    /// Delta exceeded the configured leak threshold
    pub suspected_leak: bool,
    pub driver_shutdown_error: Option<String>,
    pub elapsed: Duration,
}

/// Work that runs inside an acquired session
///
/// Implemented by the orchestrator's crawl task; tests implement it to
/// exercise release on error and panic paths.
#[async_trait(?Send)]
pub trait SessionTask {
    type Output;

    async fn run(&mut self, session: &mut CrawlSession) -> Self::Output;
}

/// Owns acquisition and guaranteed release of crawl sessions
pub struct ResourceLifecycleManager {
    fetch: FetchConfig,
    leak_threshold_bytes: u64,
    launcher: Option<Arc<dyn DriverLauncher>>,
    sampler: Arc<dyn MemorySampler>,
}

impl ResourceLifecycleManager {
    /// Creates a manager with the process memory sampler and, when built
    /// with the `render` feature, the Chromium launcher
    pub fn new(fetch: FetchConfig, resources: &ResourceConfig) -> Self {
        let launcher = default_launcher(&fetch);
        Self {
            fetch,
            leak_threshold_bytes: resources.leak_threshold_bytes(),
            launcher,
            sampler: Arc::new(ProcessMemorySampler),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.fetch.clone(), &config.resources)
    }

    /// Replaces the driver launcher
    pub fn with_launcher(mut self, launcher: Arc<dyn DriverLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Replaces the memory sampler
    pub fn with_sampler(mut self, sampler: Arc<dyn MemorySampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn strategy(&self) -> FetchStrategy {
        self.fetch.strategy
    }

    /// Takes an out-of-band memory reading for debug logging
    pub fn sample_memory(&self) -> Option<u64> {
        self.sampler.sample()
    }

    /// Builds the HTTP client, launches a render driver if the strategy
    /// needs one and takes the baseline memory sample
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - Ready to fetch
    /// * `Err(ResourceError)` - The run cannot start
    pub async fn acquire(&self) -> Result<CrawlSession, ResourceError> {
        let client = build_http_client(&self.fetch)?;

        let driver = match self.fetch.strategy {
            FetchStrategy::Http => None,
            FetchStrategy::Rendered => {
                let launcher = self.launcher.as_ref().ok_or_else(|| {
                    ResourceError::DriverUnavailable(
                        "rendered fetching needs a driver launcher (build with the `render` feature)"
                            .to_string(),
                    )
                })?;
                Some(launcher.launch().await?)
            }
        };

        let baseline_bytes = self.sampler.sample();
        info!(
            strategy = ?self.fetch.strategy,
            driver = driver.as_ref().map(|d| d.name()),
            baseline_mb = baseline_bytes.map(as_mb),
            "Acquired crawl session"
        );

        Ok(CrawlSession {
            client,
            driver,
            baseline_bytes,
            started: Instant::now(),
            released: false,
        })
    }

    /// Shuts the driver down, samples memory again and logs the delta
    ///
    /// Never fails: a driver shutdown error and a suspected leak are both
    /// reported in the returned [`TeardownReport`] and logged as warnings.
    pub async fn release(&self, mut session: CrawlSession) -> TeardownReport {
        session.released = true;

        let driver_shutdown_error = match session.driver.take() {
            Some(mut driver) => match driver.shutdown().await {
                Ok(()) => {
                    debug!(driver = driver.name(), "Render driver shut down");
                    None
                }
                Err(e) => {
                    warn!(driver = driver.name(), "Render driver shutdown failed: {}", e);
                    Some(e.to_string())
                }
            },
            None => None,
        };

        let final_bytes = self.sampler.sample();
        let delta_bytes = match (session.baseline_bytes, final_bytes) {
            (Some(before), Some(after)) => Some(after as i64 - before as i64),
            _ => None,
        };
        let suspected_leak =
            delta_bytes.is_some_and(|delta| delta > self.leak_threshold_bytes as i64);

        let report = TeardownReport {
            baseline_bytes: session.baseline_bytes,
            final_bytes,
            delta_bytes,
            suspected_leak,
            driver_shutdown_error,
            elapsed: session.started.elapsed(),
        };

        let delta_mb = delta_bytes.map(|delta| delta as f64 / (1024.0 * 1024.0));
        if suspected_leak {
            warn!(
                delta_mb,
                threshold_mb = as_mb(self.leak_threshold_bytes),
                "Suspected leak: resident memory grew past threshold during session"
            );
        } else {
            info!(
                delta_mb,
                elapsed_secs = report.elapsed.as_secs_f64(),
                "Released crawl session"
            );
        }

        report
    }

    /// Runs `task` inside a fresh session and releases it afterwards
    ///
    /// Release happens on success, on error (whatever the task's output
    /// carries) and on panic; a panic is re-raised once teardown is done.
    pub async fn scope<W>(&self, task: &mut W) -> Result<W::Output, ResourceError>
    where
        W: SessionTask,
    {
        let mut session = self.acquire().await?;

        let outcome = AssertUnwindSafe(task.run(&mut session))
            .catch_unwind()
            .await;

        self.release(session).await;

        match outcome {
            Ok(output) => Ok(output),
            Err(panic) => {
                error!("Crawl task panicked; session released before unwinding");
                resume_unwind(panic)
            }
        }
    }
}

impl fmt::Debug for ResourceLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLifecycleManager")
            .field("strategy", &self.fetch.strategy)
            .field("leak_threshold_bytes", &self.leak_threshold_bytes)
            .field("has_launcher", &self.launcher.is_some())
            .finish()
    }
}

#[cfg(feature = "render")]
fn default_launcher(fetch: &FetchConfig) -> Option<Arc<dyn DriverLauncher>> {
    Some(Arc::new(crate::resources::ChromiumLauncher::new(
        fetch.user_agent.clone(),
        fetch.timeout(),
    )))
}

#[cfg(not(feature = "render"))]
fn default_launcher(_fetch: &FetchConfig) -> Option<Arc<dyn DriverLauncher>> {
    None
}
