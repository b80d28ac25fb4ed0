//! Rendering-capable page drivers
//!
//! A render driver loads a page the way a browser would, so pages that only
//! fill in their article list with script still yield usable HTML. Drivers
//! are expensive: the lifecycle manager launches at most one per session and
//! shuts it down exactly once.

use crate::resources::ResourceError;
use crate::FetchError;
use async_trait::async_trait;
use std::time::Duration;

/// A launched browser-like driver
#[async_trait]
pub trait RenderDriver: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Loads `url` and returns the rendered document HTML
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;

    /// Releases the driver's processes and connections
    async fn shutdown(&mut self) -> Result<(), ResourceError>;
}

/// Starts render drivers on demand
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderDriver>, ResourceError>;
}

#[cfg(feature = "render")]
pub use chromium::{ChromiumDriver, ChromiumLauncher};

#[cfg(feature = "render")]
mod chromium {
    use super::*;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    /// Launches a headless Chromium through the DevTools protocol
    #[derive(Debug, Clone)]
    pub struct ChromiumLauncher {
        user_agent: String,
        request_timeout: Duration,
    }

    impl ChromiumLauncher {
        pub fn new(user_agent: impl Into<String>, request_timeout: Duration) -> Self {
            Self {
                user_agent: user_agent.into(),
                request_timeout,
            }
        }
    }

    #[async_trait]
    impl DriverLauncher for ChromiumLauncher {
        async fn launch(&self) -> Result<Box<dyn RenderDriver>, ResourceError> {
            let config = BrowserConfig::builder()
                .request_timeout(self.request_timeout)
                .args(vec![
                    "--no-sandbox",
                    "--disable-dev-shm-usage",
                    "--disable-gpu",
                ])
                .build()
                .map_err(ResourceError::DriverLaunch)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| ResourceError::DriverLaunch(e.to_string()))?;

            // The CDP handler must be polled for the browser to make progress
            let handler_task = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!("Chromium handler stopped: {}", e);
                        break;
                    }
                }
            });

            info!("Launched headless Chromium");
            Ok(Box::new(ChromiumDriver {
                browser,
                handler_task: Some(handler_task),
                user_agent: self.user_agent.clone(),
            }))
        }
    }

    /// A running headless Chromium
    pub struct ChromiumDriver {
        browser: Browser,
        handler_task: Option<JoinHandle<()>>,
        user_agent: String,
    }

    impl ChromiumDriver {
        async fn load(&self, page: &Page, url: &str) -> Result<String, chromiumoxide::error::CdpError> {
            page.set_user_agent(self.user_agent.as_str()).await?;
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            page.content().await
        }
    }

    #[async_trait]
    impl RenderDriver for ChromiumDriver {
        fn name(&self) -> &str {
            "chromium"
        }

        async fn render(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| FetchError::TransientNetwork {
                    url: url.to_string(),
                    reason: format!("Failed to open page: {}", e),
                })?;

            let loaded = tokio::time::timeout(timeout, self.load(&page, url)).await;

            // Pages hold CDP targets until closed explicitly
            if let Err(e) = page.close().await {
                warn!(url, "Failed to close rendered page: {}", e);
            }

            match loaded {
                Ok(Ok(html)) => Ok(html),
                Ok(Err(e)) => Err(FetchError::TransientNetwork {
                    url: url.to_string(),
                    reason: format!("Render failed: {}", e),
                }),
                Err(_) => Err(FetchError::TransientNetwork {
                    url: url.to_string(),
                    reason: format!("Render timed out after {:?}", timeout),
                }),
            }
        }

        async fn shutdown(&mut self) -> Result<(), ResourceError> {
            let closed = self
                .browser
                .close()
                .await
                .map(|_| ())
                .map_err(|e| ResourceError::DriverShutdown(e.to_string()));

            if let Err(e) = self.browser.wait().await {
                warn!("Chromium process did not exit cleanly: {}", e);
            }
            if let Some(task) = self.handler_task.take() {
                task.abort();
            }

            closed
        }
    }
}
