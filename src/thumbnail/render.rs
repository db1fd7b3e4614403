//! Rendered page captures through a headless browser
//!
//! Rendering is an optional capability. [`ChromeRenderer::detect`] tries to
//! launch (or connect to) a Chromium instance at startup and returns `None`
//! when none is available, in which case the rendered strategy is skipped.

use crate::config::RenderConfig;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use url::Url;

/// Browser window size used for a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Browser unavailable: {0}")]
    Unavailable(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Render timed out after {0:?}")]
    Timeout(Duration),

    #[error("Renderer is shut down")]
    Closed,
}

impl From<chromiumoxide::error::CdpError> for RenderError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(e.to_string())
    }
}

/// Capability that turns a URL into a screenshot
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Returns encoded image bytes of the page as shown in `viewport`
    async fn render(&self, url: &Url, viewport: Viewport) -> Result<Vec<u8>, RenderError>;
}

/// Closes its page when dropped, including when a capture is cancelled
struct PageGuard {
    page: Page,
    url: String,
    closed: bool,
}

impl PageGuard {
    fn new(page: Page, url: &Url) -> Self {
        Self {
            page,
            url: url.to_string(),
            closed: false,
        }
    }

    fn page(&self) -> &Page {
        &self.page
    }

    async fn close(mut self) {
        self.closed = true;
        if let Err(e) = self.page.clone().close().await {
            tracing::debug!("Failed to close page for {}: {}", self.url, e);
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let page = self.page.clone();
        let url = std::mem::take(&mut self.url);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = page.close().await {
                    tracing::debug!("Page cleanup failed for {}: {}", url, e);
                }
            });
        }
    }
}

/// Limits how many renders of `R` run at once
pub struct PagePool<R> {
    inner: R,
    pages: Semaphore,
}

impl<R: Renderer> PagePool<R> {
    pub fn new(inner: R, max_pages: usize) -> Self {
        Self {
            inner,
            pages: Semaphore::new(max_pages.max(1)),
        }
    }
}

#[async_trait]
impl<R: Renderer> Renderer for PagePool<R> {
    async fn render(&self, url: &Url, viewport: Viewport) -> Result<Vec<u8>, RenderError> {
        let _permit = self.pages.acquire().await.map_err(|_| RenderError::Closed)?;
        self.inner.render(url, viewport).await
    }
}

/// Chromium-backed renderer; every render opens its own page
pub struct ChromeRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    settle: Duration,
}

impl ChromeRenderer {
    /// Launches a local browser, or connects to `remote-url` when configured
    pub async fn launch(config: &RenderConfig) -> Result<Self, RenderError> {
        let (browser, mut handler) = if let Some(url) = &config.remote_url {
            tracing::info!("Connecting to remote browser at {}", url);
            Browser::connect(url.as_str())
                .await
                .map_err(|e| RenderError::Unavailable(e.to_string()))?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .window_size(config.viewport_width, config.viewport_height)
                .request_timeout(config.timeout())
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--hide-scrollbars");

            if let Some(path) = &config.chrome_path {
                builder = builder.chrome_executable(path);
            }

            let browser_config = builder.build().map_err(RenderError::Unavailable)?;
            Browser::launch(browser_config)
                .await
                .map_err(|e| RenderError::Unavailable(e.to_string()))?
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            settle: config.settle(),
        })
    }

    /// Returns a renderer when rendering is enabled and a browser can be started
    pub async fn detect(config: &RenderConfig) -> Option<Arc<dyn Renderer>> {
        if !config.enabled {
            tracing::debug!("Rendered captures disabled");
            return None;
        }

        match Self::launch(config).await {
            Ok(renderer) => {
                tracing::info!("Rendered captures enabled ({} pages)", config.max_pages);
                Some(Arc::new(PagePool::new(renderer, config.max_pages as usize)))
            }
            Err(e) => {
                tracing::warn!("Rendered captures unavailable: {}", e);
                None
            }
        }
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &Url, viewport: Viewport) -> Result<Vec<u8>, RenderError> {
        let page = PageGuard::new(self.browser.new_page("about:blank").await?, url);

        let metrics = SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            1.0,
            false,
        );
        page.page().execute(metrics).await?;

        page.page().goto(url.as_str()).await?;
        tokio::time::sleep(self.settle).await;

        let bytes = page
            .page()
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await?;

        page.close().await;
        Ok(bytes)
    }
}
