//! Thumbnail capture
//!
//! A thumbnail is acquired by trying, in order:
//! 1. the page's `og:image`
//! 2. the page's Twitter Card image
//! 3. the largest `<img>` above a minimum pixel area
//! 4. a rendered capture of the page, when a [`Renderer`] is available
//! 5. a deterministic placeholder
//!
//! Every strategy failure is logged and the next strategy is tried. Capture
//! never fails towards the caller: the worst outcome is a placeholder.
//!
//! Captures are written under a staging name next to the live thumbnail and
//! only replace it when the outcome is published.

mod candidates;
mod image_ops;
mod placeholder;
mod render;

pub use candidates::{extract_candidates, ImageCandidate, PageImages};
pub use image_ops::ThumbnailBox;
pub use placeholder::{placeholder_color, render_placeholder};
pub use render::{ChromeRenderer, PagePool, RenderError, Renderer, Viewport};

#[cfg(test)]
pub(crate) use image_ops::test_images;
#[cfg(test)]
pub(crate) use render::test_renderers;

use crate::config::{RenderConfig, ThumbnailConfig};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use url::Url;

/// Number of `<img>` candidates downloaded at once
const IMAGE_FETCH_CONCURRENCY: usize = 4;

/// Which strategy produced a thumbnail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStrategy {
    OpenGraph,
    TwitterCard,
    LargestImage,
    Rendered,
    Placeholder,
}

impl CaptureStrategy {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::OpenGraph => "open_graph",
            Self::TwitterCard => "twitter_card",
            Self::LargestImage => "largest_image",
            Self::Rendered => "rendered",
            Self::Placeholder => "placeholder",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "open_graph" => Some(Self::OpenGraph),
            "twitter_card" => Some(Self::TwitterCard),
            "largest_image" => Some(Self::LargestImage),
            "rendered" => Some(Self::Rendered),
            "placeholder" => Some(Self::Placeholder),
            _ => None,
        }
    }
}

impl fmt::Display for CaptureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Failure of a single image strategy; always degraded, never surfaced
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Image request returned HTTP {0}")]
    Status(u16),

    #[error("Image is too large ({0} bytes)")]
    TooLarge(u64),

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Image worker failed: {0}")]
    Worker(String),
}

/// Result of a capture: the strategy that won and the staged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub strategy: CaptureStrategy,
    /// Live thumbnail path the staged file is published to
    pub path: PathBuf,
    /// `None` only when even the placeholder could not be written
    staged: Option<PathBuf>,
}

impl CaptureOutcome {
    pub fn is_written(&self) -> bool {
        self.staged.is_some()
    }

    /// Moves the staged file over the live thumbnail and returns its path
    pub fn publish(self) -> Option<PathBuf> {
        let staged = self.staged?;
        match std::fs::rename(&staged, &self.path) {
            Ok(()) => Some(self.path),
            Err(e) => {
                tracing::error!(
                    "Could not publish thumbnail {} to {}: {}",
                    staged.display(),
                    self.path.display(),
                    e
                );
                None
            }
        }
    }
}

/// Acquires representative images for pages
pub struct ThumbnailCapturer {
    client: reqwest::Client,
    config: ThumbnailConfig,
    target: ThumbnailBox,
    slots: Semaphore,
    renderer: Option<Arc<dyn Renderer>>,
    viewport: Viewport,
    render_timeout: Duration,
    render_attempts: u32,
}

impl ThumbnailCapturer {
    /// Creates a capturer that runs at most `concurrency` captures at once
    pub fn new(client: reqwest::Client, config: &ThumbnailConfig, concurrency: usize) -> Self {
        let render = RenderConfig::default();
        Self {
            client,
            target: ThumbnailBox {
                width: config.width,
                height: config.height,
                jpeg_quality: config.jpeg_quality,
            },
            config: config.clone(),
            slots: Semaphore::new(concurrency.max(1)),
            renderer: None,
            viewport: Viewport {
                width: render.viewport_width,
                height: render.viewport_height,
            },
            render_timeout: render.timeout(),
            render_attempts: render.attempts,
        }
    }

    /// Enables the rendered strategy
    pub fn with_renderer(mut self, renderer: Option<Arc<dyn Renderer>>, config: &RenderConfig) -> Self {
        self.renderer = renderer;
        self.viewport = Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
        };
        self.render_timeout = config.timeout();
        self.render_attempts = config.attempts.max(1);
        self
    }

    /// Thumbnail file for `domain`
    pub fn output_path(&self, domain: &str) -> PathBuf {
        self.config
            .dir
            .join(format!("{}.jpg", crate::url::domain_hash(domain)))
    }

    /// Where a capture for `domain` is written before it is published
    pub fn staging_path(&self, domain: &str) -> PathBuf {
        self.config
            .dir
            .join(format!("{}.staged.jpg", crate::url::domain_hash(domain)))
    }

    /// Captures a thumbnail for `page_url`, fetching the page itself
    ///
    /// Like [`ThumbnailCapturer::capture_page`], the result is staged until
    /// [`CaptureOutcome::publish`] is called.
    pub async fn capture(&self, page_url: &Url, domain: &str) -> CaptureOutcome {
        let html = match self.fetch_page(page_url).await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::debug!("Could not fetch {} for image discovery: {}", page_url, e);
                None
            }
        };
        self.capture_page(page_url, domain, html.as_deref(), None).await
    }

    /// Captures a thumbnail for an already fetched page
    ///
    /// Once `deadline` passes, outstanding strategies are abandoned and the
    /// placeholder is produced.
    pub async fn capture_page(
        &self,
        page_url: &Url,
        domain: &str,
        html: Option<&str>,
        deadline: Option<Instant>,
    ) -> CaptureOutcome {
        let output = self.staging_path(domain);
        let attempt = self.try_strategies(page_url, domain, html, &output);

        let found = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, attempt).await {
                Ok(found) => found,
                Err(_) => {
                    tracing::warn!("Capture deadline passed for {}; using placeholder", domain);
                    None
                }
            },
            None => attempt.await,
        };

        if let Some(strategy) = found {
            tracing::debug!("Thumbnail for {} from {}", domain, strategy);
            return CaptureOutcome {
                strategy,
                path: self.output_path(domain),
                staged: Some(output),
            };
        }

        self.placeholder(domain, output).await
    }

    async fn try_strategies(
        &self,
        page_url: &Url,
        domain: &str,
        html: Option<&str>,
        output: &Path,
    ) -> Option<CaptureStrategy> {
        let _slot = self.slots.acquire().await.ok()?;

        let images = html
            .map(|html| {
                extract_candidates(
                    html,
                    page_url,
                    &self.config.denylist,
                    self.config.max_image_candidates,
                )
            })
            .unwrap_or_default();

        if let Some(url) = &images.open_graph {
            if self.try_static(url, domain, output, CaptureStrategy::OpenGraph).await {
                return Some(CaptureStrategy::OpenGraph);
            }
        }

        if let Some(url) = &images.twitter {
            if self.try_static(url, domain, output, CaptureStrategy::TwitterCard).await {
                return Some(CaptureStrategy::TwitterCard);
            }
        }

        if self.try_largest(&images.images, domain, output).await {
            return Some(CaptureStrategy::LargestImage);
        }

        if self.try_render(page_url, domain, output).await {
            return Some(CaptureStrategy::Rendered);
        }

        None
    }

    async fn try_static(
        &self,
        image_url: &Url,
        domain: &str,
        output: &Path,
        strategy: CaptureStrategy,
    ) -> bool {
        let result = async {
            let bytes = self.fetch_image(image_url).await?;
            self.write_image(bytes, output, false).await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("{} image {} failed for {}: {}", strategy, image_url, domain, e);
                false
            }
        }
    }

    async fn try_largest(&self, candidates: &[ImageCandidate], domain: &str, output: &Path) -> bool {
        let min_area = self.config.min_image_area;
        let eligible: Vec<(usize, Url)> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.hint_area.map_or(true, |area| area >= min_area))
            .map(|(index, c)| (index, c.url.clone()))
            .collect();

        let mut sized: Vec<(u64, usize, Url, Vec<u8>)> = futures::stream::iter(eligible)
            .map(move |(index, url)| async move {
                let bytes = match self.fetch_image(&url).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::trace!("Image candidate {} skipped: {}", url, e);
                        return None;
                    }
                };
                match image_ops::probe_area(&bytes) {
                    Ok(area) if area >= min_area => Some((area, index, url, bytes)),
                    Ok(area) => {
                        tracing::trace!("Image candidate {} too small ({} px)", url, area);
                        None
                    }
                    Err(e) => {
                        tracing::trace!("Image candidate {} unreadable: {}", url, e);
                        None
                    }
                }
            })
            .buffer_unordered(IMAGE_FETCH_CONCURRENCY)
            .filter_map(|sized| async move { sized })
            .collect()
            .await;

        // Largest first; document order breaks ties
        sized.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        for (area, _, url, bytes) in sized {
            match self.write_image(bytes, output, false).await {
                Ok(()) => {
                    tracing::debug!("Largest image for {}: {} ({} px)", domain, url, area);
                    return true;
                }
                Err(e) => tracing::debug!("Image {} failed for {}: {}", url, domain, e),
            }
        }
        false
    }

    async fn try_render(&self, page_url: &Url, domain: &str, output: &Path) -> bool {
        let Some(renderer) = &self.renderer else {
            return false;
        };

        for attempt in 1..=self.render_attempts {
            let rendered = tokio::time::timeout(
                self.render_timeout,
                renderer.render(page_url, self.viewport),
            )
            .await
            .unwrap_or(Err(RenderError::Timeout(self.render_timeout)));

            match rendered {
                Ok(bytes) => match self.write_image(bytes, output, true).await {
                    Ok(()) => return true,
                    Err(e) => tracing::warn!("Rendered capture of {} unusable: {}", domain, e),
                },
                Err(e) => tracing::warn!(
                    "Render attempt {}/{} failed for {}: {}",
                    attempt,
                    self.render_attempts,
                    domain,
                    e
                ),
            }
        }
        false
    }

    async fn placeholder(&self, domain: &str, output: PathBuf) -> CaptureOutcome {
        let target = self.target;
        let initials = self.config.placeholder_initials;
        let owned_domain = domain.to_string();
        let path = output.clone();

        let written = tokio::task::spawn_blocking(move || {
            placeholder::write_placeholder(&owned_domain, &target, initials, &path)
        })
        .await
        .map_err(|e| ImageError::Worker(e.to_string()))
        .and_then(|result| result);

        let staged = match written {
            Ok(()) => Some(output),
            Err(e) => {
                tracing::error!("Placeholder for {} could not be written: {}", domain, e);
                None
            }
        };
        CaptureOutcome {
            strategy: CaptureStrategy::Placeholder,
            path: self.output_path(domain),
            staged,
        }
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, ImageError> {
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(ImageError::Status(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }

    async fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, ImageError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.config.image_timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }

        let max = self.config.max_image_bytes as u64;
        if let Some(length) = response.content_length() {
            if length > max {
                return Err(ImageError::TooLarge(length));
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() as u64 > max {
            return Err(ImageError::TooLarge(bytes.len() as u64));
        }
        Ok(bytes.to_vec())
    }

    /// Decodes, resizes and writes an image on the blocking pool
    async fn write_image(&self, bytes: Vec<u8>, output: &Path, rendered: bool) -> Result<(), ImageError> {
        let target = self.target;
        let path = output.to_path_buf();

        tokio::task::spawn_blocking(move || {
            if rendered {
                image_ops::process_render(&bytes, &target, &path)
            } else {
                image_ops::process_static(&bytes, &target, &path)
            }
        })
        .await
        .map_err(|e| ImageError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::image_ops::test_images::png;
    use super::render::test_renderers::{CountingRenderer, HangingRenderer, StubRenderer};
    use super::*;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn capturer(dir: &Path) -> ThumbnailCapturer {
        let config = ThumbnailConfig {
            dir: dir.to_path_buf(),
            ..ThumbnailConfig::default()
        };
        ThumbnailCapturer::new(reqwest::Client::new(), &config, 2)
    }

    async fn serve_png(server: &MockServer, route: &str, width: u32, height: u32) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(png(width, height)),
            )
            .mount(server)
            .await;
    }

    fn page_url(server: &MockServer) -> Url {
        Url::parse(&format!("{}/", server.uri())).unwrap()
    }

    #[test]
    fn test_strategy_names_roundtrip_through_db_strings() {
        for strategy in [
            CaptureStrategy::OpenGraph,
            CaptureStrategy::TwitterCard,
            CaptureStrategy::LargestImage,
            CaptureStrategy::Rendered,
            CaptureStrategy::Placeholder,
        ] {
            assert_eq!(CaptureStrategy::from_db_string(strategy.to_db_string()), Some(strategy));
        }
        assert_eq!(
            serde_json::to_string(&CaptureStrategy::OpenGraph).unwrap(),
            "\"open_graph\""
        );
    }

    #[tokio::test]
    async fn test_open_graph_wins() {
        let server = MockServer::start().await;
        serve_png(&server, "/og.png", 800, 600).await;
        let dir = tempdir().unwrap();
        let capturer = capturer(dir.path());

        let html = r#"<meta property="og:image" content="/og.png">
            <meta name="twitter:image" content="/tw.png">"#;
        let outcome = capturer
            .capture_page(&page_url(&server), "example.com", Some(html), None)
            .await;

        assert_eq!(outcome.strategy, CaptureStrategy::OpenGraph);
        let path = outcome.publish().unwrap();
        assert_eq!(path, capturer.output_path("example.com"));
        let written = image::open(&path).unwrap();
        assert_eq!(written.height(), 200);
        assert!((266..=267).contains(&written.width()));
    }

    #[tokio::test]
    async fn test_twitter_fallback_when_og_is_broken() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/og.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        serve_png(&server, "/tw.png", 400, 400).await;
        let dir = tempdir().unwrap();

        let html = r#"<meta property="og:image" content="/og.png">
            <meta name="twitter:image" content="/tw.png">"#;
        let outcome = capturer(dir.path())
            .capture_page(&page_url(&server), "example.com", Some(html), None)
            .await;

        assert_eq!(outcome.strategy, CaptureStrategy::TwitterCard);
    }

    #[tokio::test]
    async fn test_largest_image_above_threshold() {
        let server = MockServer::start().await;
        serve_png(&server, "/small.png", 40, 40).await;
        serve_png(&server, "/medium.png", 200, 100).await;
        serve_png(&server, "/large.png", 600, 300).await;
        Mock::given(method("GET"))
            .and(path("/broken.png"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
            .mount(&server)
            .await;
        let dir = tempdir().unwrap();
        let capturer = capturer(dir.path());

        let html = r#"<img src="/small.png"><img src="/broken.png">
            <img src="/medium.png"><img src="/large.png"><img src="/missing.png">"#;
        let outcome = capturer
            .capture_page(&page_url(&server), "example.com", Some(html), None)
            .await;

        assert_eq!(outcome.strategy, CaptureStrategy::LargestImage);
        let written = image::open(outcome.publish().unwrap()).unwrap();
        assert_eq!((written.width(), written.height()), (300, 150));
    }

    #[tokio::test]
    async fn test_small_images_fall_through_to_placeholder() {
        let server = MockServer::start().await;
        serve_png(&server, "/small.png", 40, 40).await;
        let dir = tempdir().unwrap();

        let outcome = capturer(dir.path())
            .capture_page(
                &page_url(&server),
                "example.com",
                Some(r#"<img src="/small.png">"#),
                None,
            )
            .await;

        assert_eq!(outcome.strategy, CaptureStrategy::Placeholder);
        assert!(outcome.publish().unwrap().exists());
    }

    #[tokio::test]
    async fn test_rendered_capture_after_static_strategies() {
        let dir = tempdir().unwrap();
        let renderer = Arc::new(StubRenderer::new(png(1200, 1600)));
        let capturer = capturer(dir.path())
            .with_renderer(Some(renderer.clone() as Arc<dyn Renderer>), &RenderConfig::default());

        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let outcome = capturer.capture_page(&url, "example.com", None, None).await;

        assert_eq!(outcome.strategy, CaptureStrategy::Rendered);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        let written = image::open(outcome.publish().unwrap()).unwrap();
        assert_eq!((written.width(), written.height()), (300, 200));
    }

    #[tokio::test]
    async fn test_render_retries() {
        let dir = tempdir().unwrap();
        let renderer = Arc::new(StubRenderer {
            failures: 1,
            ..StubRenderer::new(png(800, 800))
        });
        let render_config = RenderConfig {
            attempts: 2,
            ..RenderConfig::default()
        };
        let capturer = capturer(dir.path()).with_renderer(Some(renderer.clone() as Arc<dyn Renderer>), &render_config);

        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let outcome = capturer.capture_page(&url, "example.com", None, None).await;

        assert_eq!(outcome.strategy, CaptureStrategy::Rendered);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_render_degrades_to_placeholder() {
        let dir = tempdir().unwrap();
        let renderer = Arc::new(StubRenderer {
            failures: usize::MAX,
            ..StubRenderer::new(Vec::new())
        });
        let capturer = capturer(dir.path()).with_renderer(Some(renderer as Arc<dyn Renderer>), &RenderConfig::default());

        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let outcome = capturer.capture_page(&url, "example.com", None, None).await;

        assert_eq!(outcome.strategy, CaptureStrategy::Placeholder);
        assert!(outcome.publish().is_some());
    }

    #[tokio::test]
    async fn test_deadline_cuts_capture_short() {
        let dir = tempdir().unwrap();
        let capturer = capturer(dir.path())
            .with_renderer(Some(Arc::new(HangingRenderer) as Arc<dyn Renderer>), &RenderConfig::default());

        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let deadline = Instant::now() + Duration::from_millis(100);
        let outcome = capturer
            .capture_page(&url, "example.com", None, Some(deadline))
            .await;

        assert_eq!(outcome.strategy, CaptureStrategy::Placeholder);
        assert!(outcome.publish().unwrap().exists());
    }

    #[tokio::test]
    async fn test_capture_fetches_page_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<meta property="og:image" content="/og.png">"#),
            )
            .mount(&server)
            .await;
        serve_png(&server, "/og.png", 300, 200).await;
        let dir = tempdir().unwrap();

        let outcome = capturer(dir.path())
            .capture(&page_url(&server), "example.com")
            .await;

        assert_eq!(outcome.strategy, CaptureStrategy::OpenGraph);
    }

    #[tokio::test]
    async fn test_unreachable_page_still_gets_placeholder() {
        let dir = tempdir().unwrap();
        let url = Url::parse("http://127.0.0.1:1/").unwrap();

        let outcome = capturer(dir.path()).capture(&url, "example.com").await;

        assert_eq!(outcome.strategy, CaptureStrategy::Placeholder);
        assert!(outcome.publish().unwrap().exists());
    }

    #[tokio::test]
    async fn test_capture_leaves_live_thumbnail_until_published() {
        let dir = tempdir().unwrap();
        let capturer = capturer(dir.path());
        let live = capturer.output_path("example.com");
        std::fs::create_dir_all(live.parent().unwrap()).unwrap();
        std::fs::write(&live, b"previous").unwrap();

        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let outcome = capturer.capture_page(&url, "example.com", None, None).await;

        assert!(outcome.is_written());
        assert_eq!(std::fs::read(&live).unwrap(), b"previous");
        assert!(capturer.staging_path("example.com").exists());

        assert_eq!(outcome.publish(), Some(live.clone()));
        assert!(image::open(&live).is_ok());
        assert!(!capturer.staging_path("example.com").exists());
    }

    #[tokio::test]
    async fn test_concurrent_captures_bounded_by_slots() {
        let dir = tempdir().unwrap();
        let renderer = Arc::new(CountingRenderer::new(png(600, 400), Duration::from_millis(50)));
        let capturer = capturer(dir.path())
            .with_renderer(Some(renderer.clone() as Arc<dyn Renderer>), &RenderConfig::default());

        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let domains: Vec<String> = (0..6).map(|i| format!("site{}.test", i)).collect();
        let outcomes = futures::future::join_all(
            domains
                .iter()
                .map(|domain| capturer.capture_page(&url, domain, None, None)),
        )
        .await;

        assert!(outcomes.iter().all(|o| o.strategy == CaptureStrategy::Rendered));
        assert_eq!(renderer.peak.load(Ordering::SeqCst), 2);
    }
}
