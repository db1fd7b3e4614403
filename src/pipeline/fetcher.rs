//! Page fetching
//!
//! One GET per domain. Redirects are followed by the client; the final URL
//! after redirects is what the catalog records. Any terminal status outside
//! 2xx/3xx, and any transport problem, is a per-domain failure.

use crate::config::{FetchConfig, UserAgentConfig};
use reqwest::Client;
use thiserror::Error;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after following redirects
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid URL {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Short label used in logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Connect(_) => "connect",
            FetchError::Status(_) => "status",
            FetchError::Body(_) => "body",
            FetchError::Request(_) => "request",
            FetchError::InvalidUrl(_) => "invalid_url",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// Builds the HTTP client shared by page and image fetches
///
/// # Example
///
/// ```no_run
/// use sumi_folio::config::{FetchConfig, UserAgentConfig};
/// use sumi_folio::pipeline::build_http_client;
///
/// let agent = UserAgentConfig {
///     crawler_name: "SumiFolio".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&agent, &FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(agent: &UserAgentConfig, fetch: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(agent.header_value())
        .timeout(fetch.timeout())
        .connect_timeout(fetch.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches `url` and returns its body
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, FetchError> {
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !(status.is_success() || status.is_redirection()) {
        return Err(FetchError::Status(status.as_u16()));
    }

    let final_url = response.url().clone();
    let body = response.text().await?;

    Ok(FetchedPage {
        final_url,
        status: status.as_u16(),
        body,
    })
}
