//! Sumi-Folio: a site snapshot catalog builder
//!
//! This crate turns a list of domains into a persisted, incrementally updated
//! catalog of site snapshots (theme, keywords, detected technologies, a
//! representative thumbnail and a generated description). Each run fetches and
//! analyzes the stale domains concurrently, captures thumbnails with several
//! fallback strategies and merges the results into a durable, domain-keyed store.

pub mod analyzer;
pub mod config;
pub mod description;
pub mod output;
pub mod pipeline;
pub mod schedule;
pub mod source;
pub mod state;
pub mod storage;
pub mod thumbnail;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Folio runs
///
/// Only setup and storage problems surface here. Per-domain failures are
/// counted in the run summary and never abort a run.
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Domain source error: {0}")]
    Setup(#[from] source::SourceError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sumi-Folio operations
pub type Result<T> = std::result::Result<T, FolioError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{Coordinator, RunSummary};
pub use source::{DomainSource, DomainTask};
pub use state::TaskState;
pub use storage::{Snapshot, SnapshotStore};
pub use url::{normalize_domain, normalize_url};
