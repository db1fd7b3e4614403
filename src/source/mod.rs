//! Domain sources
//!
//! A domain source produces the finite list of [`DomainTask`]s for one run.
//! The pipeline treats that list as a snapshot of work: it is read once at
//! startup and never re-read mid-run.

mod list_file;

pub use list_file::DomainListFile;

use std::path::PathBuf;
use thiserror::Error;

/// One unit of work: a normalized domain and the URL used to fetch it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainTask {
    /// Fetchable URL (scheme included)
    pub url: String,

    /// Normalized host: no scheme, no port, no leading `www.`
    pub domain: String,
}

impl DomainTask {
    pub fn new(domain: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            url: url.into(),
        }
    }
}

/// Errors that prevent a run from starting
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read domain list {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid entry on line {line}: {message}")]
    InvalidEntry { line: usize, message: String },
}

/// Anything that can hand the pipeline its list of domains
pub trait DomainSource {
    /// Returns the tasks for one run, in source order
    fn load_tasks(&self) -> Result<Vec<DomainTask>, SourceError>;
}

impl DomainSource for Vec<DomainTask> {
    fn load_tasks(&self) -> Result<Vec<DomainTask>, SourceError> {
        Ok(self.clone())
    }
}
