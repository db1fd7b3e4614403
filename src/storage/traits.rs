//! Storage traits and error types
//!
//! This module defines the trait interface for catalog backends and the
//! associated error type.

use crate::storage::Snapshot;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the catalog
///
/// Any of these is fatal to a run.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt record for {domain}: {message}")]
    Corrupt { domain: String, message: String },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for catalog backend implementations
///
/// Backends move the whole mapping at once. `write_all` must either publish
/// the complete mapping or leave the previous content in place.
pub trait SnapshotBackend: Send {
    /// Reads every stored snapshot, keyed by domain
    ///
    /// A backend that has never been written returns an empty mapping.
    fn read_all(&self) -> StorageResult<BTreeMap<String, Snapshot>>;

    /// Replaces the stored content with `snapshots`
    fn write_all(&mut self, snapshots: &BTreeMap<String, Snapshot>) -> StorageResult<()>;

    /// Removes all stored snapshots
    fn clear(&mut self) -> StorageResult<()>;

    /// Human readable location, for logs
    fn location(&self) -> String;
}
