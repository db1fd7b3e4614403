//! JSON file backend
//!
//! The catalog is a single JSON array, newest snapshots first. That is the
//! order the publisher renders, so the file can be served as-is.

use crate::storage::traits::{SnapshotBackend, StorageError, StorageResult};
use crate::storage::{atomic_write, unique_by_domain, Snapshot};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Catalog stored as one JSON document
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotBackend for JsonFileBackend {
    fn read_all(&self) -> StorageResult<BTreeMap<String, Snapshot>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let records: Vec<Snapshot> = serde_json::from_str(&content)?;
        Ok(unique_by_domain(records))
    }

    fn write_all(&mut self, snapshots: &BTreeMap<String, Snapshot>) -> StorageResult<()> {
        let mut ordered: Vec<&Snapshot> = snapshots.values().collect();
        ordered.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.domain.cmp(&b.domain))
        });

        let json = serde_json::to_vec_pretty(&ordered)?;
        atomic_write(&self.path, &json).map_err(|e| StorageError::io(&self.path, e))
    }

    fn clear(&mut self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
