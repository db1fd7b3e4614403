//! In-memory snapshot catalog
//!
//! The store is loaded once per run, mutated only through [`SnapshotStore::merge`]
//! and written back through its backend at checkpoints.

use crate::description;
use crate::storage::traits::{SnapshotBackend, StorageResult};
use crate::storage::Snapshot;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Result of merging one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The domain had no prior entry
    Inserted,
    /// A prior entry was replaced
    Updated,
}

/// Domain-keyed catalog backed by a persistent store
pub struct SnapshotStore {
    backend: Box<dyn SnapshotBackend>,
    entries: BTreeMap<String, Snapshot>,
}

impl SnapshotStore {
    /// Reads the full catalog from `backend`
    pub fn load(backend: Box<dyn SnapshotBackend>) -> StorageResult<Self> {
        let entries = backend.read_all()?;
        tracing::info!(
            "Loaded {} snapshots from {}",
            entries.len(),
            backend.location()
        );
        Ok(Self { backend, entries })
    }

    pub fn get(&self, domain: &str) -> Option<&Snapshot> {
        self.entries.get(domain)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshots in domain order
    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.values()
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Returns true if `domain` has no entry or its entry is at least
    /// `threshold_days` whole days old
    pub fn is_stale(&self, domain: &str, threshold_days: u32, now: DateTime<Utc>) -> bool {
        match self.entries.get(domain) {
            None => true,
            Some(snapshot) => snapshot.age_days(now) >= i64::from(threshold_days),
        }
    }

    /// Replaces or inserts the entry for `snapshot.domain`
    ///
    /// Derived fields (description and hashtags) are regenerated here, empty
    /// keywords and technologies are dropped, and `last_updated` never moves
    /// backwards for a domain.
    pub fn merge(&mut self, mut snapshot: Snapshot) -> MergeOutcome {
        snapshot.keywords.retain(|k| !k.trim().is_empty());
        snapshot.technologies.retain(|t| !t.trim().is_empty());

        let prior = self.entries.get(&snapshot.domain);
        if let Some(prior) = prior {
            if snapshot.last_updated < prior.last_updated {
                tracing::warn!(
                    "Clock went backwards for {}; keeping last_updated {}",
                    snapshot.domain,
                    prior.last_updated
                );
                snapshot.last_updated = prior.last_updated;
            }
        }

        snapshot.description = description::describe(&snapshot.theme, &snapshot.keywords);
        snapshot.hashtags = description::hashtags(&snapshot.theme, &snapshot.keywords);

        let outcome = if prior.is_some() {
            MergeOutcome::Updated
        } else {
            MergeOutcome::Inserted
        };

        tracing::debug!("Merged {} ({:?})", snapshot.domain, outcome);
        self.entries.insert(snapshot.domain.clone(), snapshot);
        outcome
    }

    /// Writes the full catalog to the backend
    pub fn persist(&mut self) -> StorageResult<()> {
        self.backend.write_all(&self.entries)?;
        tracing::debug!(
            "Persisted {} snapshots to {}",
            self.entries.len(),
            self.backend.location()
        );
        Ok(())
    }

    /// Clears both the in-memory catalog and the backend
    pub fn reset(&mut self) -> StorageResult<()> {
        self.backend.clear()?;
        self.entries.clear();
        tracing::info!("Cleared catalog at {}", self.backend.location());
        Ok(())
    }
}
