//! Storage module for persisting the snapshot catalog
//!
//! This module handles:
//! - The `Snapshot` record kept for every domain
//! - The in-memory `SnapshotStore` with merge and staleness checks
//! - Whole-catalog persistence through a JSON file or a SQLite database

mod json_file;
mod schema;
mod sqlite;
mod store;
mod traits;

pub use json_file::JsonFileBackend;
pub use sqlite::SqliteBackend;
pub use store::{MergeOutcome, SnapshotStore};
pub use traits::{SnapshotBackend, StorageError, StorageResult};

use crate::config::{BackendKind, StorageConfig};
use crate::thumbnail::CaptureStrategy;
use crate::url::{domain_hash, normalize_domain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Persisted analysis record for one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Catalog key
    pub domain: String,

    /// Stable identifier used for thumbnail file names
    pub domain_hash: String,

    /// Last successfully resolved URL
    pub url: String,

    pub theme: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub technologies: BTreeSet<String>,

    #[serde(default)]
    pub hashtags: Vec<String>,

    #[serde(default)]
    pub thumbnail_path: Option<String>,

    #[serde(default)]
    pub thumbnail_strategy: Option<CaptureStrategy>,

    #[serde(default)]
    pub description: String,

    #[serde(with = "timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl Snapshot {
    /// Whole days between `last_updated` and `now`
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_days()
    }
}

/// Opens the backend named in the configuration
pub fn open_backend(config: &StorageConfig) -> StorageResult<Box<dyn SnapshotBackend>> {
    match config.backend {
        BackendKind::Json => Ok(Box::new(JsonFileBackend::new(&config.path))),
        BackendKind::Sqlite => Ok(Box::new(SqliteBackend::new(&config.path)?)),
    }
}

/// Opens the configured backend and loads the catalog from it
pub fn open_store(config: &StorageConfig) -> StorageResult<SnapshotStore> {
    SnapshotStore::load(open_backend(config)?)
}

/// Builds a domain-keyed mapping, keeping the newest record for repeated domains
///
/// Keys are normalized first, so records written under a raw host such as
/// `www.example.com` collapse into the `example.com` entry.
pub(crate) fn unique_by_domain(records: Vec<Snapshot>) -> BTreeMap<String, Snapshot> {
    let mut map: BTreeMap<String, Snapshot> = BTreeMap::new();
    for mut record in records {
        match normalize_domain(&record.domain) {
            Ok(domain) if domain != record.domain => {
                tracing::debug!("Re-keying record {} as {}", record.domain, domain);
                record.domain_hash = domain_hash(&domain);
                record.domain = domain;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Keeping unnormalizable key {}: {}", record.domain, e),
        }

        match map.get(&record.domain) {
            Some(existing) if existing.last_updated >= record.last_updated => {
                tracing::warn!("Dropping older duplicate record for {}", record.domain);
            }
            Some(_) => {
                tracing::warn!("Replacing older duplicate record for {}", record.domain);
                map.insert(record.domain.clone(), record);
            }
            None => {
                map.insert(record.domain.clone(), record);
            }
        }
    }
    map
}

/// Writes `bytes` to a temporary sibling of `path`, syncs it and renames it over `path`
///
/// Readers see either the previous file or the complete new one. Every call
/// gets its own temporary file, so concurrent writers to one path never
/// interfere; the last rename wins.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// RFC 3339 timestamps; also reads the legacy `%Y-%m-%d %H:%M:%S` form as UTC
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const LEGACY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, LEGACY_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Duration;

    /// Snapshot of `domain` last updated `days_ago` days before `now`
    pub fn snapshot(domain: &str, now: DateTime<Utc>, days_ago: i64) -> Snapshot {
        Snapshot {
            domain: domain.to_string(),
            domain_hash: crate::url::domain_hash(domain),
            url: format!("http://{}/", domain),
            theme: "Blog".to_string(),
            keywords: vec!["garden".to_string(), "seeds".to_string()],
            technologies: ["WordPress".to_string()].into_iter().collect(),
            hashtags: vec!["#garden".to_string(), "#Blog".to_string()],
            thumbnail_path: Some(format!("thumbs/{}.jpg", domain)),
            thumbnail_strategy: Some(CaptureStrategy::OpenGraph),
            description: "This blog website focuses on garden, seeds.".to_string(),
            last_updated: now - Duration::days(days_ago),
        }
    }
}
