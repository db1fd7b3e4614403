//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the SnapshotBackend trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SnapshotBackend, StorageError, StorageResult};
use crate::storage::{timestamp, Snapshot};
use crate::thumbnail::CaptureStrategy;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// SQLite storage backend
pub struct SqliteBackend {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Creates a new SqliteBackend instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteBackend)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn, path: None })
    }
}

/// Decodes a JSON array column
fn decode_list<T>(domain: &str, column: &str, raw: &str) -> StorageResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt {
        domain: domain.to_string(),
        message: format!("{}: {}", column, e),
    })
}

impl SnapshotBackend for SqliteBackend {
    fn read_all(&self) -> StorageResult<BTreeMap<String, Snapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT domain, domain_hash, url, theme, keywords, technologies, hashtags,
             thumbnail_path, thumbnail_strategy, description, last_updated
             FROM snapshots",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, String>(9)?,
                row.get::<_, String>(10)?,
            ))
        })?;

        let mut snapshots = BTreeMap::new();
        for row in rows {
            let (
                domain,
                domain_hash,
                url,
                theme,
                keywords,
                technologies,
                hashtags,
                thumbnail_path,
                thumbnail_strategy,
                description,
                last_updated,
            ) = row?;

            let last_updated =
                timestamp::parse(&last_updated).ok_or_else(|| StorageError::Corrupt {
                    domain: domain.clone(),
                    message: format!("invalid last_updated '{}'", last_updated),
                })?;

            let snapshot = Snapshot {
                keywords: decode_list(&domain, "keywords", &keywords)?,
                technologies: decode_list(&domain, "technologies", &technologies)?,
                hashtags: decode_list(&domain, "hashtags", &hashtags)?,
                thumbnail_strategy: thumbnail_strategy
                    .as_deref()
                    .and_then(CaptureStrategy::from_db_string),
                domain_hash,
                url,
                theme,
                thumbnail_path,
                description,
                last_updated,
                domain,
            };
            snapshots.insert(snapshot.domain.clone(), snapshot);
        }

        Ok(snapshots)
    }

    fn write_all(&mut self, snapshots: &BTreeMap<String, Snapshot>) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM snapshots", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO snapshots (domain, domain_hash, url, theme, keywords, technologies,
                 hashtags, thumbnail_path, thumbnail_strategy, description, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;

            for snapshot in snapshots.values() {
                stmt.execute(params![
                    snapshot.domain,
                    snapshot.domain_hash,
                    snapshot.url,
                    snapshot.theme,
                    serde_json::to_string(&snapshot.keywords)?,
                    serde_json::to_string(&snapshot.technologies)?,
                    serde_json::to_string(&snapshot.hashtags)?,
                    snapshot.thumbnail_path,
                    snapshot.thumbnail_strategy.map(|s| s.to_db_string()),
                    snapshot.description,
                    snapshot.last_updated.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM snapshots", [])?;
        Ok(())
    }

    fn location(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{}", path.display()),
            None => "sqlite::memory:".to_string(),
        }
    }
}
