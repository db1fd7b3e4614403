//! Database schema definitions and migrations
//!
//! This module contains the SQL schema for the SQLite catalog backend.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per domain; list columns hold JSON arrays
CREATE TABLE IF NOT EXISTS snapshots (
    domain TEXT PRIMARY KEY,
    domain_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    theme TEXT NOT NULL,
    keywords TEXT NOT NULL DEFAULT '[]',
    technologies TEXT NOT NULL DEFAULT '[]',
    hashtags TEXT NOT NULL DEFAULT '[]',
    thumbnail_path TEXT,
    thumbnail_strategy TEXT,
    description TEXT NOT NULL DEFAULT '',
    last_updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_last_updated ON snapshots(last_updated);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('version', ?1)",
        [get_schema_version().to_string()],
    )?;
    Ok(())
}

/// Gets the current schema version
pub fn get_schema_version() -> u32 {
    1
}
