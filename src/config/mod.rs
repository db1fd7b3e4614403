//! Configuration module for Sumi-Folio
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Only the `[user-agent]` table is mandatory; every other section falls back to
//! defaults suited to a small daily catalog.
//!
//! # Example
//!
//! ```no_run
//! use sumi_folio::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("folio.toml")).unwrap();
//! println!("Refreshing snapshots older than {} days", config.pipeline.staleness_days);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AnalyzerConfig, BackendKind, Config, FetchConfig, InputConfig, PipelineConfig, RenderConfig,
    ScheduleConfig, StorageConfig, TechnologyEntry, ThemeEntry, ThumbnailConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::path::Path;

    /// Configuration with every file under `dir` and short network timeouts
    pub fn config(dir: &Path) -> Config {
        Config {
            pipeline: PipelineConfig {
                shutdown_grace_secs: 1,
                ..PipelineConfig::default()
            },
            fetch: FetchConfig {
                timeout_secs: 2,
                connect_timeout_secs: 2,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestFolio".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            input: InputConfig {
                domains_path: dir.join("domains.txt"),
                strict: false,
            },
            storage: StorageConfig {
                backend: BackendKind::Json,
                path: dir.join("data.json"),
            },
            thumbnail: ThumbnailConfig {
                dir: dir.join("thumbnails"),
                image_timeout_secs: 2,
                ..ThumbnailConfig::default()
            },
            render: RenderConfig::default(),
            analyzer: AnalyzerConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}
