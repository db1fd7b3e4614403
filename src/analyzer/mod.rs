//! Content analysis
//!
//! This module turns raw page content into a theme, ranked keywords and the
//! set of detected technologies. Analysis is deterministic for a given input
//! and pattern tables, and never fails: anything that goes wrong degrades to
//! [`Analysis::degraded`].

mod keywords;
mod technology;
mod text;
mod theme;

pub use keywords::extract_keywords;
pub use technology::{default_technologies, detect_technologies};
pub use text::{normalize, visible_text};
pub use theme::{default_themes, detect_theme, GENERAL_THEME, UNKNOWN_THEME};

use crate::config::{AnalyzerConfig, TechnologyEntry, ThemeEntry};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Result of analyzing one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub theme: String,
    pub keywords: Vec<String>,
    pub technologies: BTreeSet<String>,
}

impl Analysis {
    /// The result used when content is missing or analysis broke down
    pub fn degraded() -> Self {
        Self {
            theme: UNKNOWN_THEME.to_string(),
            keywords: Vec::new(),
            technologies: BTreeSet::new(),
        }
    }
}

/// Pluggable content analysis strategy
pub trait ContentAnalyzer: Send + Sync {
    fn analyze(&self, raw_html: &str) -> Analysis;
}

/// Frequency keywords, table-scored themes and substring technology detection
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    max_keywords: usize,
    min_words_keywords: usize,
    min_words_theme: usize,
    themes: Vec<ThemeEntry>,
    technologies: Vec<TechnologyEntry>,
}

impl PatternAnalyzer {
    /// Builds an analyzer; empty tables in `config` fall back to the built-in ones
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            max_keywords: config.max_keywords,
            min_words_keywords: config.min_words_keywords,
            min_words_theme: config.min_words_theme,
            themes: if config.themes.is_empty() {
                default_themes()
            } else {
                config.themes.clone()
            },
            technologies: if config.technologies.is_empty() {
                default_technologies()
            } else {
                config.technologies.clone()
            },
        }
    }
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}

impl ContentAnalyzer for PatternAnalyzer {
    fn analyze(&self, raw_html: &str) -> Analysis {
        if raw_html.trim().is_empty() {
            return Analysis::degraded();
        }

        let normalized = normalize(&visible_text(raw_html));
        let words = text::word_count(&normalized);

        let keywords = if words < self.min_words_keywords {
            Vec::new()
        } else {
            extract_keywords(&normalized, self.max_keywords)
        };

        let theme = if words < self.min_words_theme {
            UNKNOWN_THEME.to_string()
        } else {
            detect_theme(&normalized, &self.themes)
        };

        Analysis {
            theme,
            keywords,
            technologies: detect_technologies(raw_html, &self.technologies),
        }
    }
}

/// Runs `analyzer` on the blocking pool
///
/// A panic inside the analyzer degrades the result instead of reaching the
/// caller.
pub async fn analyze_blocking(analyzer: Arc<dyn ContentAnalyzer>, raw_html: Arc<str>) -> Analysis {
    match tokio::task::spawn_blocking(move || analyzer.analyze(&raw_html)).await {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::error!("Content analysis failed: {}", e);
            Analysis::degraded()
        }
    }
}
