//! Statistics over the snapshot catalog
//!
//! This module provides functionality for summarizing the catalog held by a
//! [`SnapshotStore`] and printing it for `--stats`.

use crate::storage::SnapshotStore;
use crate::thumbnail::CaptureStrategy;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Number of technologies listed by [`print_statistics`]
const TOP_TECHNOLOGIES: usize = 10;

/// Catalog statistics summary
#[derive(Debug, Clone, Default)]
pub struct CatalogStatistics {
    /// Number of snapshots
    pub entries: usize,

    /// Snapshots per theme
    pub themes: BTreeMap<String, usize>,

    /// Technologies by number of sites, most common first
    pub technologies: Vec<(String, usize)>,

    /// Thumbnails per capture strategy
    pub strategies: HashMap<CaptureStrategy, usize>,

    /// Entries whose thumbnail file is missing
    pub missing_thumbnails: usize,

    pub oldest: Option<(String, DateTime<Utc>)>,
    pub newest: Option<(String, DateTime<Utc>)>,
}

impl CatalogStatistics {
    /// Share of thumbnails that are placeholders, in percent
    pub fn placeholder_share(&self) -> f64 {
        if self.entries == 0 {
            return 0.0;
        }
        let placeholders = self
            .strategies
            .get(&CaptureStrategy::Placeholder)
            .copied()
            .unwrap_or(0);
        placeholders as f64 / self.entries as f64 * 100.0
    }
}

/// Collects statistics from the loaded catalog
pub fn load_statistics(store: &SnapshotStore) -> CatalogStatistics {
    let mut stats = CatalogStatistics {
        entries: store.len(),
        ..CatalogStatistics::default()
    };
    let mut technologies: HashMap<&str, usize> = HashMap::new();

    for snapshot in store.snapshots() {
        *stats.themes.entry(snapshot.theme.clone()).or_insert(0) += 1;

        for tech in &snapshot.technologies {
            *technologies.entry(tech.as_str()).or_insert(0) += 1;
        }

        if let Some(strategy) = snapshot.thumbnail_strategy {
            *stats.strategies.entry(strategy).or_insert(0) += 1;
        }

        let has_file = snapshot
            .thumbnail_path
            .as_deref()
            .map_or(false, |path| std::path::Path::new(path).exists());
        if !has_file {
            stats.missing_thumbnails += 1;
        }

        let stamp = (snapshot.domain.clone(), snapshot.last_updated);
        if stats.oldest.as_ref().map_or(true, |(_, t)| snapshot.last_updated < *t) {
            stats.oldest = Some(stamp.clone());
        }
        if stats.newest.as_ref().map_or(true, |(_, t)| snapshot.last_updated > *t) {
            stats.newest = Some(stamp);
        }
    }

    stats.technologies = technologies
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    stats
        .technologies
        .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    stats
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Snapshots: {}", stats.entries);
    println!("  Placeholder thumbnails: {:.1}%", stats.placeholder_share());
    println!("  Missing thumbnail files: {}", stats.missing_thumbnails);
    if let Some((domain, at)) = &stats.oldest {
        println!("  Oldest update: {} ({})", at.format("%Y-%m-%d %H:%M"), domain);
    }
    if let Some((domain, at)) = &stats.newest {
        println!("  Newest update: {} ({})", at.format("%Y-%m-%d %H:%M"), domain);
    }
    println!();

    if !stats.themes.is_empty() {
        println!("Themes:");
        let mut themes: Vec<_> = stats.themes.iter().collect();
        themes.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (theme, count) in themes {
            println!("  {}: {}", theme, count);
        }
        println!();
    }

    if !stats.technologies.is_empty() {
        println!("Top Technologies:");
        for (name, count) in stats.technologies.iter().take(TOP_TECHNOLOGIES) {
            println!("  {}: {}", name, count);
        }
        println!();
    }

    if !stats.strategies.is_empty() {
        println!("Thumbnail Strategies:");
        let mut strategies: Vec<_> = stats.strategies.iter().collect();
        strategies.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_db_string().cmp(b.0.to_db_string())));
        for (strategy, count) in strategies {
            println!("  {}: {}", strategy, count);
        }
    }
}
