//! Theme scoring against a theme table

use crate::config::ThemeEntry;

pub const GENERAL_THEME: &str = "General";
pub const UNKNOWN_THEME: &str = "Unknown";

/// Built-in theme table, in tie-breaking order
pub fn default_themes() -> Vec<ThemeEntry> {
    let table: &[(&str, &[&str])] = &[
        ("Ecommerce", &["shop", "cart", "product", "buy", "price", "store", "shipping"]),
        ("Blog", &["blog", "post", "article", "author", "comment", "read"]),
        ("Portfolio", &["portfolio", "work", "project", "gallery", "showcase"]),
        ("Corporate", &["company", "business", "service", "solution", "client", "partner"]),
        ("News", &["news", "article", "latest", "update", "publish", "press"]),
        ("Education", &["course", "learn", "student", "education", "training", "class"]),
        ("Technology", &["tech", "software", "app", "digital", "innovation", "solution"]),
        ("Health", &["health", "medical", "doctor", "patient", "care", "treatment"]),
        ("Finance", &["finance", "bank", "invest", "money", "financial", "payment"]),
        ("Travel", &["travel", "tour", "destination", "hotel", "flight", "booking"]),
        ("Food", &["food", "recipe", "restaurant", "cook", "meal", "dish"]),
        ("Fashion", &["fashion", "style", "clothing", "wear", "collection", "design"]),
        ("Real estate", &["property", "real estate", "home", "house", "apartment", "rent"]),
        ("Nonprofit", &["nonprofit", "charity", "donate", "volunteer", "cause", "community"]),
        ("Government", &["government", "public", "citizen", "service", "official", "policy"]),
        ("Entertainment", &["entertainment", "movie", "music", "game", "show", "event"]),
        ("Sports", &["sport", "team", "player", "game", "match", "league"]),
        ("Art", &["art", "artist", "gallery", "exhibition", "creative", "design"]),
    ];

    table
        .iter()
        .map(|(name, keywords)| ThemeEntry {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        })
        .collect()
}

/// Picks the theme with the most keywords present in `normalized_text`
///
/// Each keyword counts once, by substring match. The first theme in table
/// order wins a tie; no match at all yields [`GENERAL_THEME`].
pub fn detect_theme(normalized_text: &str, themes: &[ThemeEntry]) -> String {
    let mut best: Option<(&str, usize)> = None;

    for theme in themes {
        let score = theme
            .keywords
            .iter()
            .filter(|keyword| !keyword.is_empty() && normalized_text.contains(keyword.to_lowercase().as_str()))
            .count();

        if score > 0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((&theme.name, score));
        }
    }

    best.map(|(name, _)| name.to_string())
        .unwrap_or_else(|| GENERAL_THEME.to_string())
}
