//! Technology detection by markup fingerprints

use crate::config::TechnologyEntry;
use std::collections::BTreeSet;

/// Built-in technology table
///
/// Patterns are fragments of file names, hosts or attributes rather than bare
/// product names where a bare name would match ordinary prose.
pub fn default_technologies() -> Vec<TechnologyEntry> {
    let table: &[(&str, &[&str])] = &[
        ("React", &["react.production.min.js", "react-dom", "data-reactroot", "reactjs"]),
        ("Next.js", &["__next_data__", "/_next/static"]),
        ("Vue.js", &["vue.js", "vue.min.js", "vue.runtime", "vuejs", "data-v-app"]),
        ("Nuxt", &["__nuxt", "/_nuxt/"]),
        ("Angular", &["ng-version", "angular.js", "angular.min.js", "ng-app"]),
        ("jQuery", &["jquery"]),
        ("Bootstrap", &["bootstrap.min.css", "bootstrap.css", "bootstrap.min.js", "bootstrap.bundle"]),
        ("Tailwind CSS", &["tailwind"]),
        ("Bulma", &["bulma.min.css", "bulma.css"]),
        ("WordPress", &["wp-content", "wp-includes", "wordpress"]),
        ("Drupal", &["drupal"]),
        ("Joomla", &["joomla"]),
        ("Shopify", &["cdn.shopify.com", "shopify"]),
        ("Wix", &["wixstatic.com", "wix.com"]),
        ("Squarespace", &["squarespace"]),
        ("Google Analytics", &["google-analytics.com", "googletagmanager.com/gtag", "ga.js", "analytics.js"]),
        ("Google Tag Manager", &["googletagmanager.com/gtm"]),
        ("Google Fonts", &["fonts.googleapis.com"]),
        ("Font Awesome", &["font-awesome", "fontawesome"]),
        ("Cloudflare", &["cdnjs.cloudflare.com", "cdn-cgi/"]),
    ];

    table
        .iter()
        .map(|(name, patterns)| TechnologyEntry {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        })
        .collect()
}

/// Names of every technology with at least one pattern in `raw_html`
///
/// Matching is a case-insensitive substring test on the raw markup.
pub fn detect_technologies(raw_html: &str, technologies: &[TechnologyEntry]) -> BTreeSet<String> {
    let haystack = raw_html.to_lowercase();

    technologies
        .iter()
        .filter(|tech| {
            tech.patterns
                .iter()
                .any(|pattern| !pattern.is_empty() && haystack.contains(pattern.to_lowercase().as_str()))
        })
        .map(|tech| tech.name.clone())
        .collect()
}
