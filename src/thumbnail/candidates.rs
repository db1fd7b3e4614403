//! Image candidate extraction
//!
//! This module inspects a fetched page for images that could represent it:
//! - `og:image` meta tags
//! - Twitter Card image meta tags
//! - `<img>` elements, filtered by a filename denylist

use scraper::{Html, Selector};
use url::Url;

/// Image URLs found on a page, in capture strategy order
#[derive(Debug, Clone, Default)]
pub struct PageImages {
    pub open_graph: Option<Url>,
    pub twitter: Option<Url>,
    pub images: Vec<ImageCandidate>,
}

/// An `<img>` element that may be fetched for the largest-image strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    pub url: Url,

    /// `width * height` from the element attributes, when both are present
    pub hint_area: Option<u64>,
}

/// Extracts image candidates from `html`
///
/// Relative URLs are resolved against `<base href>` when present, otherwise
/// against `page_url`. At most `limit` `<img>` candidates are returned, largest
/// hinted area first; candidates without size hints keep document order after
/// the hinted ones.
///
/// # Example
///
/// ```
/// use sumi_folio::thumbnail::extract_candidates;
/// use url::Url;
///
/// let html = r#"<html><head><meta property="og:image" content="/cover.png"></head></html>"#;
/// let page = Url::parse("http://example.com/blog/").unwrap();
/// let found = extract_candidates(html, &page, &[], 10);
/// assert_eq!(found.open_graph.unwrap().as_str(), "http://example.com/cover.png");
/// ```
pub fn extract_candidates(
    html: &str,
    page_url: &Url,
    denylist: &[String],
    limit: usize,
) -> PageImages {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);

    let open_graph = meta_image(
        &document,
        &base,
        &[
            "meta[property='og:image']",
            "meta[property='og:image:url']",
            "meta[property='og:image:secure_url']",
        ],
    );

    let twitter = meta_image(
        &document,
        &base,
        &[
            "meta[name='twitter:image']",
            "meta[property='twitter:image']",
            "meta[name='twitter:image:src']",
        ],
    );

    let images = img_candidates(&document, &base, denylist, limit);

    PageImages {
        open_graph,
        twitter,
        images,
    }
}

/// Returns the `<base href>` target, or `page_url`
fn document_base(document: &Html, page_url: &Url) -> Url {
    let Ok(selector) = Selector::parse("base[href]") else {
        return page_url.clone();
    };

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

/// First resolvable `content` of the given meta selectors
fn meta_image(document: &Html, base: &Url, selectors: &[&str]) -> Option<Url> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };

        for element in document.select(&selector) {
            if let Some(url) = element
                .value()
                .attr("content")
                .and_then(|content| resolve_image(content, base))
            {
                return Some(url);
            }
        }
    }
    None
}

fn img_candidates(document: &Html, base: &Url, denylist: &[String], limit: usize) -> Vec<ImageCandidate> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    let mut candidates: Vec<ImageCandidate> = Vec::new();
    for element in document.select(&selector) {
        let attrs = element.value();

        // Lazy-loading pages keep the real source in data-src
        let Some(src) = attrs
            .attr("src")
            .filter(|s| !s.trim().is_empty() && !s.trim_start().starts_with("data:"))
            .or_else(|| attrs.attr("data-src"))
        else {
            continue;
        };

        let Some(url) = resolve_image(src, base) else {
            continue;
        };

        if is_denied(&url, denylist) {
            tracing::trace!("Skipping denylisted image {}", url);
            continue;
        }

        if candidates.iter().any(|c| c.url == url) {
            continue;
        }

        let hint_area = match (dimension(attrs.attr("width")), dimension(attrs.attr("height"))) {
            (Some(w), Some(h)) => Some(w * h),
            _ => None,
        };

        candidates.push(ImageCandidate { url, hint_area });
    }

    // Stable sort keeps document order among equal keys
    candidates.sort_by_key(|c| std::cmp::Reverse(c.hint_area.unwrap_or(0)));
    candidates.truncate(limit);
    candidates
}

/// Resolves an image reference to an absolute http(s) URL
fn resolve_image(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }

    let url = base.join(raw).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Checks the last path segment against the denylist terms
fn is_denied(url: &Url, denylist: &[String]) -> bool {
    let file_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("")
        .to_lowercase();

    denylist
        .iter()
        .any(|term| !term.is_empty() && file_name.contains(&term.to_lowercase()))
}

fn dimension(raw: Option<&str>) -> Option<u64> {
    raw?.trim().trim_end_matches("px").trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denylist() -> Vec<String> {
        ["icon", "logo", "spacer", "blank", "pixel"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn page() -> Url {
        Url::parse("https://example.com/articles/post.html").unwrap()
    }

    #[test]
    fn test_meta_images() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://cdn.example.com/og.jpg">
            <meta name="twitter:image" content="../tw.png">
        </head><body></body></html>"#;

        let found = extract_candidates(html, &page(), &denylist(), 10);
        assert_eq!(
            found.open_graph.unwrap().as_str(),
            "https://cdn.example.com/og.jpg"
        );
        assert_eq!(found.twitter.unwrap().as_str(), "https://example.com/tw.png");
        assert!(found.images.is_empty());
    }

    #[test]
    fn test_empty_meta_content_is_ignored() {
        let html = r#"<meta property="og:image" content="  ">
            <meta property="og:image:secure_url" content="/secure.jpg">"#;

        let found = extract_candidates(html, &page(), &[], 10);
        assert_eq!(
            found.open_graph.unwrap().as_str(),
            "https://example.com/secure.jpg"
        );
    }

    #[test]
    fn test_img_filtering() {
        let html = r#"<body>
            <img src="/images/site-logo.png" width="400" height="100">
            <img src="data:image/gif;base64,R0lGOD" data-src="/lazy/photo.jpg">
            <img src="/img/spacer.gif" width="1" height="1">
            <img src="javascript:void(0)">
            <img src="hero.jpg" width="1200px" height="600">
            <img src="hero.jpg">
            <img>
        </body>"#;

        let found = extract_candidates(html, &page(), &denylist(), 10);
        let urls: Vec<&str> = found.images.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/articles/hero.jpg",
                "https://example.com/lazy/photo.jpg",
            ]
        );
        assert_eq!(found.images[0].hint_area, Some(720_000));
        assert_eq!(found.images[1].hint_area, None);
    }

    #[test]
    fn test_base_href() {
        let html = r#"<head><base href="https://static.example.org/assets/"></head>
            <body><img src="a.png"></body>"#;

        let found = extract_candidates(html, &page(), &[], 10);
        assert_eq!(
            found.images[0].url.as_str(),
            "https://static.example.org/assets/a.png"
        );
    }

    #[test]
    fn test_candidate_limit() {
        let html: String = (0..20)
            .map(|i| format!(r#"<img src="/p{}.jpg" width="{}" height="10">"#, i, i + 1))
            .collect();

        let found = extract_candidates(&html, &page(), &[], 3);
        let urls: Vec<&str> = found.images.iter().map(|c| c.url.path()).collect();
        assert_eq!(urls, vec!["/p19.jpg", "/p18.jpg", "/p17.jpg"]);
    }
}
