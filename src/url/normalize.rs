use crate::UrlError;
use url::Url;

/// Query parameters dropped during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref"];

/// Normalizes a URL as it appears in a domain list
///
/// # Normalization Steps
///
/// 1. Trim whitespace; prepend `http://` when no scheme is given
/// 2. Parse the URL; reject if malformed or not HTTP(S)
/// 3. Lowercase the host and remove a leading `www.`
/// 4. Remove dot segments and duplicate slashes from the path
/// 5. Remove the fragment and tracking query parameters
///
/// # Examples
///
/// ```
/// use sumi_folio::url::normalize_url;
///
/// let url = normalize_url("WWW.Example.com/about/").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/about/");
/// ```
pub fn normalize_url(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    let host = strip_www(&host.to_lowercase()).to_string();
    if host.is_empty() {
        return Err(UrlError::MissingDomain);
    }
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Normalizes a domain-list entry to its bare host
///
/// The result has no scheme, no port, no path and no leading `www.`, which
/// is the key every snapshot is stored under.
///
/// # Examples
///
/// ```
/// use sumi_folio::url::normalize_domain;
///
/// assert_eq!(normalize_domain("https://WWW.Example.com/shop").unwrap(), "example.com");
/// assert_eq!(normalize_domain("example.org").unwrap(), "example.org");
/// ```
pub fn normalize_domain(input: &str) -> Result<String, UrlError> {
    let url = normalize_url(input)?;
    url.host_str()
        .map(|h| h.to_string())
        .ok_or(UrlError::MissingDomain)
}

/// Removes a single leading `www.` label
pub(crate) fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Collapses empty and `.` segments and resolves `..`, keeping a trailing slash
fn normalize_path(path: &str) -> String {
    let trailing = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if trailing {
        result.push('/');
    }
    result
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_domain_gets_http_scheme() {
        let url = normalize_url("example.com").unwrap();
        assert_eq!(url.as_str(), "http://example.com/");
    }

    #[test]
    fn test_https_is_kept() {
        let url = normalize_url("https://example.com/page").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_www_and_lowercase() {
        let url = normalize_url("http://WWW.EXAMPLE.COM/Page").unwrap();
        assert_eq!(url.as_str(), "http://example.com/Page");
    }

    #[test]
    fn test_remove_fragment_and_tracking() {
        let url = normalize_url("https://example.com/a?utm_source=x&id=3#top").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a?id=3");

        let url = normalize_url("https://example.com/a?fbclid=abc").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_dot_segments() {
        let url = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(url.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            normalize_url("ftp://example.com"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(normalize_url("   ").is_err());
    }

    #[test]
    fn test_normalize_domain_variants() {
        assert_eq!(normalize_domain("Example.COM").unwrap(), "example.com");
        assert_eq!(normalize_domain("www.example.com").unwrap(), "example.com");
        assert_eq!(
            normalize_domain("https://www.blog.example.com:8443/x").unwrap(),
            "blog.example.com"
        );
    }

    #[test]
    fn test_only_leading_www_is_removed() {
        assert_eq!(normalize_domain("www.www.example.com").unwrap(), "www.example.com");
        assert_eq!(normalize_domain("wwwexample.com").unwrap(), "wwwexample.com");
    }
}
