use super::normalize::strip_www;
use sha2::{Digest, Sha256};
use url::Url;

/// Extracts the catalog domain from a URL
///
/// The host is lowercased and a leading `www.` removed, so that the result can
/// be compared with snapshot keys.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_folio::url::extract_domain;
///
/// let url = Url::parse("https://www.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| strip_www(&h.to_lowercase()).to_string())
        .filter(|h| !h.is_empty())
}

/// Stable file-name-safe identifier for a domain
///
/// First 16 hex characters of the SHA-256 of the domain.
pub fn domain_hash(domain: &str) -> String {
    let digest = Sha256::digest(domain.as_bytes());
    hex::encode(&digest[..8])
}

/// Up to two upper-case initials taken from the first label of a domain
pub fn domain_initials(domain: &str) -> String {
    domain
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(2)
        .collect::<String>()
        .to_ascii_uppercase()
}
