//! URL handling module for Sumi-Folio
//!
//! This module turns free-form domain-list entries into canonical catalog keys
//! and fetchable URLs, and derives the stable identifiers used for thumbnails.

mod domain;
mod normalize;

pub use domain::{domain_hash, domain_initials, extract_domain};
pub use normalize::{normalize_domain, normalize_url};
