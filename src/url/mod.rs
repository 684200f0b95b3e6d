//! URL handling module for docsift
//!
//! This module provides URL normalization, cache-key derivation, host
//! extraction and the crawl scope check.

mod normalize;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use normalize::{cache_key, normalize_url};

/// Extracts the lowercase host of a URL, without port
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// The set of URLs a crawl is allowed to visit: everything on the seed's host
///
/// # Examples
///
/// ```
/// use docsift::url::{normalize_url, Scope};
///
/// let seed = normalize_url("https://docs.example.com/guide").unwrap();
/// let scope = Scope::from_url(&seed).unwrap();
///
/// assert!(scope.contains(&normalize_url("https://docs.example.com/api").unwrap()));
/// assert!(!scope.contains(&normalize_url("https://example.com/").unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    host: String,
}

impl Scope {
    /// Builds the scope for a seed URL
    pub fn from_url(seed: &Url) -> Result<Self, UrlError> {
        let host = extract_domain(seed).ok_or(UrlError::MissingDomain)?;
        Ok(Self { host })
    }

    /// The host every in-scope URL must share
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns true if the URL is an http(s) URL on the scope's host
    pub fn contains(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        extract_domain(url).as_deref() == Some(self.host.as_str())
    }
}
