use crate::UrlError;
use sha2::{Digest, Sha256};
use url::form_urlencoded;
use url::Url;

/// Normalizes a URL so that equivalent spellings collapse to one identity
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https schemes
/// 3. Lowercase the scheme and host, drop default ports (done by the parser)
/// 4. Remove dot segments and collapse repeated slashes in the path
/// 5. Remove credentials
/// 6. Remove fragment (everything after #)
/// 7. Sort query parameters by key, then value
/// 8. Remove empty query string (trailing ?)
///
/// The function is idempotent: normalizing a normalized URL returns it
/// unchanged.
///
/// # Examples
///
/// ```
/// use docsift::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.COM/docs//guide?b=2&a=1#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/guide?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    // Both only fail for cannot-be-a-base URLs, which http(s) URLs never are
    let _ = url.set_username("");
    let _ = url.set_password(None);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = sorted_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Derives the content-addressable cache key for a URL
///
/// The key is the hex-encoded SHA-256 of the normalized URL, so equivalent
/// URLs always map to the same cache entry.
pub fn cache_key(url: &Url) -> String {
    let normalized = normalize_url(url.as_str()).unwrap_or_else(|_| url.clone());
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Removes dot segments and empty segments while keeping a trailing slash
fn normalize_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }

    let trailing_slash = path.ends_with('/');
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
    if trailing_slash {
        result.push('/');
    }
    result
}

/// Collects query parameters sorted by key and then by value
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}
