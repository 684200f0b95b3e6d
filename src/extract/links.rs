//! Outbound link discovery
//!
//! Links are collected from the whole document, navigation included, since
//! menus are usually how the rest of a site is reached.

use crate::url::{normalize_url, Scope};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Schemes that never lead to a crawlable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Returns the URL relative links resolve against: `<base href>` if present,
/// otherwise the page URL
pub fn document_base(document: &Html, page_url: &Url) -> Url {
    let Ok(selector) = Selector::parse("base[href]") else {
        return page_url.clone();
    };

    document
        .select(&selector)
        .next()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .unwrap_or_else(|| page_url.clone())
}

/// Collects in-scope links in document order, normalized and deduplicated
///
/// # Link Extraction Rules
///
/// **Include:** `<a href>` anywhere in the document that resolves to an
/// http(s) URL on the scope's host.
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - fragment-only links (same page anchors)
/// - links to other hosts
pub fn extract_links(document: &Html, base_url: &Url, scope: &Scope) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        if scope.contains(&url) && seen.insert(url.to_string()) {
            links.push(url);
        }
    }

    links
}

/// Resolves an href to a normalized absolute URL
///
/// Returns None for empty, fragment-only or non-navigational hrefs, and for
/// anything that does not resolve to an http(s) URL.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/docs/page").unwrap()
    }

    fn links(body: &str) -> Vec<String> {
        let html = format!("<html><body>{}</body></html>", body);
        let document = Html::parse_document(&html);
        let scope = Scope::from_url(&base_url()).unwrap();
        extract_links(&document, &base_url(), &scope)
            .into_iter()
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn test_relative_links_resolve() {
        assert_eq!(
            links(r#"<a href="/guide">a</a><a href="intro">b</a>"#),
            vec!["https://example.com/guide", "https://example.com/docs/intro"]
        );
    }

    #[test]
    fn test_skips_non_navigational_links() {
        let body = r##"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:team@example.com">mail</a>
            <a href="tel:+1234567890">call</a>
            <a href="data:text/html,hi">data</a>
            <a href="#section">jump</a>
            <a href="/file.pdf" download>file</a>
            <a href="">empty</a>
        "##;
        assert!(links(body).is_empty());
    }

    #[test]
    fn test_scheme_check_ignores_case() {
        assert!(links(r#"<a href="JavaScript:alert(1)">x</a>"#).is_empty());
    }

    #[test]
    fn test_strips_fragments_and_dedupes() {
        assert_eq!(
            links(r#"<a href="/a#one">1</a><a href="/a#two">2</a><a href="/b">3</a><a href="/a">4</a>"#),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_drops_other_hosts() {
        assert_eq!(
            links(r#"<a href="https://other.org/x">o</a><a href="https://blog.example.com/">s</a><a href="/ok">k</a>"#),
            vec!["https://example.com/ok"]
        );
    }

    #[test]
    fn test_follows_nofollow_links() {
        assert_eq!(
            links(r#"<a href="/page" rel="nofollow">Link</a>"#),
            vec!["https://example.com/page"]
        );
    }

    #[test]
    fn test_base_href_changes_resolution() {
        let html = r#"<html><head><base href="https://example.com/v2/"></head>
            <body><a href="start">s</a></body></html>"#;
        let document = Html::parse_document(html);
        let base = document_base(&document, &base_url());
        let scope = Scope::from_url(&base_url()).unwrap();

        let found: Vec<String> = extract_links(&document, &base, &scope)
            .into_iter()
            .map(|u| u.to_string())
            .collect();
        assert_eq!(found, vec!["https://example.com/v2/start"]);
    }
}
