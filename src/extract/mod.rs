//! Content extraction from HTML
//!
//! [`extract`] is a pure function of the page: the same HTML and base URL
//! always yield the same title, markdown body and link list. Main content
//! comes from the `readability` crate and is rendered with `htmd`; outbound
//! links come from [`links`].

pub mod links;

use crate::url::Scope;
use scraper::{ElementRef, Html, Selector};
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors that can occur during extraction
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No extractable text in {url}")]
    Empty { url: String },
}

/// The extracted parts of a page
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub title: String,
    pub body_markdown: String,

    /// Normalized, in-scope, deduplicated links in document order
    pub links: Vec<Url>,
}

/// Extracts title, main content and links from an HTML page
///
/// Main content falls back from the readability candidate to the whole
/// `<body>` and then to its plain text; extraction fails only when the body
/// has no text at all.
///
/// # Example
///
/// ```
/// use docsift::extract::extract;
/// use docsift::url::{normalize_url, Scope};
///
/// let url = normalize_url("https://example.com/guide").unwrap();
/// let scope = Scope::from_url(&url).unwrap();
/// let html = r#"<html><head><title>Guide</title></head>
///     <body><p>Hello <a href="/next">next page</a></p></body></html>"#;
///
/// let page = extract(html, &url, &scope).unwrap();
/// assert_eq!(page.title, "Guide");
/// assert!(page.body_markdown.contains("Hello"));
/// assert_eq!(page.links[0].as_str(), "https://example.com/next");
/// ```
pub fn extract(html: &str, base_url: &Url, scope: &Scope) -> Result<Extracted, ExtractionError> {
    let document = Html::parse_document(html);
    let resolve_base = links::document_base(&document, base_url);

    let title = extract_title(&document).unwrap_or_else(|| base_url.path().to_string());
    let links = links::extract_links(&document, &resolve_base, scope);

    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());
    let body_text = body.map(visible_text).unwrap_or_default();
    if body_text.is_empty() {
        return Err(ExtractionError::Empty {
            url: base_url.to_string(),
        });
    }

    let mut body_markdown = main_content(html, &resolve_base);
    if body_markdown.is_empty() {
        debug!("No main content found in {}, rendering <body>", base_url);
        body_markdown = body.map(|b| to_markdown(&b.inner_html())).unwrap_or_default();
    }
    if body_markdown.is_empty() {
        body_markdown = body_text;
    }

    Ok(Extracted {
        title,
        body_markdown,
        links,
    })
}

/// Markdown of the readability candidate, empty if there is none
fn main_content(html: &str, base_url: &Url) -> String {
    let mut cursor = Cursor::new(html.as_bytes());
    match readability::extractor::extract(&mut cursor, base_url) {
        Ok(product) if !product.text.trim().is_empty() => to_markdown(&product.content),
        Ok(_) => String::new(),
        Err(e) => {
            debug!("Readability failed for {}: {:?}", base_url, e);
            String::new()
        }
    }
}

fn to_markdown(html: &str) -> String {
    htmd::convert(html)
        .map(|markdown| markdown.trim().to_string())
        .unwrap_or_default()
}

/// Whitespace-normalized text outside `script`, `style` and friends
fn visible_text(element: ElementRef<'_>) -> String {
    let text: Vec<&str> = element
        .descendants()
        .filter(|node| {
            !node.ancestors().any(|ancestor| {
                ancestor.value().as_element().map_or(false, |el| {
                    matches!(el.name(), "script" | "style" | "noscript" | "template")
                })
            })
        })
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect();

    text.concat().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `<title>`, else the first `<h1>`
fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document
            .select(&selector)
            .map(|element| {
                element
                    .text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .find(|title| !title.is_empty())
    })
}
