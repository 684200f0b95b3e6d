//! HTTP fetcher implementation
//!
//! One GET per URL, no retries. Every failure is classified into a
//! [`FetchError`] that the scheduler records against the task:
//! - timeouts and connection failures
//! - non-2xx status codes
//! - responses that are not HTML
//!
//! Redirects are never followed by the client. A 3xx with a `Location` comes
//! back as [`Fetched::Redirect`] so the scheduler can route the target
//! through the frontier, which keeps every URL to a single fetch.

use crate::config::Config;
use reqwest::{
    header::{CONTENT_TYPE, LOCATION},
    redirect::Policy,
    Client,
};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Upper bound on the connect phase, never above the request timeout
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Errors from fetching a single page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Expected HTML from {url}, got '{content_type}'")]
    ContentType { url: String, content_type: String },

    #[error("Request failed for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Failed to read body of {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("Redirect from {url} leaves the host: {target}")]
    OffHostRedirect { url: String, target: String },
}

/// What a successful request produced
#[derive(Debug, Clone)]
pub enum Fetched {
    Page(FetchedPage),

    /// A 3xx response; `target` is resolved against the request URL
    Redirect { target: Url },
}

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: Url,
    pub status_code: u16,
    pub content_type: String,
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use docsift::config::Config;
/// use docsift::crawler::build_http_client;
///
/// let config = Config::with_paths("./cache.db", "./data");
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let timeout = config.crawler.request_timeout_secs;

    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_secs(timeout))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS.min(timeout)))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true for content types the extractor understands
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Fetches a URL, failing on anything that is not a 2xx HTML response or a
/// redirect
///
/// | Condition | Result |
/// |-----------|--------|
/// | 3xx with `Location` | `Fetched::Redirect` |
/// | Timeout | `FetchError::Timeout` |
/// | Connection refused, DNS, TLS | `FetchError::Connect` |
/// | Non-2xx status, 3xx without `Location` | `FetchError::Status` |
/// | Content-Type not HTML | `FetchError::ContentType` |
/// | Body read failure | `FetchError::Body` |
pub async fn fetch_page(client: &Client, url: &Url) -> Result<Fetched, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    let final_url = response.url().clone();

    if status.is_redirection() {
        let target = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| final_url.join(location).ok());
        if let Some(target) = target {
            return Ok(Fetched::Redirect { target });
        }
    }

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html_content_type(&content_type) {
        return Err(FetchError::ContentType {
            url: url.to_string(),
            content_type,
        });
    }

    let body = response.text().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    Ok(Fetched::Page(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    }))
}

fn classify_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
