//! docsift: crawl a site into a locally queryable document collection
//!
//! This crate discovers pages on a single host, extracts their main content as
//! markdown and hands each document to a collection sink: a from-scratch
//! full-text search index, a mirrored tree of markdown files, or a single
//! aggregate export. A content-addressable cache makes repeated crawls
//! incremental.

pub mod collection;
pub mod config;
pub mod crawler;
pub mod document;
pub mod extract;
pub mod search;
pub mod sink;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for docsift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] extract::ExtractionError),

    #[error("Cache error: {0}")]
    Cache(#[from] storage::CacheError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] storage::CatalogError),

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("Query error: {0}")]
    Query(#[from] search::QueryError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Crawl worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for docsift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use collection::CollectionManager;
pub use config::Config;
pub use crawler::{crawl_collection, CancelToken, CrawlOutcome, CrawlReport, Crawler};
pub use document::{DocId, Document};
pub use search::{SearchHit, QueryError};
pub use storage::IndexType;
pub use crate::url::{normalize_url, Scope};
