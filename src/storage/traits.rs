//! Storage traits and error types

use crate::storage::CachedEntry;
use thiserror::Error;
use url::Url;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache entry has an invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Cache connection lock poisoned")]
    LockPoisoned,
}

/// Errors that can occur during catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid collection name '{0}': use letters, digits, '-' and '_' only")]
    InvalidName(String),

    #[error("Collection already exists: {0}")]
    AlreadyExists(String),

    #[error("Collection '{name}' already exists as {existing}, not {requested}")]
    TypeMismatch {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("Unknown index type: {0}")]
    UnknownIndexType(String),

    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Content-addressable store of fetch+extract results
///
/// Keys are derived from the normalized URL, so any spelling of the same page
/// hits the same entry. Implementations must be safe to share between crawl
/// workers; concurrent `put`s for one URL resolve as last writer wins.
pub trait Cache: Send + Sync {
    /// Looks up the entry for a URL
    fn get(&self, url: &Url) -> CacheResult<Option<CachedEntry>>;

    /// Stores an entry, replacing any previous entry for the same URL
    fn put(&self, entry: &CachedEntry) -> CacheResult<()>;

    /// Returns true if an entry exists for the URL
    fn contains(&self, url: &Url) -> CacheResult<bool>;

    /// Number of cached entries
    fn len(&self) -> CacheResult<u64>;

    fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}
