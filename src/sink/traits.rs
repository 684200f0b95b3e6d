//! Sink trait and error types
//!
//! A sink receives every document of a crawl and commits them to the
//! collection's on-disk output when the crawl ends.

use crate::document::Document;
use crate::search::IndexError;
use thiserror::Error;

/// Errors that can occur while writing collection output
///
/// Errors tied to a single document's URL fail that page only; every other
/// sink error halts the crawl, as the output would otherwise silently miss
/// documents.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Refusing unsafe path segment '{segment}' for {url}")]
    UnsafePath { url: String, segment: String },

    #[error("Invalid document URL: {0}")]
    InvalidUrl(String),
}

impl SinkError {
    /// True if the error concerns one document rather than the output
    pub fn is_page_level(&self) -> bool {
        matches!(self, SinkError::UnsafePath { .. } | SinkError::InvalidUrl(_))
    }
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Outcome of a finalized sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeSummary {
    /// Documents received during this run
    pub documents_written: u64,

    /// Documents held by the collection after the commit
    pub document_count: u64,
}

/// Trait for collection outputs
pub trait Sink {
    /// Accepts one document
    fn write(&mut self, document: &Document) -> SinkResult<()>;

    /// Commits everything written so far
    fn finalize(&mut self) -> SinkResult<FinalizeSummary>;
}
