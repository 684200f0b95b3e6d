//! Full-text search engine
//!
//! A small BM25 engine built from four pieces:
//! - [`tokenizer`]: text to positional tokens, shared by indexing and querying
//! - [`index`]: the in-memory inverted index a crawl batch is built into
//! - [`scorer`]: BM25 relevance scoring
//! - [`query`]: ranking over any [`PostingSource`]
//!
//! [`store`] persists an index to SQLite and serves queries from it.

pub mod index;
pub mod query;
pub mod scorer;
pub mod store;
pub mod tokenizer;

pub use index::{InvertedIndex, Posting, StoredDocument};
pub use query::{DocumentSummary, PostingSource, QueryEvaluator, QueryOptions, SearchHit};
pub use scorer::{Bm25, CorpusStats, RelevanceScorer};
pub use store::{IndexStore, INDEX_FILE};
pub use tokenizer::{StandardTokenizer, Token, TokenFilter, Tokenizer};

use crate::storage::CatalogError;
use thiserror::Error;

/// Errors from reading or writing a persisted index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Index is corrupt: {0}")]
    Corrupt(String),

    #[error("Index file not found: {0}")]
    Missing(String),
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors returned by the query path
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Collection not found or not a search collection: {0}")]
    CollectionNotFound(String),

    #[error("Query contains no searchable terms")]
    EmptyQuery,

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}
