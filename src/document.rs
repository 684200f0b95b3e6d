//! Document model handed to every sink
//!
//! A [`Document`] is derived from a cached fetch+extract result and is
//! immutable once built. Its id is a stable hash of the normalized URL, so the
//! same page always lands on the same id across runs.

use crate::search::{Token, Tokenizer};
use crate::storage::CachedEntry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex characters kept from the URL digest
const DOC_ID_HEX_LEN: usize = 16;

/// Stable document identifier derived from a normalized URL
///
/// Ids are fixed-width lowercase hex, so their string ordering is also their
/// numeric ordering. Query results use it as the deterministic tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Derives the id for a (normalized) URL
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(digest[..DOC_ID_HEX_LEN].to_string())
    }

    /// Wraps an id read back from storage
    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An extracted page, ready to be written to a sink
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Stable hash of the URL
    pub id: DocId,

    /// The normalized page URL
    pub url: String,

    /// Page title
    pub title: String,

    /// Main content rendered as markdown
    pub body_markdown: String,

    /// Tokens of `title` followed by `body_markdown`
    pub token_stream: Vec<Token>,
}

impl Document {
    /// Builds a document and tokenizes its title and body
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        body_markdown: impl Into<String>,
        tokenizer: &dyn Tokenizer,
    ) -> Self {
        let url = url.into();
        let title = title.into();
        let body_markdown = body_markdown.into();
        let token_stream = tokenizer.tokenize(&format!("{}\n{}", title, body_markdown));

        Self {
            id: DocId::from_url(&url),
            url,
            title,
            body_markdown,
            token_stream,
        }
    }

    /// Builds a document from a cache entry without touching the network
    pub fn from_cached(entry: &CachedEntry, tokenizer: &dyn Tokenizer) -> Self {
        Self::new(
            entry.url.clone(),
            entry.extracted_title.clone(),
            entry.extracted_body_markdown.clone(),
            tokenizer,
        )
    }

    /// Number of tokens, used for length normalization
    pub fn length(&self) -> u32 {
        self.token_stream.len() as u32
    }
}
