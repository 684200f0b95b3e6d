//! Tokenization for indexing and querying
//!
//! Indexing and querying must tokenize identically, so both go through the
//! [`Tokenizer`] trait. [`StandardTokenizer`] lower-cases, splits on every
//! non-alphanumeric character and drops tokens shorter than
//! [`MIN_TOKEN_CHARS`]. Normalization beyond that (stemming, stop words)
//! plugs in as a [`TokenFilter`]; filters only rewrite term text, so the
//! on-disk index format does not change when one is added.

use serde::{Deserialize, Serialize};

/// Tokens shorter than this many characters are dropped
pub const MIN_TOKEN_CHARS: usize = 2;

/// A single term occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Normalized term text
    pub text: String,

    /// Position among the kept tokens of the source text, starting at 0
    pub position: u32,
}

impl Token {
    pub fn new(text: impl Into<String>, position: u32) -> Self {
        Self {
            text: text.into(),
            position,
        }
    }
}

/// Rewrites or drops a term after splitting
pub trait TokenFilter: Send + Sync {
    /// Returns the rewritten term, or `None` to drop it
    fn apply(&self, term: String) -> Option<String>;
}

/// Trait for tokenizers that turn text into a positional token stream
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text
    fn tokenize(&self, text: &str) -> Vec<Token>;

    /// Identifier recorded alongside persisted indexes
    fn name(&self) -> &'static str;
}

/// Lower-casing, non-alphanumeric-splitting tokenizer
///
/// Deterministic and locale independent: lower-casing uses Unicode's default
/// case mapping and alphanumeric classification uses Unicode properties.
///
/// # Examples
///
/// ```
/// use docsift::search::{StandardTokenizer, Tokenizer};
///
/// let tokens = StandardTokenizer::new().tokenize("Hello, World! A x-ray");
/// let terms: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
/// assert_eq!(terms, vec!["hello", "world", "ray"]);
/// ```
#[derive(Default)]
pub struct StandardTokenizer {
    filters: Vec<Box<dyn TokenFilter>>,
}

impl StandardTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter to the chain, applied in insertion order
    pub fn with_filter(mut self, filter: impl TokenFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    fn apply_filters(&self, term: String) -> Option<String> {
        self.filters
            .iter()
            .try_fold(term, |term, filter| filter.apply(term))
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for raw in text.split(|c: char| !c.is_alphanumeric()) {
            if raw.chars().count() < MIN_TOKEN_CHARS {
                continue;
            }

            let Some(term) = self.apply_filters(raw.to_lowercase()) else {
                continue;
            };
            if term.is_empty() {
                continue;
            }

            tokens.push(Token::new(term, position));
            position += 1;
        }

        tokens
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}
