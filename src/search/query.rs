//! Query evaluation over any posting source
//!
//! The evaluator is generic over [`PostingSource`], so the same ranking code
//! runs against an in-memory [`crate::search::InvertedIndex`] in tests and
//! against a persisted [`crate::search::IndexStore`] at query time.

use crate::document::DocId;
use crate::search::index::Posting;
use crate::search::scorer::{CorpusStats, RelevanceScorer};
use crate::search::tokenizer::Tokenizer;
use crate::search::{IndexResult, QueryError};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Default number of hits returned by a query
pub const DEFAULT_LIMIT: usize = 10;

/// What a hit needs from the document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub url: String,
    pub title: String,
    pub length: u32,
}

/// Read access to an index, in-memory or persisted
pub trait PostingSource {
    fn corpus_stats(&self) -> IndexResult<CorpusStats>;

    /// Postings for a term, sorted by doc_id; empty if the term is unknown
    fn postings(&self, term: &str) -> IndexResult<Vec<Posting>>;

    fn summary(&self, doc_id: &DocId) -> IndexResult<Option<DocumentSummary>>;
}

/// A ranked query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub url: String,
    pub title: String,
    pub score: f64,
}

/// Limits applied after scoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOptions {
    pub limit: usize,

    /// Hits scoring below this are dropped
    pub score_threshold: Option<f64>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            score_threshold: None,
        }
    }
}

/// Tokenizes, scores and ranks a free-text query
pub struct QueryEvaluator<'a> {
    tokenizer: &'a dyn Tokenizer,
    scorer: &'a dyn RelevanceScorer,
}

impl<'a> QueryEvaluator<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, scorer: &'a dyn RelevanceScorer) -> Self {
        Self { tokenizer, scorer }
    }

    /// Runs `text` against `source`
    ///
    /// Repeated query terms count once. Results are ordered by score
    /// descending, ties broken by doc_id ascending, so the same index and
    /// query always produce the same list.
    pub fn evaluate<S: PostingSource + ?Sized>(
        &self,
        source: &S,
        text: &str,
        options: &QueryOptions,
    ) -> Result<Vec<SearchHit>, QueryError> {
        let terms: BTreeSet<String> = self
            .tokenizer
            .tokenize(text)
            .into_iter()
            .map(|t| t.text)
            .collect();

        if terms.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let stats = source.corpus_stats()?;
        if stats.document_count == 0 || options.limit == 0 {
            return Ok(Vec::new());
        }

        let mut scores: HashMap<DocId, f64> = HashMap::new();
        let mut summaries: HashMap<DocId, DocumentSummary> = HashMap::new();

        for term in &terms {
            let postings = source.postings(term)?;
            let document_frequency = postings.len() as u64;

            for posting in postings {
                if !summaries.contains_key(&posting.doc_id) {
                    // A posting without a stored document means the index is
                    // inconsistent; skip it rather than fail the whole query
                    let Some(summary) = source.summary(&posting.doc_id)? else {
                        continue;
                    };
                    summaries.insert(posting.doc_id.clone(), summary);
                }
                let length = summaries[&posting.doc_id].length;

                let contribution = self.scorer.score(
                    posting.term_frequency,
                    length,
                    document_frequency,
                    &stats,
                );
                *scores.entry(posting.doc_id).or_insert(0.0) += contribution;
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .filter(|(_, score)| match options.score_threshold {
                Some(threshold) => *score >= threshold,
                None => true,
            })
            .filter_map(|(doc_id, score)| {
                let summary = summaries.remove(&doc_id)?;
                Some(SearchHit {
                    doc_id,
                    url: summary.url,
                    title: summary.title,
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        hits.truncate(options.limit);

        Ok(hits)
    }
}
