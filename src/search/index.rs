//! In-memory inverted index
//!
//! Postings lists are kept sorted by [`DocId`] so that merging and persisting
//! are deterministic. The index is the write-side structure for a crawl batch;
//! [`crate::search::IndexStore`] is its persisted counterpart.

use crate::document::{DocId, Document};
use crate::search::query::{DocumentSummary, PostingSource};
use crate::search::scorer::CorpusStats;
use crate::search::IndexResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One document's occurrences of a term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
    pub positions: Vec<u32>,
}

/// The fields the document store keeps per doc_id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub url: String,
    pub title: String,
    pub body_markdown: String,

    /// Token count, used for BM25 length normalization
    pub length: u32,
}

/// Term to postings map plus the document store
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: BTreeMap<String, Vec<Posting>>,
    documents: BTreeMap<DocId, StoredDocument>,
    doc_terms: HashMap<DocId, Vec<String>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a document, replacing any previous version with the same id
    pub fn add_document(&mut self, document: &Document) {
        self.remove_document(&document.id);

        let mut occurrences: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for token in &document.token_stream {
            occurrences
                .entry(token.text.as_str())
                .or_default()
                .push(token.position);
        }

        let mut terms = Vec::with_capacity(occurrences.len());
        for (term, positions) in occurrences {
            let posting = Posting {
                doc_id: document.id.clone(),
                term_frequency: positions.len() as u32,
                positions,
            };

            let list = self.postings.entry(term.to_string()).or_default();
            let slot = list
                .binary_search_by(|p| p.doc_id.cmp(&posting.doc_id))
                .unwrap_or_else(|insert_at| insert_at);
            list.insert(slot, posting);
            terms.push(term.to_string());
        }

        self.doc_terms.insert(document.id.clone(), terms);
        self.documents.insert(
            document.id.clone(),
            StoredDocument {
                url: document.url.clone(),
                title: document.title.clone(),
                body_markdown: document.body_markdown.clone(),
                length: document.length(),
            },
        );
    }

    /// Removes a document and all of its postings, returning whether it existed
    pub fn remove_document(&mut self, doc_id: &DocId) -> bool {
        let Some(terms) = self.doc_terms.remove(doc_id) else {
            return false;
        };

        for term in terms {
            if let Some(list) = self.postings.get_mut(&term) {
                if let Ok(slot) = list.binary_search_by(|p| p.doc_id.cmp(doc_id)) {
                    list.remove(slot);
                }
                if list.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }

        self.documents.remove(doc_id).is_some()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, doc_id: &DocId) -> Option<&StoredDocument> {
        self.documents.get(doc_id)
    }

    /// Iterates the document store in doc_id order
    pub fn documents(&self) -> impl Iterator<Item = (&DocId, &StoredDocument)> {
        self.documents.iter()
    }

    /// All (term, posting) pairs belonging to one document
    pub fn document_postings(&self, doc_id: &DocId) -> Vec<(&str, &Posting)> {
        let Some(terms) = self.doc_terms.get(doc_id) else {
            return Vec::new();
        };

        terms
            .iter()
            .filter_map(|term| {
                let list = self.postings.get(term)?;
                let slot = list.binary_search_by(|p| p.doc_id.cmp(doc_id)).ok()?;
                Some((term.as_str(), &list[slot]))
            })
            .collect()
    }

    pub fn term_postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl PostingSource for InvertedIndex {
    fn corpus_stats(&self) -> IndexResult<CorpusStats> {
        let total: u64 = self.documents.values().map(|d| d.length as u64).sum();
        Ok(CorpusStats::new(self.documents.len() as u64, total))
    }

    fn postings(&self, term: &str) -> IndexResult<Vec<Posting>> {
        Ok(self.term_postings(term).to_vec())
    }

    fn summary(&self, doc_id: &DocId) -> IndexResult<Option<DocumentSummary>> {
        Ok(self.documents.get(doc_id).map(|d| DocumentSummary {
            url: d.url.clone(),
            title: d.title.clone(),
            length: d.length,
        }))
    }
}
