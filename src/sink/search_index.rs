//! Search index sink
//!
//! Documents are indexed in memory during the crawl and committed to the
//! collection's `index.db` in one transaction by `finalize`, so queries never
//! observe a partially written batch.

use crate::document::Document;
use crate::search::{IndexStore, InvertedIndex};
use crate::sink::traits::{FinalizeSummary, Sink, SinkResult};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct SearchIndexSink {
    index_path: PathBuf,
    batch: InvertedIndex,
    documents_written: u64,
}

impl SearchIndexSink {
    pub fn new(index_path: &Path) -> Self {
        Self {
            index_path: index_path.to_path_buf(),
            batch: InvertedIndex::new(),
            documents_written: 0,
        }
    }

    /// Documents buffered and not yet committed
    pub fn pending(&self) -> usize {
        self.batch.document_count()
    }
}

impl Sink for SearchIndexSink {
    fn write(&mut self, document: &Document) -> SinkResult<()> {
        self.batch.add_document(document);
        self.documents_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> SinkResult<FinalizeSummary> {
        let mut store = IndexStore::open(&self.index_path)?;
        let batch = std::mem::take(&mut self.batch);
        let committed = store.commit(&batch)?;

        debug!(
            "Committed {} documents ({} terms) to {}",
            committed,
            batch.term_count(),
            self.index_path.display()
        );

        Ok(FinalizeSummary {
            documents_written: self.documents_written,
            document_count: store.document_count()?,
        })
    }
}
