//! Collection outputs
//!
//! Every collection writes through exactly one sink, picked from its
//! [`IndexType`] when the collection is opened:
//! - [`SearchIndexSink`]: BM25 search index in `index.db`
//! - [`MirrorTreeSink`]: markdown files under `mirror/`
//! - [`AggregateExportSink`]: a single `export.json`

mod aggregate;
mod mirror_tree;
mod search_index;
mod traits;

pub use aggregate::{AggregateExportSink, ExportFile, ExportRecord, EXPORT_FILE};
pub use mirror_tree::{mirror_path, MirrorTreeSink, MIRROR_DIR};
pub use search_index::SearchIndexSink;
pub use traits::{FinalizeSummary, Sink, SinkError, SinkResult};

use crate::document::Document;
use crate::search::INDEX_FILE;
use crate::storage::IndexType;
use std::path::Path;

/// The sink of a collection, dispatched by index type
pub enum CollectionSink {
    SearchIndex(SearchIndexSink),
    MirrorTree(MirrorTreeSink),
    AggregateExport(AggregateExportSink),
}

impl CollectionSink {
    /// Opens the sink for a collection stored in `collection_dir`
    pub fn open(index_type: IndexType, collection_dir: &Path, collection: &str) -> SinkResult<Self> {
        std::fs::create_dir_all(collection_dir)?;

        Ok(match index_type {
            IndexType::Search => {
                Self::SearchIndex(SearchIndexSink::new(&collection_dir.join(INDEX_FILE)))
            }
            IndexType::MirrorTree => Self::MirrorTree(MirrorTreeSink::new(collection_dir)),
            IndexType::Aggregate => {
                Self::AggregateExport(AggregateExportSink::open(collection_dir, collection)?)
            }
        })
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            Self::SearchIndex(_) => IndexType::Search,
            Self::MirrorTree(_) => IndexType::MirrorTree,
            Self::AggregateExport(_) => IndexType::Aggregate,
        }
    }
}

impl Sink for CollectionSink {
    fn write(&mut self, document: &Document) -> SinkResult<()> {
        match self {
            Self::SearchIndex(sink) => sink.write(document),
            Self::MirrorTree(sink) => sink.write(document),
            Self::AggregateExport(sink) => sink.write(document),
        }
    }

    fn finalize(&mut self) -> SinkResult<FinalizeSummary> {
        match self {
            Self::SearchIndex(sink) => sink.finalize(),
            Self::MirrorTree(sink) => sink.finalize(),
            Self::AggregateExport(sink) => sink.finalize(),
        }
    }
}
