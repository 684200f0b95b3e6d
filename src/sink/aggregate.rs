//! Aggregate export sink
//!
//! Keeps every document of the collection in a single `export.json`. The
//! previous export is loaded on open so the aggregate grows across runs, with
//! a re-crawled URL replacing its old record. The file is replaced atomically
//! by writing a temporary file and renaming it.

use crate::document::Document;
use crate::sink::traits::{FinalizeSummary, Sink, SinkResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::error;

/// File name of the export inside a collection directory
pub const EXPORT_FILE: &str = "export.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub url: String,
    pub title: String,
    pub body_markdown: String,
}

/// On-disk layout of `export.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub collection: String,
    pub generated_at: DateTime<Utc>,
    pub document_count: u64,
    pub documents: Vec<ExportRecord>,
}

pub struct AggregateExportSink {
    collection: String,
    path: PathBuf,
    records: Vec<ExportRecord>,
    positions: HashMap<String, usize>,
    documents_written: u64,
}

impl AggregateExportSink {
    /// Opens the sink, seeding it with the collection's existing export
    ///
    /// A malformed previous export is left in place and fails the open, so
    /// the records it holds are never overwritten by a partial aggregate.
    pub fn open(collection_dir: &Path, collection: &str) -> SinkResult<Self> {
        let path = collection_dir.join(EXPORT_FILE);
        let mut sink = Self {
            collection: collection.to_string(),
            path,
            records: Vec::new(),
            positions: HashMap::new(),
            documents_written: 0,
        };

        if sink.path.exists() {
            let previous = fs::read_to_string(&sink.path)?;
            let export = serde_json::from_str::<ExportFile>(&previous).map_err(|e| {
                error!("Malformed export {}: {}", sink.path.display(), e);
                e
            })?;
            for record in export.documents {
                sink.upsert(record);
            }
        }

        Ok(sink)
    }

    fn upsert(&mut self, record: ExportRecord) {
        match self.positions.get(&record.url) {
            Some(&index) => self.records[index] = record,
            None => {
                self.positions.insert(record.url.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

impl Sink for AggregateExportSink {
    fn write(&mut self, document: &Document) -> SinkResult<()> {
        self.upsert(ExportRecord {
            url: document.url.clone(),
            title: document.title.clone(),
            body_markdown: document.body_markdown.clone(),
        });
        self.documents_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> SinkResult<FinalizeSummary> {
        let export = ExportFile {
            collection: self.collection.clone(),
            generated_at: Utc::now(),
            document_count: self.records.len() as u64,
            documents: self.records.clone(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(&export)?)?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(FinalizeSummary {
            documents_written: self.documents_written,
            document_count: export.document_count,
        })
    }
}
