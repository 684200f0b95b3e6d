//! SQLite persistence for a collection's search index
//!
//! A crawl's [`InvertedIndex`] batch is committed in a single transaction, so
//! readers never see half of a batch. Committing a document that already
//! exists replaces its row and all of its postings.

use crate::document::DocId;
use crate::search::index::{InvertedIndex, Posting};
use crate::search::query::{DocumentSummary, PostingSource};
use crate::search::scorer::CorpusStats;
use crate::search::{IndexError, IndexResult};
use crate::storage::schema::initialize_index_schema;
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// File name of the index inside a collection directory
pub const INDEX_FILE: &str = "index.db";

/// Persisted inverted index and document store
pub struct IndexStore {
    conn: Connection,
}

impl IndexStore {
    /// Opens or creates the index database at `path`
    pub fn open(path: &Path) -> IndexResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_index_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens an existing index for querying
    ///
    /// The connection is read-only: no pragmas are set and the schema is not
    /// created, so a query never changes the file it reads.
    pub fn open_read_only(path: &Path) -> IndexResult<Self> {
        if !path.exists() {
            return Err(IndexError::Missing(path.display().to_string()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> IndexResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_index_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Writes every document of `index` and its postings in one transaction
    ///
    /// Returns the number of documents written.
    pub fn commit(&mut self, index: &InvertedIndex) -> IndexResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut written = 0;

        {
            let mut delete_postings = tx.prepare("DELETE FROM postings WHERE doc_id = ?1")?;
            let mut upsert_document = tx.prepare(
                "INSERT OR REPLACE INTO documents (doc_id, url, title, body_markdown, length, indexed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            let mut insert_posting = tx.prepare(
                "INSERT INTO postings (term, doc_id, term_frequency, positions) VALUES (?1, ?2, ?3, ?4)",
            )?;

            for (doc_id, document) in index.documents() {
                delete_postings.execute(params![doc_id.as_str()])?;
                upsert_document.execute(params![
                    doc_id.as_str(),
                    document.url,
                    document.title,
                    document.body_markdown,
                    document.length,
                    now,
                ])?;

                for (term, posting) in index.document_postings(doc_id) {
                    let positions = serde_json::to_string(&posting.positions)
                        .map_err(|e| IndexError::Corrupt(e.to_string()))?;
                    insert_posting.execute(params![
                        term,
                        doc_id.as_str(),
                        posting.term_frequency,
                        positions,
                    ])?;
                }
                written += 1;
            }
        }

        tx.commit()?;
        Ok(written)
    }

    pub fn document_count(&self) -> IndexResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Number of distinct terms
    pub fn term_count(&self) -> IndexResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT term) FROM postings",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl PostingSource for IndexStore {
    fn corpus_stats(&self) -> IndexResult<CorpusStats> {
        let (count, total): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(length), 0) FROM documents",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(CorpusStats::new(count as u64, total as u64))
    }

    fn postings(&self, term: &str) -> IndexResult<Vec<Posting>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT doc_id, term_frequency, positions FROM postings WHERE term = ?1 ORDER BY doc_id",
        )?;

        let rows = stmt.query_map(params![term], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut postings = Vec::new();
        for row in rows {
            let (doc_id, term_frequency, positions) = row?;
            let positions: Vec<u32> = serde_json::from_str(&positions)
                .map_err(|e| IndexError::Corrupt(format!("positions for '{}': {}", term, e)))?;
            postings.push(Posting {
                doc_id: DocId::from_stored(doc_id),
                term_frequency,
                positions,
            });
        }

        Ok(postings)
    }

    fn summary(&self, doc_id: &DocId) -> IndexResult<Option<DocumentSummary>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT url, title, length FROM documents WHERE doc_id = ?1")?;

        let summary = stmt
            .query_row(params![doc_id.as_str()], |row| {
                Ok(DocumentSummary {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    length: row.get(2)?,
                })
            })
            .optional()?;

        Ok(summary)
    }
}
