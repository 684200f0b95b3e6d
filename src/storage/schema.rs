//! Database schema definitions
//!
//! docsift keeps three kinds of SQLite files: the shared page cache, the
//! collection catalog under the storage root, and one search index per search
//! collection.

/// SQL schema for the page cache
pub const CACHE_SCHEMA_SQL: &str = r#"
-- One row per normalized URL, keyed by the SHA-256 of that URL
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    raw_content_hash TEXT NOT NULL,
    raw_content TEXT NOT NULL,
    extracted_title TEXT NOT NULL,
    extracted_body_markdown TEXT NOT NULL,
    links TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);
"#;

/// SQL schema for the collection catalog
pub const CATALOG_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    index_type TEXT NOT NULL,
    document_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
"#;

/// SQL schema for a search collection's index
pub const INDEX_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    doc_id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    body_markdown TEXT NOT NULL,
    length INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);

-- positions is a JSON array of token offsets
CREATE TABLE IF NOT EXISTS postings (
    term TEXT NOT NULL,
    doc_id TEXT NOT NULL REFERENCES documents(doc_id),
    term_frequency INTEGER NOT NULL,
    positions TEXT NOT NULL,
    PRIMARY KEY (term, doc_id)
);

CREATE INDEX IF NOT EXISTS idx_postings_doc ON postings(doc_id);
"#;

pub fn initialize_cache_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(CACHE_SCHEMA_SQL)
}

pub fn initialize_catalog_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(CATALOG_SCHEMA_SQL)
}

pub fn initialize_index_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(INDEX_SCHEMA_SQL)
}
