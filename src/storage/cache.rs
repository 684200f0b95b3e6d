//! SQLite-backed page cache
//!
//! Entries are never expired or deleted; a later `put` for the same URL simply
//! replaces the row.

use crate::extract::Extracted;
use crate::storage::schema::initialize_cache_schema;
use crate::storage::traits::{Cache, CacheError, CacheResult};
use crate::url::cache_key;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// A fetched page together with its extraction result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Normalized URL of the page
    pub url: String,

    /// SHA-256 hex of `raw_content`
    pub raw_content_hash: String,

    pub raw_content: String,
    pub extracted_title: String,
    pub extracted_body_markdown: String,

    /// In-scope outbound links, so a cache hit can still feed the frontier
    pub links: Vec<String>,

    pub fetched_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn new(url: &Url, raw_content: String, extracted: &Extracted) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(raw_content.as_bytes());

        Self {
            url: url.to_string(),
            raw_content_hash: hex::encode(hasher.finalize()),
            raw_content,
            extracted_title: extracted.title.clone(),
            extracted_body_markdown: extracted.body_markdown.clone(),
            links: extracted.links.iter().map(Url::to_string).collect(),
            fetched_at: Utc::now(),
        }
    }

    /// The stored links that still parse as URLs
    pub fn parsed_links(&self) -> Vec<Url> {
        self.links
            .iter()
            .filter_map(|link| Url::parse(link).ok())
            .collect()
    }
}

/// Page cache stored in a single SQLite file
///
/// The connection sits behind a mutex so that every worker's reads and writes
/// are serialized; a half-written row is never observable.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens or creates the cache database
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_cache_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_cache_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

impl Cache for SqliteCache {
    fn get(&self, url: &Url) -> CacheResult<Option<CachedEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT url, raw_content_hash, raw_content, extracted_title,
             extracted_body_markdown, links, fetched_at
             FROM cache_entries WHERE cache_key = ?1",
        )?;

        let row = stmt
            .query_row(params![cache_key(url)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .optional()?;

        let Some((url, raw_content_hash, raw_content, title, body, links, fetched_at)) = row else {
            return Ok(None);
        };

        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(CachedEntry {
            url,
            raw_content_hash,
            raw_content,
            extracted_title: title,
            extracted_body_markdown: body,
            links: serde_json::from_str(&links)?,
            fetched_at,
        }))
    }

    fn put(&self, entry: &CachedEntry) -> CacheResult<()> {
        let url = Url::parse(&entry.url)
            .map_err(|e| CacheError::InvalidUrl(format!("{}: {}", entry.url, e)))?;
        let links = serde_json::to_string(&entry.links)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries
             (cache_key, url, raw_content_hash, raw_content, extracted_title,
              extracted_body_markdown, links, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                cache_key(&url),
                entry.url,
                entry.raw_content_hash,
                entry.raw_content,
                entry.extracted_title,
                entry.extracted_body_markdown,
                links,
                entry.fetched_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn contains(&self, url: &Url) -> CacheResult<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM cache_entries WHERE cache_key = ?1",
                params![cache_key(url)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn len(&self) -> CacheResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn entry(url: &str, title: &str) -> CachedEntry {
        let url = Url::parse(url).unwrap();
        let extracted = Extracted {
            title: title.to_string(),
            body_markdown: format!("Body of {}", title),
            links: vec![Url::parse("https://example.com/next").unwrap()],
        };
        CachedEntry::new(&url, format!("<html>{}</html>", title), &extracted)
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = SqliteCache::open_in_memory().unwrap();
        let url = Url::parse("https://example.com/page").unwrap();

        assert!(cache.get(&url).unwrap().is_none());
        cache.put(&entry("https://example.com/page", "Page")).unwrap();

        let hit = cache.get(&url).unwrap().unwrap();
        assert_eq!(hit.extracted_title, "Page");
        assert_eq!(hit.links, vec!["https://example.com/next".to_string()]);
        assert!(cache.contains(&url).unwrap());
    }

    #[test]
    fn test_equivalent_urls_share_entry() {
        let cache = SqliteCache::open_in_memory().unwrap();
        cache
            .put(&entry("https://example.com/page?a=1&b=2", "Page"))
            .unwrap();

        let variant = Url::parse("https://EXAMPLE.com/page?b=2&a=1#top").unwrap();
        assert!(cache.get(&variant).unwrap().is_some());
    }

    #[test]
    fn test_put_replaces_previous_entry() {
        let cache = SqliteCache::open_in_memory().unwrap();
        cache.put(&entry("https://example.com/", "Old")).unwrap();
        cache.put(&entry("https://example.com/", "New")).unwrap();

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(cache.get(&url).unwrap().unwrap().extracted_title, "New");
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_raw_content_hash() {
        let e = entry("https://example.com/", "T");
        let mut hasher = Sha256::new();
        hasher.update(e.raw_content.as_bytes());
        assert_eq!(e.raw_content_hash, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        SqliteCache::open(&path)
            .unwrap()
            .put(&entry("https://example.com/", "Kept"))
            .unwrap();

        let reopened = SqliteCache::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
        assert!(!reopened.is_empty().unwrap());
    }

    #[test]
    fn test_concurrent_puts_leave_one_complete_entry() {
        let cache = Arc::new(SqliteCache::open_in_memory().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache
                        .put(&entry("https://example.com/race", &format!("Writer {}", i)))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let url = Url::parse("https://example.com/race").unwrap();
        let stored = cache.get(&url).unwrap().unwrap();
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(
            stored.extracted_body_markdown,
            format!("Body of {}", stored.extracted_title)
        );
    }
}
