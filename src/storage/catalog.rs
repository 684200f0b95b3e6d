//! Collection catalog
//!
//! The catalog is a small SQLite table under the storage root recording every
//! collection's name, output kind, document count and creation time.

use crate::storage::schema::initialize_catalog_schema;
use crate::storage::traits::{CatalogError, CatalogResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// File name of the catalog inside the storage root
pub const CATALOG_FILE: &str = "catalog.db";

/// Maximum collection name length
const MAX_NAME_LEN: usize = 64;

/// What kind of output a collection produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexType {
    /// Ranked full-text search index
    Search,

    /// Tree of markdown files mirroring the site's paths
    MirrorTree,

    /// One JSON export holding every document
    Aggregate,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::MirrorTree => "mirror-tree",
            Self::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search" => Ok(Self::Search),
            "mirror-tree" => Ok(Self::MirrorTree),
            "aggregate" => Ok(Self::Aggregate),
            other => Err(CatalogError::UnknownIndexType(other.to_string())),
        }
    }
}

/// One catalog row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionRecord {
    pub name: String,
    pub index_type: IndexType,
    pub document_count: u64,
    pub created_at: DateTime<Utc>,
}

impl CollectionRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, i64, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn from_columns(columns: (String, String, i64, String)) -> CatalogResult<Self> {
        let (name, index_type, document_count, created_at) = columns;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Self {
            name,
            index_type: index_type.parse()?,
            document_count: document_count.max(0) as u64,
            created_at,
        })
    }
}

/// Collection names double as directory names, so they are restricted to a
/// filesystem-safe alphabet
pub fn validate_collection_name(name: &str) -> CatalogResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidName(name.to_string()))
    }
}

/// SQLite-backed catalog of collections
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Opens or creates the catalog at `path`
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        initialize_catalog_schema(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_catalog_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Registers a new collection
    ///
    /// Fails if the name is invalid or already taken.
    pub fn create(&self, name: &str, index_type: IndexType) -> CatalogResult<CollectionRecord> {
        validate_collection_name(name)?;

        if self.get(name)?.is_some() {
            return Err(CatalogError::AlreadyExists(name.to_string()));
        }

        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO collections (name, index_type, document_count, created_at)
             VALUES (?1, ?2, 0, ?3)",
            params![name, index_type.as_str(), created_at.to_rfc3339()],
        )?;

        Ok(CollectionRecord {
            name: name.to_string(),
            index_type,
            document_count: 0,
            created_at,
        })
    }

    /// Returns the existing collection, creating it if absent
    ///
    /// An existing collection of a different type is an error; a collection's
    /// output kind never changes after creation.
    pub fn get_or_create(&self, name: &str, index_type: IndexType) -> CatalogResult<CollectionRecord> {
        match self.get(name)? {
            Some(record) if record.index_type == index_type => Ok(record),
            Some(record) => Err(CatalogError::TypeMismatch {
                name: name.to_string(),
                existing: record.index_type.to_string(),
                requested: index_type.to_string(),
            }),
            None => self.create(name, index_type),
        }
    }

    pub fn get(&self, name: &str) -> CatalogResult<Option<CollectionRecord>> {
        let columns = self
            .conn
            .query_row(
                "SELECT name, index_type, document_count, created_at
                 FROM collections WHERE name = ?1",
                params![name],
                CollectionRecord::from_row,
            )
            .optional()?;

        columns.map(CollectionRecord::from_columns).transpose()
    }

    /// All collections ordered by name
    pub fn list(&self) -> CatalogResult<Vec<CollectionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, index_type, document_count, created_at
             FROM collections ORDER BY name",
        )?;

        let rows = stmt.query_map([], CollectionRecord::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(CollectionRecord::from_columns(row?)?);
        }
        Ok(records)
    }

    pub fn set_document_count(&self, name: &str, document_count: u64) -> CatalogResult<()> {
        let updated = self.conn.execute(
            "UPDATE collections SET document_count = ?1 WHERE name = ?2",
            params![document_count as i64, name],
        )?;

        if updated == 0 {
            return Err(CatalogError::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// Removes a collection's row, returning whether it existed
    pub fn delete(&self, name: &str) -> CatalogResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }
}
