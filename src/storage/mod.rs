//! Storage module for persisted state
//!
//! This module owns docsift's SQLite files:
//! - the content-addressable page cache shared by every collection
//! - the collection catalog under the storage root
//! - schema definitions, including the per-collection search index schema

mod cache;
mod catalog;
pub mod schema;
mod traits;

pub use cache::{CachedEntry, SqliteCache};
pub use catalog::{validate_collection_name, Catalog, CollectionRecord, IndexType, CATALOG_FILE};
pub use traits::{Cache, CacheError, CacheResult, CatalogError, CatalogResult};
