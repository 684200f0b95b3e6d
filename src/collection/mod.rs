//! Collection management
//!
//! A collection is a catalog row plus a directory under
//! `<storage-root>/collections/<name>/` holding its sink output. This module
//! ties the two together and serves search queries against finalized
//! indexes.

use crate::search::{
    Bm25, IndexError, IndexStore, QueryError, QueryEvaluator, QueryOptions, SearchHit,
    StandardTokenizer, INDEX_FILE,
};
use crate::sink::{CollectionSink, SinkResult};
use crate::storage::{
    validate_collection_name, Catalog, CatalogResult, CollectionRecord, IndexType, CATALOG_FILE,
};
use crate::SiftError;
use std::path::{Path, PathBuf};

/// Directory under the storage root holding one directory per collection
pub const COLLECTIONS_DIR: &str = "collections";

/// Creates, lists, deletes and queries collections under one storage root
pub struct CollectionManager {
    root: PathBuf,
    catalog: Catalog,
}

impl CollectionManager {
    /// Opens the catalog under `storage_root`, creating the directory if needed
    pub fn open(storage_root: &Path) -> CatalogResult<Self> {
        std::fs::create_dir_all(storage_root)?;
        let catalog = Catalog::open(&storage_root.join(CATALOG_FILE))?;

        Ok(Self {
            root: storage_root.to_path_buf(),
            catalog,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a collection's output
    pub fn collection_dir(&self, name: &str) -> PathBuf {
        self.root.join(COLLECTIONS_DIR).join(name)
    }

    /// Returns the collection, registering it if it does not exist yet
    pub fn ensure(&self, name: &str, index_type: IndexType) -> CatalogResult<CollectionRecord> {
        self.catalog.get_or_create(name, index_type)
    }

    pub fn get(&self, name: &str) -> CatalogResult<Option<CollectionRecord>> {
        self.catalog.get(name)
    }

    pub fn list(&self) -> CatalogResult<Vec<CollectionRecord>> {
        self.catalog.list()
    }

    /// Opens the sink matching the collection's index type
    pub fn open_sink(&self, record: &CollectionRecord) -> SinkResult<CollectionSink> {
        CollectionSink::open(
            record.index_type,
            &self.collection_dir(&record.name),
            &record.name,
        )
    }

    pub fn set_document_count(&self, name: &str, document_count: u64) -> CatalogResult<()> {
        self.catalog.set_document_count(name, document_count)
    }

    /// Removes a collection's directory and catalog row
    ///
    /// The page cache is shared between collections and is left alone.
    /// Returns false if the collection did not exist.
    pub fn delete(&self, name: &str) -> Result<bool, SiftError> {
        validate_collection_name(name)?;

        let dir = self.collection_dir(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
            tracing::debug!("Removed {}", dir.display());
        }

        Ok(self.catalog.delete(name)?)
    }

    /// Ranks a search collection's documents against `text`
    ///
    /// # Errors
    ///
    /// * `QueryError::CollectionNotFound` - no such collection, it is not a
    ///   search collection, or it has never been finalized
    /// * `QueryError::EmptyQuery` - `text` has no indexable terms
    pub fn query(
        &self,
        name: &str,
        text: &str,
        options: &QueryOptions,
    ) -> Result<Vec<SearchHit>, QueryError> {
        let record = self
            .catalog
            .get(name)?
            .filter(|record| record.index_type == IndexType::Search)
            .ok_or_else(|| QueryError::CollectionNotFound(name.to_string()))?;

        let index_path = self.collection_dir(&record.name).join(INDEX_FILE);
        let store = match IndexStore::open_read_only(&index_path) {
            Ok(store) => store,
            Err(IndexError::Missing(_)) => {
                return Err(QueryError::CollectionNotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let tokenizer = StandardTokenizer::new();
        let scorer = Bm25::default();
        QueryEvaluator::new(&tokenizer, &scorer).evaluate(&store, text, options)
    }
}
