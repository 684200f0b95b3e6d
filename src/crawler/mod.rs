//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The URL frontier with its per-run status map
//! - HTTP fetching and response classification
//! - The worker pool that turns pages into documents
//! - Cancellation and the end-of-crawl report

mod cancel;
mod coordinator;
mod fetcher;
mod frontier;
mod report;

pub use cancel::CancelToken;
pub use coordinator::{CrawlOutcome, Crawler};
pub use fetcher::{
    build_http_client, fetch_page, is_html_content_type, FetchError, Fetched, FetchedPage,
};
pub use frontier::{Claim, CrawlTask, Frontier, FrontierLimits, TaskResult, UrlStatus};
pub use report::CrawlReport;

use crate::collection::CollectionManager;
use crate::config::Config;
use crate::storage::{Cache, IndexType, SqliteCache};
use crate::url::normalize_url;
use crate::SiftError;
use std::sync::Arc;

/// Crawls a seed URL into a collection
///
/// This is the main entry point for a crawl. It will:
/// 1. Register the collection, or check the existing one has `index_type`
/// 2. Open the collection's sink and the shared page cache
/// 3. Run the worker pool until the frontier is exhausted or cancelled
/// 4. Finalize the sink and refresh the catalog's document count
///
/// # Example
///
/// ```no_run
/// use docsift::collection::CollectionManager;
/// use docsift::config::Config;
/// use docsift::crawler::{crawl_collection, CancelToken};
/// use docsift::storage::IndexType;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::with_paths("./cache.db", "./data");
/// let collections = CollectionManager::open(config.storage_root())?;
/// let outcome = crawl_collection(
///     &config,
///     &collections,
///     "rust-docs",
///     IndexType::Search,
///     "https://doc.rust-lang.org/book/",
///     CancelToken::new(),
/// )
/// .await?;
/// println!("{}", outcome.report.format_summary());
/// # Ok(())
/// # }
/// ```
pub async fn crawl_collection(
    config: &Config,
    collections: &CollectionManager,
    name: &str,
    index_type: IndexType,
    seed: &str,
    cancel: CancelToken,
) -> Result<CrawlOutcome, SiftError> {
    let seed = normalize_url(seed)?;
    let record = collections.ensure(name, index_type)?;
    let sink = collections.open_sink(&record)?;

    let cache: Arc<dyn Cache> = Arc::new(SqliteCache::open(config.cache_path())?);
    tracing::debug!("Using page cache at {}", config.cache_path().display());

    let crawler = Crawler::new(config, cache, cancel)?;
    let outcome = crawler.run(&seed, sink).await?;

    collections.set_document_count(name, outcome.finalized.document_count)?;
    tracing::info!(
        "Collection '{}' now holds {} documents",
        name,
        outcome.finalized.document_count
    );

    Ok(outcome)
}
