use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure for docsift
///
/// Every section is optional in the TOML file; missing sections take their
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Builds a default configuration rooted at the given paths
    pub fn with_paths(cache_path: impl Into<PathBuf>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                cache_path: cache_path.into(),
                storage_root: storage_root.into(),
            },
            ..Self::default()
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.storage.cache_path
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage.storage_root
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent crawl workers
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-request timeout in seconds, connect and body included
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Stop after this many pages have been claimed
    #[serde(rename = "page-limit", default)]
    pub page_limit: Option<u64>,

    /// Do not enqueue links deeper than this many hops from the seed
    #[serde(rename = "max-depth", default)]
    pub max_depth: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout(),
            page_limit: None,
            max_depth: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, contact),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

/// Where docsift keeps its files
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite file of the page cache shared by all collections
    #[serde(rename = "cache-path", default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Directory holding the catalog and every collection
    #[serde(rename = "storage-root", default = "default_storage_root")]
    pub storage_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            storage_root: default_storage_root(),
        }
    }
}

fn default_concurrency() -> u32 {
    8
}

fn default_request_timeout() -> u64 {
    30
}

fn default_crawler_name() -> String {
    "docsift".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./docsift-cache.db")
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./docsift-data")
}
