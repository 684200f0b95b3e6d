//! Configuration module for docsift
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every value has a default, so an empty file is a valid
//! configuration.
//!
//! # Example
//!
//! ```no_run
//! use docsift::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("docsift.toml")).unwrap();
//! println!("Cache lives at {}", config.cache_path().display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, StorageConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, MAX_CONCURRENCY};
