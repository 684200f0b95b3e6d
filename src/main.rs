//! docsift main entry point
//!
//! This is the command-line interface for crawling sites into collections and
//! querying them.

use clap::{Parser, Subcommand, ValueEnum};
use docsift::collection::CollectionManager;
use docsift::config::{load_config_with_hash, Config};
use docsift::crawler::{crawl_collection, CancelToken};
use docsift::search::QueryOptions;
use docsift::storage::IndexType;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docsift: turn a documentation site into a local collection
///
/// Crawls every page on a seed URL's host, extracts the main content as
/// markdown and stores it as a search index, a mirrored file tree or a
/// single JSON export.
#[derive(Parser, Debug)]
#[command(name = "docsift")]
#[command(version)]
#[command(about = "Crawl a site into a locally queryable collection", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a seed URL into a collection
    Crawl {
        /// Collection name
        collection: String,

        /// URL to start from; only pages on its host are crawled
        seed: String,

        /// Output kind of a new collection
        #[arg(long = "type", value_enum, default_value_t = CollectionKind::Search)]
        kind: CollectionKind,
    },

    /// Search a collection
    Query {
        collection: String,

        /// Free-text query
        text: String,

        /// Maximum number of hits
        #[arg(long, default_value_t = docsift::search::query::DEFAULT_LIMIT)]
        limit: usize,

        /// Drop hits scoring below this value
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// List collections
    List,

    /// Delete a collection's output and catalog entry
    Delete { collection: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CollectionKind {
    Search,
    MirrorTree,
    Aggregate,
}

impl From<CollectionKind> for IndexType {
    fn from(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::Search => IndexType::Search,
            CollectionKind::MirrorTree => IndexType::MirrorTree,
            CollectionKind::Aggregate => IndexType::Aggregate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_ref())?;
    let collections = CollectionManager::open(config.storage_root())?;

    match cli.command {
        Command::Crawl {
            collection,
            seed,
            kind,
        } => handle_crawl(&config, &collections, &collection, &seed, kind.into()).await,
        Command::Query {
            collection,
            text,
            limit,
            threshold,
        } => handle_query(&collections, &collection, &text, limit, threshold),
        Command::List => handle_list(&collections),
        Command::Delete { collection } => handle_delete(&collections, &collection),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docsift=info,warn"),
            1 => EnvFilter::new("docsift=debug,info"),
            2 => EnvFilter::new("docsift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load(path: Option<&PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the crawl command; Ctrl-C stops the crawl and keeps what was done
async fn handle_crawl(
    config: &Config,
    collections: &CollectionManager,
    collection: &str,
    seed: &str,
    index_type: IndexType,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing in-flight pages");
            on_signal.cancel();
        }
    });

    tracing::info!(
        "Crawling {} into '{}' ({})",
        seed,
        collection,
        index_type
    );

    match crawl_collection(config, collections, collection, index_type, seed, cancel).await {
        Ok(outcome) => {
            println!("{}", outcome.report.format_summary());
            println!(
                "Collection '{}' holds {} documents",
                collection, outcome.finalized.document_count
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn handle_query(
    collections: &CollectionManager,
    collection: &str,
    text: &str,
    limit: usize,
    threshold: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = QueryOptions {
        limit,
        score_threshold: threshold,
    };
    let hits = collections.query(collection, text, &options)?;

    if hits.is_empty() {
        println!("No matches");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>3}. {:.4}  {}", rank + 1, hit.score, hit.title);
        println!("      {}", hit.url);
    }
    Ok(())
}

fn handle_list(collections: &CollectionManager) -> Result<(), Box<dyn std::error::Error>> {
    let records = collections.list()?;
    if records.is_empty() {
        println!("No collections");
        return Ok(());
    }

    println!("{:<24} {:<12} {:>10}  {}", "NAME", "TYPE", "DOCUMENTS", "CREATED");
    for record in records {
        println!(
            "{:<24} {:<12} {:>10}  {}",
            record.name,
            record.index_type,
            record.document_count,
            record.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn handle_delete(
    collections: &CollectionManager,
    collection: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if collections.delete(collection)? {
        println!("Deleted collection '{}'", collection);
    } else {
        println!("No collection named '{}'", collection);
    }
    Ok(())
}
