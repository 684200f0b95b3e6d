//! Integration tests for the search path
//!
//! Crawl a mock site into a search collection, then query the persisted index
//! the way the CLI does.

use docsift::collection::CollectionManager;
use docsift::config::Config;
use docsift::crawler::{crawl_collection, CancelToken};
use docsift::search::{QueryOptions, SearchHit};
use docsift::storage::IndexType;
use docsift::QueryError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body><main>{}</main></body></html>",
            title, body
        ),
        "text/html",
    )
}

async fn mount(server: &MockServer, route: &str, title: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(page(title, body))
        .mount(server)
        .await;
}

/// Crawls a four-page site into a search collection named `kb`
async fn indexed_site() -> (TempDir, MockServer, CollectionManager) {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        "Knowledge base",
        r#"<p>Start here to browse the knowledge base articles.</p>
           <a href="/p1">one</a> <a href="/p2">two</a> <a href="/p3">three</a>"#,
    )
    .await;
    mount(
        &server,
        "/p1",
        "Tokio runtime",
        "<p>Tokio is an asynchronous runtime. The tokio scheduler runs tokio tasks \
         on worker threads, and tokio timers wake tasks.</p>",
    )
    .await;
    mount(
        &server,
        "/p2",
        "Serde",
        "<p>Serde serializes and deserializes data structures efficiently.</p>",
    )
    .await;
    mount(
        &server,
        "/p3",
        "Miscellany",
        "<p>A long page about many unrelated topics: gardening, cooking, hiking, \
         painting, sailing, reading, writing, singing, dancing, running, and \
         once, briefly, tokio.</p>",
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = Config::with_paths(dir.path().join("cache.db"), dir.path().join("data"));
    let collections = CollectionManager::open(config.storage_root()).unwrap();

    crawl_collection(
        &config,
        &collections,
        "kb",
        IndexType::Search,
        &server.uri(),
        CancelToken::new(),
    )
    .await
    .expect("Crawl failed");

    (dir, server, collections)
}

fn paths(hits: &[SearchHit]) -> Vec<String> {
    hits.iter()
        .map(|hit| url::Url::parse(&hit.url).unwrap().path().to_string())
        .collect()
}

#[tokio::test]
async fn test_dense_match_ranks_first() {
    let (_dir, _server, collections) = indexed_site().await;

    let hits = collections
        .query("kb", "tokio", &QueryOptions::default())
        .unwrap();

    assert_eq!(paths(&hits), vec!["/p1", "/p3"]);
    assert!(hits[0].score > hits[1].score);
    assert_eq!(hits[0].title, "Tokio runtime");
}

#[tokio::test]
async fn test_query_is_case_insensitive() {
    let (_dir, _server, collections) = indexed_site().await;

    let lower = collections
        .query("kb", "serde", &QueryOptions::default())
        .unwrap();
    let upper = collections
        .query("kb", "SERDE", &QueryOptions::default())
        .unwrap();

    assert_eq!(lower, upper);
    assert_eq!(paths(&lower), vec!["/p2"]);
}

#[tokio::test]
async fn test_limit_and_threshold() {
    let (_dir, _server, collections) = indexed_site().await;

    let limited = collections
        .query(
            "kb",
            "tokio",
            &QueryOptions {
                limit: 1,
                score_threshold: None,
            },
        )
        .unwrap();
    assert_eq!(paths(&limited), vec!["/p1"]);

    let all = collections
        .query("kb", "tokio", &QueryOptions::default())
        .unwrap();
    let above_weaker = collections
        .query(
            "kb",
            "tokio",
            &QueryOptions {
                limit: 10,
                score_threshold: Some(all[1].score + 1e-9),
            },
        )
        .unwrap();
    assert_eq!(paths(&above_weaker), vec!["/p1"]);
}

#[tokio::test]
async fn test_no_matches_is_empty() {
    let (_dir, _server, collections) = indexed_site().await;

    let hits = collections
        .query("kb", "kubernetes", &QueryOptions::default())
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_query_errors() {
    let (_dir, _server, collections) = indexed_site().await;

    assert!(matches!(
        collections.query("kb", "- ! ?", &QueryOptions::default()),
        Err(QueryError::EmptyQuery)
    ));
    assert!(matches!(
        collections.query("missing", "tokio", &QueryOptions::default()),
        Err(QueryError::CollectionNotFound(name)) if name == "missing"
    ));
}

#[tokio::test]
async fn test_results_are_deterministic() {
    let (_dir, _server, collections) = indexed_site().await;

    let first = collections
        .query("kb", "tokio serde knowledge", &QueryOptions::default())
        .unwrap();
    let second = collections
        .query("kb", "tokio serde knowledge", &QueryOptions::default())
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}
