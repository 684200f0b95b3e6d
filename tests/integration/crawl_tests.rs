//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, from seed URL to collection output.

use docsift::collection::CollectionManager;
use docsift::config::Config;
use docsift::crawler::{crawl_collection, CancelToken, CrawlOutcome};
use docsift::sink::{ExportFile, EXPORT_FILE, MIRROR_DIR};
use docsift::storage::{CatalogError, IndexType};
use docsift::SiftError;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A scratch storage root and cache for one test
struct TestEnv {
    dir: TempDir,
    config: Config,
    collections: CollectionManager,
}

impl TestEnv {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = Config::with_paths(dir.path().join("cache.db"), dir.path().join("data"));
        config.crawler.concurrency = 4;
        config.crawler.request_timeout_secs = 5;
        let collections =
            CollectionManager::open(config.storage_root()).expect("Failed to open catalog");

        Self {
            dir,
            config,
            collections,
        }
    }

    async fn crawl(
        &self,
        name: &str,
        index_type: IndexType,
        seed: &str,
    ) -> Result<CrawlOutcome, SiftError> {
        self.crawl_until(name, index_type, seed, CancelToken::new())
            .await
    }

    async fn crawl_until(
        &self,
        name: &str,
        index_type: IndexType,
        seed: &str,
        cancel: CancelToken,
    ) -> Result<CrawlOutcome, SiftError> {
        crawl_collection(
            &self.config,
            &self.collections,
            name,
            index_type,
            seed,
            cancel,
        )
        .await
    }

    fn read_export(&self, name: &str) -> ExportFile {
        let export_path = self.collections.collection_dir(name).join(EXPORT_FILE);
        serde_json::from_str(&std::fs::read_to_string(export_path).unwrap())
            .expect("export.json is not well-formed")
    }
}

/// An HTML page with a title and the given body
fn page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body><article>{}</article></body></html>",
            title, body
        ),
        "text/html; charset=utf-8",
    )
}

async fn mount_page(server: &MockServer, route: &str, title: &str, body: &str, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(page(title, body))
        .expect(hits)
        .mount(server)
        .await;
}

/// Three pages linking to each other: `/`, `/guide`, `/reference`
async fn mount_small_site(server: &MockServer, hits: u64) {
    mount_page(
        server,
        "/",
        "Home",
        r#"<p>Welcome to the documentation home page.</p>
           <a href="/guide">Guide</a> <a href="/reference">Reference</a>"#,
        hits,
    )
    .await;
    mount_page(
        server,
        "/guide",
        "Guide",
        r#"<p>The guide explains ownership and borrowing step by step.</p>
           <a href="/">Home</a> <a href="/reference">Reference</a>"#,
        hits,
    )
    .await;
    mount_page(
        server,
        "/reference",
        "Reference",
        r#"<p>The reference lists every keyword of the language.</p>
           <a href="/guide">Guide</a>"#,
        hits,
    )
    .await;
}

#[tokio::test]
async fn test_full_crawl_single_host() {
    let server = MockServer::start().await;
    mount_small_site(&server, 1).await;

    let env = TestEnv::new();
    let outcome = env
        .crawl("docs", IndexType::Search, &server.uri())
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.pages_done, 3);
    assert_eq!(outcome.report.fetched, 3);
    assert_eq!(outcome.report.cache_hits, 0);
    assert!(outcome.report.pages_failed.is_empty());
    assert_eq!(outcome.finalized.document_count, 3);

    let record = env.collections.get("docs").unwrap().unwrap();
    assert_eq!(record.index_type, IndexType::Search);
    assert_eq!(record.document_count, 3);
}

#[tokio::test]
async fn test_warm_cache_makes_no_requests() {
    let server = MockServer::start().await;
    // Each page may be fetched once across both runs
    mount_small_site(&server, 1).await;

    let env = TestEnv::new();
    env.crawl("docs", IndexType::Search, &server.uri())
        .await
        .expect("First crawl failed");

    let second = env
        .crawl("docs", IndexType::Search, &server.uri())
        .await
        .expect("Second crawl failed");

    assert_eq!(second.report.fetched, 0);
    assert_eq!(second.report.cache_hits, 3);
    assert_eq!(second.report.pages_done, 3);
    // Re-indexed documents replace themselves
    assert_eq!(second.finalized.document_count, 3);
}

#[tokio::test]
async fn test_warm_cache_output_is_identical() {
    let server = MockServer::start().await;
    mount_small_site(&server, 1).await;

    let env = TestEnv::new();
    env.crawl("bundle", IndexType::Aggregate, &server.uri())
        .await
        .expect("First aggregate crawl failed");
    env.crawl("mirror", IndexType::MirrorTree, &server.uri())
        .await
        .expect("First mirror crawl failed");

    let first_export = env.read_export("bundle");
    let guide_path = env
        .collections
        .collection_dir("mirror")
        .join(MIRROR_DIR)
        .join("127.0.0.1")
        .join("guide.md");
    let first_guide = std::fs::read(&guide_path).unwrap();

    let again = env
        .crawl("bundle", IndexType::Aggregate, &server.uri())
        .await
        .expect("Second aggregate crawl failed");
    env.crawl("mirror", IndexType::MirrorTree, &server.uri())
        .await
        .expect("Second mirror crawl failed");

    assert_eq!(again.report.fetched, 0);
    assert_eq!(env.read_export("bundle").documents, first_export.documents);
    assert_eq!(std::fs::read(&guide_path).unwrap(), first_guide);
}

#[tokio::test]
async fn test_cache_is_shared_between_collections() {
    let server = MockServer::start().await;
    mount_small_site(&server, 1).await;

    let env = TestEnv::new();
    env.crawl("search", IndexType::Search, &server.uri())
        .await
        .expect("Search crawl failed");

    let mirror = env
        .crawl("mirror", IndexType::MirrorTree, &server.uri())
        .await
        .expect("Mirror crawl failed");

    assert_eq!(mirror.report.fetched, 0);
    assert_eq!(mirror.finalized.document_count, 3);
}

#[tokio::test]
async fn test_cyclic_links_terminate() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/a",
        "A",
        r#"<p>Page A points at page B.</p><a href="/b">B</a><a href="/a#top">self</a>"#,
        1,
    )
    .await;
    mount_page(
        &server,
        "/b",
        "B",
        r#"<p>Page B points back at page A.</p><a href="/a">A</a><a href="/b?">self</a>"#,
        1,
    )
    .await;

    let env = TestEnv::new();
    let outcome = env
        .crawl("cycle", IndexType::Search, &format!("{}/a", server.uri()))
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.pages_done, 2);
}

#[tokio::test]
async fn test_other_hosts_are_not_crawled() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();

    // Same server, different host name: out of scope
    mount_page(
        &server,
        "/",
        "Home",
        &format!(
            r#"<p>Links to an alias of this server.</p>
               <a href="http://localhost:{}/elsewhere">Elsewhere</a>
               <a href="https://example.org/">External</a>"#,
            port
        ),
        1,
    )
    .await;
    mount_page(&server, "/elsewhere", "Elsewhere", "<p>Never fetched.</p>", 0).await;

    let env = TestEnv::new();
    let outcome = env
        .crawl("scoped", IndexType::Search, &server.uri())
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.pages_done, 1);
}

#[tokio::test]
async fn test_redirect_to_other_host_is_not_followed() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();

    mount_page(
        &server,
        "/",
        "Home",
        r#"<p>Links to a page that has moved away.</p><a href="/moved">Moved</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("http://localhost:{}/landing", port).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/landing", "Landing", "<p>Never fetched.</p>", 0).await;

    let env = TestEnv::new();
    let outcome = env
        .crawl("redirects", IndexType::Search, &server.uri())
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.pages_done, 1);
    assert_eq!(outcome.report.pages_failed.len(), 1);
    let (url, reason) = &outcome.report.pages_failed[0];
    assert!(url.ends_with("/moved"));
    assert!(reason.contains("localhost"));
}

#[tokio::test]
async fn test_failures_are_recorded_without_halting() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "Home",
        r#"<p>Links to a mix of good and bad pages.</p>
           <a href="/missing">Missing</a>
           <a href="/data.json">Data</a>
           <a href="/ok">Ok</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/ok", "Ok", "<p>This page is fine.</p>", 1).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let outcome = env
        .crawl("mixed", IndexType::Search, &server.uri())
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.pages_done, 2);
    let failed: Vec<&str> = outcome
        .report
        .pages_failed
        .iter()
        .map(|(url, _)| url.as_str())
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().any(|url| url.ends_with("/missing")));
    assert!(failed.iter().any(|url| url.ends_with("/data.json")));
    assert!(outcome.report.format_summary().contains("## Failures"));
}

#[tokio::test]
async fn test_page_limit_stops_crawl() {
    let server = MockServer::start().await;
    for i in 0..5 {
        mount_page(
            &server,
            &format!("/{}", i),
            &format!("Page {}", i),
            &format!(r#"<p>Chain page number {}.</p><a href="/{}">next</a>"#, i, i + 1),
            if i < 2 { 1 } else { 0 },
        )
        .await;
    }

    let mut env = TestEnv::new();
    env.config.crawler.concurrency = 1;
    env.config.crawler.page_limit = Some(2);

    let outcome = env
        .crawl("limited", IndexType::Search, &format!("{}/0", server.uri()))
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.pages_done, 2);
}

#[tokio::test]
async fn test_max_depth_stops_crawl() {
    let server = MockServer::start().await;
    for i in 0..4 {
        mount_page(
            &server,
            &format!("/{}", i),
            &format!("Page {}", i),
            &format!(r#"<p>Chain page number {}.</p><a href="/{}">next</a>"#, i, i + 1),
            if i <= 1 { 1 } else { 0 },
        )
        .await;
    }

    let mut env = TestEnv::new();
    env.config.crawler.max_depth = Some(1);

    let outcome = env
        .crawl("shallow", IndexType::Search, &format!("{}/0", server.uri()))
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.pages_done, 2);
}

#[tokio::test]
async fn test_mirror_tree_layout() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "Home",
        r#"<p>Mirror root page.</p>
           <a href="/guide/">Guide index</a>
           <a href="/guide/intro.html">Intro</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/guide/", "Guide", "<p>Guide landing page.</p>", 1).await;
    mount_page(&server, "/guide/intro.html", "Intro", "<p>Introduction text.</p>", 1).await;

    let env = TestEnv::new();
    let outcome = env
        .crawl("mirror", IndexType::MirrorTree, &server.uri())
        .await
        .expect("Crawl failed");
    assert_eq!(outcome.finalized.document_count, 3);

    let host_dir = env
        .collections
        .collection_dir("mirror")
        .join(MIRROR_DIR)
        .join("127.0.0.1");

    let home = std::fs::read_to_string(host_dir.join("index.md")).unwrap();
    assert!(home.starts_with("# Home"));
    assert!(home.contains("Mirror root page."));

    assert!(host_dir.join("guide").join("index.md").is_file());
    let intro = std::fs::read_to_string(host_dir.join("guide").join("intro.md")).unwrap();
    assert!(intro.starts_with("# Intro"));
    assert!(intro.contains("Introduction text."));
}

#[tokio::test]
async fn test_mirror_tree_escapes_colon_segments() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "Home",
        r#"<p>Wiki front page.</p><a href="/wiki/Help:Contents">Help</a>"#,
        1,
    )
    .await;
    mount_page(
        &server,
        "/wiki/Help:Contents",
        "Help",
        "<p>Help pages live in their own namespace.</p>",
        1,
    )
    .await;

    let env = TestEnv::new();
    let outcome = env
        .crawl("wiki", IndexType::MirrorTree, &server.uri())
        .await
        .expect("Crawl failed");

    assert!(outcome.report.pages_failed.is_empty());
    assert_eq!(outcome.finalized.document_count, 2);

    let help = env
        .collections
        .collection_dir("wiki")
        .join(MIRROR_DIR)
        .join("127.0.0.1")
        .join("wiki")
        .join("Help%3AContents.md");
    let written = std::fs::read_to_string(help).unwrap();
    assert!(written.contains("own namespace"));
}

#[tokio::test]
async fn test_aggregate_export() {
    let server = MockServer::start().await;
    mount_small_site(&server, 1).await;

    let env = TestEnv::new();
    env.crawl("bundle", IndexType::Aggregate, &server.uri())
        .await
        .expect("Crawl failed");

    let export = env.read_export("bundle");

    assert_eq!(export.collection, "bundle");
    assert_eq!(export.document_count, 3);
    assert_eq!(export.documents.len(), 3);
    assert!(export
        .documents
        .iter()
        .any(|doc| doc.title == "Guide" && doc.body_markdown.contains("ownership")));
}

#[tokio::test]
async fn test_aggregate_export_with_no_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let env = TestEnv::new();
    let outcome = env
        .crawl("empty", IndexType::Aggregate, &server.uri())
        .await
        .expect("Crawl failed");
    assert_eq!(outcome.report.pages_failed.len(), 1);

    let export = env.read_export("empty");
    assert_eq!(export.document_count, 0);
    assert!(export.documents.is_empty());
}

#[tokio::test]
async fn test_cancelled_aggregate_export_is_well_formed() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "Home",
        r#"<p>The only page written before the crawl stops.</p>
           <a href="/slow">Slow</a> <a href="/later">Later</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(page("Slow", "<p>Too slow.</p>").set_delay(Duration::from_secs(4)))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/later", "Later", "<p>Never claimed.</p>", 0).await;

    let mut env = TestEnv::new();
    env.config.crawler.concurrency = 1;
    env.config.crawler.request_timeout_secs = 2;

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let outcome = env
        .crawl_until("partial", IndexType::Aggregate, &server.uri(), cancel)
        .await
        .expect("Cancelled crawl failed");

    assert!(outcome.report.cancelled);
    assert_eq!(outcome.report.pages_done, 1);

    let export = env.read_export("partial");
    assert_eq!(export.document_count, 1);
    assert_eq!(export.documents.len(), 1);
    assert_eq!(export.documents[0].title, "Home");
    assert_eq!(env.collections.get("partial").unwrap().unwrap().document_count, 1);
}

#[tokio::test]
async fn test_delete_keeps_cache() {
    let server = MockServer::start().await;
    mount_small_site(&server, 1).await;

    let env = TestEnv::new();
    env.crawl("docs", IndexType::Search, &server.uri())
        .await
        .expect("Crawl failed");

    assert!(env.collections.delete("docs").unwrap());
    assert!(!env.collections.collection_dir("docs").exists());
    assert!(env.config.cache_path().exists());

    // Recreated from the cache alone
    let again = env
        .crawl("docs", IndexType::Search, &server.uri())
        .await
        .expect("Crawl after delete failed");
    assert_eq!(again.report.fetched, 0);
    assert_eq!(again.finalized.document_count, 3);
    assert!(env.dir.path().join("data").join("catalog.db").exists());
}

#[tokio::test]
async fn test_collection_type_cannot_change() {
    let server = MockServer::start().await;
    mount_small_site(&server, 1).await;

    let env = TestEnv::new();
    env.crawl("docs", IndexType::Search, &server.uri())
        .await
        .expect("Crawl failed");

    let result = env.crawl("docs", IndexType::Aggregate, &server.uri()).await;
    assert!(matches!(
        result,
        Err(SiftError::Catalog(CatalogError::TypeMismatch { .. }))
    ));
}

#[tokio::test]
async fn test_invalid_seed_is_rejected() {
    let env = TestEnv::new();
    let result = env.crawl("docs", IndexType::Search, "ftp://example.com/").await;
    assert!(matches!(result, Err(SiftError::Url(_))));
    assert!(env.collections.get("docs").unwrap().is_none());
}
