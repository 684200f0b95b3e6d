//! Crawler coordinator - the crawl scheduler
//!
//! A bounded pool of tokio workers shares one [`Frontier`] behind a mutex.
//! Each worker loops claim -> process -> complete:
//! - consult the cache, fetching and extracting only on a miss
//! - hand the resulting document to the collection's sink
//! - report the outcome and the page's links back to the frontier
//!
//! A redirect is not followed in place: an on-host target is handed to the
//! frontier like a link, an off-host one fails the task.
//!
//! Page-level failures are recorded and the crawl moves on, including a sink
//! refusing one document's URL. Any other sink failure halts every worker
//! and is returned to the caller.

use crate::config::Config;
use crate::crawler::cancel::CancelToken;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchError, Fetched};
use crate::crawler::frontier::{Claim, CrawlTask, Frontier, FrontierLimits, TaskResult};
use crate::crawler::report::CrawlReport;
use crate::document::Document;
use crate::extract::extract;
use crate::search::{StandardTokenizer, Tokenizer};
use crate::sink::{FinalizeSummary, Sink, SinkError};
use crate::storage::{Cache, CachedEntry};
use crate::url::{normalize_url, Scope};
use crate::SiftError;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use url::Url;

/// Pages between progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Longest an idle worker sleeps before re-checking the frontier
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Result of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub report: CrawlReport,
    pub finalized: FinalizeSummary,
}

/// Everything a worker needs that outlives a single run
struct WorkerContext {
    client: Client,
    cache: Arc<dyn Cache>,
    tokenizer: Arc<dyn Tokenizer>,
    cancel: CancelToken,
}

/// Per-run state shared by all workers
struct CrawlState<S> {
    scope: Scope,
    frontier: Mutex<Frontier>,
    sink: Mutex<S>,
    notify: Notify,
    halted: AtomicBool,
    pages_done: AtomicU64,
    cache_hits: AtomicU64,
    fetched: AtomicU64,
    started: Instant,
}

enum PageSource {
    Cache,
    Network,
}

struct ProcessedPage {
    document: Document,
    links: Vec<Url>,
    source: PageSource,
}

enum Processed {
    Page(ProcessedPage),

    /// The URL redirected to this normalized, in-scope target
    Redirect(Url),
}

/// Runs crawls against a shared cache
pub struct Crawler {
    context: Arc<WorkerContext>,
    concurrency: usize,
    limits: FrontierLimits,
}

impl Crawler {
    /// Creates a crawler from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count, limits, timeout and user agent
    /// * `cache` - Page cache consulted before every fetch
    /// * `cancel` - Token that stops the crawl at the next task boundary
    pub fn new(config: &Config, cache: Arc<dyn Cache>, cancel: CancelToken) -> Result<Self, SiftError> {
        let client = build_http_client(config)?;

        Ok(Self {
            context: Arc::new(WorkerContext {
                client,
                cache,
                tokenizer: Arc::new(StandardTokenizer::new()),
                cancel,
            }),
            concurrency: config.crawler.concurrency.max(1) as usize,
            limits: FrontierLimits {
                page_limit: config.crawler.page_limit,
                max_depth: config.crawler.max_depth,
            },
        })
    }

    /// Crawls everything reachable from `seed` on the seed's host
    ///
    /// The sink is finalized once all workers have stopped, including after a
    /// cancel request, so partial progress is committed.
    pub async fn run<S>(&self, seed: &Url, sink: S) -> Result<CrawlOutcome, SiftError>
    where
        S: Sink + Send + 'static,
    {
        let seed = normalize_url(seed.as_str())?;
        let scope = Scope::from_url(&seed)?;

        let mut frontier = Frontier::new(scope.clone(), self.limits);
        frontier.enqueue(seed.clone(), 0, None);

        let state = Arc::new(CrawlState {
            scope,
            frontier: Mutex::new(frontier),
            sink: Mutex::new(sink),
            notify: Notify::new(),
            halted: AtomicBool::new(false),
            pages_done: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            fetched: AtomicU64::new(0),
            started: Instant::now(),
        });

        tracing::info!(
            "Starting crawl of {} with {} workers",
            seed,
            self.concurrency
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..self.concurrency {
            workers.spawn(run_worker(
                worker_id,
                Arc::clone(&self.context),
                Arc::clone(&state),
            ));
        }

        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            let result = joined
                .map_err(|e| SiftError::Worker(e.to_string()))
                .and_then(|r| r);

            if let Err(e) = result {
                state.halt();
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = first_error {
            tracing::error!("Crawl of {} aborted: {}", seed, e);
            return Err(e);
        }

        let cancelled = self.context.cancel.is_cancelled();
        if cancelled {
            tracing::info!("Crawl cancelled, committing partial results");
        }

        let finalized = {
            let mut sink = state.sink()?;
            sink.finalize()?
        };
        let report = state.report(cancelled)?;

        tracing::info!(
            "Crawl completed: {} pages done, {} failed, {} from cache in {:?}",
            report.pages_done,
            report.pages_failed.len(),
            report.cache_hits,
            report.elapsed
        );

        Ok(CrawlOutcome { report, finalized })
    }
}

impl<S: Sink> CrawlState<S> {
    fn frontier(&self) -> Result<MutexGuard<'_, Frontier>, SiftError> {
        self.frontier
            .lock()
            .map_err(|_| SiftError::Worker("frontier lock poisoned".to_string()))
    }

    fn sink(&self) -> Result<MutexGuard<'_, S>, SiftError> {
        self.sink
            .lock()
            .map_err(|_| SiftError::Worker("sink lock poisoned".to_string()))
    }

    fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    fn write_document(&self, document: &Document) -> Result<(), SinkError> {
        match self.sink.lock() {
            Ok(mut sink) => sink.write(document),
            Err(_) => Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "sink lock poisoned",
            ))),
        }
    }

    fn record_page(&self, source: PageSource) -> Result<(), SiftError> {
        match source {
            PageSource::Cache => self.cache_hits.fetch_add(1, Ordering::Relaxed),
            PageSource::Network => self.fetched.fetch_add(1, Ordering::Relaxed),
        };

        let done = self.pages_done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % PROGRESS_INTERVAL == 0 {
            let (queued, seen) = {
                let frontier = self.frontier()?;
                (frontier.queued(), frontier.seen())
            };
            let rate = done as f64 / self.started.elapsed().as_secs_f64().max(f64::EPSILON);
            tracing::info!(
                "Progress: {} pages done, {} queued, {} seen, {:.2} pages/sec",
                done,
                queued,
                seen,
                rate
            );
        }
        Ok(())
    }

    fn complete(&self, task: &CrawlTask, outcome: TaskResult, links: &[Url]) -> Result<(), SiftError> {
        self.frontier()?.complete(task, outcome, links);
        self.notify.notify_waiters();
        Ok(())
    }

    fn report(&self, cancelled: bool) -> Result<CrawlReport, SiftError> {
        Ok(CrawlReport {
            pages_done: self.pages_done.load(Ordering::Relaxed),
            pages_failed: self.frontier()?.failures(),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            cancelled,
            elapsed: self.started.elapsed(),
        })
    }
}

async fn run_worker<S: Sink>(
    worker_id: usize,
    context: Arc<WorkerContext>,
    state: Arc<CrawlState<S>>,
) -> Result<(), SiftError> {
    loop {
        if context.cancel.is_cancelled() || state.is_halted() {
            tracing::debug!("Worker {} stopping", worker_id);
            return Ok(());
        }

        // Registered before claiming so a completion between the claim and
        // the wait is not missed.
        let notified = state.notify.notified();
        let claim = state.frontier()?.claim();

        let task = match claim {
            Claim::Task(task) => {
                drop(notified);
                task
            }
            Claim::Wait => {
                let _ = tokio::time::timeout(IDLE_POLL, notified).await;
                continue;
            }
            Claim::Exhausted => {
                state.notify.notify_waiters();
                tracing::debug!("Worker {} found the frontier exhausted", worker_id);
                return Ok(());
            }
        };

        tracing::debug!(
            "Worker {} processing {} (depth {})",
            worker_id,
            task.url,
            task.depth
        );

        match process_page(&context, &state.scope, &task).await {
            Ok(Processed::Redirect(target)) => {
                tracing::debug!("{} redirects to {}", task.url, target);
                state.complete(&task, TaskResult::Done, &[target])?;
            }
            Ok(Processed::Page(page)) => {
                if let Err(e) = state.write_document(&page.document) {
                    if e.is_page_level() {
                        tracing::warn!("Sink rejected {}: {}", task.url, e);
                        state.complete(&task, TaskResult::Failed(e.to_string()), &[])?;
                        continue;
                    }
                    tracing::error!("Sink write failed for {}: {}", task.url, e);
                    state.complete(&task, TaskResult::Failed(e.to_string()), &[])?;
                    state.halt();
                    return Err(e.into());
                }
                state.record_page(page.source)?;
                state.complete(&task, TaskResult::Done, &page.links)?;
            }
            Err(reason) => {
                tracing::warn!("Failed to crawl {}: {}", task.url, reason);
                state.complete(&task, TaskResult::Failed(reason), &[])?;
            }
        }
    }
}

/// Turns a task into a document, from the cache when possible
///
/// Errors are page-level failures, returned as the reason to record.
async fn process_page(
    context: &WorkerContext,
    scope: &Scope,
    task: &CrawlTask,
) -> Result<Processed, String> {
    let cached = context
        .cache
        .get(&task.url)
        .map_err(|e| format!("cache lookup failed: {}", e))?;

    if let Some(entry) = cached {
        tracing::debug!("Cache hit for {}", task.url);
        return Ok(Processed::Page(ProcessedPage {
            document: Document::from_cached(&entry, context.tokenizer.as_ref()),
            links: entry.parsed_links(),
            source: PageSource::Cache,
        }));
    }

    let page = match fetch_page(&context.client, &task.url).await {
        Ok(Fetched::Page(page)) => page,
        Ok(Fetched::Redirect { target }) => {
            return redirect_target(&task.url, target, scope).map(Processed::Redirect)
        }
        Err(e) => return Err(e.to_string()),
    };

    let extracted = extract(&page.body, &page.final_url, scope).map_err(|e| e.to_string())?;

    let entry = CachedEntry::new(&task.url, page.body, &extracted);
    context
        .cache
        .put(&entry)
        .map_err(|e| format!("cache write failed: {}", e))?;

    let document = Document::new(
        task.url.as_str(),
        extracted.title,
        extracted.body_markdown,
        context.tokenizer.as_ref(),
    );

    Ok(Processed::Page(ProcessedPage {
        document,
        links: extracted.links,
        source: PageSource::Network,
    }))
}

/// Normalizes an in-scope redirect target; an off-host one fails the task
fn redirect_target(url: &Url, target: Url, scope: &Scope) -> Result<Url, String> {
    if !scope.contains(&target) {
        return Err(FetchError::OffHostRedirect {
            url: url.to_string(),
            target: target.to_string(),
        }
        .to_string());
    }
    normalize_url(target.as_str()).map_err(|e| format!("bad redirect target {}: {}", target, e))
}
