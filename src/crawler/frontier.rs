//! URL frontier
//!
//! Tracks every URL a crawl has seen. Each normalized URL moves
//! Queued -> InFlight -> Done | Failed exactly once per run, which is what
//! makes crawls of cyclic link graphs terminate.

use crate::url::Scope;
use std::collections::{HashMap, VecDeque};
use url::Url;

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,

    /// Hops from the seed; the seed is depth 0
    pub depth: u32,

    /// Page the link was found on, `None` for the seed
    pub discovered_from: Option<Url>,
}

/// Lifecycle of a URL within one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlStatus {
    Queued,
    InFlight,
    Done,
    Failed(String),
}

/// Result of asking the frontier for work
#[derive(Debug, PartialEq, Eq)]
pub enum Claim {
    /// A task to process; the URL is now in flight
    Task(CrawlTask),

    /// Nothing queued, but in-flight work may still discover links
    Wait,

    /// Nothing left to hand out
    Exhausted,
}

/// How a claimed task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Done,
    Failed(String),
}

/// Optional stopping conditions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierLimits {
    /// Maximum number of claims handed out in the run
    pub page_limit: Option<u64>,

    /// Links deeper than this are not enqueued
    pub max_depth: Option<u32>,
}

/// The crawl's URL queue and status map
///
/// Not synchronized itself; the scheduler keeps it behind a single mutex.
#[derive(Debug)]
pub struct Frontier {
    scope: Scope,
    limits: FrontierLimits,
    queue: VecDeque<CrawlTask>,
    statuses: HashMap<String, UrlStatus>,
    in_flight: usize,
    claimed: u64,
}

impl Frontier {
    pub fn new(scope: Scope, limits: FrontierLimits) -> Self {
        Self {
            scope,
            limits,
            queue: VecDeque::new(),
            statuses: HashMap::new(),
            in_flight: 0,
            claimed: 0,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Queues a URL unless it was already seen, is off-host, or is too deep
    ///
    /// Returns true if the URL was added.
    pub fn enqueue(&mut self, url: Url, depth: u32, discovered_from: Option<Url>) -> bool {
        if !self.scope.contains(&url) {
            return false;
        }

        if let Some(max_depth) = self.limits.max_depth {
            if depth > max_depth {
                return false;
            }
        }

        let key = url.as_str().to_string();
        if self.statuses.contains_key(&key) {
            return false;
        }

        self.statuses.insert(key, UrlStatus::Queued);
        self.queue.push_back(CrawlTask {
            url,
            depth,
            discovered_from,
        });
        true
    }

    /// Hands out the oldest queued URL
    pub fn claim(&mut self) -> Claim {
        if let Some(limit) = self.limits.page_limit {
            if self.claimed >= limit {
                return Claim::Exhausted;
            }
        }

        match self.queue.pop_front() {
            Some(task) => {
                self.statuses
                    .insert(task.url.as_str().to_string(), UrlStatus::InFlight);
                self.in_flight += 1;
                self.claimed += 1;
                Claim::Task(task)
            }
            None if self.in_flight > 0 => Claim::Wait,
            None => Claim::Exhausted,
        }
    }

    /// Records the outcome of a claimed task
    ///
    /// On success the discovered links are enqueued one level deeper. Links
    /// of failed tasks are ignored.
    pub fn complete(&mut self, task: &CrawlTask, outcome: TaskResult, links: &[Url]) {
        let key = task.url.as_str();
        if self.statuses.get(key) != Some(&UrlStatus::InFlight) {
            tracing::debug!("Ignoring completion of {} which is not in flight", key);
            return;
        }

        self.in_flight -= 1;

        match outcome {
            TaskResult::Done => {
                self.statuses.insert(key.to_string(), UrlStatus::Done);
                for link in links {
                    self.enqueue(link.clone(), task.depth + 1, Some(task.url.clone()));
                }
            }
            TaskResult::Failed(reason) => {
                self.statuses.insert(key.to_string(), UrlStatus::Failed(reason));
            }
        }
    }

    pub fn status(&self, url: &Url) -> Option<&UrlStatus> {
        self.statuses.get(url.as_str())
    }

    /// True when nothing is queued or in flight
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty() && self.in_flight == 0
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Number of URLs ever seen in this run
    pub fn seen(&self) -> usize {
        self.statuses.len()
    }

    pub fn done_count(&self) -> u64 {
        self.statuses
            .values()
            .filter(|status| **status == UrlStatus::Done)
            .count() as u64
    }

    /// Failed URLs with their reasons, ordered by URL
    pub fn failures(&self) -> Vec<(String, String)> {
        let mut failures: Vec<(String, String)> = self
            .statuses
            .iter()
            .filter_map(|(url, status)| match status {
                UrlStatus::Failed(reason) => Some((url.clone(), reason.clone())),
                _ => None,
            })
            .collect();
        failures.sort();
        failures
    }
}
