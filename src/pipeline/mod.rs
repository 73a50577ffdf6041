//! Crawl-to-result orchestration.
//!
//! Seeds fan out to one crawl task each; fetched pages land on a bounded
//! queue sized to the worker count; a fixed worker pool drains the queue
//! through extraction, filtering, dedup, checking and the result sink.

pub mod filter;
pub mod processor;
pub mod stats;
pub mod workers;

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::checker::AvailabilityChecker;
use crate::crawler::{CrawlEngine, Page};
use crate::extractor::DomainExtractor;
use crate::sink::ResultSink;
use crate::store::CheckedStore;

pub use filter::TldAllowList;
pub use processor::WorkerContext;
pub use stats::{Stats, StatsSnapshot};

/// When a domain's dedup mark is committed relative to its oracle call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPolicy {
    /// Mark first; a failed check still consumes the TTL window
    #[default]
    MarkBeforeCheck,
    /// Mark first, but drop the mark again if the check fails
    ReleaseOnFailure,
}

impl fmt::Display for CheckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckPolicy::MarkBeforeCheck => write!(f, "mark_before_check"),
            CheckPolicy::ReleaseOnFailure => write!(f, "release_on_failure"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Crawling,
    Streaming,
    Draining,
    Shutdown,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Init => write!(f, "INIT"),
            PipelineState::Crawling => write!(f, "CRAWLING"),
            PipelineState::Streaming => write!(f, "STREAMING"),
            PipelineState::Draining => write!(f, "DRAINING"),
            PipelineState::Shutdown => write!(f, "SHUTDOWN"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers: usize,
    pub check_policy: CheckPolicy,
    /// Only Available results reach the sink
    pub available_only: bool,
    /// Print a status line to stdout for every checked domain
    pub echo: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            check_policy: CheckPolicy::default(),
            available_only: false,
            echo: false,
        }
    }
}

/// CPU count minus one, never below one
pub fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cpus.saturating_sub(1).max(1)
}

/// Wires a crawl engine to the extractor, dedup store, checker and sink.
pub struct Pipeline {
    engine: Arc<dyn CrawlEngine>,
    extractor: DomainExtractor,
    store: Arc<dyn CheckedStore>,
    checker: AvailabilityChecker,
    sink: Arc<dyn ResultSink>,
    allow_list: Arc<TldAllowList>,
    options: PipelineOptions,
    stats: Arc<Stats>,
    state: Mutex<PipelineState>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        engine: Arc<dyn CrawlEngine>,
        extractor: DomainExtractor,
        store: Arc<dyn CheckedStore>,
        checker: AvailabilityChecker,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            engine,
            extractor,
            store,
            checker,
            sink,
            allow_list: Arc::new(TldAllowList::default()),
            options: PipelineOptions::default(),
            stats: Arc::new(Stats::new()),
            state: Mutex::new(PipelineState::Init),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_allow_list(mut self, allow_list: TldAllowList) -> Self {
        self.allow_list = Arc::new(allow_list);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses `token` as the interrupt signal for this pipeline
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn set_state(&self, next: PipelineState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        info!("Pipeline state {} -> {}", *state, next);
        *state = next;
    }

    /// Runs the pipeline to completion or interruption.
    ///
    /// Returns once every worker has exited and the store and sink are
    /// closed. A close failure is the run's error; per-page and per-domain
    /// failures are only logged.
    ///
    /// # Arguments
    /// * `seeds` - Validated seed URLs, one crawl task each
    ///
    /// # Returns
    /// * `Result<StatsSnapshot>` - Final counters, or the first close error
    pub async fn run(&self, seeds: Vec<Url>) -> Result<StatsSnapshot> {
        if seeds.is_empty() {
            bail!("No valid seed URLs to crawl");
        }

        let workers = self.options.workers.max(1);
        debug!(
            "Pipeline starting: seeds={}, workers={}, policy={}, allow_list={}",
            seeds.len(),
            workers,
            self.options.check_policy,
            self.allow_list.len()
        );
        let (page_tx, page_rx) = mpsc::channel::<Page>(workers);

        self.set_state(PipelineState::Crawling);
        let crawls = self.spawn_crawls(seeds, page_tx);

        self.set_state(PipelineState::Streaming);
        let ctx = Arc::new(WorkerContext {
            extractor: self.extractor.clone(),
            store: self.store.clone(),
            checker: self.checker.clone(),
            sink: self.sink.clone(),
            allow_list: self.allow_list.clone(),
            stats: self.stats.clone(),
            options: self.options.clone(),
            cancel: self.cancel.clone(),
        });
        let worker_handles = workers::start_workers(page_rx, ctx, workers);

        let mut crawls = Box::pin(join_all(crawls));
        let crawls_finished = tokio::select! {
            results = &mut crawls => {
                log_join_failures("Crawl", results);
                true
            }
            _ = self.cancel.cancelled() => {
                warn!("Interrupt received, stopping crawl");
                self.engine.close();
                false
            }
        };

        self.set_state(PipelineState::Draining);
        log_join_failures("Worker", join_all(worker_handles).await);
        if !crawls_finished {
            log_join_failures("Crawl", crawls.await);
        }

        self.set_state(PipelineState::Shutdown);
        self.shutdown()
    }

    fn spawn_crawls(&self, seeds: Vec<Url>, page_tx: mpsc::Sender<Page>) -> Vec<JoinHandle<()>> {
        seeds
            .into_iter()
            .map(|seed| {
                let engine = self.engine.clone();
                let page_tx = page_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = engine.crawl(seed.clone(), page_tx).await {
                        error!("Crawl from {} failed: {:#}", seed, e);
                    }
                })
            })
            .collect()
    }

    fn shutdown(&self) -> Result<StatsSnapshot> {
        let store_closed = self.store.close().context("Failed to close dedup store");
        if let Err(e) = &store_closed {
            error!("{:#}", e);
        }
        let sink_closed = self.sink.close().context("Failed to close result sink");
        if let Err(e) = &sink_closed {
            error!("{:#}", e);
        }

        let snapshot = self.stats.snapshot();
        info!("Run summary: {}", snapshot);
        store_closed?;
        sink_closed?;
        Ok(snapshot)
    }
}

fn log_join_failures(kind: &str, results: Vec<Result<(), tokio::task::JoinError>>) {
    for result in results {
        if let Err(e) = result {
            error!("{} task panicked: {}", kind, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_policy_names() {
        assert_eq!(CheckPolicy::default(), CheckPolicy::MarkBeforeCheck);
        assert_eq!(CheckPolicy::ReleaseOnFailure.to_string(), "release_on_failure");
        let parsed: CheckPolicy = serde_json::from_str("\"release_on_failure\"").unwrap();
        assert_eq!(parsed, CheckPolicy::ReleaseOnFailure);
    }

    #[test]
    fn test_default_workers_at_least_one() {
        assert!(default_workers() >= 1);
        assert!(PipelineOptions::default().workers >= 1);
    }
}
