#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use url::Url;

use domain_spider::checker::{AvailabilityOracle, Status};
use domain_spider::crawler::{CrawlEngine, Page};
use domain_spider::extractor::{DomainExtractor, TldTable};
use domain_spider::sink::{ResultRow, ResultSink};
use domain_spider::store::CheckedStore;

pub fn seed(url: &str) -> Url {
    Url::parse(url).unwrap()
}

pub fn extractor() -> DomainExtractor {
    DomainExtractor::new(Arc::new(TldTable::builtin().unwrap()))
}

/// Serves a fixed list of pages per seed
#[derive(Default)]
pub struct StubEngine {
    pages: HashMap<String, Vec<Page>>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, seed_url: &str, status: u16, body: &str) -> Self {
        let url = seed(seed_url);
        self.pages.entry(url.to_string()).or_default().push(Page {
            url,
            status,
            body: body.as_bytes().to_vec(),
        });
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrawlEngine for StubEngine {
    async fn crawl(&self, seed: Url, pages: mpsc::Sender<Page>) -> Result<()> {
        let queued = self.pages.get(seed.as_str()).cloned().unwrap_or_default();
        for page in queued {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                sent = pages.send(page) => if sent.is_err() { break },
            }
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

/// Produces pages with a fresh domain each until closed
#[derive(Default)]
pub struct EndlessEngine {
    sent: AtomicUsize,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl EndlessEngine {
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrawlEngine for EndlessEngine {
    async fn crawl(&self, seed: Url, pages: mpsc::Sender<Page>) -> Result<()> {
        loop {
            let n = self.sent.load(Ordering::SeqCst);
            let page = Page {
                url: seed.join(&format!("/page-{}", n))?,
                status: 200,
                body: format!("<p>see endless-{}.com</p>", n).into_bytes(),
            };
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                sent = pages.send(page) => if sent.is_err() { break },
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

/// Answers from a fixed table, `Unknown` for anything else
#[derive(Default)]
pub struct MapOracle {
    statuses: HashMap<String, Status>,
    calls: Mutex<Vec<String>>,
}

impl MapOracle {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, Status)>) -> Self {
        Self {
            statuses: entries
                .into_iter()
                .map(|(domain, status)| (domain.to_string(), status))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AvailabilityOracle for MapOracle {
    async fn lookup(&self, domain: &str) -> Result<Status> {
        self.calls.lock().unwrap().push(domain.to_string());
        Ok(self.statuses.get(domain).copied().unwrap_or(Status::Unknown))
    }
}

pub struct FailingOracle;

#[async_trait]
impl AvailabilityOracle for FailingOracle {
    async fn lookup(&self, _domain: &str) -> Result<Status> {
        bail!("whois server unreachable")
    }
}

/// Blocks every lookup until permits are added to `gate`
pub struct GatedOracle {
    pub gate: Semaphore,
    pub calls: AtomicUsize,
}

impl GatedOracle {
    pub fn closed() -> Self {
        Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AvailabilityOracle for GatedOracle {
    async fn lookup(&self, _domain: &str) -> Result<Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.acquire().await?.forget();
        Ok(Status::Registered)
    }
}

#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<Vec<ResultRow>>,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn rows(&self) -> Vec<ResultRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ResultSink for MemorySink {
    fn write(&self, row: &ResultRow) -> Result<()> {
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory store without expiry that records every lookup
#[derive(Default)]
pub struct MemoryStore {
    marks: Mutex<HashSet<String>>,
    queried: Mutex<Vec<String>>,
    closed: AtomicBool,
    fail_close: bool,
}

impl MemoryStore {
    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.marks.lock().unwrap().contains(domain)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl CheckedStore for MemoryStore {
    fn has_checked(&self, domain: &str) -> Result<bool> {
        self.queried.lock().unwrap().push(domain.to_string());
        Ok(!self.marks.lock().unwrap().insert(domain.to_string()))
    }

    fn release(&self, domain: &str) -> Result<()> {
        self.marks.lock().unwrap().remove(domain);
        Ok(())
    }

    fn len(&self) -> usize {
        self.marks.lock().unwrap().len()
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            bail!("disk full");
        }
        Ok(())
    }
}
