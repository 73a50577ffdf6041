//! Page stream producers.
//!
//! A [`CrawlEngine`] walks outward from a seed URL and pushes every fetched
//! page onto a shared bounded channel. The channel is the pipeline's only
//! buffer, so a full queue suspends the crawl until workers catch up.

pub mod config;
pub mod http;
pub mod links;
pub mod url_validator;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

pub use self::config::{CrawlerConfig, RateLimit};
pub use self::http::HttpCrawler;

/// A fetched page. Consumed once by a worker and then dropped.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub status: u16,
    pub body: Vec<u8>,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait CrawlEngine: Send + Sync {
    /// Crawls outward from `seed`, sending each fetched page to `pages`.
    ///
    /// Returns once the crawl for this seed is exhausted, the receiver is
    /// gone, or the engine has been closed. Fetch failures are logged and
    /// skipped; only setup problems surface as errors.
    async fn crawl(&self, seed: Url, pages: mpsc::Sender<Page>) -> Result<()>;

    /// Stops all crawls. Pending sends are abandoned and no new fetches start.
    fn close(&self);
}
