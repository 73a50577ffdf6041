use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use rand::seq::SliceRandom;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::links::extract_links;
use super::{CrawlEngine, CrawlerConfig, Page};

type DefaultRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Same-origin breadth-first crawler over reqwest.
///
/// All seeds share one rate limiter, so the configured budget caps the
/// whole engine rather than each seed.
pub struct HttpCrawler {
    config: CrawlerConfig,
    // One client per proxy, or a single direct client
    clients: Vec<Client>,
    limiter: Arc<DefaultRateLimiter>,
    cancel: CancellationToken,
}

impl HttpCrawler {
    /// Builds the HTTP clients and rate limiter for `config`
    ///
    /// # Arguments
    /// * `config` - Crawl depth, rate, timeouts and rotation pools
    ///
    /// # Returns
    /// * `Result<Self>` - The crawler, or an error if a client or proxy is invalid
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let clients = if config.proxies.is_empty() {
            vec![build_client(&config, None)?]
        } else {
            config
                .proxies
                .iter()
                .map(|proxy| build_client(&config, Some(proxy)))
                .collect::<Result<Vec<_>>>()?
        };

        let quota = Quota::with_period(config.rate_limit.period())
            .context("Rate limit period must be non-zero")?
            .allow_burst(config.rate_limit.requests);

        debug!(
            "HTTP crawler ready: max_depth={}, rate={}/{:?}, body_cap={} bytes, clients={}",
            config.max_depth,
            config.rate_limit.requests,
            config.rate_limit.per,
            config.max_body_size,
            clients.len()
        );

        Ok(Self {
            config,
            clients,
            limiter: Arc::new(RateLimiter::direct(quota)),
            cancel: CancellationToken::new(),
        })
    }

    /// Ties the crawler to an externally owned token, so cancelling it closes the crawler
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    fn pick_client(&self) -> Option<&Client> {
        self.clients.choose(&mut rand::thread_rng())
    }

    fn pick_user_agent(&self) -> Option<&str> {
        self.config
            .user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    /// Fetches one page, keeping at most `max_body_size` bytes of its body
    pub async fn fetch(&self, url: &Url) -> Result<Page> {
        let client = self.pick_client().context("No HTTP client configured")?;
        let mut request = client.get(url.clone());
        if let Some(agent) = self.pick_user_agent() {
            request = request.header(USER_AGENT, agent);
        }

        let mut resp = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;
        let status = resp.status().as_u16();
        let final_url = resp.url().clone();
        trace!("Response headers for {}: {:?}", url, resp.headers());

        let cap = self.config.max_body_size;
        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?
        {
            let remaining = cap.saturating_sub(body.len() as u64) as usize;
            if chunk.len() > remaining {
                body.extend_from_slice(&chunk[..remaining]);
                debug!("Body of {} truncated at {} bytes", url, cap);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Page {
            url: final_url,
            status,
            body,
        })
    }
}

fn build_client(config: &CrawlerConfig, proxy: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connection_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host);

    if let Some(proxy) = proxy {
        let proxy = Proxy::all(proxy).with_context(|| format!("Invalid proxy: {}", proxy))?;
        builder = builder.proxy(proxy);
    }

    builder.build().context("Failed to build HTTP client")
}

#[async_trait]
impl CrawlEngine for HttpCrawler {
    async fn crawl(&self, seed: Url, pages: mpsc::Sender<Page>) -> Result<()> {
        info!("Starting crawl from {}", seed);
        let origin = seed.origin();
        let mut queue = VecDeque::from([(seed.clone(), 1usize)]);
        let mut visited = HashSet::from([seed.to_string()]);
        let mut fetched = 0usize;

        while let Some((url, depth)) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.limiter.until_ready() => {}
            }

            debug!("Fetching {} (depth {})", url, depth);
            let page = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.fetch(&url) => match result {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("Fetch failed for {}: {:#}", url, e);
                        continue;
                    }
                },
            };

            if page.is_success() && self.config.within_depth(depth + 1) {
                for link in extract_links(&page.url, &page.body, &self.config) {
                    if link.origin() == origin && visited.insert(link.to_string()) {
                        queue.push_back((link, depth + 1));
                    }
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                sent = pages.send(page) => {
                    if sent.is_err() {
                        debug!("Page receiver dropped, stopping crawl of {}", seed);
                        break;
                    }
                }
            }
            fetched += 1;
        }

        info!("Finished crawl from {}: {} pages fetched", seed, fetched);
        Ok(())
    }

    fn close(&self) {
        if !self.cancel.is_cancelled() {
            info!("Closing HTTP crawler");
            self.cancel.cancel();
        }
    }
}
