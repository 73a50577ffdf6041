use anyhow::{bail, Result};
use std::num::NonZeroU32;
use std::time::Duration;

const MAX_DEPTH: usize = 10;
const MAX_URL_LENGTH: usize = 2048;
const REQUEST_TIMEOUT: u64 = 60; // seconds
const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024;
const DEFAULT_USER_AGENT: &str = "domain-spider/0.1";

/// Request budget: `requests` fetches per `per`, bursting up to `requests`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: NonZeroU32,
    pub per: Duration,
}

impl RateLimit {
    pub fn new(requests: u32, per: Duration) -> Result<Self> {
        let Some(requests) = NonZeroU32::new(requests) else {
            bail!("Rate limit must allow at least one request");
        };
        if per.is_zero() {
            bail!("Rate limit interval must be non-zero");
        }
        Ok(Self { requests, per })
    }

    pub fn per_second(requests: NonZeroU32) -> Self {
        Self {
            requests,
            per: Duration::from_secs(1),
        }
    }

    /// Time between two requests once the burst is spent
    pub fn period(&self) -> Duration {
        self.per / self.requests.get()
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_second(NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN))
    }
}

/// Configuration for crawler behavior
///
/// Covers crawl depth, URL constraints, HTTP client timeouts, request
/// rate and the user-agent/proxy rotation pools.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    // Crawl shape
    pub max_depth: usize,
    pub max_url_length: usize,
    pub allowed_schemes: Vec<String>,

    // Rate limiting and timing
    pub rate_limit: RateLimit,
    pub request_timeout: Duration,

    // HTTP client configuration
    pub max_body_size: u64,
    pub user_agents: Vec<String>,
    pub proxies: Vec<String>,
    pub connection_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl CrawlerConfig {
    /// Creates a new crawler configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum link depth, counting the seed as depth 1. Zero means unlimited.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_url_length(mut self, max_url_length: usize) -> Self {
        self.max_url_length = max_url_length;
        self
    }

    pub fn with_allowed_schemes(mut self, schemes: Vec<String>) -> Self {
        self.allowed_schemes = schemes;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the number of body bytes kept per page; the rest is discarded
    pub fn with_max_body_size(mut self, bytes: u64) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Sets the user agents picked at random per request. An empty list keeps the default.
    pub fn with_user_agents(mut self, user_agents: Vec<String>) -> Self {
        if !user_agents.is_empty() {
            self.user_agents = user_agents;
        }
        self
    }

    /// Sets the proxies picked at random per request
    pub fn with_proxies(mut self, proxies: Vec<String>) -> Self {
        self.proxies = proxies;
        self
    }

    /// Whether a link at `depth` may still be fetched
    pub fn within_depth(&self, depth: usize) -> bool {
        self.max_depth == 0 || depth <= self.max_depth
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_url_length: MAX_URL_LENGTH,
            allowed_schemes: vec!["http".to_string(), "https".to_string()],

            rate_limit: RateLimit::default(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT),

            max_body_size: MAX_BODY_SIZE,
            user_agents: vec![DEFAULT_USER_AGENT.to_string()],
            proxies: Vec::new(),
            connection_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CrawlerConfig::new()
            .with_max_depth(3)
            .with_max_url_length(1000)
            .with_request_timeout(Duration::from_secs(10))
            .with_rate_limit(RateLimit::new(2, Duration::from_secs(1)).unwrap())
            .with_allowed_schemes(vec!["https".to_string()])
            .with_user_agents(vec!["Test/1.0".to_string()])
            .with_max_body_size(1024);

        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_url_length, 1000);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.rate_limit.period(), Duration::from_millis(500));
        assert_eq!(config.allowed_schemes, vec!["https".to_string()]);
        assert_eq!(config.user_agents, vec!["Test/1.0".to_string()]);
        assert_eq!(config.max_body_size, 1024);
    }

    #[test]
    fn test_empty_user_agents_keep_default() {
        let config = CrawlerConfig::new().with_user_agents(Vec::new());
        assert_eq!(config.user_agents, vec![DEFAULT_USER_AGENT.to_string()]);
    }

    #[test]
    fn test_depth_limit() {
        let config = CrawlerConfig::new().with_max_depth(2);
        assert!(config.within_depth(1));
        assert!(config.within_depth(2));
        assert!(!config.within_depth(3));

        let unlimited = CrawlerConfig::new().with_max_depth(0);
        assert!(unlimited.within_depth(10_000));
    }

    #[test]
    fn test_client_pool_defaults() {
        let config = CrawlerConfig::default();
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(90));
        assert_eq!(config.pool_max_idle_per_host, 10);
    }

    #[test]
    fn test_rate_limit_rejects_zero() {
        assert!(RateLimit::new(0, Duration::from_secs(1)).is_err());
        assert!(RateLimit::new(1, Duration::ZERO).is_err());
        assert_eq!(RateLimit::default().requests.get(), 10);
    }
}
