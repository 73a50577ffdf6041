//! Settings file, environment overrides and their typed form.
//!
//! The file holds human-readable values (`"10/s"`, `"5mb"`, `"6h"`);
//! [`AppConfig::resolve`] turns them into a validated [`Settings`].

pub mod parse;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::crawler::CrawlerConfig;
use crate::pipeline::{default_workers, CheckPolicy};

pub use parse::{parse_byte_size, parse_duration, parse_rate_limit};

/// Directory under the user's home holding config, store, logs and results
pub const BASE_DIR_NAME: &str = ".domain-spider";
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Environment overrides look like `DOMAIN_SPIDER__CRAWLER__MAX_DEPTH=3`
pub const ENV_PREFIX: &str = "DOMAIN_SPIDER";

/// Per-user base directory, `~/.domain-spider`
pub fn default_base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to determine user's home directory")?;
    Ok(home.join(BASE_DIR_NAME))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_base_dir()?.join(CONFIG_FILE_NAME))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worker count; 0 means CPU count minus one
    pub workers: usize,
    /// Availability check deadline
    pub timeout: String,
    /// TLDs to check; empty means all known TLDs
    pub allowed_tlds: Vec<String>,
    pub check_policy: CheckPolicy,
    pub crawler: CrawlerSection,
    pub store: StoreSection,
    pub log: LogSection,
    pub result: ResultSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerSection {
    pub max_depth: usize,
    pub rate_limit: String,
    pub max_body_size: String,
    pub request_timeout: String,
    pub user_agents: Vec<String>,
    pub proxies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub ttl: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub path: PathBuf,
    /// Days of log files kept
    pub max_age: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultSection {
    pub path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let base = default_base_dir().unwrap_or_else(|_| PathBuf::from(BASE_DIR_NAME));
        Self::with_base_dir(&base)
    }
}

impl Default for CrawlerSection {
    fn default() -> Self {
        Self {
            max_depth: 10,
            rate_limit: "10/s".to_string(),
            max_body_size: "5mb".to_string(),
            request_timeout: "60s".to_string(),
            user_agents: vec!["domain-spider/0.1".to_string()],
            proxies: Vec::new(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        AppConfig::default().store
    }
}

impl Default for LogSection {
    fn default() -> Self {
        AppConfig::default().log
    }
}

impl Default for ResultSection {
    fn default() -> Self {
        AppConfig::default().result
    }
}

impl AppConfig {
    /// Default configuration with every path rooted at `base`
    pub fn with_base_dir(base: &Path) -> Self {
        Self {
            workers: 0,
            timeout: "60s".to_string(),
            allowed_tlds: Vec::new(),
            check_policy: CheckPolicy::default(),
            crawler: CrawlerSection::default(),
            store: StoreSection {
                ttl: "6h".to_string(),
                path: base.join("storage"),
            },
            log: LogSection {
                path: base.join("log"),
                max_age: 7,
            },
            result: ResultSection {
                path: base.join("result"),
            },
        }
    }

    /// Loads configuration from `path`, or from the per-user file if it exists.
    ///
    /// Environment variables prefixed with `DOMAIN_SPIDER__` override file
    /// values; nested keys use `__` (`DOMAIN_SPIDER__STORE__TTL=12h`) and list
    /// values are comma-separated.
    ///
    /// # Arguments
    /// * `path` - Explicit config file; must exist when given
    ///
    /// # Returns
    /// * `Result<AppConfig>` - Merged configuration with defaults for absent fields
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => {
                let default = default_config_path()?;
                debug!("Looking for config at {}", default.display());
                File::from(default.as_path()).required(false)
            }
        };

        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("allowed_tlds")
            .with_list_parse_key("crawler.user_agents")
            .with_list_parse_key("crawler.proxies");

        Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Validates raw values and converts them into typed settings.
    pub fn resolve(&self) -> Result<Settings> {
        let timeout = parse_duration(&self.timeout).context("Invalid timeout")?;
        if timeout.is_zero() {
            bail!("timeout must be greater than zero");
        }

        let crawler = CrawlerConfig::new()
            .with_max_depth(self.crawler.max_depth)
            .with_rate_limit(
                parse_rate_limit(&self.crawler.rate_limit).context("Invalid crawler.rate_limit")?,
            )
            .with_max_body_size(
                parse_byte_size(&self.crawler.max_body_size)
                    .context("Invalid crawler.max_body_size")?,
            )
            .with_request_timeout(
                parse_duration(&self.crawler.request_timeout)
                    .context("Invalid crawler.request_timeout")?,
            )
            .with_user_agents(self.crawler.user_agents.clone())
            .with_proxies(self.crawler.proxies.clone());

        let workers = if self.workers == 0 {
            default_workers()
        } else {
            self.workers
        };

        Ok(Settings {
            workers,
            timeout,
            allowed_tlds: self.allowed_tlds.clone(),
            check_policy: self.check_policy,
            crawler,
            store_ttl: parse_duration(&self.store.ttl).context("Invalid store.ttl")?,
            store_path: self.store.path.clone(),
            log_path: self.log.path.clone(),
            log_max_age: self.log.max_age,
            result_path: self.result.path.clone(),
        })
    }
}

/// Validated, typed configuration for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub workers: usize,
    pub timeout: Duration,
    pub allowed_tlds: Vec<String>,
    pub check_policy: CheckPolicy,
    pub crawler: CrawlerConfig,
    pub store_ttl: Duration,
    pub store_path: PathBuf,
    pub log_path: PathBuf,
    pub log_max_age: u64,
    pub result_path: PathBuf,
}

/// Writes the default configuration under `base` and creates its directories.
///
/// Refuses to overwrite an existing config file; use [`update`] for that.
///
/// # Returns
/// * `Result<PathBuf>` - Path of the written config file
pub fn init(base: &Path) -> Result<PathBuf> {
    fs::create_dir_all(base)
        .with_context(|| format!("Failed to create directory: {}", base.display()))?;

    let path = base.join(CONFIG_FILE_NAME);
    if path.exists() {
        bail!(
            "{} already exists; run `update` to refresh it",
            path.display()
        );
    }

    let config = AppConfig::with_base_dir(base);
    write_config(&path, &config)?;

    for dir in [&config.store.path, &config.log.path, &config.result.path] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    info!("Initialized configuration at {}", path.display());
    Ok(path)
}

/// Rewrites an existing config file with fields added since it was written.
///
/// Only the file is read; environment overrides are not baked in.
pub fn update(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    write_config(path, &config)?;
    info!("Updated configuration at {}", path.display());
    Ok(config)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
    fs::write(path, json + "\n")
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
