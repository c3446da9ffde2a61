//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Search listing URL to crawl (site-specific query parameters included)
    #[serde(default = "defaults::query_url")]
    pub query_url: String,

    /// HTTP session and fan-out settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// CSS selectors used to read listing and job pages
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Log sink and level
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.query_url)?;
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.session_attempts == 0 {
            return Err(AppError::validation(
                "crawler.session_attempts must be > 0",
            ));
        }
        for (name, selector) in self.extractor.named_selectors() {
            if selector.trim().is_empty() {
                return Err(AppError::validation(format!("extractor.{name} is empty")));
            }
        }
        if self.logging.name.trim().is_empty() {
            return Err(AppError::validation("logging.name is empty"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query_url: defaults::query_url(),
            crawler: CrawlerConfig::default(),
            extractor: ExtractorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP session and fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request deadline in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Worker pool size for each fan-out stage
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Retries for connection-phase failures
    #[serde(default = "defaults::connect_retries")]
    pub connect_retries: u32,

    /// Base delay of the exponential backoff, in milliseconds
    #[serde(default = "defaults::backoff_factor")]
    pub backoff_factor_ms: u64,

    /// Attempts at building the HTTP session before the run is aborted
    #[serde(default = "defaults::session_attempts")]
    pub session_attempts: u32,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_factor(&self) -> Duration {
        Duration::from_millis(self.backoff_factor_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            connect_retries: defaults::connect_retries(),
            backoff_factor_ms: defaults::backoff_factor(),
            session_attempts: defaults::session_attempts(),
        }
    }
}

/// CSS selectors for the listing and job detail pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Pager controls; the last numeric one holds the page count
    #[serde(default = "defaults::page_link_selector")]
    pub page_link_selector: String,

    /// One element per job on a listing page
    #[serde(default = "defaults::job_item_selector")]
    pub job_item_selector: String,

    /// Link to the job detail page, relative to a job item
    #[serde(default = "defaults::job_link_selector")]
    pub job_link_selector: String,

    /// HTML attribute holding the job link
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,

    /// One element per requirement line on a job page
    #[serde(default = "defaults::requirement_selector")]
    pub requirement_selector: String,
}

impl ExtractorConfig {
    fn named_selectors(&self) -> [(&'static str, &str); 5] {
        [
            ("page_link_selector", self.page_link_selector.as_str()),
            ("job_item_selector", self.job_item_selector.as_str()),
            ("job_link_selector", self.job_link_selector.as_str()),
            ("link_attr", self.link_attr.as_str()),
            ("requirement_selector", self.requirement_selector.as_str()),
        ]
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            page_link_selector: defaults::page_link_selector(),
            job_item_selector: defaults::job_item_selector(),
            job_link_selector: defaults::job_link_selector(),
            link_attr: defaults::link_attr(),
            requirement_selector: defaults::requirement_selector(),
        }
    }
}

/// Log sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter, overridden by `RUST_LOG`
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Write to a file under `dir` instead of the console
    #[serde(default)]
    pub file: bool,

    /// Directory for log files
    #[serde(default = "defaults::log_dir")]
    pub dir: String,

    /// Log file name prefix
    #[serde(default = "defaults::log_name")]
    pub name: String,

    /// One file per day
    #[serde(default = "defaults::single_date")]
    pub single_date: bool,

    /// Reuse a single undated file
    #[serde(default)]
    pub rotate: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            file: false,
            dir: defaults::log_dir(),
            name: defaults::log_name(),
            single_date: defaults::single_date(),
            rotate: false,
        }
    }
}

mod defaults {
    pub fn query_url() -> String {
        "https://djinni.co/jobs/?primary_keyword=Python".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; requirements-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        8
    }
    pub fn connect_retries() -> u32 {
        3
    }
    pub fn backoff_factor() -> u64 {
        500
    }
    pub fn session_attempts() -> u32 {
        10
    }

    // Extractor defaults
    pub fn page_link_selector() -> String {
        ".page-link".into()
    }
    pub fn job_item_selector() -> String {
        ".list-jobs__item".into()
    }
    pub fn job_link_selector() -> String {
        ".profile".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }
    pub fn requirement_selector() -> String {
        "ul:nth-child(1) > li > div > span".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn log_dir() -> String {
        "logs".into()
    }
    pub fn log_name() -> String {
        "requirements-crawler".into()
    }
    pub fn single_date() -> bool {
        true
    }
}
