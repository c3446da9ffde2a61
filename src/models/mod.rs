// src/models/mod.rs

//! Domain models for the crawler.

mod config;
mod page;

pub use config::{Config, CrawlerConfig, ExtractorConfig, LoggingConfig};
pub use page::{CrawlStats, FetchResult, PageTask, PipelineReport};
