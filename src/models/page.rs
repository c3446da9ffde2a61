// src/models/page.rs

use chrono::{DateTime, Utc};
use scraper::Html;

/// A single fetch to perform: a URL and, for listing pages, a page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTask {
    pub url: String,
    pub page: Option<usize>,
}

impl PageTask {
    /// Fetch the bare URL (a job detail page).
    pub fn bare(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page: None,
        }
    }

    /// Fetch page `page` of a search query.
    pub fn page(url: impl Into<String>, page: usize) -> Self {
        Self {
            url: url.into(),
            page: Some(page),
        }
    }

    /// The URL actually requested.
    ///
    /// The page parameter is appended as-is, so the query URL is expected to
    /// already carry a query string.
    pub fn target(&self) -> String {
        match self.page {
            None => self.url.clone(),
            Some(page) => format!("{}&page={}", self.url, page),
        }
    }
}

/// Raw content of a fetched page, handed to the extractor untouched.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Requested URL, used to resolve relative links
    pub url: String,
    pub body: String,
}

impl FetchResult {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    /// Parse the body as an HTML document.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Counters and timing of one pipeline run.
#[derive(Debug, Clone)]
pub struct CrawlStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub page_count: usize,
    pub job_count: usize,
    pub page_failures: usize,
    pub job_failures: usize,
}

impl CrawlStats {
    pub fn started() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            page_count: 0,
            job_count: 0,
            page_failures: 0,
            job_failures: 0,
        }
    }

    /// Wall-clock duration in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at)
            .num_microseconds()
            .map(|n| n as f64 / 1_000_000.0)
            .unwrap_or(0.0)
    }
}

/// Outcome of a pipeline run: requirements in job-major order plus stats.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub requirements: Vec<String>,
    pub stats: CrawlStats,
}
