// src/pipeline/pipeline.rs

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;

use crate::error::Result;
use crate::models::{Config, CrawlStats, FetchResult, PageTask, PipelineReport};
use crate::services::{
    ContentExtractor, HttpFetcher, PageFetcher, SelectorExtractor, Session, create_client,
};

use super::fan_out::{fan_out, flatten_outcomes};
use super::paginate::discover_page_count;

type ExtractFn = fn(&dyn ContentExtractor, &FetchResult) -> Result<Vec<String>>;

/// Listing → job pages → requirements.
pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            concurrency: concurrency.max(1),
        }
    }

    /// Crawl every result page of `query_url` and every job it lists.
    ///
    /// Requirements are returned job-major: jobs in discovery order, each
    /// job's requirements in document order. Failed pages and jobs are
    /// skipped and counted in the stats.
    pub async fn run(&self, query_url: &str) -> PipelineReport {
        let mut stats = CrawlStats::started();

        log::info!("Step 1/2: Collecting job links from {}", query_url);
        let job_urls = self.collect_job_urls(query_url, &mut stats).await;
        stats.job_count = job_urls.len();
        log::info!("Found {} job links", job_urls.len());

        log::info!("Step 2/2: Collecting requirements");
        let requirements = self.collect_requirements(job_urls, &mut stats).await;

        stats.finished_at = Utc::now();
        log::info!(
            "Collected {} requirements ({} page failures, {} job failures)",
            requirements.len(),
            stats.page_failures,
            stats.job_failures
        );

        PipelineReport {
            requirements,
            stats,
        }
    }

    async fn collect_job_urls(&self, query_url: &str, stats: &mut CrawlStats) -> Vec<String> {
        let first_page = match self.fetcher.fetch(&PageTask::page(query_url, 1)).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Failed to fetch the first result page: {}", e);
                stats.page_failures += 1;
                return Vec::new();
            }
        };

        let page_count = discover_page_count(self.extractor.as_ref(), &first_page);
        stats.page_count = page_count;

        let mut job_urls = match self.extractor.extract_job_links(&first_page) {
            Ok(urls) => urls,
            Err(e) => {
                log::warn!("Can not get jobs on the first page: {}", e);
                stats.page_failures += 1;
                Vec::new()
            }
        };

        if page_count > 1 {
            let tasks = (2..=page_count)
                .map(|page| PageTask::page(query_url, page))
                .collect();
            let outcomes = self
                .dispatch(tasks, |extractor, page| extractor.extract_job_links(page))
                .await;
            let (urls, failures) = flatten_outcomes("page", outcomes);
            job_urls.extend(urls);
            stats.page_failures += failures;
        }

        job_urls
    }

    async fn collect_requirements(
        &self,
        job_urls: Vec<String>,
        stats: &mut CrawlStats,
    ) -> Vec<String> {
        let tasks = job_urls.into_iter().map(PageTask::bare).collect();
        let outcomes = self
            .dispatch(tasks, |extractor, page| extractor.extract_requirements(page))
            .await;
        let (requirements, failures) = flatten_outcomes("job", outcomes);
        stats.job_failures += failures;
        requirements
    }

    async fn dispatch(
        &self,
        tasks: Vec<PageTask>,
        extract: ExtractFn,
    ) -> Vec<Result<Vec<String>>> {
        let fetcher = Arc::clone(&self.fetcher);
        let extractor = Arc::clone(&self.extractor);
        fan_out(tasks, self.concurrency, move |task| {
            fetch_and_extract(Arc::clone(&fetcher), Arc::clone(&extractor), task, extract)
        })
        .await
    }
}

async fn fetch_and_extract(
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    task: PageTask,
    extract: ExtractFn,
) -> Result<Vec<String>> {
    let page = fetcher.fetch(&task).await?;
    extract(extractor.as_ref(), &page)
}

/// Build the shared session and run the pipeline over `config.query_url`.
///
/// Failing to build the session or the extractor aborts the run before any
/// page is fetched.
pub async fn run_pipeline(config: &Config) -> Result<PipelineReport> {
    run_pipeline_with(config, || create_client(&config.crawler)).await
}

/// [`run_pipeline`] with the HTTP client produced by `build_client`.
pub async fn run_pipeline_with<E, F>(config: &Config, build_client: F) -> Result<PipelineReport>
where
    F: FnMut() -> std::result::Result<Client, E>,
    E: fmt::Display,
{
    let session = Arc::new(Session::build_with(&config.crawler, build_client)?);
    let extractor = SelectorExtractor::new(&config.extractor)?;

    let pipeline = Pipeline::new(
        Arc::new(HttpFetcher::new(session)),
        Arc::new(extractor),
        config.crawler.max_concurrent,
    );
    Ok(pipeline.run(&config.query_url).await)
}
