//! Page content extraction.
//!
//! Turns fetched listing and job pages into a page count, job links, or
//! requirement lines using CSS selectors from the configuration.

use scraper::{ElementRef, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ExtractorConfig, FetchResult};
use crate::utils::{normalize_whitespace, resolve_url};

/// Reads structured data out of a fetched page.
pub trait ContentExtractor: Send + Sync {
    /// Total number of result pages announced by the pager.
    fn extract_page_count(&self, page: &FetchResult) -> Result<usize>;

    /// Absolute URLs of the job postings listed on a result page.
    fn extract_job_links(&self, page: &FetchResult) -> Result<Vec<String>>;

    /// Requirement lines of a job posting, in document order.
    fn extract_requirements(&self, page: &FetchResult) -> Result<Vec<String>>;
}

/// [`ContentExtractor`] driven by configured CSS selectors.
#[derive(Debug)]
pub struct SelectorExtractor {
    page_link: Selector,
    job_item: Selector,
    job_link: Selector,
    link_attr: String,
    requirement: Selector,
}

impl SelectorExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        Ok(Self {
            page_link: Self::parse_selector(&config.page_link_selector)?,
            job_item: Self::parse_selector(&config.job_item_selector)?,
            job_link: Self::parse_selector(&config.job_link_selector)?,
            link_attr: config.link_attr.clone(),
            requirement: Self::parse_selector(&config.requirement_selector)?,
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    fn text_of(element: ElementRef<'_>) -> String {
        normalize_whitespace(&element.text().collect::<String>())
    }
}

impl ContentExtractor for SelectorExtractor {
    fn extract_page_count(&self, page: &FetchResult) -> Result<usize> {
        let document = page.document();
        let labels: Vec<String> = document
            .select(&self.page_link)
            .map(Self::text_of)
            .collect();

        if labels.is_empty() {
            return Err(AppError::extraction(&page.url, "no pagination controls"));
        }

        // The trailing control is usually a "next" arrow rather than a number.
        labels
            .iter()
            .rev()
            .find_map(|label| label.parse::<usize>().ok())
            .ok_or_else(|| AppError::extraction(&page.url, "no numeric pagination label"))
    }

    fn extract_job_links(&self, page: &FetchResult) -> Result<Vec<String>> {
        let base = Url::parse(&page.url)?;
        let document = page.document();

        document
            .select(&self.job_item)
            .map(|item| {
                item.select(&self.job_link)
                    .next()
                    .and_then(|link| link.value().attr(&self.link_attr))
                    .map(|href| resolve_url(&base, href))
                    .ok_or_else(|| {
                        AppError::extraction(
                            &page.url,
                            format!("job item without a '{}' link", self.link_attr),
                        )
                    })
            })
            .collect()
    }

    fn extract_requirements(&self, page: &FetchResult) -> Result<Vec<String>> {
        let document = page.document();
        Ok(document
            .select(&self.requirement)
            .map(Self::text_of)
            .filter(|text| !text.is_empty())
            .collect())
    }
}
