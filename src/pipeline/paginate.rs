// src/pipeline/paginate.rs

use crate::models::FetchResult;
use crate::services::ContentExtractor;

/// Number of result pages announced by the first listing page.
///
/// A listing without a pager has a single page, so extraction failures and
/// a zero count both resolve to 1.
pub fn discover_page_count(extractor: &dyn ContentExtractor, first_page: &FetchResult) -> usize {
    match extractor.extract_page_count(first_page) {
        Ok(count) => {
            let count = count.max(1);
            log::info!("Count of pages: {}", count);
            count
        }
        Err(e) => {
            log::warn!("Can not get count of pages, assuming one: {}", e);
            1
        }
    }
}
