//! Service layer for the crawler.
//!
//! - Page fetching over a shared HTTP session (`Session`, `HttpFetcher`)
//! - Page content extraction (`ContentExtractor`, `SelectorExtractor`)

mod extractor;
mod session;

pub use extractor::{ContentExtractor, SelectorExtractor};
pub use session::{
    HttpFetcher, PageFetcher, RetryPolicy, Session, build_with_attempts, create_client,
};
