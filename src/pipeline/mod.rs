//! Crawl pipeline.
//!
//! - `discover_page_count`: read the number of result pages from page 1
//! - `fan_out`: bounded, order-preserving concurrent task execution
//! - `Pipeline` / `run_pipeline`: listing pages → job pages → requirements

pub mod fan_out;
pub mod paginate;
#[allow(clippy::module_inception)]
pub mod pipeline;

pub use fan_out::{fan_out, flatten_outcomes};
pub use paginate::discover_page_count;
pub use pipeline::{Pipeline, run_pipeline, run_pipeline_with};
