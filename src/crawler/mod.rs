//! Crawler module for listing page traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - The per-category pagination state machine
//! - Per-site run orchestration

mod fetcher;
mod orchestrator;
mod paginator;

pub use fetcher::{build_http_client, FetchError, PageFetcher, RetryPolicy, MAX_RETRY_DELAY};
pub use orchestrator::{site_image_dir, CrawlReport, CrawlSettings, Orchestrator, Precondition};
pub use paginator::{
    next_state, CategoryEnd, CategoryReport, CategorySpec, CrawlJob, PaginationState, Paginator,
};

use crate::config::CategoryEntry;

impl From<&CategoryEntry> for CategorySpec {
    fn from(entry: &CategoryEntry) -> Self {
        Self {
            name: entry.name.clone(),
            id: entry.id.clone(),
            url_template: entry.url_template.clone(),
        }
    }
}
