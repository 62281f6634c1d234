//! Pagination driver
//!
//! Drives one extractor across the pages of one category:
//!
//! ```text
//! FETCHING(n) --fetch failed after retries--------------------> ABORTED
//! FETCHING(n) --"no results" marker---------------------------> DONE
//! FETCHING(n) --no product nodes, no next control-------------> DONE
//! FETCHING(n) --no product nodes, next control (drift)--------> FETCHING(n+1)
//! FETCHING(n) --products, site has a next control but page
//!               does not show it----------------------------> DONE
//! FETCHING(n) --products------------------------------------> FETCHING(n+1)
//! ```

use crate::crawler::fetcher::{PageFetcher, RetryPolicy};
use crate::download::{BatchSummary, ImageBatch};
use crate::extract::{Extractor, ListingPage};
use crate::url::render_template;
use crate::NormalizedProduct;

/// A category to crawl: logical name plus the site URL template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySpec {
    /// Logical category name attached to records
    pub name: String,
    /// Site-specific identifier substituted for `{id}`
    pub id: Option<String>,
    /// Listing URL with a `{page}` placeholder
    pub url_template: String,
}

impl CategorySpec {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            url_template: url_template.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// URL of listing page `page`
    pub fn page_url(&self, page: u32) -> String {
        render_template(&self.url_template, self.id.as_deref(), page)
    }
}

/// Pagination state of one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Fetching(u32),
    Done,
    Aborted,
}

/// How a category's pagination ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryEnd {
    /// Clean end of results
    Done,
    /// A page fetch failed on every attempt
    Aborted,
}

/// Pagination of one category, alive for the duration of its loop
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub category: CategorySpec,
    pub page_cursor: u32,
    pub retry: RetryPolicy,
}

impl CrawlJob {
    pub fn new(category: CategorySpec, retry: RetryPolicy) -> Self {
        Self {
            category,
            page_cursor: 1,
            retry,
        }
    }
}

/// Result of crawling one category
#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: String,
    /// Pages fetched successfully
    pub pages_fetched: u32,
    pub end: CategoryEnd,
    /// Records in page order, then node order
    pub products: Vec<NormalizedProduct>,
    /// Image downloads submitted to the pool
    pub images_scheduled: usize,
    /// Outcomes of those downloads, filled in once the batch is joined
    pub images: BatchSummary,
}

/// Decides the state after a successfully fetched and parsed page
///
/// `paginated` tells whether the site renders a "next page" control at all.
pub fn next_state(page: u32, listing: &ListingPage, paginated: bool) -> PaginationState {
    if listing.no_results {
        return PaginationState::Done;
    }

    if listing.node_count == 0 {
        return if listing.has_next_page {
            PaginationState::Fetching(page + 1)
        } else {
            PaginationState::Done
        };
    }

    if paginated && !listing.has_next_page {
        return PaginationState::Done;
    }

    PaginationState::Fetching(page + 1)
}

/// Drives one extractor across successive pages of a category
pub struct Paginator<'a> {
    fetcher: &'a PageFetcher,
    extractor: &'a dyn Extractor,
    max_pages: Option<u32>,
}

impl<'a> Paginator<'a> {
    pub fn new(fetcher: &'a PageFetcher, extractor: &'a dyn Extractor) -> Self {
        Self {
            fetcher,
            extractor,
            max_pages: None,
        }
    }

    /// Caps the number of pages visited per category
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages.filter(|n| *n > 0);
        self
    }

    /// Runs the pagination loop of `job`
    ///
    /// Image downloads of every record with an image URL are submitted to
    /// `batch` as pages are parsed; the caller joins the batch.
    pub async fn run(&self, job: CrawlJob, batch: &mut ImageBatch) -> CategoryReport {
        let category = job.category.name.clone();
        let mut products = Vec::new();
        let mut pages_fetched = 0;
        let mut images_scheduled = 0;
        let mut state = PaginationState::Fetching(job.page_cursor);

        while let PaginationState::Fetching(page) = state {
            if let Some(max) = self.max_pages {
                if page >= job.page_cursor + max {
                    tracing::info!("Page limit ({}) reached for {}", max, category);
                    state = PaginationState::Done;
                    break;
                }
            }

            let url = job.category.page_url(page);
            tracing::info!("Scraping page {} for {}: {}", page, category, url);

            let body = match self.fetcher.fetch_with_retry(&url, &job.retry).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!(
                        "Failed to fetch {} page {} after {} attempts ({}). Stopping this category.",
                        category,
                        page,
                        job.retry.max_attempts,
                        e
                    );
                    state = PaginationState::Aborted;
                    break;
                }
            };
            pages_fetched += 1;

            let listing = self.extractor.parse_page(&body, &category);
            state = next_state(page, &listing, self.extractor.has_pagination_control());

            if listing.no_results {
                tracing::info!("No more results for {} on page {}", category, page);
            } else if listing.node_count == 0 {
                if listing.has_next_page {
                    tracing::warn!(
                        "No product nodes on page {} of {} but a next page exists; markup may have changed",
                        page,
                        category
                    );
                } else {
                    tracing::info!("No more products for {} on page {}", category, page);
                }
            } else {
                tracing::info!(
                    "Found {} products ({} nodes) on page {} of {}",
                    listing.products.len(),
                    listing.node_count,
                    page,
                    category
                );
            }

            for product in listing.products {
                if batch.submit(&product) {
                    images_scheduled += 1;
                }
                products.push(product);
            }

            if state == PaginationState::Done && listing.node_count > 0 && !listing.no_results {
                tracing::info!("No enabled next page control, end of results for {}", category);
            }
        }

        let end = match state {
            PaginationState::Aborted => CategoryEnd::Aborted,
            _ => CategoryEnd::Done,
        };

        CategoryReport {
            category,
            pages_fetched,
            end,
            products,
            images_scheduled,
            images: BatchSummary::default(),
        }
    }
}
