//! Site orchestrator - one crawl run of one catalog site
//!
//! The orchestrator owns everything a run of one site needs:
//! - The extractor for the site's markup dialect
//! - An HTTP client carrying the site's request headers
//! - The image download pool shared by every category of the run
//!
//! Categories are paginated sequentially. Each category's image batch is
//! joined before the next category starts.

use crate::config::{header_map, load_headers, Config, SiteEntry};
use crate::crawler::fetcher::{build_http_client, PageFetcher, RetryPolicy};
use crate::crawler::paginator::{CategoryEnd, CategoryReport, CategorySpec, CrawlJob, Paginator};
use crate::download::{resolve_workers, BatchSummary, DownloadPool, ImageFetcher};
use crate::extract::{Extractor, ProfileExtractor};
use crate::{CatalogError, NormalizedProduct, Platform};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables of one site run
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    /// Image download workers; 0 means available parallelism
    pub workers: usize,
    /// Page cap per category
    pub max_pages: Option<u32>,
    /// Directory the site's images are written to
    pub image_dir: PathBuf,
    /// Refuse to run with an empty header set
    pub require_headers: bool,
}

impl CrawlSettings {
    /// Settings for `site` derived from the global crawler config
    pub fn for_site(config: &Config, site: &SiteEntry) -> Self {
        let crawler = &config.crawler;
        Self {
            retry: RetryPolicy::new(
                site.max_retries.unwrap_or(crawler.max_retries),
                Duration::from_millis(crawler.retry_delay_ms),
                crawler.retry_multiplier,
            ),
            request_timeout: Duration::from_secs(crawler.request_timeout_secs),
            workers: crawler.max_workers,
            max_pages: Some(crawler.max_pages).filter(|n| *n > 0),
            image_dir: site_image_dir(&config.output.image_dir, site.platform),
            require_headers: site.require_headers,
        }
    }
}

/// Image directory of one site under the configured image root
pub fn site_image_dir(root: impl AsRef<Path>, platform: Platform) -> PathBuf {
    root.as_ref().join(platform.as_key())
}

/// Why a run stopped before its first request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    ImageDir(String),
    MissingHeaders,
}

/// Result of one site run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub platform: Platform,
    /// Set when the run stopped before any network activity
    pub precondition_failed: Option<Precondition>,
    /// Per-category results in configured order
    pub categories: Vec<CategoryReport>,
}

impl CrawlReport {
    fn empty(platform: Platform, reason: Precondition) -> Self {
        Self {
            platform,
            precondition_failed: Some(reason),
            categories: Vec::new(),
        }
    }

    /// Number of records across all categories
    pub fn product_count(&self) -> usize {
        self.categories.iter().map(|c| c.products.len()).sum()
    }

    /// Number of listing pages fetched across all categories
    pub fn pages_fetched(&self) -> u32 {
        self.categories.iter().map(|c| c.pages_fetched).sum()
    }

    /// Categories whose pagination was abandoned after a failed fetch
    pub fn aborted_categories(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| c.end == CategoryEnd::Aborted)
            .count()
    }

    /// Image outcomes summed over all categories
    pub fn images(&self) -> BatchSummary {
        let mut total = BatchSummary::default();
        for category in &self.categories {
            total.merge(&category.images);
        }
        total
    }

    /// Concatenates the records of every category in order
    pub fn into_products(self) -> Vec<NormalizedProduct> {
        self.categories
            .into_iter()
            .flat_map(|c| c.products)
            .collect()
    }
}

/// Runs one site's categories through pagination, extraction and image download
pub struct Orchestrator {
    extractor: Box<dyn Extractor>,
    fetcher: PageFetcher,
    images: ImageFetcher,
    headers_empty: bool,
    settings: CrawlSettings,
}

impl Orchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `extractor` - Extractor for the site's markup dialect
    /// * `headers` - Headers sent with every page and image request
    /// * `settings` - Retry, timeout, pool and directory settings
    pub fn new(
        extractor: Box<dyn Extractor>,
        headers: HeaderMap,
        settings: CrawlSettings,
    ) -> Result<Self, CatalogError> {
        let headers_empty = headers.is_empty();
        let client = build_http_client(headers, settings.request_timeout)?;

        Ok(Self {
            extractor,
            fetcher: PageFetcher::new(client.clone()),
            images: ImageFetcher::new(client, settings.request_timeout),
            headers_empty,
            settings,
        })
    }

    /// Creates the orchestrator of a configured site
    ///
    /// A headers file that cannot be loaded leaves a header-requiring site
    /// with an empty header set, so its run fails the header precondition.
    pub fn from_config(config: &Config, site: &SiteEntry) -> Result<Self, CatalogError> {
        let settings = CrawlSettings::for_site(config, site);
        let extractor = ProfileExtractor::new(
            site.platform,
            site.origin.as_deref(),
            settings.image_dir.clone(),
            config.output.image_naming,
        )?;

        let headers = site_headers(site);
        Self::new(Box::new(extractor), headers, settings)
    }

    pub fn platform(&self) -> Platform {
        self.extractor.platform()
    }

    /// Crawls `categories` and returns every record, in category order,
    /// then page order, then node order
    pub async fn run(&self, categories: &[CategorySpec]) -> Vec<NormalizedProduct> {
        self.run_with_report(categories).await.into_products()
    }

    /// Crawls `categories` and returns the per-category report
    pub async fn run_with_report(&self, categories: &[CategorySpec]) -> CrawlReport {
        let platform = self.platform();

        if let Err(e) = tokio::fs::create_dir_all(&self.settings.image_dir).await {
            tracing::error!(
                "Could not create image directory {}: {}",
                self.settings.image_dir.display(),
                e
            );
            return CrawlReport::empty(platform, Precondition::ImageDir(e.to_string()));
        }

        if self.settings.require_headers && self.headers_empty {
            tracing::error!("{} requires request headers but none are loaded. Aborting.", platform);
            return CrawlReport::empty(platform, Precondition::MissingHeaders);
        }

        let workers = resolve_workers(self.settings.workers);
        let pool = DownloadPool::new(self.images.clone(), workers);
        let paginator = Paginator::new(&self.fetcher, self.extractor.as_ref())
            .with_max_pages(self.settings.max_pages);

        tracing::info!(
            "Starting {} crawl: {} categories, {} image workers",
            platform,
            categories.len(),
            pool.workers()
        );

        let mut reports = Vec::with_capacity(categories.len());

        for category in categories {
            tracing::info!("--- Processing category: {} ---", category.name);

            let mut batch = pool.batch();
            let job = CrawlJob::new(category.clone(), self.settings.retry);
            let mut report = paginator.run(job, &mut batch).await;

            if !batch.is_empty() {
                tracing::info!("Waiting for {} image downloads of {}", batch.len(), category.name);
            }
            report.images = batch.join().await;

            tracing::info!(
                "Category {} finished ({:?}): {} products from {} pages",
                report.category,
                report.end,
                report.products.len(),
                report.pages_fetched
            );
            reports.push(report);
        }

        let report = CrawlReport {
            platform,
            precondition_failed: None,
            categories: reports,
        };
        tracing::info!("{} crawl finished with {} products", platform, report.product_count());
        report
    }
}

/// Builds the header set of a site from its headers file and User-Agent
fn site_headers(site: &SiteEntry) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Some(path) = &site.headers_file {
        match load_headers(Path::new(path)).and_then(|h| header_map(&h)) {
            Ok(map) => headers = map,
            Err(e) if site.require_headers => {
                tracing::error!("Could not load headers for {}: {}", site.platform, e);
                return HeaderMap::new();
            }
            Err(e) => tracing::warn!("Could not load headers for {}: {}", site.platform, e),
        }
    }

    if let Some(agent) = &site.user_agent {
        match HeaderValue::from_str(agent) {
            Ok(value) => {
                headers.insert(USER_AGENT, value);
            }
            Err(e) => tracing::warn!("Ignoring invalid user agent for {}: {}", site.platform, e),
        }
    }

    headers
}
