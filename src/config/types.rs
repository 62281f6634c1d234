use crate::Platform;
use serde::Deserialize;

/// Main configuration structure for Catalog-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

impl Config {
    /// Looks up the configuration of one site
    pub fn site(&self, platform: Platform) -> Option<&SiteEntry> {
        self.sites.iter().find(|s| s.platform == platform)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Attempts per listing page before the category is abandoned
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay of the linear retry backoff (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Scales the linear backoff: delay = base * attempt * multiplier
    #[serde(default = "default_retry_multiplier")]
    pub retry_multiplier: f64,

    /// Timeout for a single page or image request (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Image download workers; 0 means available parallelism
    #[serde(default)]
    pub max_workers: usize,

    /// Page cap per category; 0 means unbounded
    #[serde(default)]
    pub max_pages: u32,

    /// How long a finished site stays locked against a new run (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_multiplier: default_retry_multiplier(),
            request_timeout_secs: default_request_timeout_secs(),
            max_workers: 0,
            max_pages: 0,
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_retry_multiplier() -> f64 {
    1.0
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_cooldown_secs() -> u64 {
    5
}

/// How local image filenames are derived from a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageNaming {
    /// Sanitized title only; distinct titles may share a file
    #[default]
    Title,
    /// Sanitized title plus a short hash of the canonical product URL
    TitleHash,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory for downloaded images (one subdirectory per site)
    pub image_dir: String,

    #[serde(default)]
    pub image_naming: ImageNaming,

    /// Optional SQLite product store; empty disables it
    #[serde(default)]
    pub database_path: String,
}

/// Downstream ingestion endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IngestConfig {
    /// Empty disables delivery
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_ingest_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_ingest_timeout_secs(),
        }
    }
}

fn default_ingest_timeout_secs() -> u64 {
    600
}

/// One catalog site and the categories to crawl on it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteEntry {
    pub platform: Platform,

    /// Overrides the origin used to resolve relative links
    #[serde(default)]
    pub origin: Option<String>,

    /// JSON file with a `headers` object
    #[serde(default)]
    pub headers_file: Option<String>,

    /// Whether the site refuses to run without a non-empty header set
    #[serde(default)]
    pub require_headers: bool,

    /// Static User-Agent sent with every request to this site
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Overrides `crawler.max-retries` for this site
    #[serde(default)]
    pub max_retries: Option<u32>,

    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryEntry>,
}

/// A caller-defined category mapped to a site URL template
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CategoryEntry {
    /// Logical category name attached to every record
    pub name: String,

    /// Site-specific category identifier, substituted for `{id}`
    #[serde(default)]
    pub id: Option<String>,

    /// Listing URL with a `{page}` placeholder
    pub url_template: String,
}
