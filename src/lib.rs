//! Catalog-Crawler: a multi-site product catalog crawler
//!
//! This crate crawls paginated e-commerce listing pages, extracts normalized
//! product records through per-site selector tables, downloads product images
//! on a bounded worker pool and forwards the unified records to an ingestion
//! endpoint.

pub mod config;
pub mod coordinator;
pub mod crawler;
pub mod download;
pub mod extract;
pub mod ingest;
pub mod output;
pub mod storage;
pub mod url;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Catalog-Crawler operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse headers file: {0}")]
    Headers(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Unsupported URL form: {0}")]
    Unsupported(String),
}

/// Result type alias for Catalog-Crawler operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Sentinel used for product fields that could not be extracted
pub const MISSING: &str = "N/A";

/// The catalog site a record was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    SiteA,
    SiteB,
    SiteC,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::SiteA, Platform::SiteB, Platform::SiteC];

    /// Name used in the outbound ingestion payload
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SiteA => "SiteA",
            Self::SiteB => "SiteB",
            Self::SiteC => "SiteC",
        }
    }

    /// Key used in configuration files and on the command line
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::SiteA => "site-a",
            Self::SiteB => "site-b",
            Self::SiteC => "site-c",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_key().eq_ignore_ascii_case(s) || p.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::Validation(format!("Unknown platform '{}'", s)))
    }
}

/// One product listing extracted from a listing page
///
/// Records are produced by an extractor and never mutated afterwards.
/// `title` and `source_url` are never the `N/A` sentinel; `price` may be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedProduct {
    pub title: String,
    pub price: String,
    pub source_url: String,
    pub image_url: Option<String>,
    pub local_image_path: PathBuf,
    pub platform: Platform,
    pub category: String,
}

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{RunCoordinator, RunOutcome, RunState};
pub use crawler::{CategoryEnd, CategoryReport, CategorySpec, CrawlReport, Orchestrator};
pub use download::{sanitize_filename, ImageFetcher, ImageOutcome};
pub use extract::{Extractor, ListingPage, ProfileExtractor};
