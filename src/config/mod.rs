//! Configuration module for Catalog-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and loading the per-site request header files.
//!
//! # Example
//!
//! ```no_run
//! use catalog_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Sites configured: {}", config.sites.len());
//! ```

mod headers;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CategoryEntry, Config, CrawlerConfig, ImageNaming, IngestConfig, OutputConfig, SiteEntry,
};

// Re-export parser functions
pub use headers::{header_map, load_headers};
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
