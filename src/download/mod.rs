//! Image download subsystem
//!
//! This module contains:
//! - Filename sanitizing and local image path derivation
//! - The skip-if-exists image fetcher
//! - The bounded worker pool shared by all categories of a run

mod fetcher;
pub mod filename;
mod pool;

pub use fetcher::{ImageFetcher, ImageOutcome};
pub use filename::{image_path, sanitize_filename, MAX_FILE_LENGTH};
pub use pool::{resolve_workers, BatchSummary, DownloadPool, ImageBatch};
