//! Storage traits and error types
//!
//! This module defines the trait interface for product store backends and
//! associated error types.

use crate::storage::{RunRecord, RunStatus};
use crate::{NormalizedProduct, Platform};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for product store implementations
pub trait Storage {
    // ===== Run Management =====

    /// Records the start of a site run
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, platform: Platform, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run of a site
    fn get_latest_run(&self, platform: Platform) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with its final status and record count
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        product_count: usize,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    // ===== Products =====

    /// Inserts records, skipping any whose canonical URL is already stored
    ///
    /// # Returns
    ///
    /// The number of newly inserted rows
    fn insert_products(&mut self, run_id: i64, products: &[NormalizedProduct]) -> StorageResult<usize>;

    /// Counts stored products, optionally for one site only
    fn count_products(&self, platform: Option<Platform>) -> StorageResult<usize>;
}
