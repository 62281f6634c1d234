//! Bounded image download pool
//!
//! One pool is shared by every category of a run. Each category submits its
//! downloads into an `ImageBatch` and joins that batch before the next
//! category starts, so no download outlives the category that scheduled it.

use crate::download::fetcher::{ImageFetcher, ImageOutcome};
use crate::NormalizedProduct;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Resolves the worker count: an explicit request wins, otherwise the
/// available parallelism of the machine
pub fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }

    match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(e) => {
            tracing::warn!("Could not detect available parallelism ({}), using 1 worker", e);
            1
        }
    }
}

/// Fixed-size pool of image download slots
pub struct DownloadPool {
    fetcher: Arc<ImageFetcher>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl DownloadPool {
    /// Creates a pool running at most `workers` downloads at once
    pub fn new(fetcher: ImageFetcher, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            fetcher: Arc::new(fetcher),
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Number of concurrent download slots
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Starts a new batch of downloads scoped to one category
    pub fn batch(&self) -> ImageBatch {
        ImageBatch {
            fetcher: Arc::clone(&self.fetcher),
            permits: Arc::clone(&self.permits),
            tasks: JoinSet::new(),
        }
    }
}

/// Counts of image outcomes for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub downloaded: usize,
    pub already_present: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &ImageOutcome) {
        match outcome {
            ImageOutcome::Downloaded { .. } => self.downloaded += 1,
            ImageOutcome::AlreadyPresent => self.already_present += 1,
            ImageOutcome::Rejected | ImageOutcome::NoUrl => self.rejected += 1,
            ImageOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Adds another batch's counts to this one
    pub fn merge(&mut self, other: &BatchSummary) {
        self.downloaded += other.downloaded;
        self.already_present += other.already_present;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

/// In-flight downloads of one category
///
/// Dropping a batch without joining it aborts its downloads.
pub struct ImageBatch {
    fetcher: Arc<ImageFetcher>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<ImageOutcome>,
}

impl ImageBatch {
    /// Schedules the image of `product`, if it has one
    ///
    /// Returns immediately; the download waits for a free pool slot.
    pub fn submit(&mut self, product: &NormalizedProduct) -> bool {
        let Some(url) = product.image_url.clone() else {
            return false;
        };

        let fetcher = Arc::clone(&self.fetcher);
        let permits = Arc::clone(&self.permits);
        let dest = product.local_image_path.clone();

        self.tasks.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(p) => p,
                Err(_) => return ImageOutcome::Failed("download pool closed".to_string()),
            };
            fetcher.fetch(Some(&url), &dest).await
        });

        true
    }

    /// Number of downloads scheduled and not yet joined
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every scheduled download to finish
    ///
    /// A task that panicked or was cancelled is logged and counted as failed.
    pub async fn join(mut self) -> BatchSummary {
        let mut summary = BatchSummary::default();

        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    tracing::error!("Image download task failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
