//! Site job runner
//!
//! A job is one guarded run of one site: crawl, optionally persist, deliver,
//! then report the outcome back to the coordinator.

use crate::config::Config;
use crate::coordinator::{RunCoordinator, RunOutcome};
use crate::crawler::{CategorySpec, CrawlReport, Orchestrator, Precondition};
use crate::ingest::{Delivery, IngestClient};
use crate::storage::{open_storage, RunStatus, SqliteStorage, Storage, StorageResult};
use crate::{CatalogError, ConfigError, Platform};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Everything site jobs share for the lifetime of the process
pub struct JobContext {
    config: Config,
    config_hash: String,
    storage: Option<Mutex<SqliteStorage>>,
    ingest: Option<IngestClient>,
}

impl JobContext {
    /// Opens the optional product store and ingestion client of `config`
    pub fn new(config: Config, config_hash: impl Into<String>) -> Result<Self, CatalogError> {
        let storage = if config.output.database_path.is_empty() {
            None
        } else {
            let path = Path::new(&config.output.database_path);
            tracing::info!("Opening product store: {}", path.display());
            match open_storage(path) {
                Ok(storage) => Some(Mutex::new(storage)),
                Err(e) => {
                    tracing::error!("Could not open product store {}: {}. Storing disabled.", path.display(), e);
                    None
                }
            }
        };

        let ingest = if config.ingest.url.is_empty() {
            tracing::info!("No ingestion URL configured, delivery disabled");
            None
        } else {
            let client = IngestClient::new(
                config.ingest.url.clone(),
                Duration::from_secs(config.ingest.timeout_secs),
            )?;
            tracing::info!("Delivering records to {}", client.url());
            Some(client)
        };

        Ok(Self {
            config,
            config_hash: config_hash.into(),
            storage,
            ingest,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs `f` against the product store, if one is configured
    fn with_storage<T>(
        &self,
        f: impl FnOnce(&mut SqliteStorage) -> StorageResult<T>,
    ) -> Option<StorageResult<T>> {
        let storage = self.storage.as_ref()?;
        let mut guard = storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(f(&mut guard))
    }
}

/// What one site job did
#[derive(Debug, Clone)]
pub struct SiteRunSummary {
    pub platform: Platform,
    pub outcome: RunOutcome,
    /// Absent when the run failed before crawling
    pub report: Option<CrawlReport>,
    /// Rows newly written to the product store
    pub stored: Option<usize>,
    pub delivery: Option<Delivery>,
    pub elapsed: Duration,
}

struct JobOutput {
    report: CrawlReport,
    stored: Option<usize>,
    delivery: Option<Delivery>,
}

impl RunCoordinator {
    /// Runs one site end to end under the coordinator's guard
    ///
    /// # Returns
    ///
    /// * `Some(summary)` - The run happened (successfully or not)
    /// * `None` - The site was already running or cooling down
    pub async fn run_site(&self, ctx: &JobContext, platform: Platform) -> Option<SiteRunSummary> {
        let Some(guard) = self.start(platform) else {
            tracing::warn!("{} crawl is already active, skipping", platform);
            return None;
        };

        let start = Instant::now();
        tracing::info!("Starting {} job", platform);

        let run_id = match ctx.with_storage(|s| s.create_run(platform, &ctx.config_hash)) {
            Some(Ok(id)) => Some(id),
            Some(Err(e)) => {
                tracing::error!("Could not record {} run: {}", platform, e);
                None
            }
            None => None,
        };

        let result = execute(ctx, platform, run_id).await;

        let (outcome, output) = match result {
            Ok(output) => match &output.report.precondition_failed {
                Some(reason) => (RunOutcome::Failed(precondition_message(reason)), Some(output)),
                None => (RunOutcome::Completed, Some(output)),
            },
            Err(e) => {
                tracing::error!("{} job failed: {}", platform, e);
                (RunOutcome::Failed(e.to_string()), None)
            }
        };

        if let Some(run_id) = run_id {
            let (status, error) = match &outcome {
                RunOutcome::Completed => (RunStatus::Completed, None),
                RunOutcome::Failed(reason) => (RunStatus::Failed, Some(reason.as_str())),
            };
            let count = output.as_ref().map(|o| o.report.product_count()).unwrap_or(0);
            if let Some(Err(e)) = ctx.with_storage(|s| s.finish_run(run_id, status, count, error)) {
                tracing::error!("Could not finish {} run {}: {}", platform, run_id, e);
            }
        }

        guard.finish(outcome.clone());
        tracing::info!("{} job finished: {:?}", platform, outcome);

        let (report, stored, delivery) = match output {
            Some(o) => (Some(o.report), o.stored, o.delivery),
            None => (None, None, None),
        };

        Some(SiteRunSummary {
            platform,
            outcome,
            report,
            stored,
            delivery,
            elapsed: start.elapsed(),
        })
    }
}

fn precondition_message(reason: &Precondition) -> String {
    match reason {
        Precondition::ImageDir(e) => format!("image directory unavailable: {}", e),
        Precondition::MissingHeaders => "request headers required but not loaded".to_string(),
    }
}

async fn execute(
    ctx: &JobContext,
    platform: Platform,
    run_id: Option<i64>,
) -> Result<JobOutput, CatalogError> {
    let site = ctx.config.site(platform).ok_or_else(|| {
        ConfigError::Validation(format!("{} is not configured", platform.as_key()))
    })?;

    let orchestrator = Orchestrator::from_config(&ctx.config, site)?;
    let categories: Vec<CategorySpec> = site.categories.iter().map(CategorySpec::from).collect();

    let report = orchestrator.run_with_report(&categories).await;
    if report.precondition_failed.is_some() {
        return Ok(JobOutput {
            report,
            stored: None,
            delivery: None,
        });
    }

    let products: Vec<_> = report
        .categories
        .iter()
        .flat_map(|c| c.products.iter().cloned())
        .collect();

    let stored = match run_id.and_then(|id| ctx.with_storage(|s| s.insert_products(id, &products))) {
        Some(Ok(n)) => {
            tracing::info!("Stored {} new {} products", n, platform);
            Some(n)
        }
        Some(Err(e)) => {
            tracing::error!("Could not store {} products: {}", platform, e);
            None
        }
        None => None,
    };

    let delivery = match &ctx.ingest {
        Some(client) => Some(client.send(&products).await),
        None => None,
    };

    Ok(JobOutput {
        report,
        stored,
        delivery,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryEntry, CrawlerConfig, IngestConfig, OutputConfig, SiteEntry};
    use crate::coordinator::RunState;

    fn config(image_dir: &Path, database_path: &str) -> Config {
        Config {
            crawler: CrawlerConfig::default(),
            output: OutputConfig {
                image_dir: image_dir.to_string_lossy().into_owned(),
                image_naming: Default::default(),
                database_path: database_path.to_string(),
            },
            ingest: IngestConfig::default(),
            sites: vec![SiteEntry {
                platform: Platform::SiteA,
                origin: None,
                headers_file: None,
                require_headers: true,
                user_agent: None,
                max_retries: None,
                categories: vec![CategoryEntry {
                    name: "laptops".to_string(),
                    id: None,
                    url_template: "http://127.0.0.1:9/s?page={page}".to_string(),
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_unconfigured_site_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = JobContext::new(config(dir.path(), ""), "hash").unwrap();
        let coordinator = RunCoordinator::new(Duration::ZERO);

        let summary = coordinator.run_site(&ctx, Platform::SiteB).await.unwrap();
        assert!(matches!(summary.outcome, RunOutcome::Failed(_)));
        assert!(summary.report.is_none());
        assert!(matches!(coordinator.status(Platform::SiteB), RunState::Failed(_)));
    }

    #[tokio::test]
    async fn test_missing_headers_marks_failed_and_records_run() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("products.db");
        let ctx = JobContext::new(config(dir.path(), &db.to_string_lossy()), "hash").unwrap();
        let coordinator = RunCoordinator::new(Duration::ZERO);

        let summary = coordinator.run_site(&ctx, Platform::SiteA).await.unwrap();
        assert!(matches!(summary.outcome, RunOutcome::Failed(_)));
        assert_eq!(summary.report.unwrap().precondition_failed, Some(Precondition::MissingHeaders));

        let run = ctx
            .with_storage(|s| s.get_latest_run(Platform::SiteA))
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_busy_site_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = JobContext::new(config(dir.path(), ""), "hash").unwrap();
        let coordinator = RunCoordinator::new(Duration::ZERO);

        assert!(coordinator.try_start(Platform::SiteA));
        assert!(coordinator.run_site(&ctx, Platform::SiteA).await.is_none());
    }
}
