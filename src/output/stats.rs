//! Run statistics
//!
//! This module aggregates the summaries of finished site jobs and prints
//! them for the CLI.

use crate::coordinator::{RunOutcome, RunState, SiteRunSummary};
use crate::download::BatchSummary;
use crate::ingest::Delivery;
use crate::Platform;
use std::time::Duration;

/// Statistics of one site run
#[derive(Debug, Clone)]
pub struct SiteStatistics {
    pub platform: Platform,
    pub outcome: RunOutcome,
    pub categories: usize,
    pub categories_aborted: usize,
    pub pages_fetched: u32,
    pub products: usize,
    pub images: BatchSummary,
    pub stored: Option<usize>,
    pub delivery: Option<Delivery>,
    pub elapsed: Duration,
}

impl From<&SiteRunSummary> for SiteStatistics {
    fn from(summary: &SiteRunSummary) -> Self {
        let report = summary.report.as_ref();
        Self {
            platform: summary.platform,
            outcome: summary.outcome.clone(),
            categories: report.map(|r| r.categories.len()).unwrap_or(0),
            categories_aborted: report.map(|r| r.aborted_categories()).unwrap_or(0),
            pages_fetched: report.map(|r| r.pages_fetched()).unwrap_or(0),
            products: report.map(|r| r.product_count()).unwrap_or(0),
            images: report.map(|r| r.images()).unwrap_or_default(),
            stored: summary.stored,
            delivery: summary.delivery.clone(),
            elapsed: summary.elapsed,
        }
    }
}

/// Statistics of every site run of one invocation
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub sites: Vec<SiteStatistics>,
}

impl RunStatistics {
    pub fn from_summaries(summaries: &[SiteRunSummary]) -> Self {
        Self {
            sites: summaries.iter().map(SiteStatistics::from).collect(),
        }
    }

    pub fn total_products(&self) -> usize {
        self.sites.iter().map(|s| s.products).sum()
    }

    pub fn total_pages(&self) -> u32 {
        self.sites.iter().map(|s| s.pages_fetched).sum()
    }

    pub fn failed_sites(&self) -> usize {
        self.sites
            .iter()
            .filter(|s| matches!(s.outcome, RunOutcome::Failed(_)))
            .count()
    }
}

fn delivery_line(delivery: &Option<Delivery>) -> String {
    match delivery {
        None => "disabled".to_string(),
        Some(Delivery::Empty) => "nothing to send".to_string(),
        Some(Delivery::Sent { items }) => format!("{} records sent", items),
        Some(Delivery::Failed(e)) => format!("failed ({})", e),
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Crawl Statistics ===\n");

    for site in &stats.sites {
        let outcome = match &site.outcome {
            RunOutcome::Completed => "completed".to_string(),
            RunOutcome::Failed(reason) => format!("failed ({})", reason),
        };

        println!("{} [{}] in {:.1}s:", site.platform, outcome, site.elapsed.as_secs_f64());
        println!(
            "  Categories: {} ({} aborted)",
            site.categories, site.categories_aborted
        );
        println!("  Pages fetched: {}", site.pages_fetched);
        println!("  Products: {}", site.products);
        println!(
            "  Images: {} downloaded, {} already present, {} rejected, {} failed",
            site.images.downloaded,
            site.images.already_present,
            site.images.rejected,
            site.images.failed
        );
        if let Some(stored) = site.stored {
            println!("  Newly stored: {}", stored);
        }
        println!("  Delivery: {}", delivery_line(&site.delivery));
        println!();
    }

    println!(
        "Total: {} products from {} pages across {} sites ({} failed)",
        stats.total_products(),
        stats.total_pages(),
        stats.sites.len(),
        stats.failed_sites()
    );
}

/// Prints the coordinator's per-site status map
pub fn print_statuses(statuses: &[(Platform, RunState)]) {
    println!("=== Site Status ===\n");
    for (platform, state) in statuses {
        println!("  {:<6} {}", platform.display_name(), state);
    }
    println!();
}
