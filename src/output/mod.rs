//! Output module for reporting crawl results
//!
//! This module handles:
//! - Recording per-site run statistics
//! - Printing the site status map
//! - Listing configured sites and their stored history

pub mod stats;

pub use stats::{print_statistics, print_statuses, RunStatistics, SiteStatistics};

use crate::config::Config;
use crate::storage::{Storage, StorageResult};

/// Prints the configured sites and categories
///
/// When a product store is given, the latest stored run and product count of
/// each site are shown as well.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `storage` - Optional product store to read history from
pub fn print_site_list(config: &Config, storage: Option<&dyn Storage>) -> StorageResult<()> {
    println!("=== Configured Sites ({}) ===\n", config.sites.len());

    for site in &config.sites {
        println!("{} ({})", site.platform.display_name(), site.platform.as_key());

        if let Some(storage) = storage {
            let stored = storage.count_products(Some(site.platform))?;
            match storage.get_latest_run(site.platform)? {
                Some(run) => println!(
                    "  Last run: #{} {} at {} ({} products), {} stored in total",
                    run.id,
                    run.status.to_db_string(),
                    run.started_at,
                    run.product_count,
                    stored
                ),
                None => println!("  No stored runs"),
            }
        }

        for category in &site.categories {
            println!("  - {}", category.name);
        }
        println!();
    }

    Ok(())
}
