//! Catalog-Crawler main entry point
//!
//! This is the command-line interface for the Catalog-Crawler product crawler.

use anyhow::Context;
use catalog_crawler::config::{load_config_with_hash, Config};
use catalog_crawler::coordinator::{JobContext, RunCoordinator};
use catalog_crawler::output::{print_site_list, print_statistics, print_statuses, RunStatistics};
use catalog_crawler::storage::{open_storage, Storage};
use catalog_crawler::Platform;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

/// Catalog-Crawler: a multi-site product catalog crawler
///
/// Catalog-Crawler paginates the configured category listings of each
/// catalog site, extracts normalized product records, downloads their
/// images and delivers the records to an ingestion endpoint.
#[derive(Parser, Debug)]
#[command(name = "catalog-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A multi-site product catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Only crawl these sites (site-a, site-b, site-c); defaults to every configured site
    #[arg(long = "site", value_name = "PLATFORM")]
    sites: Vec<Platform>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "list")]
    dry_run: bool,

    /// List configured sites (and stored run history) and exit
    #[arg(long, conflicts_with = "dry_run")]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).with_context(|| format!("invalid configuration {}", cli.config.display()));
        }
    };

    let sites = selected_sites(&config, &cli.sites);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &sites);
    } else if cli.list {
        handle_list(&config)?;
    } else {
        handle_crawl(config, config_hash, sites).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_crawler=info,warn"),
            1 => EnvFilter::new("catalog_crawler=debug,info"),
            2 => EnvFilter::new("catalog_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Sites to run: the requested ones in request order, or every configured site
fn selected_sites(config: &Config, requested: &[Platform]) -> Vec<Platform> {
    if requested.is_empty() {
        config.sites.iter().map(|s| s.platform).collect()
    } else {
        requested.to_vec()
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, sites: &[Platform]) {
    println!("=== Catalog-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max retries: {}", config.crawler.max_retries);
    println!(
        "  Retry backoff: {}ms x attempt x {}",
        config.crawler.retry_delay_ms, config.crawler.retry_multiplier
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    match config.crawler.max_workers {
        0 => println!("  Image workers: available parallelism"),
        n => println!("  Image workers: {}", n),
    }
    match config.crawler.max_pages {
        0 => println!("  Page cap: none"),
        n => println!("  Page cap: {} per category", n),
    }

    println!("\nOutput:");
    println!("  Images: {} ({:?} naming)", config.output.image_dir, config.output.image_naming);
    if config.output.database_path.is_empty() {
        println!("  Database: disabled");
    } else {
        println!("  Database: {}", config.output.database_path);
    }

    println!("\nIngestion:");
    if config.ingest.url.is_empty() {
        println!("  Disabled");
    } else {
        println!("  {} (timeout {}s)", config.ingest.url, config.ingest.timeout_secs);
    }

    let mut categories = 0;
    println!("\nSites ({}):", sites.len());
    for platform in sites {
        let Some(site) = config.site(*platform) else {
            println!("  - {}: not configured", platform);
            continue;
        };

        let retries = site.max_retries.unwrap_or(config.crawler.max_retries);
        println!("  - {} ({} attempts per page)", platform, retries);
        if let Some(path) = &site.headers_file {
            let required = if site.require_headers { ", required" } else { "" };
            println!("    headers: {}{}", path, required);
        }
        for category in &site.categories {
            println!("    * {}: {}", category.name, category.url_template);
            categories += 1;
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} categories across {} sites", categories, sites.len());
}

/// Handles the --list mode: shows configured sites and stored history
fn handle_list(config: &Config) -> anyhow::Result<()> {
    if config.output.database_path.is_empty() {
        print_site_list(config, None)?;
        return Ok(());
    }

    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open product store {}", config.output.database_path))?;
    print_site_list(config, Some(&storage as &dyn Storage))?;
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String, sites: Vec<Platform>) -> anyhow::Result<()> {
    let coordinator = Arc::new(RunCoordinator::new(Duration::from_secs(
        config.crawler.cooldown_secs,
    )));
    let context = Arc::new(
        JobContext::new(config, config_hash).context("Failed to prepare site jobs")?,
    );

    tracing::info!("Starting crawl of {} sites", sites.len());

    let mut jobs = JoinSet::new();
    for platform in sites {
        let coordinator = Arc::clone(&coordinator);
        let context = Arc::clone(&context);
        jobs.spawn(async move {
            let summary = coordinator.run_site(&context, platform).await;
            if summary.is_none() {
                let lock = if coordinator.is_active(platform) {
                    "still locked"
                } else {
                    "released since"
                };
                tracing::warn!(
                    "Run request for {} rejected ({}), current state: {}",
                    platform,
                    lock,
                    coordinator.status(platform)
                );
            }
            summary
        });
    }

    let mut summaries = Vec::new();
    while let Some(result) = jobs.join_next().await {
        match result {
            Ok(Some(summary)) => summaries.push(summary),
            Ok(None) => {}
            Err(e) => tracing::error!("Site job panicked: {}", e),
        }
    }
    summaries.sort_by_key(|s| s.platform);

    println!();
    print_statuses(&coordinator.statuses());
    print_statistics(&RunStatistics::from_summaries(&summaries));

    Ok(())
}
