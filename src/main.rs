//! Lookout main entry point
//!
//! This is the command-line interface for the Lookout crawler.

use clap::Parser;
use lookout::config::{load_config_with_hash, Config};
use lookout::crawler::Coordinator;
use lookout::output::{print_report, CrawlReport};
use lookout::state::Frontier;
use lookout::storage::{CheckpointStore, FileCheckpointStore};
use lookout::LookoutError;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Lookout: a resumable, policy-driven batch web crawler
///
/// Lookout crawls a site in concurrent batches, filtering discovered links
/// through allow/deny policies, and checkpoints its progress so an
/// interrupted crawl picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "lookout")]
#[command(version = "1.0.0")]
#[command(about = "A resumable, policy-driven batch web crawler", long_about = None)]
struct Cli {
    /// Path to TOML (or .json) configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// JSON array of seed URLs used instead of start-url
    #[arg(value_name = "URL_LIST")]
    url_list: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl, ignoring save files
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Show the state of the latest save file and exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load and validate configuration
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            setup_logging(cli.verbose, cli.quiet, false);
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    setup_logging(cli.verbose, cli.quiet, config.crawler.verbose);
    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    let seeds = match &cli.url_list {
        Some(path) => Some(load_seed_list(path)?),
        None => None,
    };

    if cli.dry_run {
        handle_dry_run(&config, seeds.as_deref());
    } else if cli.status {
        handle_status(&config)?;
    } else {
        handle_crawl(config, seeds, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, config_verbose: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 if config_verbose => EnvFilter::new("lookout=debug,info"),
            0 => EnvFilter::new("lookout=info,warn"),
            1 => EnvFilter::new("lookout=debug,info"),
            2 => EnvFilter::new("lookout=trace,debug"),
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

/// Reads a JSON array of URLs
fn load_seed_list(path: &Path) -> Result<Vec<String>, LookoutError> {
    let seed_error = |message: String| LookoutError::SeedList {
        path: path.display().to_string(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
    let seeds: Vec<String> =
        serde_json::from_str(&content).map_err(|e| seed_error(e.to_string()))?;
    if seeds.is_empty() {
        return Err(seed_error("the list is empty".to_string()));
    }

    tracing::info!("Loaded {} seed URL(s) from {}", seeds.len(), path.display());
    Ok(seeds)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, seeds: Option<&[String]>) {
    println!("=== Lookout Dry Run: {} ===\n", config.id);

    println!("Crawler Configuration:");
    println!("  Request count: {}", config.crawler.request_count);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Save status each: {}", config.crawler.save_status_each);
    println!("  Strip GET: {}", config.crawler.strip_get);
    println!("  Links to lowercase: {}", config.crawler.links_to_lowercase);
    println!("  Dedupe protocol: {}", config.crawler.dedupe_protocol);

    println!("\nFilters:");
    println!("  Allowed domains: {}", config.filters.allowed_domains.len());
    println!(
        "  Allowed protocols: {}",
        config.filters.allowed_protocols.join(", ")
    );

    println!("\nHTTP:");
    println!("  Timeout: {}ms", config.http.timeout);
    println!("  Require valid SSL cert: {}", config.http.require_valid_ssl_cert);
    println!("  Custom headers: {}", config.http.custom_headers.len());
    println!("  Cookies: {}", config.http.cookies.len());
    println!("  Basic auth: {}", config.http.auth.enable);

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Store default data: {}", config.output.store_default_data);
    println!("  Output directory: {}", config.output.output_directory);
    println!("  Save directory: {}", config.output.save_directory);
    if config.custom.use_custom {
        println!(
            "  Custom action: {}",
            config.custom.custom_file.as_deref().unwrap_or("-")
        );
    }

    println!("\n✓ Configuration is valid");
    match seeds {
        Some(list) => {
            println!("✓ Would start crawling with {} seed URLs", list.len());
            for seed in list {
                println!("    * {}", seed);
            }
        }
        None => println!("✓ Would start crawling from {}", config.start_url),
    }
    if let Some(sitemap) = &config.sitemap_url {
        println!("✓ Would add links from sitemap {}", sitemap);
    }
}

/// Handles the --status mode: shows the state of the latest save file
fn handle_status(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileCheckpointStore::new(&config.output.save_directory, &config.id);

    let Some((path, saved)) = store.load_latest()? else {
        println!("No save file found in {}", store.dir().display());
        return Ok(());
    };

    println!("Save file: {}\n", path.display());
    let frontier = Frontier::from_snapshot(saved)?;
    print_report(&CrawlReport::from_frontier(&config.id, &frontier));

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    seeds: Option<Vec<String>>,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring save files)");
    } else {
        tracing::info!("Starting crawl (will resume if an unfinished save file exists)");
    }

    let mut coordinator = Coordinator::new(config, fresh)?;
    if let Some(seeds) = seeds {
        coordinator = coordinator.with_seeds(seeds);
    }

    // Run the crawler
    match coordinator.run().await {
        Ok(report) => {
            tracing::info!(
                "Crawl completed successfully: {} page(s) crawled, {} discarded",
                report.pages_crawled,
                report.pages_discarded
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
