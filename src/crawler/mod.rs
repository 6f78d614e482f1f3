//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML parsing and link extraction
//! - Sitemap flattening
//! - Batch scheduling and overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod sitemap;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher, PageResponse};
pub use parser::{extract_image_sources, parse_page, ParsedPage};
pub use scheduler::{build_page_record, BatchScheduler, CycleOutcome};
pub use sitemap::{parse_sitemap, SitemapDocument, SitemapResolver, MAX_SITEMAP_DEPTH};

use crate::config::Config;
use crate::output::CrawlReport;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Resume an unfinished crawl or start a fresh one
/// 2. Build the HTTP client
/// 3. Crawl in batches, following allowed links
/// 4. Write checkpoints and the final outputs
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed successfully
/// * `Err(LookoutError)` - Crawl failed
pub async fn crawl(config: Config) -> Result<CrawlReport> {
    run_crawl(config).await
}
