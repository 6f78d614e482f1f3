//! Crawler coordinator - main crawl orchestration logic
//!
//! This module ties the crawl together:
//! - Resuming from the latest unfinished checkpoint, or starting fresh
//! - Seeding a fresh frontier from the seed list and the sitemap
//! - Running the batch scheduler to completion
//! - Writing the final outputs

use crate::config::Config;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::scheduler::BatchScheduler;
use crate::crawler::sitemap::SitemapResolver;
use crate::custom::{self, CustomAction};
use crate::hooks::{read_back, HookEvent, HookRegistry};
use crate::output::{self, CrawlReport};
use crate::state::Frontier;
use crate::storage::{CheckpointManager, Restore};
use crate::url::UrlTransform;
use crate::Result;
use indexmap::IndexSet;
use serde_json::json;
use std::sync::Arc;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fresh: bool,
    fetcher: Arc<dyn Fetcher>,
    hooks: HookRegistry,
    custom: Option<Arc<dyn CustomAction>>,
    transform: Option<UrlTransform>,
    seeds: Option<Vec<String>>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// The custom action named by the configuration is loaded here, and the
    /// default HTTP fetcher is built from the `[http]` section.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Whether to ignore any existing checkpoint
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(LookoutError)` - Failed to build the HTTP client
    pub fn new(config: Config, fresh: bool) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        let custom = custom::from_config(&config);

        Ok(Self {
            config: Arc::new(config),
            fresh,
            fetcher: Arc::new(fetcher),
            hooks: HookRegistry::new(),
            custom,
            transform: None,
            seeds: None,
        })
    }

    /// Replaces the fetcher used for pages and sitemaps
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Sets the event handlers
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replaces the custom action chosen from the configuration
    pub fn with_custom(mut self, custom: Option<Arc<dyn CustomAction>>) -> Self {
        self.custom = custom;
        self
    }

    /// Sets the rewrite applied to every discovered link
    pub fn with_transform(mut self, transform: UrlTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Seeds a fresh crawl with these URLs instead of `start-url`
    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// Runs the crawl to completion and writes its outputs
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Summary of the finished crawl
    /// * `Err(LookoutError)` - A checkpoint or output could not be written
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let hooks = Arc::new(self.hooks.clone());
        let checkpoints = CheckpointManager::for_config(&self.config, Arc::clone(&hooks));

        let restored = if self.fresh {
            tracing::info!("Fresh start requested, ignoring save files");
            Restore::StartFresh
        } else {
            checkpoints.restore().await?
        };

        let frontier = match restored {
            Restore::Resumed { path, frontier } => {
                tracing::info!(
                    "Resuming crawl {} started at {} from {} ({} crawled, {} to visit)",
                    self.config.id,
                    frontier.start_timestamp,
                    path.display(),
                    frontier.counter.crawled,
                    frontier.pages_to_visit.len()
                );
                if let Some(custom) = &self.custom {
                    custom.restore_data(frontier.custom_data.clone()).await;
                }
                frontier
            }
            Restore::StartFresh => self.seed_frontier(&hooks).await,
        };

        let mut scheduler = BatchScheduler::new(
            Arc::clone(&self.config),
            frontier,
            Arc::clone(&self.fetcher),
            hooks,
            checkpoints,
        )
        .with_custom(self.custom.clone())
        .with_transform(self.transform.clone());

        scheduler.run().await?;

        let handle = scheduler.frontier();
        let frontier = handle.lock().await;
        self.write_outputs(&frontier).await
    }

    /// Builds a fresh frontier and admits the sitemap URLs into it
    async fn seed_frontier(&self, hooks: &HookRegistry) -> Frontier {
        let custom_seed = match &self.custom {
            Some(custom) => Some(custom.data().await),
            None => None,
        };
        let mut frontier = Frontier::init(
            &self.config,
            Frontier::timestamp_now(),
            self.seeds.clone(),
            custom_seed,
        );

        let Some(sitemap_url) = self.config.sitemap_url.as_deref() else {
            tracing::info!("No sitemap URL provided.");
            return frontier;
        };

        tracing::info!("Sitemap URL provided: {} ... Fetching links ...", sitemap_url);
        let links = SitemapResolver::new(Arc::clone(&self.fetcher))
            .resolve(sitemap_url)
            .await;

        let mut payload = hooks
            .emit(
                HookEvent::AfterSitemapLinksExtracted,
                json!({ "sitemapUrl": sitemap_url, "links": links }),
            )
            .await;
        let links: IndexSet<String> = read_back(
            &mut payload,
            HookEvent::AfterSitemapLinksExtracted,
            "links",
            links,
        )
        .into_iter()
        .collect();

        tracing::info!("Found: {} links in sitemap", links.len());
        let report = frontier.admit_discovered(links, &self.config, self.transform.as_ref());
        tracing::info!("Queued {} sitemap link(s)", report.added);

        frontier
    }

    /// Writes the outputs of a finished crawl
    ///
    /// Order: custom output, discarded URLs, default output, report. A
    /// failing custom output is logged and does not stop the rest.
    async fn write_outputs(&self, frontier: &Frontier) -> Result<CrawlReport> {
        let config = self.config.as_ref();
        let output_path = output::prepare_output_directory(config, &frontier.start_timestamp)?;

        if let Some(custom) = &self.custom {
            if let Err(e) = custom
                .out(config, &frontier.start_timestamp, &output_path)
                .await
            {
                tracing::error!("Custom output failed: {:#}", e);
            }
        }

        output::write_discarded(config, frontier, &output_path)?;

        if config.output.store_default_data {
            output::write_default_output(config, frontier, &output_path)?;
        }

        let report = CrawlReport::from_frontier(&config.id, frontier);
        let path = output::write_report(&report, &output_path)?;
        tracing::info!("Crawl report written to {}", path.display());

        Ok(report)
    }
}

/// Runs the main crawl operation
///
/// This function orchestrates the entire crawl process:
///
/// 1. Resume the latest unfinished checkpoint or start fresh
/// 2. On a fresh start, seed the frontier and admit sitemap links
/// 3. Run batch cycles until the frontier is exhausted
/// 4. Save the terminal checkpoint
/// 5. Write custom output, discarded URLs, default output and the report
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed successfully
/// * `Err(LookoutError)` - Crawl failed with an error
///
/// # Example
///
/// ```no_run
/// use lookout::config::load_config;
/// use lookout::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("lookout.toml"))?;
/// run_crawl(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport> {
    let mut coordinator = Coordinator::new(config, false)?;
    coordinator.run().await
}
