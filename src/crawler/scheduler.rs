//! Batch scheduler driving the crawl cycles
//!
//! This module handles:
//! - Picking each cycle's batch from the frontier, capped by the page limit
//! - Running one page pipeline per batch URL concurrently
//! - Firing the per-page and per-cycle hooks
//! - Periodic and terminal checkpoints
//!
//! The frontier lives behind a single `tokio::sync::Mutex`. The lock is only
//! held for frontier mutations, never across a fetch or a hook.

use crate::config::Config;
use crate::crawler::fetcher::{FetchError, Fetcher, PageResponse};
use crate::crawler::parser::parse_page;
use crate::custom::CustomAction;
use crate::hooks::{read_back, HookEvent, HookRegistry};
use crate::state::{CrawlPhase, Frontier, PageError, PageRecord};
use crate::storage::{CheckpointManager, StorageError};
use crate::url::{check_conditions, UrlTransform};
use crate::{LookoutError, Result};
use futures::future::join_all;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of one call to [`BatchScheduler::run_cycle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A batch of this many pages was crawled
    Crawled(usize),
    /// The frontier is exhausted; the scheduler moved to `Terminating`
    Exhausted,
}

/// Runs batch cycles over a shared frontier until it is exhausted
pub struct BatchScheduler {
    config: Arc<Config>,
    frontier: Arc<Mutex<Frontier>>,
    fetcher: Arc<dyn Fetcher>,
    hooks: Arc<HookRegistry>,
    checkpoints: CheckpointManager,
    custom: Option<Arc<dyn CustomAction>>,
    transform: Option<UrlTransform>,
    save_due: AtomicBool,
    phase: CrawlPhase,
    cycles: u64,
}

impl BatchScheduler {
    /// Creates a scheduler in the `Running` phase
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `frontier` - Fresh or restored crawl state
    /// * `fetcher` - Used for every page request
    /// * `hooks` - Event handlers
    /// * `checkpoints` - Where periodic and terminal checkpoints go
    pub fn new(
        config: Arc<Config>,
        frontier: Frontier,
        fetcher: Arc<dyn Fetcher>,
        hooks: Arc<HookRegistry>,
        checkpoints: CheckpointManager,
    ) -> Self {
        Self {
            config,
            frontier: Arc::new(Mutex::new(frontier)),
            fetcher,
            hooks,
            checkpoints,
            custom: None,
            transform: None,
            save_due: AtomicBool::new(false),
            phase: CrawlPhase::Running,
            cycles: 0,
        }
    }

    /// Sets the custom action called for every crawled page
    pub fn with_custom(mut self, custom: Option<Arc<dyn CustomAction>>) -> Self {
        self.custom = custom;
        self
    }

    /// Sets the rewrite applied to discovered links before filtering
    pub fn with_transform(mut self, transform: Option<UrlTransform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Number of cycles started so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Shared handle to the frontier
    pub fn frontier(&self) -> Arc<Mutex<Frontier>> {
        Arc::clone(&self.frontier)
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(LookoutError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        if self.phase != next {
            tracing::debug!("Crawl phase {} -> {}", self.phase, next);
        }
        self.phase = next;
        Ok(())
    }

    /// Runs cycles until the frontier is exhausted, then finishes the crawl
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The crawl finished and the terminal checkpoint was saved
    /// * `Err(LookoutError)` - A checkpoint could not be written
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.run_cycle().await? {
                CycleOutcome::Crawled(count) => {
                    tracing::debug!("Cycle {} crawled {} page(s)", self.cycles, count);
                }
                CycleOutcome::Exhausted => break,
            }
        }

        self.finish().await?;
        Ok(())
    }

    /// Runs a single batch cycle
    ///
    /// Fails with [`LookoutError::InvalidTransition`] unless the scheduler is
    /// still `Running`.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.transition(CrawlPhase::Running)?;
        self.cycles += 1;

        let (counter, queued) = {
            let frontier = self.frontier.lock().await;
            (frontier.counter, frontier.pages_to_visit.len())
        };
        self.hooks
            .emit(
                HookEvent::BeforeEachCrawlCycle,
                json!({ "cycle": self.cycles, "counter": counter, "pagesToVisit": queued }),
            )
            .await;

        let batch = {
            let frontier = self.frontier.lock().await;
            if frontier.is_exhausted() {
                None
            } else {
                let size = match frontier.counter.remaining() {
                    Some(remaining) => self.config.crawler.request_count.min(remaining as usize),
                    None => self.config.crawler.request_count,
                };
                Some(frontier.next_batch(size))
            }
        };

        let Some(batch) = batch else {
            self.transition(CrawlPhase::Terminating)?;
            return Ok(CycleOutcome::Exhausted);
        };

        join_all(batch.iter().map(|url| self.process_page(url))).await;

        if self.save_due.swap(false, Ordering::SeqCst) {
            self.checkpoint().await?;
        }

        Ok(CycleOutcome::Crawled(batch.len()))
    }

    /// Marks the frontier finished and writes the terminal checkpoint
    pub async fn finish(&mut self) -> Result<PathBuf> {
        if self.phase != CrawlPhase::Terminating {
            return Err(LookoutError::InvalidTransition {
                from: self.phase,
                to: CrawlPhase::Finished,
            });
        }

        self.sync_custom_data().await;
        self.frontier.lock().await.finish();
        let path = self.checkpoint().await?;

        self.transition(CrawlPhase::Finished)?;
        tracing::info!("Crawl finished after {} cycle(s)", self.cycles);
        Ok(path)
    }

    async fn sync_custom_data(&self) {
        if let Some(custom) = &self.custom {
            let data = custom.data().await;
            self.frontier.lock().await.set_custom_data(data);
        }
    }

    async fn checkpoint(&self) -> Result<PathBuf> {
        self.sync_custom_data().await;

        let (start_timestamp, snapshot) = {
            let frontier = self.frontier.lock().await;
            let snapshot = frontier.to_snapshot().map_err(StorageError::from)?;
            (frontier.start_timestamp.clone(), snapshot)
        };

        Ok(self
            .checkpoints
            .save_snapshot(&start_timestamp, snapshot)
            .await?)
    }

    /// Crawls one page and folds the result into the frontier
    ///
    /// Never fails: transport errors end up in the page record.
    async fn process_page(&self, url: &str) {
        let config = self.config.as_ref();
        if config.crawler.verbose {
            tracing::debug!("About to crawl: {}", url);
        }

        self.hooks
            .emit(HookEvent::BeforeUrlCrawled, json!({ "url": url }))
            .await;

        let outcome = self.fetcher.visit_page(url).await;
        let counter = self.frontier.lock().await.counter;
        let mut record = build_page_record(&outcome, url, counter.crawled);

        if let Some(custom) = &self.custom {
            if let Err(e) = custom.action(outcome.as_ref(), url, counter, config).await {
                tracing::warn!("Custom action failed for {}: {:#}", url, e);
            }
        }

        if self.hooks.handler_count(HookEvent::AfterPageDataCreated) > 0 {
            let mut payload = self
                .hooks
                .emit(
                    HookEvent::AfterPageDataCreated,
                    json!({ "url": url, "pageData": record }),
                )
                .await;
            record = read_back(&mut payload, HookEvent::AfterPageDataCreated, "pageData", record);
        }

        let links = if check_conditions(url, &config.policy.allow_links_from) {
            let links = record.links.url.clone();
            let mut payload = self
                .hooks
                .emit(
                    HookEvent::BeforePagesToVisitUpdated,
                    json!({ "url": url, "links": links }),
                )
                .await;
            Some(read_back(
                &mut payload,
                HookEvent::BeforePagesToVisitUpdated,
                "links",
                links,
            ))
        } else {
            None
        };

        let (crawled, total, percent) = {
            let mut frontier = self.frontier.lock().await;
            frontier.record_output(url, record.clone(), config);
            if let Some(links) = links {
                frontier.admit_discovered(links, config, self.transform.as_ref());
            }
            frontier.mark_visited(url);
            let crawled = frontier.increment_crawled();
            (
                crawled,
                crawled + frontier.pages_to_visit.len() as u64,
                frontier.progress_percent(),
            )
        };

        tracing::info!("{} of {} ({}%) Crawled: {}", crawled, total, percent, url);

        self.hooks
            .emit(
                HookEvent::AfterUrlCrawled,
                json!({ "url": url, "pageData": record }),
            )
            .await;

        let every = config.crawler.save_status_each;
        if every > 0 && crawled % every as u64 == 0 {
            self.save_due.store(true, Ordering::SeqCst);
        }
    }
}

/// Builds the page record for a fetch outcome
///
/// Links and title are taken from any response that has a body, including
/// error pages.
pub fn build_page_record(
    outcome: &std::result::Result<PageResponse, FetchError>,
    url: &str,
    id: u64,
) -> PageRecord {
    match outcome {
        Ok(response) => {
            let parsed = response
                .body
                .as_deref()
                .map(|body| parse_page(body, url))
                .unwrap_or_default();
            PageRecord {
                id,
                url: url.to_string(),
                title: parsed.title,
                status: Some(response.status_code),
                links: parsed.links,
                error: PageError::from_status(response.status_code),
            }
        }
        Err(e) => PageRecord {
            status: e.status(),
            ..PageRecord::failed(id, url, e.to_string())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DomainRule, Policy};
    use crate::storage::{CheckpointStore, FileCheckpointStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// In-memory site; unknown URLs fail with a transport error
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, (u16, String)>,
        requests: AtomicUsize,
    }

    impl FakeSite {
        fn page(mut self, url: &str, links: &[&str]) -> Self {
            let anchors: String = links
                .iter()
                .map(|l| format!("<a href=\"{}\">link</a>", l))
                .collect();
            let body = format!(
                "<html><head><title>{}</title></head><body>{}</body></html>",
                url, anchors
            );
            self.pages.insert(url.to_string(), (200, body));
            self
        }

        fn status(mut self, url: &str, status: u16) -> Self {
            self.pages
                .insert(url.to_string(), (status, "<html></html>".to_string()));
            self
        }
    }

    #[async_trait]
    impl Fetcher for FakeSite {
        async fn visit_page(&self, url: &str) -> std::result::Result<PageResponse, FetchError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(url) {
                Some((status, body)) => Ok(PageResponse {
                    status_code: *status,
                    body: Some(body.clone()),
                    final_url: url.to_string(),
                    ..Default::default()
                }),
                None => Err(FetchError::Transport {
                    url: url.to_string(),
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    fn create_test_config(save_dir: &TempDir) -> Config {
        let mut config = Config::new("test", "http://localhost/");
        config.filters.allowed_domains = vec![DomainRule::Exact("localhost".to_string())];
        config.filters.allowed_protocols = vec!["http:".to_string(), "https:".to_string()];
        config.crawler.save_status_each = -1;
        config.output.save_directory = save_dir.path().to_string_lossy().to_string();
        config
    }

    fn small_site() -> FakeSite {
        FakeSite::default()
            .page(
                "http://localhost/",
                &["/a", "/b", "http://other.test/x"],
            )
            .page("http://localhost/a", &["/c", "/"])
            .page("http://localhost/b", &[])
            .page("http://localhost/c", &[])
    }

    fn numbered_site() -> FakeSite {
        let links: Vec<String> = (1..=9).map(|i| format!("/{}", i)).collect();
        let refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let mut site = FakeSite::default().page("http://localhost/", &refs);
        for i in 1..=9 {
            site = site.page(&format!("http://localhost/{}", i), &[]);
        }
        site
    }

    fn create_scheduler(config: Config, site: Arc<FakeSite>, hooks: HookRegistry) -> BatchScheduler {
        let hooks = Arc::new(hooks);
        let checkpoints = CheckpointManager::for_config(&config, Arc::clone(&hooks));
        let frontier = Frontier::init(&config, "2024-01-01_00-00-00", None, None);
        BatchScheduler::new(Arc::new(config), frontier, site, hooks, checkpoints)
    }

    #[tokio::test]
    async fn test_crawl_stays_on_allowed_domain() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir);
        let mut scheduler = create_scheduler(config, Arc::new(small_site()), HookRegistry::new());

        scheduler.run().await.unwrap();

        let frontier = scheduler.frontier();
        let frontier = frontier.lock().await;
        assert_eq!(scheduler.phase(), CrawlPhase::Finished);
        assert!(frontier.finished);
        assert_eq!(frontier.counter.crawled, 4);
        assert!(frontier.pages_to_visit.is_empty());
        assert!(frontier.visited_pages.contains("http://localhost/c"));
        assert!(!frontier.visited_pages.contains("http://other.test/x"));
        assert!(!frontier.discarded_pages.contains("http://other.test/x"));
        assert_eq!(frontier.output_data.len(), 4);
    }

    #[tokio::test]
    async fn test_dedupe_protocol_twin_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.crawler.dedupe_protocol = true;
        let site = FakeSite::default()
            .page("http://localhost/", &["/a"])
            .page("http://localhost/a", &["https://localhost/"]);
        let site = Arc::new(site);
        let mut scheduler = create_scheduler(config, Arc::clone(&site), HookRegistry::new());

        scheduler.run().await.unwrap();

        let frontier = scheduler.frontier();
        let frontier = frontier.lock().await;
        assert!(!frontier.visited_pages.contains("https://localhost/"));
        assert_eq!(frontier.counter.crawled, 2);
        assert_eq!(site.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_max_pages_is_exact() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.crawler.max_pages = 3;
        config.crawler.request_count = 2;
        let site = Arc::new(numbered_site());
        let mut scheduler = create_scheduler(config, Arc::clone(&site), HookRegistry::new());

        scheduler.run().await.unwrap();

        let frontier = scheduler.frontier();
        let frontier = frontier.lock().await;
        assert_eq!(frontier.counter.crawled, 3);
        assert_eq!(frontier.visited_pages.len(), 3);
        assert_eq!(site.requests.load(Ordering::SeqCst), 3);
        assert!(!frontier.pages_to_visit.is_empty());
    }

    #[tokio::test]
    async fn test_unlimited_crawl_drains_frontier() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.crawler.request_count = 4;
        let mut scheduler = create_scheduler(config, Arc::new(numbered_site()), HookRegistry::new());

        scheduler.run().await.unwrap();

        let frontier = scheduler.frontier();
        let frontier = frontier.lock().await;
        assert_eq!(frontier.counter.crawled, 10);
        assert!(frontier.pages_to_visit.is_empty());
        assert!(frontier
            .pages_to_visit
            .iter()
            .all(|url| !frontier.visited_pages.contains(url)));
    }

    #[tokio::test]
    async fn test_failures_are_recorded_not_retried() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir);
        let site = FakeSite::default()
            .page("http://localhost/", &["/missing", "/gone"])
            .status("http://localhost/gone", 404);
        let site = Arc::new(site);
        let mut scheduler = create_scheduler(config, Arc::clone(&site), HookRegistry::new());

        scheduler.run().await.unwrap();

        let frontier = scheduler.frontier();
        let frontier = frontier.lock().await;
        let missing = &frontier.output_data["http://localhost/missing"];
        assert_eq!(missing.status, None);
        assert!(matches!(missing.error, PageError::Message(_)));

        let gone = &frontier.output_data["http://localhost/gone"];
        assert_eq!(gone.status, Some(404));
        assert_eq!(gone.error, PageError::Status(404));

        assert_eq!(frontier.visited_pages.len(), 3);
        assert_eq!(site.requests.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_crawl_links_policy_discards() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.policy.crawl_links = Policy::new("", &[], &["/b"]).unwrap();
        let mut scheduler = create_scheduler(config, Arc::new(small_site()), HookRegistry::new());

        scheduler.run().await.unwrap();

        let frontier = scheduler.frontier();
        let frontier = frontier.lock().await;
        assert!(frontier.discarded_pages.contains("http://localhost/b"));
        assert!(!frontier.visited_pages.contains("http://localhost/b"));
        assert_eq!(frontier.counter.crawled, 3);
    }

    #[tokio::test]
    async fn test_hooks_can_replace_page_data_and_links() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir);

        let mut hooks = HookRegistry::new();
        hooks.on_fn(HookEvent::AfterPageDataCreated, |payload| async move {
            let mut page = payload["pageData"].clone();
            page["title"] = json!("rewritten");
            Ok(Some(json!({ "pageData": page })))
        });
        hooks.on_fn(HookEvent::BeforePagesToVisitUpdated, |_| async move {
            Ok(Some(json!({ "links": ["http://localhost/b"] })))
        });

        let mut scheduler = create_scheduler(config, Arc::new(small_site()), hooks);
        scheduler.run().await.unwrap();

        let frontier = scheduler.frontier();
        let frontier = frontier.lock().await;
        assert_eq!(
            frontier.visited_pages.iter().collect::<Vec<_>>(),
            vec!["http://localhost/", "http://localhost/b"]
        );
        assert_eq!(
            frontier.output_data["http://localhost/"].title.as_deref(),
            Some("rewritten")
        );
    }

    #[tokio::test]
    async fn test_periodic_and_terminal_checkpoints() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.crawler.save_status_each = 2;

        let saves = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&saves);
        let mut hooks = HookRegistry::new();
        hooks.on_fn(HookEvent::BeforeSaveStatus, move |_| {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
        });

        let mut scheduler = create_scheduler(config, Arc::new(small_site()), hooks);
        scheduler.run().await.unwrap();

        // one periodic save plus the terminal save at minimum
        assert!(saves.load(Ordering::SeqCst) >= 2);

        let store = FileCheckpointStore::new(temp_dir.path(), "test");
        let (_, saved) = store.load_latest().unwrap().unwrap();
        assert_eq!(saved["finished"], json!(true));
        assert_eq!(saved["counter"]["crawled"], json!(4));
    }

    #[tokio::test]
    async fn test_periodic_checkpoint_failure_stops_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "occupied").unwrap();

        let mut config = create_test_config(&temp_dir);
        config.output.save_directory = blocker.to_string_lossy().to_string();
        config.crawler.save_status_each = 1;
        let site = Arc::new(small_site());
        let mut scheduler = create_scheduler(config, Arc::clone(&site), HookRegistry::new());

        let result = scheduler.run().await;

        assert!(matches!(result, Err(LookoutError::Storage(_))));
        assert_eq!(scheduler.phase(), CrawlPhase::Running);
        // the first cycle's save failed, so no further batch was fetched
        assert_eq!(site.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_terminal_checkpoint_failure_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "occupied").unwrap();

        let mut config = create_test_config(&temp_dir);
        config.output.save_directory = blocker.to_string_lossy().to_string();
        let mut scheduler = create_scheduler(config, Arc::new(small_site()), HookRegistry::new());

        let result = scheduler.run().await;

        assert!(matches!(result, Err(LookoutError::Storage(_))));
        assert_ne!(scheduler.phase(), CrawlPhase::Finished);
    }

    #[tokio::test]
    async fn test_cycle_after_finish_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_test_config(&temp_dir);
        let mut scheduler = create_scheduler(config, Arc::new(small_site()), HookRegistry::new());

        scheduler.run().await.unwrap();

        assert!(matches!(
            scheduler.run_cycle().await,
            Err(LookoutError::InvalidTransition {
                from: CrawlPhase::Finished,
                to: CrawlPhase::Running
            })
        ));
    }

    #[tokio::test]
    async fn test_batch_keeps_insertion_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = create_test_config(&temp_dir);
        config.crawler.request_count = 2;
        let mut scheduler = create_scheduler(config, Arc::new(numbered_site()), HookRegistry::new());

        assert_eq!(scheduler.run_cycle().await.unwrap(), CycleOutcome::Crawled(1));
        assert_eq!(scheduler.run_cycle().await.unwrap(), CycleOutcome::Crawled(2));

        let frontier = scheduler.frontier();
        let frontier = frontier.lock().await;
        assert!(frontier.visited_pages.contains("http://localhost/1"));
        assert!(frontier.visited_pages.contains("http://localhost/2"));
        assert_eq!(
            frontier.next_batch(2),
            vec!["http://localhost/3", "http://localhost/4"]
        );
    }

    #[test]
    fn test_build_page_record_from_error() {
        let outcome = Err(FetchError::Timeout {
            url: "http://localhost/".to_string(),
        });
        let record = build_page_record(&outcome, "http://localhost/", 7);
        assert_eq!(record.id, 7);
        assert_eq!(
            record.error,
            PageError::Message("Request to http://localhost/ timed out".to_string())
        );
        assert_eq!(record.status, None);
    }

    #[test]
    fn test_build_page_record_keeps_status_of_unreadable_body() {
        let outcome = Err(FetchError::Body {
            url: "http://localhost/big".to_string(),
            status: 200,
            message: "connection reset".to_string(),
        });
        let record = build_page_record(&outcome, "http://localhost/big", 3);
        assert_eq!(record.status, Some(200));
        assert_eq!(
            record.error,
            PageError::Message(
                "Reading the body of http://localhost/big (HTTP 200) failed: connection reset"
                    .to_string()
            )
        );
        assert!(record.links.url.is_empty());
    }
}
