//! The crawl frontier
//!
//! Holds every URL the crawl knows about, partitioned into pages still to
//! visit, pages already visited and links discarded by the crawl-links policy,
//! together with the collected page records and counters. Admission keeps the
//! to-visit and visited sets disjoint, and a visited URL never goes back into
//! the to-visit set.

use crate::config::Config;
use crate::state::PageRecord;
use crate::url::{
    check_conditions, dedupe_key, in_domains, in_protocols, normalize_url, UrlTransform,
};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Format of `start_timestamp`, also used in checkpoint and output paths
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Page limit and progress counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    /// Maximum pages to crawl, -1 for no limit
    pub limit: i64,
    pub crawled: u64,
}

impl Counter {
    /// Returns true once the page limit is reached
    pub fn limit_reached(&self) -> bool {
        self.limit != -1 && self.crawled as i64 >= self.limit
    }

    /// Pages that may still be crawled, `None` when unlimited
    pub fn remaining(&self) -> Option<u64> {
        if self.limit == -1 {
            None
        } else {
            Some((self.limit - self.crawled as i64).max(0) as u64)
        }
    }
}

/// Outcome counts of one `admit_discovered` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionReport {
    /// Candidates offered
    pub found: usize,
    /// Candidates that passed every filter
    pub admitted: usize,
    /// Admitted candidates that were not already queued
    pub added: usize,
    /// Rejected by the crawl-links policy and recorded as discarded
    pub discarded: usize,
    /// Rejected by the transform, domain or protocol filters
    pub dropped: usize,
    /// Skipped because their http/https twin was visited
    pub deduped: usize,
    /// Skipped because they were already visited
    pub already_visited: usize,
}

/// The mutable crawl state of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontier {
    pub finished: bool,
    pub counter: Counter,
    pub start_timestamp: String,
    pub pages_to_visit: IndexSet<String>,
    pub discarded_pages: IndexSet<String>,
    pub visited_pages: IndexSet<String>,
    pub output_data: IndexMap<String, PageRecord>,
    #[serde(default)]
    pub custom_data: Vec<Value>,
}

impl Frontier {
    /// Creates a fresh frontier for a new run
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `start_timestamp` - Run identity, see [`TIMESTAMP_FORMAT`]
    /// * `seeds` - Optional seed list; `start-url` is used when absent
    /// * `custom_seed` - Initial data of the custom action, if any
    pub fn init(
        config: &Config,
        start_timestamp: impl Into<String>,
        seeds: Option<Vec<String>>,
        custom_seed: Option<Vec<Value>>,
    ) -> Self {
        let pages_to_visit = match seeds {
            Some(list) => list.into_iter().collect(),
            None => IndexSet::from([config.start_url.clone()]),
        };

        Self {
            finished: false,
            counter: Counter {
                limit: config.crawler.max_pages,
                crawled: 0,
            },
            start_timestamp: start_timestamp.into(),
            pages_to_visit,
            discarded_pages: IndexSet::new(),
            visited_pages: IndexSet::new(),
            output_data: IndexMap::new(),
            custom_data: custom_seed.unwrap_or_default(),
        }
    }

    /// Current local time formatted as a start timestamp
    pub fn timestamp_now() -> String {
        chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
    }

    /// Serializes the frontier into its checkpoint JSON shape
    pub fn to_snapshot(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Rebuilds a frontier from checkpoint JSON
    pub fn from_snapshot(value: Value) -> serde_json::Result<Self> {
        let mut frontier: Frontier = serde_json::from_value(value)?;
        // A hand-edited snapshot may list a URL in both sets
        let visited = &frontier.visited_pages;
        frontier.pages_to_visit.retain(|url| !visited.contains(url));
        Ok(frontier)
    }

    fn rejects_mutation(&self, operation: &str) -> bool {
        if self.finished {
            tracing::warn!("Ignoring {} on a finished frontier", operation);
        }
        self.finished
    }

    /// Filters discovered links and queues the ones that pass
    ///
    /// Each candidate is normalized, then tested in order: not already
    /// visited, http/https twin not visited, optional transform, allowed
    /// domain, allowed protocol and the crawl-links policy. Only a crawl-links
    /// rejection is recorded in `discarded_pages`; other rejections leave no
    /// trace in the frontier.
    ///
    /// # Returns
    ///
    /// Counts of what happened to the candidates
    pub fn admit_discovered<I, S>(
        &mut self,
        urls: I,
        config: &Config,
        transform: Option<&UrlTransform>,
    ) -> AdmissionReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = AdmissionReport::default();
        if self.rejects_mutation("admission") {
            return report;
        }

        let domains = &config.filters.allowed_domains;
        let protocols = &config.filters.allowed_protocols;

        for raw in urls {
            report.found += 1;
            let normalized = normalize_url(raw.as_ref(), config);

            let twin_visited = dedupe_key(&normalized, config)
                .map_or(false, |twin| self.visited_pages.contains(&twin));

            let url = match transform {
                Some(f) => match f(&normalized) {
                    Some(rewritten) => rewritten,
                    None => {
                        report.dropped += 1;
                        continue;
                    }
                },
                None => normalized,
            };

            if self.visited_pages.contains(&url) {
                report.already_visited += 1;
            } else if twin_visited {
                if config.crawler.verbose {
                    tracing::debug!("Deduped URL: {}", url);
                }
                report.deduped += 1;
            } else if (!domains.is_empty() && !in_domains(&url, domains))
                || (!protocols.is_empty() && !in_protocols(&url, protocols))
            {
                report.dropped += 1;
            } else if !check_conditions(&url, &config.policy.crawl_links) {
                if self.discarded_pages.insert(url) {
                    report.discarded += 1;
                }
            } else {
                report.admitted += 1;
                if self.pages_to_visit.insert(url) {
                    report.added += 1;
                }
            }
        }

        if report.discarded > 0 {
            tracing::debug!(
                "Discarded {} link(s) due to crawl-links policy",
                report.discarded
            );
        }
        tracing::debug!(
            "Links found: {} | Proper: {} | Added: {}",
            report.found,
            report.admitted,
            report.added
        );

        report
    }

    /// Returns up to `n` URLs to crawl next, in insertion order
    ///
    /// The URLs stay in `pages_to_visit` until they are marked visited.
    pub fn next_batch(&self, n: usize) -> Vec<String> {
        self.pages_to_visit.iter().take(n).cloned().collect()
    }

    /// Moves a URL from the to-visit set to the visited set
    pub fn mark_visited(&mut self, url: &str) {
        if self.rejects_mutation("mark_visited") {
            return;
        }
        self.pages_to_visit.shift_remove(url);
        self.visited_pages.insert(url.to_string());
    }

    /// Stores a page record if the save-crawl-data policy accepts the URL
    ///
    /// # Returns
    ///
    /// `true` if the record was stored
    pub fn record_output(&mut self, url: &str, record: PageRecord, config: &Config) -> bool {
        if self.rejects_mutation("record_output") {
            return false;
        }
        if !config.output.store_default_data
            || !check_conditions(url, &config.policy.save_crawl_data)
        {
            return false;
        }
        self.output_data.insert(url.to_string(), record);
        true
    }

    /// Increments the crawled counter and returns the new value
    pub fn increment_crawled(&mut self) -> u64 {
        if !self.rejects_mutation("increment_crawled") {
            self.counter.crawled += 1;
        }
        self.counter.crawled
    }

    /// Replaces the custom action data carried by checkpoints
    pub fn set_custom_data(&mut self, data: Vec<Value>) {
        if !self.rejects_mutation("set_custom_data") {
            self.custom_data = data;
        }
    }

    /// Returns true when there is nothing left to crawl or the limit is hit
    pub fn is_exhausted(&self) -> bool {
        self.pages_to_visit.is_empty() || self.counter.limit_reached()
    }

    /// Share of known pages already crawled, in percent with two decimals
    pub fn progress_percent(&self) -> f64 {
        let crawled = self.counter.crawled as f64;
        let total = crawled + self.pages_to_visit.len() as f64;
        if total == 0.0 {
            return 100.0;
        }
        (crawled / total * 10000.0).round() / 100.0
    }

    /// Marks the run finished; all later mutations are ignored
    pub fn finish(&mut self) {
        self.finished = true;
    }
}
