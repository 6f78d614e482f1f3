//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Frontier`: URLs to visit, visited and discarded, plus collected page data
//! - `PageRecord`: The data stored for each crawled page
//! - `CrawlPhase`: Lifecycle of the batch scheduler

mod crawl_phase;
mod frontier;
mod page_record;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use frontier::{AdmissionReport, Counter, Frontier, TIMESTAMP_FORMAT};
pub use page_record::{PageError, PageLinks, PageRecord};
