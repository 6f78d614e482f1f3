//! Configuration module for Lookout
//!
//! This module handles loading, parsing, and validating crawl configuration
//! files. TOML is the default format; files ending in `.json` are read as JSON.
//!
//! # Example
//!
//! ```no_run
//! use lookout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lookout.toml")).unwrap();
//! println!("Crawl {} starts at {}", config.id, config.start_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, Cookie, CrawlerConfig, CustomConfig, DomainRule, FilterConfig, HeadCheckConfig,
    HttpAuth, HttpConfig, OutputConfig, OutputFormat, Policy, PolicySet,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
