//! URL policy module for Lookout
//!
//! Pure functions deciding what happens to a discovered link: normalization,
//! domain and protocol filters, pathname matching, composite policy checks and
//! the http/https twin used for protocol deduplication.

mod domain;
mod matcher;
mod normalize;

use crate::config::Config;
use std::sync::Arc;

// Re-export main functions
pub use domain::{extract_host, in_domains, in_protocols};
pub use matcher::{check_conditions, in_pathnames};
pub use normalize::{normalize_url, strip_fragment, strip_query};

/// Host-supplied rewrite applied to every normalized link before filtering
///
/// Returning `None` drops the link without recording it anywhere.
pub type UrlTransform = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Returns the http/https twin of a URL when protocol deduplication is on
///
/// Deduplication only applies when `crawler.dedupe-protocol` is set and more
/// than one protocol is allowed.
///
/// # Arguments
///
/// * `url` - A normalized URL
/// * `config` - The crawl configuration
///
/// # Returns
///
/// * `Some(String)` - The same URL with `http://` and `https://` swapped
/// * `None` - If deduplication is disabled
///
/// # Examples
///
/// ```
/// use lookout::config::Config;
/// use lookout::url::dedupe_key;
///
/// let mut config = Config::new("docs", "https://example.com/");
/// config.crawler.dedupe_protocol = true;
/// config.filters.allowed_protocols = vec!["http:".into(), "https:".into()];
///
/// assert_eq!(
///     dedupe_key("http://example.com/a", &config).as_deref(),
///     Some("https://example.com/a")
/// );
/// ```
pub fn dedupe_key(url: &str, config: &Config) -> Option<String> {
    if !config.crawler.dedupe_protocol || config.filters.allowed_protocols.len() <= 1 {
        return None;
    }

    if let Some(rest) = url.strip_prefix("http://") {
        Some(format!("https://{}", rest))
    } else if let Some(rest) = url.strip_prefix("https://") {
        Some(format!("http://{}", rest))
    } else {
        Some(url.to_string())
    }
}
