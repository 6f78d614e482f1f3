use crate::config::Config;

/// Normalizes a discovered link before it is tested against the frontier
///
/// # Normalization Steps
///
/// 1. Remove the fragment (everything from the first `#`)
/// 2. If `crawler.strip-get` is set, remove the query string (everything
///    from the first `?`)
/// 3. If `crawler.links-to-lowercase` is set, lowercase the whole URL
///
/// The result is plain text: the URL is not parsed here, so malformed input
/// passes through and is rejected later by the domain and protocol filters.
/// Applying the function twice gives the same result as applying it once.
///
/// # Arguments
///
/// * `url` - The raw link text
/// * `config` - The crawl configuration
///
/// # Returns
///
/// The normalized URL string
///
/// # Examples
///
/// ```
/// use lookout::config::Config;
/// use lookout::url::normalize_url;
///
/// let mut config = Config::new("docs", "https://example.com/");
/// config.crawler.strip_get = true;
///
/// assert_eq!(
///     normalize_url("https://example.com/page?q=1#top", &config),
///     "https://example.com/page"
/// );
/// ```
pub fn normalize_url(url: &str, config: &Config) -> String {
    let mut normalized = strip_fragment(url);

    if config.crawler.strip_get {
        normalized = strip_query(normalized);
    }

    if config.crawler.links_to_lowercase {
        normalized.to_lowercase()
    } else {
        normalized.to_string()
    }
}

/// Returns the URL without its `#fragment`
pub fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

/// Returns the URL without its `?query`
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
