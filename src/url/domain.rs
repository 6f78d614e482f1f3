use crate::config::DomainRule;
use url::Url;

/// Extracts the host from a URL string
///
/// # Returns
///
/// * `Some(String)` - The host as the URL parser reports it (lowercase for
///   domain names)
/// * `None` - If the URL is malformed or has no host
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| h.to_string()))
}

/// Returns true if the URL's host is accepted by one of the domain rules
///
/// An exact rule must equal the host; a pattern rule must match it.
/// Malformed URLs never match.
///
/// # Examples
///
/// ```
/// use lookout::config::DomainRule;
/// use lookout::url::in_domains;
///
/// let rules = vec![DomainRule::Exact("example.com".to_string())];
/// assert!(in_domains("https://example.com/page", &rules));
/// assert!(!in_domains("https://other.com/page", &rules));
/// ```
pub fn in_domains(url: &str, domains: &[DomainRule]) -> bool {
    let Some(host) = extract_host(url) else {
        return false;
    };

    domains.iter().any(|rule| match rule {
        DomainRule::Exact(expected) => host == *expected,
        DomainRule::Pattern(re) => re.is_match(&host),
    })
}

/// Returns true if the URL's scheme (with trailing colon) is in the list
pub fn in_protocols(url: &str, protocols: &[String]) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            let protocol = format!("{}:", parsed.scheme());
            protocols.iter().any(|p| *p == protocol)
        }
        Err(_) => false,
    }
}
