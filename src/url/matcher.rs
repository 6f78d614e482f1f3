use crate::config::Policy;
use url::Url;

/// Checks if any of the given fragments occurs in the URL's pathname
///
/// When `strip_get` is false the fragments are also searched for in the
/// whole URL string, so query parameters and hosts can be matched too.
///
/// # Arguments
///
/// * `url` - The URL to test
/// * `paths` - Substrings to look for
/// * `strip_get` - Restrict matching to the pathname only
///
/// # Returns
///
/// * `true` - If any fragment matches
/// * `false` - Otherwise, or if the URL cannot be parsed
///
/// # Examples
///
/// ```
/// use lookout::url::in_pathnames;
///
/// let paths = vec!["/blog/".to_string()];
/// assert!(in_pathnames("https://example.com/blog/post", &paths, true));
/// assert!(!in_pathnames("https://example.com/?next=/blog/", &paths, true));
/// assert!(in_pathnames("https://example.com/?next=/blog/", &paths, false));
/// ```
pub fn in_pathnames(url: &str, paths: &[String], strip_get: bool) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let pathname = parsed.path();

    paths
        .iter()
        .any(|p| pathname.contains(p.as_str()) || (!strip_get && url.contains(p.as_str())))
}

/// Evaluates a URL against a policy
///
/// A URL passes when the pattern matches, the allow list is empty or one of
/// its entries matches, and no deny entry matches.
pub fn check_conditions(url: &str, policy: &Policy) -> bool {
    let allowed = policy.pathname_allow.is_empty()
        || in_pathnames(url, &policy.pathname_allow, policy.strip_get);
    let denied = !policy.pathname_deny.is_empty()
        && in_pathnames(url, &policy.pathname_deny, policy.strip_get);

    policy.matches_pattern(url) && allowed && !denied
}
