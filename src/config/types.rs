use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Lookout
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Crawl id, used in checkpoint and output file names
    pub id: String,

    /// URL the crawl starts from when no seed list is given
    pub start_url: String,

    /// Optional sitemap (or sitemap index) used to seed the frontier
    #[serde(default)]
    pub sitemap_url: Option<String>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub policy: PolicySet,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub custom: CustomConfig,

    #[serde(default)]
    pub head_check: Option<HeadCheckConfig>,
}

impl Config {
    /// Creates a configuration with default sections for the given crawl
    pub fn new(id: impl Into<String>, start_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_url: start_url.into(),
            sitemap_url: None,
            crawler: CrawlerConfig::default(),
            filters: FilterConfig::default(),
            policy: PolicySet::default(),
            http: HttpConfig::default(),
            output: OutputConfig::default(),
            custom: CustomConfig::default(),
            head_check: None,
        }
    }
}

/// Crawl loop behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of pages fetched concurrently in one batch cycle
    pub request_count: usize,

    /// Maximum pages to crawl, -1 for no limit
    pub max_pages: i64,

    /// Checkpoint every N crawled pages, -1 to only checkpoint at the end
    pub save_status_each: i64,

    /// Strip query strings from discovered links
    pub strip_get: bool,

    /// Lowercase discovered links
    pub links_to_lowercase: bool,

    /// Treat http:// and https:// twins as the same page
    pub dedupe_protocol: bool,

    /// Log per-page admission details
    pub verbose: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_count: 5,
            max_pages: -1,
            save_status_each: 10,
            strip_get: false,
            links_to_lowercase: false,
            dedupe_protocol: false,
            verbose: false,
        }
    }
}

/// Domain and protocol filters applied to discovered links
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Hostnames (exact) or `{ regex = "..." }` entries; empty allows all
    pub allowed_domains: Vec<DomainRule>,

    /// Schemes with trailing colon, e.g. `"https:"`; empty allows all
    pub allowed_protocols: Vec<String>,
}

/// A single allowed-domain entry
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "DomainRuleDef")]
pub enum DomainRule {
    /// Hostname must equal this string
    Exact(String),
    /// Hostname must match this regular expression
    Pattern(Regex),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DomainRuleDef {
    Exact(String),
    Pattern { regex: String },
}

impl TryFrom<DomainRuleDef> for DomainRule {
    type Error = regex::Error;

    fn try_from(def: DomainRuleDef) -> Result<Self, Self::Error> {
        match def {
            DomainRuleDef::Exact(host) => Ok(Self::Exact(host)),
            DomainRuleDef::Pattern { regex } => Ok(Self::Pattern(Regex::new(&regex)?)),
        }
    }
}

/// The three URL policies a crawl applies
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolicySet {
    /// Links are only followed from pages matching this policy
    pub allow_links_from: Policy,

    /// Discovered links must match this policy to be crawled
    pub crawl_links: Policy,

    /// Pages must match this policy to be stored in the output
    pub save_crawl_data: Policy,
}

/// A `{pattern, pathname-allow, pathname-deny}` policy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "PolicyDef")]
pub struct Policy {
    /// Compiled pattern; `None` matches every URL
    pub pattern: Option<Regex>,
    pub pathname_allow: Vec<String>,
    pub pathname_deny: Vec<String>,
    /// When false, pathname entries are also matched against the whole URL
    pub strip_get: bool,
}

#[derive(Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct PolicyDef {
    pattern: Option<String>,
    pathname_allow: Vec<String>,
    pathname_deny: Vec<String>,
    strip_get: bool,
}

impl Default for PolicyDef {
    fn default() -> Self {
        Self {
            pattern: None,
            pathname_allow: Vec::new(),
            pathname_deny: Vec::new(),
            strip_get: false,
        }
    }
}

impl TryFrom<PolicyDef> for Policy {
    type Error = regex::Error;

    fn try_from(def: PolicyDef) -> Result<Self, Self::Error> {
        let pattern = def.pattern.as_deref().map(Regex::new).transpose()?;
        Ok(Self {
            pattern,
            pathname_allow: def.pathname_allow,
            pathname_deny: def.pathname_deny,
            strip_get: def.strip_get,
        })
    }
}

impl Policy {
    /// Builds a policy from a pattern string and pathname lists
    pub fn new(
        pattern: &str,
        pathname_allow: &[&str],
        pathname_deny: &[&str],
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Some(Regex::new(pattern)?),
            pathname_allow: pathname_allow.iter().map(|s| s.to_string()).collect(),
            pathname_deny: pathname_deny.iter().map(|s| s.to_string()).collect(),
            strip_get: false,
        })
    }

    /// Returns true if the pattern matches (or there is no pattern)
    pub fn matches_pattern(&self, url: &str) -> bool {
        self.pattern.as_ref().map_or(true, |re| re.is_match(url))
    }
}

/// HTTP request settings used by the default fetcher
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Per-request timeout in milliseconds
    pub timeout: u64,

    pub require_valid_ssl_cert: bool,

    pub custom_headers: BTreeMap<String, String>,

    pub cookies: Vec<Cookie>,

    pub auth: HttpAuth,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: 5000,
            require_valid_ssl_cert: true,
            custom_headers: BTreeMap::new(),
            cookies: Vec::new(),
            auth: HttpAuth::default(),
        }
    }
}

/// A cookie sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct Cookie {
    pub key: String,
    pub value: String,
}

/// HTTP basic auth credentials
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpAuth {
    pub enable: bool,
    pub user: String,
    pub pass: String,
}

/// Output format of the default page data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Console,
    Csv,
    Json,
    Blank,
}

/// Output and checkpoint locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Collect per-page records for the default output
    pub store_default_data: bool,

    /// Root directory for crawl outputs
    pub output_directory: String,

    /// Root directory for checkpoint files
    pub save_directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Console,
            store_default_data: true,
            output_directory: "./output".to_string(),
            save_directory: "./save".to_string(),
        }
    }
}

/// Custom per-page action selection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CustomConfig {
    pub use_custom: bool,

    /// Name of a built-in custom action, e.g. `"extract-images"`
    pub custom_file: Option<String>,
}

/// HEAD-before-GET content type check
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "HeadCheckDef")]
pub struct HeadCheckConfig {
    pub enabled: bool,

    /// URLs the check applies to; `None` means every URL
    pub pattern: Option<Regex>,

    /// MIME types that are fetched in full
    pub crawl_mime_types: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HeadCheckDef {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    crawl_mime_types: Vec<String>,
}

impl TryFrom<HeadCheckDef> for HeadCheckConfig {
    type Error = regex::Error;

    fn try_from(def: HeadCheckDef) -> Result<Self, Self::Error> {
        Ok(Self {
            enabled: def.enabled,
            pattern: def.pattern.as_deref().map(Regex::new).transpose()?,
            crawl_mime_types: def.crawl_mime_types,
        })
    }
}

impl HeadCheckConfig {
    /// Returns true if a HEAD request should precede the GET for this URL
    pub fn applies_to(&self, url: &str) -> bool {
        self.enabled && self.pattern.as_ref().map_or(true, |re| re.is_match(url))
    }

    /// Returns true if the content type is one that should be fetched in full
    pub fn allows_mime(&self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        self.crawl_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&mime))
    }
}
