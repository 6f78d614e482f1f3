//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - The `Fetcher` trait the scheduler and sitemap resolver depend on
//! - Building the reqwest client from the `[http]` config section
//! - Optional HEAD requests to check Content-Type before a GET
//!
//! Non-2xx responses are not errors here: they resolve normally and the
//! caller records the status code. Only transport failures are errors.

use crate::config::{Config, HeadCheckConfig, HttpConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::{Client, Response};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Response of a single page request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Response headers with lowercase names
    pub headers: BTreeMap<String, String>,
    /// Page body; `None` when only a HEAD request was made
    pub body: Option<String>,
    /// Final URL after redirects
    pub final_url: String,
}

impl PageResponse {
    /// Content-Type header value, if present
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Transport-level failure of a page request
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The response head arrived but its body could not be read
    #[error("Reading the body of {url} (HTTP {status}) failed: {message}")]
    Body {
        url: String,
        status: u16,
        message: String,
    },
}

impl FetchError {
    /// Status code the server sent before the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Body { status, .. } => Some(*status),
            Self::Timeout { .. } | Self::Transport { .. } => None,
        }
    }
}

/// Something that can fetch a URL
///
/// The default implementation is [`HttpFetcher`]; tests substitute in-memory
/// fetchers.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn visit_page(&self, url: &str) -> Result<PageResponse, FetchError>;
}

/// reqwest-backed fetcher configured from the `[http]` section
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    auth: Option<(String, String)>,
    head_check: Option<HeadCheckConfig>,
}

impl HttpFetcher {
    /// Builds a fetcher from the crawl configuration
    ///
    /// # Returns
    ///
    /// * `Ok(HttpFetcher)` - Successfully built client
    /// * `Err(reqwest::Error)` - Failed to build client
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.http)?;
        let auth = config
            .http
            .auth
            .enable
            .then(|| (config.http.auth.user.clone(), config.http.auth.pass.clone()));

        Ok(Self {
            client,
            auth,
            head_check: config.head_check.clone().filter(|check| check.enabled),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Response, FetchError> {
        let request = match &self.auth {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        };
        request.send().await.map_err(|e| classify_error(e, url))
    }

    /// Runs the HEAD check for URLs it applies to
    ///
    /// Returns a body-less response when the content type is not one the
    /// crawl should download. HEAD failures fall through to the GET.
    async fn check_head(&self, url: &str) -> Option<PageResponse> {
        let check = self.head_check.as_ref().filter(|c| c.applies_to(url))?;

        let response = match self.send(self.client.head(url), url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("HEAD check failed for {}, falling back to GET: {}", url, e);
                return None;
            }
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if check.allows_mime(&content_type) {
            return None;
        }

        tracing::debug!(
            "Skipping body of {} (Content-Type '{}')",
            url,
            content_type
        );
        Some(PageResponse {
            status_code: response.status().as_u16(),
            headers: collect_headers(response.headers()),
            body: None,
            final_url: response.url().to_string(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn visit_page(&self, url: &str) -> Result<PageResponse, FetchError> {
        if let Some(response) = self.check_head(url).await {
            return Ok(response);
        }

        let response = self.send(self.client.get(url), url).await?;

        let status_code = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            status: status_code,
            message: e.to_string(),
        })?;

        Ok(PageResponse {
            status_code,
            headers,
            body: Some(body),
            final_url,
        })
    }
}

/// Builds an HTTP client with proper configuration
///
/// Applies the request timeout, custom headers, a single `Cookie` header
/// built from the configured cookies, and the certificate validation toggle.
/// Header entries that are not valid HTTP are skipped with a warning.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.custom_headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!("Ignoring invalid custom header '{}'", name),
        }
    }

    if !config.cookies.is_empty() {
        let cookie = config
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.key, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => tracing::warn!("Ignoring cookies that do not form a valid header"),
        }
    }

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_millis(config.timeout))
        .danger_accept_invalid_certs(!config.require_valid_ssl_cert)
        .gzip(true)
        .brotli(true)
        .build()
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn classify_error(error: reqwest::Error, url: &str) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
