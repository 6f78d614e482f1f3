//! Sitemap flattening
//!
//! Resolves a sitemap URL into the page URLs it lists. A `<urlset>` yields its
//! `<loc>` entries in document order; a `<sitemapindex>` is followed
//! depth-first, concatenating the nested results in index order. Failures
//! never abort the crawl: a sitemap that cannot be fetched or parsed simply
//! contributes no URLs.

use crate::crawler::fetcher::Fetcher;
use futures::future::BoxFuture;
use futures::FutureExt;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;
use std::sync::Arc;

/// Nested sitemap indexes deeper than this are not followed
pub const MAX_SITEMAP_DEPTH: usize = 8;

/// Parsed content of one sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<urlset>`: page URLs
    UrlSet(Vec<String>),
    /// `<sitemapindex>`: URLs of further sitemaps
    Index(Vec<String>),
    /// Well-formed XML with some other root element
    Unknown,
}

/// Parses a sitemap or sitemap index
///
/// # Returns
///
/// * `Ok(SitemapDocument)` - The document kind and its `<loc>` values
/// * `Err(quick_xml::Error)` - The XML is malformed
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut root: Option<Vec<u8>> = None;
    // Open elements below the root, by qualified name
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut in_loc = false;
    let mut locs = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if root.is_none() {
                    root = Some(e.local_name().as_ref().to_vec());
                } else {
                    let name = e.name().as_ref().to_vec();
                    // Only `<url><loc>` / `<sitemap><loc>` directly under the root;
                    // extension elements such as `<image:loc>` never match
                    in_loc = name == b"loc"
                        && path.len() == 1
                        && entry_element(root.as_deref()) == Some(path[0].as_slice());
                    path.push(name);
                }
            }
            Event::End(_) => {
                path.pop();
                in_loc = false;
            }
            Event::Text(t) if in_loc => {
                let text = t.unescape()?.trim().to_string();
                if !text.is_empty() {
                    locs.push(text);
                }
            }
            Event::CData(c) if in_loc => {
                let text = String::from_utf8_lossy(&c.into_inner()).trim().to_string();
                if !text.is_empty() {
                    locs.push(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(match root.as_deref() {
        Some(b"urlset") => SitemapDocument::UrlSet(locs),
        Some(b"sitemapindex") => SitemapDocument::Index(locs),
        _ => SitemapDocument::Unknown,
    })
}

/// Element wrapping each `<loc>` for a given root
fn entry_element(root: Option<&[u8]>) -> Option<&'static [u8]> {
    match root {
        Some(b"urlset") => Some(&b"url"[..]),
        Some(b"sitemapindex") => Some(&b"sitemap"[..]),
        _ => None,
    }
}

/// Recursively flattens sitemaps through an injected fetcher
pub struct SitemapResolver {
    fetcher: Arc<dyn Fetcher>,
    max_depth: usize,
}

impl SitemapResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            max_depth: MAX_SITEMAP_DEPTH,
        }
    }

    /// Overrides the maximum index nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns every page URL reachable from `sitemap_url`
    ///
    /// Each sitemap is fetched at most once per call, so an index that
    /// lists itself (directly or through another index) terminates.
    pub async fn resolve(&self, sitemap_url: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.resolve_nested(sitemap_url.to_string(), 0, &mut seen)
            .await
    }

    fn resolve_nested<'a>(
        &'a self,
        url: String,
        depth: usize,
        seen: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Vec<String>> {
        async move {
            if depth > self.max_depth {
                tracing::warn!(
                    "Sitemap {} is nested deeper than {} levels, skipping",
                    url,
                    self.max_depth
                );
                return Vec::new();
            }
            if !seen.insert(url.clone()) {
                tracing::debug!("Sitemap {} already resolved, skipping", url);
                return Vec::new();
            }

            let Some(xml) = self.fetch(&url).await else {
                return Vec::new();
            };

            match parse_sitemap(&xml) {
                Ok(SitemapDocument::UrlSet(urls)) => {
                    tracing::debug!("Sitemap {} lists {} URL(s)", url, urls.len());
                    urls
                }
                Ok(SitemapDocument::Index(children)) => {
                    let mut urls = Vec::new();
                    for child in children {
                        urls.extend(self.resolve_nested(child, depth + 1, seen).await);
                    }
                    urls
                }
                Ok(SitemapDocument::Unknown) => {
                    tracing::warn!("{} is neither a urlset nor a sitemap index", url);
                    Vec::new()
                }
                Err(e) => {
                    tracing::warn!("Failed to parse sitemap {}: {}", url, e);
                    Vec::new()
                }
            }
        }
        .boxed()
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        match self.fetcher.visit_page(url).await {
            Ok(response) if response.is_success() => response.body,
            Ok(response) => {
                tracing::warn!(
                    "Sitemap {} returned HTTP {}",
                    url,
                    response.status_code
                );
                None
            }
            Err(e) => {
                tracing::warn!("Failed to fetch sitemap {}: {}", url, e);
                None
            }
        }
    }
}
