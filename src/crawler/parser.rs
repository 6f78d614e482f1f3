//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Page links, grouped into web links, `mailto:`, `tel:` and `#anchor` links
//! - Page title
//! - Image sources, used by the image extraction custom action

use crate::state::PageLinks;
use indexmap::IndexSet;
use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Links found on the page, grouped by kind
    pub links: PageLinks,
}

/// Parses HTML content and extracts links and the page title
///
/// # Link Extraction Rules
///
/// | Selector | List |
/// |----------|------|
/// | `a[href^='/']`, `a[href^='http']` | `url` (resolved against the page URL) |
/// | `a[href^='mailto:']` | `mailto` |
/// | `a[href^='tel:']` | `tel` |
/// | `a[href^='#']` | `hash` |
///
/// Other hrefs (bare relative paths, `javascript:` and so on) are ignored.
/// Each list keeps the first occurrence of every value.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The URL the HTML was fetched from
///
/// # Example
///
/// ```
/// use lookout::crawler::parse_page;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_page(html, "https://example.com/");
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links.url, vec!["https://example.com/page"]);
/// ```
pub fn parse_page(html: &str, page_url: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let links = PageLinks {
        url: select_hrefs(&document, "a[href^='/'], a[href^='http']")
            .into_iter()
            .map(|href| resolve_link(&href, base.as_ref()))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect(),
        mailto: dedupe(select_hrefs(&document, "a[href^='mailto:']")),
        tel: dedupe(select_hrefs(&document, "a[href^='tel:']")),
        hash: dedupe(select_hrefs(&document, "a[href^='#']")),
    };

    ParsedPage {
        title: extract_title(&document),
        links,
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_hrefs(document: &Html, selector: &str) -> Vec<String> {
    select_attr(document, selector, "href")
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(|value| value.to_string())
        .collect()
}

fn dedupe(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Turns a root-relative href into an absolute URL
///
/// Absolute hrefs and hrefs that cannot be joined are returned unchanged.
fn resolve_link(href: &str, base: Option<&Url>) -> String {
    if !href.starts_with('/') {
        return href.to_string();
    }

    base.and_then(|base| base.join(href).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Returns the `src` of every `<img>` on the page, in document order
pub fn extract_image_sources(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    select_attr(&document, "img[src]", "src")
        .into_iter()
        .filter(|src| !src.is_empty())
        .collect()
}
