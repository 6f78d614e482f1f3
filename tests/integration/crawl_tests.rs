//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use lookout::config::{Config, Cookie, DomainRule, HeadCheckConfig, HttpAuth, OutputFormat};
use lookout::crawler::{
    build_page_record, BatchScheduler, Coordinator, FetchError, Fetcher, HttpFetcher,
};
use lookout::hooks::HookRegistry;
use lookout::output::output_directory;
use lookout::state::{Frontier, PageError, PageRecord};
use lookout::storage::{CheckpointManager, CheckpointStore, FileCheckpointStore};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the mock server
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let mut config = Config::new("itest", format!("{}/", base_url));
    config.filters.allowed_domains = vec![DomainRule::Exact("127.0.0.1".to_string())];
    config.filters.allowed_protocols = vec!["http:".to_string()];
    config.crawler.request_count = 2;
    config.crawler.save_status_each = -1;
    config.output.format = OutputFormat::Json;
    config.output.output_directory = dir.join("output").to_string_lossy().to_string();
    config.output.save_directory = dir.join("save").to_string_lossy().to_string();
    config
}

fn html(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().unwrap();

    mount_page(
        &mock_server,
        "/",
        html(
            "Home",
            r#"<a href="/page1">Page 1</a>
               <a href="/page2#top">Page 2</a>
               <a href="http://other.invalid/">Elsewhere</a>
               <a href="mailto:team@example.com">Mail</a>"#,
        ),
    )
    .await;
    mount_page(&mock_server, "/page1", html("Page 1", r#"<a href="/">Home</a>"#)).await;
    mount_page(&mock_server, "/page2", html("Page 2", r#"<a href="/missing">Gone</a>"#)).await;
    mount_page(&mock_server, "/missing", ResponseTemplate::new(404)).await;

    let config = create_test_config(&base_url, temp_dir.path());
    let mut coordinator = Coordinator::new(config.clone(), true).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.pages_crawled, 4);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.pages_remaining, 0);
    assert!(report.finished);

    let dir = output_directory(&config, &report.start_timestamp);
    let content = std::fs::read_to_string(dir.join("itest.json")).expect("Missing JSON output");
    let pages: IndexMap<String, PageRecord> = serde_json::from_str(&content).unwrap();

    let home = &pages[&format!("{}/", base_url)];
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.links.mailto, vec!["mailto:team@example.com"]);
    assert!(home.links.url.contains(&"http://other.invalid/".to_string()));

    let missing = &pages[&format!("{}/missing", base_url)];
    assert_eq!(missing.error, PageError::Status(404));
    assert!(!pages.contains_key("http://other.invalid/"));

    assert!(dir.join("itest_report.json").exists());
}

#[tokio::test]
async fn test_http_fetcher_sends_configured_headers() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("x-crawler", "lookout"))
        .and(header("cookie", "session=abc; lang=en"))
        .and(header("authorization", "Basic dXNlcjpzZWNyZXQ="))
        .respond_with(html("Private", ""))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), temp_dir.path());
    config
        .http
        .custom_headers
        .insert("X-Crawler".to_string(), "lookout".to_string());
    config.http.cookies = vec![
        Cookie {
            key: "session".to_string(),
            value: "abc".to_string(),
        },
        Cookie {
            key: "lang".to_string(),
            value: "en".to_string(),
        },
    ];
    config.http.auth = HttpAuth {
        enable: true,
        user: "user".to_string(),
        pass: "secret".to_string(),
    };

    let fetcher = HttpFetcher::new(&config).unwrap();
    let response = fetcher
        .visit_page(&format!("{}/private", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert!(response.body.unwrap().contains("Private"));
}

#[tokio::test]
async fn test_non_success_status_is_not_an_error() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_page(&mock_server, "/teapot", ResponseTemplate::new(418)).await;

    let config = create_test_config(&mock_server.uri(), temp_dir.path());
    let fetcher = HttpFetcher::new(&config).unwrap();
    let response = fetcher
        .visit_page(&format!("{}/teapot", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status_code, 418);
}

#[tokio::test]
async fn test_timeout_is_a_transport_error() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_page(
        &mock_server,
        "/slow",
        html("Slow", "").set_delay(Duration::from_millis(500)),
    )
    .await;

    let mut config = create_test_config(&mock_server.uri(), temp_dir.path());
    config.http.timeout = 50;
    let fetcher = HttpFetcher::new(&config).unwrap();
    let result = fetcher
        .visit_page(&format!("{}/slow", mock_server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_truncated_body_keeps_status_code() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 1000\r\n\r\n<html>")
            .await
            .unwrap();
        // closing here leaves the body short of its declared length
    });

    let temp_dir = TempDir::new().unwrap();
    let base_url = format!("http://{}", addr);
    let config = create_test_config(&base_url, temp_dir.path());
    let fetcher = HttpFetcher::new(&config).unwrap();
    let url = format!("{}/cut", base_url);

    let outcome = fetcher.visit_page(&url).await;
    server.await.unwrap();

    assert!(matches!(outcome, Err(FetchError::Body { status: 200, .. })));
    let record = build_page_record(&outcome, &url, 1);
    assert_eq!(record.status, Some(200));
    assert!(matches!(record.error, PageError::Message(_)));
}

#[tokio::test]
async fn test_head_check_skips_unwanted_content() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("HEAD"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/page", html("Page", "")).await;

    let mut config = create_test_config(&mock_server.uri(), temp_dir.path());
    config.head_check = Some(HeadCheckConfig {
        enabled: true,
        pattern: None,
        crawl_mime_types: vec!["text/html".to_string()],
    });
    let fetcher = HttpFetcher::new(&config).unwrap();

    let pdf = fetcher
        .visit_page(&format!("{}/report.pdf", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(pdf.status_code, 200);
    assert_eq!(pdf.body, None);
    assert_eq!(pdf.content_type(), Some("application/pdf"));

    let page = fetcher
        .visit_page(&format!("{}/page", mock_server.uri()))
        .await
        .unwrap();
    assert!(page.body.unwrap().contains("Page"));
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_from_checkpoint() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("Home", r#"<a href="/a">A</a><a href="/b">B</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/a", html("A", "")).await;
    mount_page(&mock_server, "/b", html("B", "")).await;

    let mut config = create_test_config(&base_url, temp_dir.path());
    config.crawler.save_status_each = 1;

    // First run: one cycle, then the process "dies"
    {
        let hooks = Arc::new(HookRegistry::new());
        let checkpoints = CheckpointManager::for_config(&config, Arc::clone(&hooks));
        let frontier = Frontier::init(&config, "2024-01-01_00-00-00", None, None);
        let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
        let mut scheduler =
            BatchScheduler::new(Arc::new(config.clone()), frontier, fetcher, hooks, checkpoints);
        scheduler.run_cycle().await.unwrap();
    }

    let store = FileCheckpointStore::new(&config.output.save_directory, &config.id);
    let (_, saved) = store.load_latest().unwrap().unwrap();
    assert_eq!(saved["finished"], false);
    assert_eq!(saved["counter"]["crawled"], 1);

    // Second run picks up the same crawl
    let mut coordinator = Coordinator::new(config, false).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.start_timestamp, "2024-01-01_00-00-00");
    assert_eq!(report.pages_crawled, 3);
    assert!(report.finished);

    let (_, saved) = store.load_latest().unwrap().unwrap();
    assert_eq!(saved["finished"], true);
}

#[tokio::test]
async fn test_sitemap_index_seeds_the_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().unwrap();

    let urlset = |paths: &[&str]| {
        let entries: String = paths
            .iter()
            .map(|p| format!("<url><loc>{}{}</loc></url>", base_url, p))
            .collect();
        ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
            entries
        ))
    };

    mount_page(
        &mock_server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><sitemap><loc>{0}/s1.xml</loc></sitemap><sitemap><loc>{0}/s2.xml</loc></sitemap></sitemapindex>"#,
            base_url
        )),
    )
    .await;
    mount_page(&mock_server, "/s1.xml", urlset(&["/one", "/two"])).await;
    mount_page(&mock_server, "/s2.xml", urlset(&["/three", "/one"])).await;
    mount_page(&mock_server, "/", html("Home", "")).await;
    for page in ["/one", "/two", "/three"] {
        mount_page(&mock_server, page, html(page, "")).await;
    }

    let mut config = create_test_config(&base_url, temp_dir.path());
    config.sitemap_url = Some(format!("{}/sitemap.xml", base_url));

    let mut coordinator = Coordinator::new(config, true).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.pages_crawled, 4);
    assert_eq!(report.pages_failed, 0);
}
