//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! downloader and the full crawl cycle end-to-end.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use sumi_harvest::crawler::{crawl, CrawlRequest, Downloader, DownloaderConfig, FetchCache, FetchMode};
use sumi_harvest::handlers::StorageLayout;
use sumi_harvest::output::{generate_layout_script, LayoutMode};
use sumi_harvest::proxy::{ProxyDescriptor, ProxyManager};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

fn test_downloader(max_retries: u32, timeout: Duration, proxies: ProxyManager) -> Downloader {
    Downloader::new(
        DownloaderConfig {
            timeout,
            max_retries,
            ..DownloaderConfig::default()
        },
        Arc::new(proxies),
        Arc::new(FetchCache::new()),
    )
}

/// Returns a proxy URL on a local port nothing listens on
fn dead_proxy() -> ProxyDescriptor {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    ProxyDescriptor::new(format!("http://127.0.0.1:{}", port))
}

/// Mounts a seed page linking to one PDF (twice) and one HTML page
async fn mount_site(server: &MockServer, pdf_get_calls: u64) {
    let seed_html = format!(
        r#"<html><head><title>Reports</title></head><body>
            <a href="/docs/report.pdf">Annual report</a>
            <a href="{}/docs/report.pdf#page=2">Same report</a>
            <a href="/about">About</a>
            <a href="/">Home</a>
            <a href="mailto:office@example.com">Mail</a>
        </body></html>"#,
        server.uri()
    );

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html; charset=utf-8"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(seed_html, "text/html"))
        .mount(server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/docs/report.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BYTES, "application/pdf"))
        .expect(pdf_get_calls)
        .mount(server)
        .await;
}

fn page_name(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

fn read_ledger(layout: &StorageLayout) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(layout.csv_path()).unwrap();
    reader.records().map(|r| r.unwrap()).collect()
}

#[tokio::test]
async fn test_harvest_depth_one_records_and_stores_pdf() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let dir = TempDir::new().unwrap();

    let report = crawl(CrawlRequest::new(format!("{}/", server.uri()), dir.path()).depth(1))
        .await
        .unwrap();

    let pdf_url = format!("{}/docs/report.pdf", server.uri());
    let layout = StorageLayout::new(dir.path(), page_name(&server));

    let rows = read_ledger(&layout);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "report.pdf");
    assert_eq!(&rows[0][2], pdf_url.as_str());

    let stored = layout.local_path(&pdf_url);
    assert_eq!(&rows[0][1], &*stored.to_string_lossy());
    assert_eq!(std::fs::read(&stored).unwrap(), PDF_BYTES);

    assert_eq!(report.visited, 3);
    assert_eq!(report.head_handled, 1);
    assert_eq!(report.get_handled, 1);
    assert!(!report.cancelled);

    server.verify().await;
}

#[tokio::test]
async fn test_harvest_depth_zero_stores_nothing() {
    let server = MockServer::start().await;
    mount_site(&server, 0).await;
    let dir = TempDir::new().unwrap();

    let report = crawl(CrawlRequest::new(server.uri(), dir.path()).depth(0))
        .await
        .unwrap();

    let layout = StorageLayout::new(dir.path(), page_name(&server));
    assert!(read_ledger(&layout).is_empty());
    assert!(!layout.storage_dir().exists());
    assert_eq!(report.visited, 1);
    assert_eq!(report.enqueued, 0);

    server.verify().await;
}

#[tokio::test]
async fn test_rerun_skips_already_stored_pdf() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let dir = TempDir::new().unwrap();

    let first = crawl(CrawlRequest::new(server.uri(), dir.path()).depth(1))
        .await
        .unwrap();
    let second = crawl(CrawlRequest::new(server.uri(), dir.path()).depth(1))
        .await
        .unwrap();

    assert_eq!(first.get_handled, 1);
    assert_eq!(second.get_handled, 0);
    assert_eq!(second.vetoed, 1);

    let layout = StorageLayout::new(dir.path(), page_name(&server));
    assert_eq!(read_ledger(&layout).len(), 1);

    server.verify().await;
}

#[tokio::test]
async fn test_layout_script_for_harvested_ledger() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let dir = TempDir::new().unwrap();

    crawl(CrawlRequest::new(server.uri(), dir.path()).depth(1).page_name("reports"))
        .await
        .unwrap();

    let commands = generate_layout_script(dir.path(), LayoutMode::Symlink).unwrap();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].contains("/_readable_symlinks/reports\""));
    assert!(commands[0].contains("/reports/report_"));
}

#[tokio::test]
async fn test_always_failing_fetch_makes_four_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let downloader = test_downloader(3, Duration::from_secs(5), ProxyManager::empty());
    let session = downloader.session().unwrap();

    let result = downloader
        .fetch(&session, &format!("{}/broken", server.uri()), FetchMode::Get, false)
        .await;

    assert!(result.is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_flaky_endpoint_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .mount(&server)
        .await;

    let downloader = test_downloader(3, Duration::from_secs(5), ProxyManager::empty());
    let session = downloader.session().unwrap();

    let response = downloader
        .fetch(&session, &format!("{}/flaky", server.uri()), FetchMode::Get, false)
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "finally");
}

#[tokio::test]
async fn test_fetch_is_memoized_per_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body"))
        .expect(2)
        .mount(&server)
        .await;

    let downloader = test_downloader(3, Duration::from_secs(5), ProxyManager::empty());
    let url = format!("{}/doc", server.uri());

    let session = downloader.session().unwrap();
    let first = downloader.fetch(&session, &url, FetchMode::Get, false).await;
    let second = downloader.fetch(&session, &url, FetchMode::Get, false).await;
    assert!(first.is_some());
    assert_eq!(first, second);

    let other = downloader.session().unwrap();
    assert!(downloader.fetch(&other, &url, FetchMode::Get, false).await.is_some());
    assert_eq!(downloader.cache().len(), 2);

    server.verify().await;
}

#[tokio::test]
async fn test_failures_are_memoized() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let downloader = test_downloader(0, Duration::from_secs(5), ProxyManager::empty());
    let session = downloader.session().unwrap();
    let url = format!("{}/gone", server.uri());

    assert!(downloader.fetch(&session, &url, FetchMode::Head, false).await.is_none());
    assert!(downloader.fetch(&session, &url, FetchMode::Head, false).await.is_none());

    server.verify().await;
}

#[tokio::test]
async fn test_proxy_mode_with_empty_pool_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let downloader = test_downloader(3, Duration::from_secs(5), ProxyManager::empty());
    let session = downloader.session().unwrap();

    let result = downloader
        .fetch(&session, &format!("{}/doc", server.uri()), FetchMode::Get, true)
        .await;

    assert!(result.is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_proxy_rotation_over_dead_pool() {
    let pool = ProxyManager::new(vec![dead_proxy(), dead_proxy(), dead_proxy()]);
    let downloader = test_downloader(3, Duration::from_secs(5), pool);
    let session = downloader.session().unwrap();

    let result = downloader
        .fetch(&session, "http://harvest.invalid/doc", FetchMode::Get, true)
        .await;

    assert!(result.is_none());
    // Four attempts rotate 0 -> 1 -> 2 -> 0; the last failure does not rotate
    assert_eq!(downloader.proxies().get_proxy().index, 0);
    assert_eq!(downloader.proxies().last_failed(), Some(2));
}

#[tokio::test]
async fn test_fetch_routes_through_proxy() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("via proxy"))
        .expect(1)
        .mount(&proxy)
        .await;

    let pool = ProxyManager::new(vec![ProxyDescriptor::new(proxy.uri())]);
    let downloader = test_downloader(0, Duration::from_secs(5), pool);
    let session = downloader.session().unwrap();

    let response = downloader
        .fetch(&session, "http://harvest.invalid/doc", FetchMode::Get, true)
        .await
        .unwrap();

    assert_eq!(response.text(), "via proxy");
    assert_eq!(downloader.proxies().last_failed(), None);
    proxy.verify().await;
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(1)
        .mount(&server)
        .await;

    let downloader = test_downloader(0, Duration::from_millis(200), ProxyManager::empty());
    let session = downloader.session().unwrap();

    let result = downloader
        .fetch(&session, &format!("{}/slow", server.uri()), FetchMode::Get, false)
        .await;

    assert!(result.is_none());
    server.verify().await;
}
