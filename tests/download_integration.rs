//! Integration tests for the batch downloader.
//!
//! These tests verify the full download flow with mock HTTP servers.

use std::time::Duration;

use metaharvest::download::{DownloadConfig, DownloadEvent, Downloader};
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pdf_body(len: usize) -> Vec<u8> {
    let mut body = b"%PDF-1.4\n".to_vec();
    body.resize(len, b'0');
    body
}

async fn serve(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

fn downloader(dir: &TempDir) -> Downloader {
    Downloader::new(DownloadConfig::new(dir.path())).expect("client builds")
}

#[tokio::test]
async fn test_existing_file_is_reused_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body(500)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let existing = dir.path().join("report.pdf");
    std::fs::write(&existing, b"already here").unwrap();

    let url = format!("{}/docs/report.pdf", server.uri());
    let results = downloader(&dir).download_files(&[url.clone()], None).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].is_success());
    assert_eq!(results[0].url, url);
    assert_eq!(results[0].local_path.as_deref(), Some(existing.as_path()));
    assert_eq!(std::fs::read(&existing).unwrap(), b"already here");
}

#[tokio::test]
async fn test_tiny_body_is_rejected() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/empty.pdf",
        ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let url = format!("{}/empty.pdf", server.uri());
    let results = downloader(&dir).download_files(&[url], None).await;

    assert!(!results[0].is_success());
    assert!(results[0].error.as_deref().unwrap().contains("too small"));
    assert!(!dir.path().join("empty.pdf").exists());
}

#[tokio::test]
async fn test_http_error_is_classified() {
    let server = MockServer::start().await;
    serve(&server, "/gone.pdf", ResponseTemplate::new(404)).await;

    let dir = TempDir::new().unwrap();
    let url = format!("{}/gone.pdf", server.uri());
    let results = downloader(&dir).download_files(&[url], None).await;

    assert_eq!(results[0].error.as_deref(), Some("HTTP 404"));
    assert!(results[0].local_path.is_none());
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/slow.pdf",
        ResponseTemplate::new(200)
            .set_body_bytes(pdf_body(500))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = DownloadConfig::new(dir.path());
    config.timeout = Duration::from_millis(200);
    let url = format!("{}/slow.pdf", server.uri());
    let results = Downloader::new(config)
        .unwrap()
        .download_files(&[url], None)
        .await;

    assert_eq!(results[0].error.as_deref(), Some("Timeout"));
}

#[tokio::test]
async fn test_results_keep_input_order_and_names_do_not_collide() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/a/memo.pdf",
        ResponseTemplate::new(200)
            .set_body_bytes(pdf_body(300))
            .set_delay(Duration::from_millis(150)),
    )
    .await;
    serve(
        &server,
        "/b/memo.pdf",
        ResponseTemplate::new(200).set_body_bytes(pdf_body(400)),
    )
    .await;
    serve(&server, "/c/missing.pdf", ResponseTemplate::new(404)).await;

    let dir = TempDir::new().unwrap();
    let urls = vec![
        format!("{}/a/memo.pdf", server.uri()),
        format!("{}/b/memo.pdf", server.uri()),
        format!("{}/c/missing.pdf", server.uri()),
    ];
    let results = downloader(&dir).download_files(&urls, None).await;

    let order: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(order, urls.iter().map(String::as_str).collect::<Vec<_>>());

    let first = results[0].local_path.clone().unwrap();
    let second = results[1].local_path.clone().unwrap();
    assert_eq!(first, dir.path().join("memo.pdf"));
    assert_eq!(second, dir.path().join("memo_1.pdf"));
    assert_eq!(std::fs::read(&first).unwrap().len(), 300);
    assert_eq!(std::fs::read(&second).unwrap().len(), 400);
    assert!(!results[2].is_success());
}

#[tokio::test]
async fn test_limit_caps_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body(200)))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let urls: Vec<String> = (0..5)
        .map(|i| format!("{}/doc{}.pdf", server.uri(), i))
        .collect();
    let results = downloader(&dir).download_files(&urls, Some(2)).await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn test_zero_limit_downloads_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body(200)))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let urls: Vec<String> = (0..3)
        .map(|i| format!("{}/doc{}.pdf", server.uri(), i))
        .collect();
    let results = downloader(&dir).download_files(&urls, Some(0)).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn test_events_report_each_outcome() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/ok.pdf",
        ResponseTemplate::new(200).set_body_bytes(pdf_body(200)),
    )
    .await;
    serve(&server, "/bad.pdf", ResponseTemplate::new(500)).await;

    let dir = TempDir::new().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let downloader = downloader(&dir).with_events(tx);
    let urls = vec![
        format!("{}/ok.pdf", server.uri()),
        format!("{}/bad.pdf", server.uri()),
    ];
    downloader.download_files(&urls, None).await;
    drop(downloader);

    let mut started = 0;
    let mut completed = 0;
    let mut failed = 0;
    while let Some(event) = rx.recv().await {
        match event {
            DownloadEvent::Started { .. } => started += 1,
            DownloadEvent::Completed { .. } => completed += 1,
            DownloadEvent::Failed { error, .. } => {
                assert_eq!(error, "HTTP 500");
                failed += 1;
            }
            DownloadEvent::AlreadyPresent { .. } => panic!("nothing was on disk"),
        }
    }
    assert_eq!((started, completed, failed), (2, 1, 1));
}

#[tokio::test]
async fn test_concurrent_fetches_stay_within_bound() {
    let delay = Duration::from_millis(200);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(pdf_body(200))
                .set_delay(delay),
        )
        .expect(6)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = DownloadConfig::new(dir.path());
    config.max_concurrent = 2;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let downloader = Downloader::new(config).unwrap().with_events(tx);
    let urls: Vec<String> = (0..6)
        .map(|i| format!("{}/batch/file{}.pdf", server.uri(), i))
        .collect();

    let started = std::time::Instant::now();
    let results = downloader.download_files(&urls, None).await;
    let elapsed = started.elapsed();
    drop(downloader);

    assert!(results.iter().all(|r| r.is_success()));

    // Started is sent once a slot is held; Completed before it is released.
    let mut in_flight = 0usize;
    let mut peak = 0usize;
    while let Some(event) = rx.recv().await {
        match event {
            DownloadEvent::Started { .. } => {
                in_flight += 1;
                peak = peak.max(in_flight);
            }
            DownloadEvent::Completed { .. } | DownloadEvent::Failed { .. } => in_flight -= 1,
            DownloadEvent::AlreadyPresent { .. } => {}
        }
    }
    assert_eq!(peak, 2);
    assert!(
        elapsed >= delay * 3 - Duration::from_millis(50),
        "six delayed fetches two at a time finished in {:?}",
        elapsed
    );
}
