//! Integration tests for the DuckDuckGo search client against a mock endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use metaharvest::models::FileType;
use metaharvest::search::{
    DuckDuckGoSearch, Pacer, PauseReason, SearchConfig, SearchEngine, SearchError,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records every pause instead of sleeping.
#[derive(Default)]
struct RecordingPacer {
    pauses: Mutex<Vec<(Duration, PauseReason)>>,
}

impl RecordingPacer {
    fn count(&self, reason: PauseReason) -> usize {
        self.pauses
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| *r == reason)
            .count()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration, reason: PauseReason) {
        self.pauses.lock().unwrap().push((duration, reason));
    }
}

const RESULTS_PAGE: &str = r#"<html><body>
<div class="result">
  <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.agency.gov%2Freports%2Fannual.pdf&rut=abc">Annual report</a>
</div>
<div class="result">
  <a class="result__a" href="https://www.agency.gov/budget/fy24.pdf">FY24 budget</a>
</div>
<div class="result">
  <a class="result__a" href="https://elsewhere.org/mirror/annual.pdf">Mirror</a>
</div>
</body></html>"#;

fn search_for(server: &MockServer, pacer: Arc<RecordingPacer>) -> DuckDuckGoSearch {
    let mut config = SearchConfig::new("agency.gov");
    config.endpoint = format!("{}/html/", server.uri());
    config.base_delay = Duration::from_millis(10);
    config.seed = Some(42);
    DuckDuckGoSearch::with_pacer(config, pacer)
}

#[tokio::test]
async fn test_rate_limited_attempts_back_off_then_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let pacer = Arc::new(RecordingPacer::default());
    let search = search_for(&server, pacer.clone());

    let results = search.search_files(FileType::Pdf, 10).await.unwrap();

    let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.agency.gov/reports/annual.pdf",
            "https://www.agency.gov/budget/fy24.pdf",
        ]
    );
    assert_eq!(pacer.count(PauseReason::Backoff), 2);
    assert_eq!(pacer.count(PauseReason::Courtesy), 1);
}

#[tokio::test]
async fn test_query_is_sent_as_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .and(body_string_contains("q=filetype%3Adocx+site%3Aagency.gov"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let pacer = Arc::new(RecordingPacer::default());
    let search = search_for(&server, pacer.clone());

    let results = search.search_files(FileType::Docx, 10).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(pacer.count(PauseReason::Backoff), 0);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let pacer = Arc::new(RecordingPacer::default());
    let search = search_for(&server, pacer.clone());

    let err = search.search_files(FileType::Pdf, 10).await.unwrap_err();

    assert!(matches!(err, SearchError::Status { status: 500, .. }));
    assert_eq!(err.query(), "filetype:pdf site:agency.gov");
    assert_eq!(pacer.count(PauseReason::Backoff), 0);
    assert_eq!(pacer.count(PauseReason::Courtesy), 1);
}

#[tokio::test]
async fn test_rate_limit_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(3)
        .mount(&server)
        .await;

    let pacer = Arc::new(RecordingPacer::default());
    let search = search_for(&server, pacer.clone());

    let err = search.search_files(FileType::Pdf, 10).await.unwrap_err();

    assert!(matches!(err, SearchError::RateLimited { status: 202, .. }));
    assert_eq!(pacer.count(PauseReason::Backoff), 2);
}

#[tokio::test]
async fn test_results_are_truncated_to_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .mount(&server)
        .await;

    let search = search_for(&server, Arc::new(RecordingPacer::default()));

    let results = search.search_files(FileType::Pdf, 1).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_close_releases_pool_and_search_reopens_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .mount(&server)
        .await;

    let search = search_for(&server, Arc::new(RecordingPacer::default()));
    search.search_files(FileType::Pdf, 5).await.unwrap();
    assert!(!search.is_closed());

    search.close();
    search.close();
    assert!(search.is_closed());

    let again = search.search_files(FileType::Pdf, 5).await.unwrap();
    assert_eq!(again.len(), 2);
}

#[tokio::test]
async fn test_connection_failures_are_retried_then_reported() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = closed.local_addr().unwrap();
    drop(closed);

    let mut config = SearchConfig::new("agency.gov");
    config.endpoint = format!("http://{}/html/", addr);
    config.base_delay = Duration::from_millis(10);
    config.timeout = Duration::from_secs(2);
    config.seed = Some(1);
    let pacer = Arc::new(RecordingPacer::default());
    let search = DuckDuckGoSearch::with_pacer(config, pacer.clone());

    let err = search.search_files(FileType::Pdf, 10).await.unwrap_err();

    assert!(matches!(err, SearchError::Network { .. }), "got {:?}", err);
    assert_eq!(err.query(), "filetype:pdf site:agency.gov");
    assert_eq!(pacer.count(PauseReason::Backoff), 2);
    assert_eq!(pacer.count(PauseReason::Courtesy), 1);
}
