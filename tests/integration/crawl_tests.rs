//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! full traversals of small sites.

use crate::support::{html_page, mount_page, mount_small_site};
use lemma_search::config::HttpConfig;
use lemma_search::crawler::{
    build_http_client, CrawlError, CrawlOutcome, Crawler, FetchedPage, NoopHandler, PageHandler,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_crawler(workers: usize) -> Crawler {
    let client = build_http_client(&HttpConfig {
        user_agent: "TestBot/1.0".to_string(),
        referrer: String::new(),
        timeout_ms: 500,
    })
    .unwrap();
    Crawler::new(client, workers)
}

fn sorted_paths(pages: &[FetchedPage]) -> Vec<String> {
    let mut paths: Vec<String> = pages.iter().map(|p| p.path.clone()).collect();
    paths.sort();
    paths
}

/// Records the path of every page it is handed
#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<String>>,
}

impl PageHandler for RecordingHandler {
    fn on_page(&self, page: &FetchedPage) -> Result<(), CrawlError> {
        self.seen.lock().unwrap().push(page.path.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_traversal_visits_each_internal_page_once() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;

    let handler = Arc::new(RecordingHandler::default());
    let outcome = test_crawler(4)
        .traverse(mock_server.uri().as_str(), handler.clone(), &CancellationToken::new())
        .await;

    let CrawlOutcome::Success(pages) = outcome else {
        panic!("expected success, got {:?}", outcome);
    };
    assert_eq!(sorted_paths(&pages), vec!["/", "/about"]);

    let mut seen = handler.seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["/", "/about"]);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_error_status_pages_are_kept() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        html_page("Home", r#"<a href="/missing">Missing</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&mock_server)
        .await;

    let outcome = test_crawler(2)
        .traverse(mock_server.uri().as_str(), Arc::new(NoopHandler), &CancellationToken::new())
        .await;

    let CrawlOutcome::Success(pages) = outcome else {
        panic!("expected success, got {:?}", outcome);
    };
    let missing = pages.iter().find(|p| p.path == "/missing").unwrap();
    assert_eq!(missing.status_code, 404);
    assert_eq!(missing.html, "not here");
}

#[tokio::test]
async fn test_slow_page_fails_whole_traversal() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        html_page("Home", r#"<a href="/slow">Slow</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let outcome = test_crawler(2)
        .traverse(mock_server.uri().as_str(), Arc::new(NoopHandler), &CancellationToken::new())
        .await;

    match outcome {
        CrawlOutcome::FetchFailure(reason) => assert!(reason.contains("/slow")),
        other => panic!("expected fetch failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_interrupts_inflight_fetch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let client = build_http_client(&HttpConfig {
        user_agent: "TestBot/1.0".to_string(),
        referrer: String::new(),
        timeout_ms: 10_000,
    })
    .unwrap();
    let crawler = Crawler::new(client, 2);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        crawler.traverse(mock_server.uri().as_str(), Arc::new(NoopHandler), &cancel),
    )
    .await
    .expect("traversal did not observe cancellation");
    assert!(matches!(outcome, CrawlOutcome::Cancelled));
}
