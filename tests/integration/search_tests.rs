//! End-to-end search tests
//!
//! Sites are crawled from wiremock servers through the coordinator, then
//! queried through the search engine.

use crate::support::{html_page, mount_page, mount_small_site, test_app, TestApp};
use lemma_search::search::{EMPTY_QUERY_MESSAGE, NOTHING_FOUND_MESSAGE, SITE_NOT_INDEXED_MESSAGE};
use std::time::Duration;
use wiremock::MockServer;

async fn index_all(app: &TestApp) {
    assert!(app.coordinator.start().result);
    tokio::time::timeout(Duration::from_secs(10), app.coordinator.wait_for_completion())
        .await
        .expect("indexing run did not finish");
}

#[tokio::test]
async fn test_unique_word_finds_its_page() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;
    let app = test_app(&[(mock_server.uri().as_str(), "Harbor")], 1000);
    index_all(&app).await;

    let response = app.search.query("lighthouse", None, 0, 20);
    assert!(response.result);
    assert_eq!(response.count, 1);

    let item = &response.data[0];
    assert_eq!(item.site, mock_server.uri());
    assert_eq!(item.site_name, "Harbor");
    assert_eq!(item.uri, "/about");
    assert_eq!(item.title, "About");
    assert_eq!(item.relevance, 1.0);
    assert!(item.snippet.contains("<b>lighthouse</b>"));
}

#[tokio::test]
async fn test_results_are_ordered_by_relevance() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        html_page(
            "Fleet",
            r#"<p>Anchor anchor anchor rope</p>
            <a href="/one">One</a><a href="/two">Two</a><a href="/three">Three</a>"#,
        ),
    )
    .await;
    mount_page(&mock_server, "/one", html_page("One", "<p>anchor rope</p>")).await;
    mount_page(&mock_server, "/two", html_page("Two", "<p>sails</p>")).await;
    mount_page(&mock_server, "/three", html_page("Three", "<p>mast</p>")).await;
    let app = test_app(&[(mock_server.uri().as_str(), "Fleet")], 1000);
    index_all(&app).await;

    let response = app.search.query("anchor rope", None, 0, 20);
    assert_eq!(response.count, 2);
    assert_eq!(response.data[0].uri, "/");
    assert_eq!(response.data[0].relevance, 1.0);
    assert_eq!(response.data[1].uri, "/one");
    assert!((response.data[1].relevance - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_site_filter() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_small_site(&first).await;
    mount_page(
        &second,
        "/",
        html_page("Coast", "<p>Another lighthouse on the coast</p>"),
    )
    .await;
    let app = test_app(
        &[
            (first.uri().as_str(), "Harbor"),
            (second.uri().as_str(), "Coast"),
        ],
        1000,
    );
    index_all(&app).await;

    let all = app.search.query("lighthouse", None, 0, 20);
    assert_eq!(all.count, 2);
    assert!(all.data.iter().all(|item| item.relevance == 1.0));

    let filtered = app
        .search
        .query("lighthouse", Some(&format!("{}/", second.uri())), 0, 20);
    assert_eq!(filtered.count, 1);
    assert_eq!(filtered.data[0].site_name, "Coast");

    let unknown = app
        .search
        .query("lighthouse", Some("http://unindexed.example"), 0, 20);
    assert!(!unknown.result);
    assert_eq!(unknown.error.as_deref(), Some(SITE_NOT_INDEXED_MESSAGE));
}

#[tokio::test]
async fn test_pagination_over_indexed_pages() {
    let mock_server = MockServer::start().await;
    let links: String = (0..5)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    mount_page(&mock_server, "/", html_page("Index", &links)).await;
    for i in 0..5 {
        mount_page(
            &mock_server,
            &format!("/p{}", i),
            html_page("Page", "<p>compass</p>"),
        )
        .await;
    }
    let app = test_app(&[(mock_server.uri().as_str(), "Pages")], 1000);
    index_all(&app).await;

    let first = app.search.query("compass", None, 0, 2);
    assert_eq!(first.count, 5);
    assert_eq!(first.data.len(), 2);

    let last = app.search.query("compass", None, 4, 2);
    assert_eq!(last.count, 5);
    assert_eq!(last.data.len(), 1);

    let past_end = app.search.query("compass", None, 5, 2);
    assert!(past_end.result);
    assert!(past_end.data.is_empty());

    let invalid = app.search.query("compass", None, 0, 0);
    assert!(!invalid.result);
    assert_eq!(invalid.count, 5);
}

#[tokio::test]
async fn test_empty_and_unmatched_queries() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;
    let app = test_app(&[(mock_server.uri().as_str(), "Harbor")], 1000);
    index_all(&app).await;

    let empty = app.search.query("  ", None, 0, 20);
    assert!(!empty.result);
    assert_eq!(empty.error.as_deref(), Some(EMPTY_QUERY_MESSAGE));

    let unmatched = app.search.query("volcano", None, 0, 20);
    assert!(unmatched.result);
    assert_eq!(unmatched.count, 0);
    assert_eq!(unmatched.error.as_deref(), Some(NOTHING_FOUND_MESSAGE));
}
