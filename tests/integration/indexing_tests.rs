//! Integration tests for indexing runs
//!
//! Full runs against wiremock sites: site lifecycle, the lemma frequency
//! invariant, stopping, and single page reindexing.

use crate::support::{html_page, mount_page, mount_small_site, test_app, TestApp};
use lemma_search::indexing::STOPPED_MESSAGE;
use lemma_search::output::load_statistics;
use lemma_search::state::SiteStatus;
use lemma_search::storage::{lock_storage, RunStatus, Storage};
use std::collections::HashSet;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_to_completion(app: &TestApp) {
    let response = app.coordinator.start();
    assert!(response.result, "start failed: {:?}", response.error);
    tokio::time::timeout(Duration::from_secs(10), app.coordinator.wait_for_completion())
        .await
        .expect("indexing run did not finish");
    assert!(!app.coordinator.is_running());
}

/// Every lemma's frequency equals the number of its site's pages indexed under it
fn assert_frequency_invariant(app: &TestApp, site_url: &str, htmls: &[String]) {
    let storage = lock_storage(&app.storage).unwrap();
    let site = storage.find_site_by_url(site_url).unwrap().unwrap();

    let lemmas: HashSet<String> = htmls
        .iter()
        .flat_map(|html| app.extractor.extract_from_html(html).into_keys())
        .collect();
    assert!(!lemmas.is_empty());

    for text in lemmas {
        let lemma = storage.find_lemma(site.id, &text).unwrap().unwrap();
        let pages = storage.find_pages_by_lemma(lemma.id).unwrap();
        assert_eq!(lemma.frequency, pages.len() as i64, "lemma {:?}", text);
    }
}

#[tokio::test]
async fn test_full_run_indexes_site() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;
    let app = test_app(&[(mock_server.uri().as_str(), "Harbor")], 1000);

    run_to_completion(&app).await;

    let storage = lock_storage(&app.storage).unwrap();
    let site = storage.find_site_by_url(&mock_server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert!(site.last_error.is_none());
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 2);
    assert!(storage.find_page(site.id, "/about").unwrap().is_some());

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_lemma_frequency_matches_pages() {
    let mock_server = MockServer::start().await;
    let root = html_page(
        "Harbor",
        r#"<p>Boats and boats in the harbor</p><a href="/dock">Dock</a>"#,
    );
    let dock = html_page("Dock", "<p>The dock holds boats. The harbor is calm.</p>");
    mount_page(&mock_server, "/", root.clone()).await;
    mount_page(&mock_server, "/dock", dock.clone()).await;
    let app = test_app(&[(mock_server.uri().as_str(), "Harbor")], 1000);

    run_to_completion(&app).await;

    assert_frequency_invariant(&app, &mock_server.uri(), &[root, dock]);
}

#[tokio::test]
async fn test_failing_site_does_not_affect_siblings() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;
    let app = test_app(
        &[(mock_server.uri().as_str(), "Harbor"), ("http://127.0.0.1:9", "Closed")],
        1000,
    );

    run_to_completion(&app).await;

    let stats = {
        let storage = lock_storage(&app.storage).unwrap();
        load_statistics(&*storage).unwrap()
    };
    assert_eq!(stats.total.sites, 2);
    assert!(!stats.total.indexing);

    let good = stats.detailed.iter().find(|s| s.name == "Harbor").unwrap();
    assert_eq!(good.status, "INDEXED");
    assert_eq!(good.pages, 2);

    let bad = stats.detailed.iter().find(|s| s.name == "Closed").unwrap();
    assert_eq!(bad.status, "FAILED");
    assert_eq!(bad.pages, 0);
    assert!(bad.error.is_some());
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;
    let app = test_app(&[(mock_server.uri().as_str(), "Slow")], 1000);

    assert!(app.coordinator.start().result);
    let second = app.coordinator.start();
    assert!(!second.result);
    assert!(second.error.is_some());

    app.coordinator.wait_for_completion().await;
    assert!(app.coordinator.start().result);
    app.coordinator.wait_for_completion().await;
}

#[tokio::test]
async fn test_stop_marks_sites_failed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("never seen")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;
    let app = test_app(&[(mock_server.uri().as_str(), "Stuck")], 2000);

    assert!(app.coordinator.start().result);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(app.coordinator.is_running());

    let response = app.coordinator.stop().await;
    assert!(response.result);
    assert!(!app.coordinator.is_running());

    let storage = lock_storage(&app.storage).unwrap();
    let site = storage.find_site_by_url(&mock_server.uri()).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Failed);
    assert_eq!(site.last_error.as_deref(), Some(STOPPED_MESSAGE));
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 0);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
    drop(storage);

    let restarted = app.coordinator.start();
    assert!(restarted.result, "restart failed: {:?}", restarted.error);
    assert!(app.coordinator.is_running());
    assert!(app.coordinator.stop().await.result);
}

#[tokio::test]
async fn test_reset_during_run_leaves_no_sites() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("never seen")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;
    let app = test_app(
        &[
            (mock_server.uri().as_str(), "First"),
            ("http://127.0.0.1:9", "Second"),
            ("http://localhost:9", "Third"),
        ],
        2000,
    );

    assert!(app.coordinator.start().result);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(app.coordinator.reset_all().await.result);
    assert!(!app.coordinator.is_running());

    tokio::time::sleep(Duration::from_millis(300)).await;
    let storage = lock_storage(&app.storage).unwrap();
    assert!(storage.list_sites().unwrap().is_empty());
    assert_eq!(storage.count_pages().unwrap(), 0);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Interrupted
    );
}

#[tokio::test]
async fn test_single_page_reindex_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;
    let app = test_app(&[(mock_server.uri().as_str(), "Harbor")], 1000);

    run_to_completion(&app).await;

    let about = format!("{}/about", mock_server.uri());
    for _ in 0..2 {
        let response = app.coordinator.index_single_page(&about).await;
        assert!(response.result, "reindex failed: {:?}", response.error);
    }

    let storage = lock_storage(&app.storage).unwrap();
    let site = storage.find_site_by_url(&mock_server.uri()).unwrap().unwrap();
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 2);

    let lighthouse = app.extractor.lemma_set("lighthouse");
    let lemma = storage.find_lemma(site.id, &lighthouse[0]).unwrap().unwrap();
    assert_eq!(lemma.frequency, 1);
    drop(storage);

    let htmls = vec![
        html_page("About", r#"<p>The lighthouse keeper watches the harbor.</p><a href="/">Home</a>"#),
    ];
    assert_frequency_invariant(&app, &mock_server.uri(), &htmls);
}

#[tokio::test]
async fn test_single_page_creates_site_record() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;
    let app = test_app(&[(mock_server.uri().as_str(), "Harbor")], 1000);

    let response = app
        .coordinator
        .index_single_page(&format!("{}/about", mock_server.uri()))
        .await;
    assert!(response.result);

    let storage = lock_storage(&app.storage).unwrap();
    let site = storage.find_site_by_url(&mock_server.uri()).unwrap().unwrap();
    assert_eq!(site.name, "Harbor");
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 1);
}

#[tokio::test]
async fn test_reset_removes_everything() {
    let mock_server = MockServer::start().await;
    mount_small_site(&mock_server).await;
    let app = test_app(&[(mock_server.uri().as_str(), "Harbor")], 1000);

    run_to_completion(&app).await;
    assert!(app.coordinator.reset_all().await.result);

    let storage = lock_storage(&app.storage).unwrap();
    assert!(storage.list_sites().unwrap().is_empty());
    assert_eq!(storage.count_pages().unwrap(), 0);
    assert_eq!(storage.count_lemmas().unwrap(), 0);
}
