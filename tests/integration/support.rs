//! Shared fixtures for the integration tests

use lemma_search::config::{load_config_with_hash, Config};
use lemma_search::indexing::IndexingCoordinator;
use lemma_search::lemma::LemmaExtractor;
use lemma_search::search::SearchEngine;
use lemma_search::storage::{open_storage, SqliteStorage};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A coordinator and search engine over a fresh database in a temp dir
pub struct TestApp {
    pub config: Arc<Config>,
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub coordinator: IndexingCoordinator,
    pub search: SearchEngine,
    pub extractor: LemmaExtractor,
    _dir: TempDir,
}

/// Builds an app whose config lists `sites` as (url, name) pairs
pub fn test_app(sites: &[(&str, &str)], stop_grace_ms: u64) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("index.db");

    let mut toml = format!(
        r#"
[indexing]
site-workers = 2
crawl-workers = 4
batch-size = 2
stop-grace-ms = {}

[http]
user-agent = "TestBot/1.0"
timeout-ms = 1000

[storage]
database-path = "{}"

[search]
language = "english"
"#,
        stop_grace_ms,
        db_path.display()
    );
    for (url, name) in sites {
        toml.push_str(&format!("\n[[sites]]\nurl = \"{}\"\nname = \"{}\"\n", url, name));
    }

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    assert_eq!(hash.len(), 64);

    let config = Arc::new(config);
    let storage = Arc::new(Mutex::new(open_storage(&db_path).unwrap()));
    let extractor = LemmaExtractor::for_language(config.search.language);
    let search = SearchEngine::new(
        Arc::clone(&storage),
        extractor.clone(),
        config.search.clone(),
    );
    let coordinator = IndexingCoordinator::new(
        Arc::clone(&config),
        hash,
        Arc::clone(&storage),
        extractor.clone(),
    )
    .unwrap();

    TestApp {
        config,
        storage,
        coordinator,
        search,
        extractor,
        _dir: dir,
    }
}

pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

/// Serves `body` as HTML at `route`
pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// A two-page site: the root links to /about, to itself and off-host
pub async fn mount_small_site(server: &MockServer) {
    mount_page(
        server,
        "/",
        html_page(
            "Harbor",
            r#"<p>The harbor is quiet tonight.</p>
            <a href="/about">About</a>
            <a href="/about#crew">Crew</a>
            <a href="/">Home</a>
            <a href="https://elsewhere.example/">Elsewhere</a>
            <a href="mailto:keeper@example.com">Mail</a>"#,
        ),
    )
    .await;
    mount_page(
        server,
        "/about",
        html_page(
            "About",
            r#"<p>The lighthouse keeper watches the harbor.</p><a href="/">Home</a>"#,
        ),
    )
    .await;
}
