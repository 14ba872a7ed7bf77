//! Indexing coordinator - run lifecycle and per-site orchestration
//!
//! This module owns the Idle/Running state machine, including:
//! - Starting a run that recrawls every configured site concurrently
//! - Stopping a run with a bounded grace period
//! - Reindexing a single page on demand
//! - Wiping all indexed data

use crate::config::{Config, SiteEntry};
use crate::crawler::{
    build_http_client, fetch_page, CrawlError, CrawlOutcome, Crawler, FetchedPage, PageHandler,
};
use crate::indexing::PageIndexer;
use crate::lemma::LemmaExtractor;
use crate::state::{RunContext, RunGuard, RunState, SiteStatus};
use crate::storage::{
    lock_storage, NewPage, RunStatus, SqliteStorage, Storage, StorageError, StorageResult,
};
use crate::url::{parse_http_url, same_host};
use crate::SearchEngineError;
use reqwest::Client;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Site error recorded when the operator stops a run
pub const STOPPED_MESSAGE: &str = "Indexing stopped by operator";

const ALREADY_RUNNING_MESSAGE: &str = "Indexing is already running";
const NOT_RUNNING_MESSAGE: &str = "Indexing is not running";
const OUT_OF_SCOPE_MESSAGE: &str =
    "This page is outside the sites listed in the configuration file";

/// Result of a start/stop/index-page/reset request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexingResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexingResponse {
    pub fn ok() -> Self {
        Self {
            result: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: false,
            error: Some(message.into()),
        }
    }
}

/// The run currently (or most recently) spawned by `start`
struct ActiveRun {
    context: RunContext,
    handle: JoinHandle<()>,
    finished: CancellationToken,
    run_id: i64,
}

/// Main indexing coordinator
pub struct IndexingCoordinator {
    config: Arc<Config>,
    config_hash: String,
    storage: Arc<Mutex<SqliteStorage>>,
    client: Client,
    crawler: Crawler,
    indexer: Arc<PageIndexer>,
    run_state: Arc<RunState>,
    active: Mutex<Option<ActiveRun>>,
}

impl IndexingCoordinator {
    /// Wires the coordinator to shared storage and a lemma extractor
    ///
    /// `config_hash` is recorded on every run this coordinator starts.
    pub fn new(
        config: Arc<Config>,
        config_hash: String,
        storage: Arc<Mutex<SqliteStorage>>,
        extractor: LemmaExtractor,
    ) -> Result<Self, SearchEngineError> {
        let client = build_http_client(&config.http)?;
        let crawler = Crawler::new(client.clone(), config.indexing.crawl_workers as usize);
        let indexer = Arc::new(PageIndexer::new(Arc::clone(&storage), extractor));

        Ok(Self {
            config,
            config_hash,
            storage,
            client,
            crawler,
            indexer,
            run_state: Arc::new(RunState::new()),
            active: Mutex::new(None),
        })
    }

    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        Arc::clone(&self.storage)
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    /// Starts a run over every configured site
    pub fn start(&self) -> IndexingResponse {
        self.start_sites(self.config.sites.clone())
    }

    /// Starts a run over `sites`
    ///
    /// Rejected while another run is active. Previously indexed data for
    /// these root URLs is deleted before any crawl begins.
    pub fn start_sites(&self, sites: Vec<SiteEntry>) -> IndexingResponse {
        let Some(generation) = self.run_state.try_begin() else {
            return IndexingResponse::error(ALREADY_RUNNING_MESSAGE);
        };

        let urls: Vec<String> = sites.iter().map(|s| s.url.clone()).collect();
        let prepared = lock_storage(&self.storage).and_then(|mut storage| {
            let deleted = storage.delete_sites_by_urls(&urls)?;
            if deleted > 0 {
                tracing::info!("Cleared {} previously indexed sites", deleted);
            }
            storage.create_run(&self.config_hash)
        });
        let run_id = match prepared {
            Ok(run_id) => run_id,
            Err(e) => {
                self.run_state.finish(generation);
                tracing::error!("Failed to prepare indexing run: {}", e);
                return IndexingResponse::error(e.to_string());
            }
        };

        let context = RunContext::new(generation);
        let finished = CancellationToken::new();
        let guard = RunGuard::new(Arc::clone(&self.run_state), generation);
        let finished_guard = finished.clone().drop_guard();

        let run = IndexingRun {
            storage: Arc::clone(&self.storage),
            crawler: self.crawler.clone(),
            indexer: Arc::clone(&self.indexer),
            context: context.clone(),
            site_workers: self.config.indexing.site_workers as usize,
            batch_size: self.config.indexing.batch_size,
            run_id,
        };

        tracing::info!("Starting indexing run {} over {} sites", run_id, sites.len());
        let handle = tokio::spawn(async move {
            let _finished = finished_guard;
            let _guard = guard;
            run.execute(sites).await;
        });

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActiveRun {
            context,
            handle,
            finished,
            run_id,
        });

        IndexingResponse::ok()
    }

    /// Stops the active run
    ///
    /// Waits up to `stop-grace-ms` for in-flight work to unwind, then aborts
    /// it. Sites still INDEXING are marked FAILED.
    pub async fn stop(&self) -> IndexingResponse {
        let Some(generation) = self.run_state.current() else {
            return IndexingResponse::error(NOT_RUNNING_MESSAGE);
        };

        tracing::info!("Stopping indexing run");
        let active = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(run) = active {
            run.context.cancel();

            let grace = Duration::from_millis(self.config.indexing.stop_grace_ms);
            let mut handle = run.handle;
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                tracing::warn!("Indexing run did not stop within {:?}, aborting", grace);
                handle.abort();
                let _ = handle.await;
            }

            let cleanup = lock_storage(&self.storage).and_then(|mut storage| {
                let failed = storage.update_sites_in_status(
                    SiteStatus::Indexing,
                    SiteStatus::Failed,
                    Some(STOPPED_MESSAGE),
                )?;
                storage.finish_run(run.run_id, RunStatus::Interrupted)?;
                Ok(failed)
            });
            match cleanup {
                Ok(failed) if failed > 0 => {
                    tracing::info!("Marked {} interrupted sites as failed", failed)
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Failed to record stopped run: {}", e),
            }
        }

        self.run_state.finish(generation);
        tracing::info!("Indexing stopped");
        IndexingResponse::ok()
    }

    /// Waits until the most recently started run has finished
    pub async fn wait_for_completion(&self) {
        let finished = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|run| run.finished.clone());

        if let Some(finished) = finished {
            finished.cancelled().await;
        }
    }

    /// Fetches and (re)indexes one page without crawling its links
    ///
    /// The URL's host must match a configured site root. Does not touch the
    /// run state, so it may run alongside a full crawl.
    pub async fn index_single_page(&self, url: &str) -> IndexingResponse {
        let url = match parse_http_url(url.trim()) {
            Ok(url) => url,
            Err(e) => return IndexingResponse::error(format!("Invalid URL: {}", e)),
        };

        let Some(entry) = self.site_for(&url) else {
            tracing::debug!("Rejected out-of-scope page {}", url);
            return IndexingResponse::error(OUT_OF_SCOPE_MESSAGE);
        };

        let site_id = match self.find_or_create_site(entry) {
            Ok(site_id) => site_id,
            Err(e) => return IndexingResponse::error(e.to_string()),
        };

        let page = match fetch_page(&self.client, &url).await {
            Ok(page) => page,
            Err(e) => return IndexingResponse::error(e.to_string()),
        };

        match self
            .indexer
            .index(site_id, &page.path, page.status_code, &page.html)
        {
            Ok(_) => {
                tracing::info!("Indexed single page {}", url);
                IndexingResponse::ok()
            }
            Err(e) => {
                tracing::error!("Failed to index {}: {}", url, e);
                IndexingResponse::error(e.to_string())
            }
        }
    }

    /// Deletes all indexed data and returns to Idle
    ///
    /// An active run is cancelled and given `stop-grace-ms` to unwind before
    /// it is aborted, so no site task can write after the wipe.
    pub async fn reset_all(&self) -> IndexingResponse {
        let active = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(run) = active {
            run.context.cancel();

            let grace = Duration::from_millis(self.config.indexing.stop_grace_ms);
            let mut handle = run.handle;
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                tracing::warn!("Indexing run did not stop within {:?}, aborting", grace);
                handle.abort();
                let _ = handle.await;
            }

            if let Ok(mut storage) = lock_storage(&self.storage) {
                if let Err(e) = storage.finish_run(run.run_id, RunStatus::Interrupted) {
                    tracing::warn!("Failed to mark run {} interrupted: {}", run.run_id, e);
                }
            }
        }

        let result = lock_storage(&self.storage).and_then(|mut storage| storage.delete_all());
        self.run_state.clear();

        match result {
            Ok(()) => {
                tracing::info!("All indexed data deleted");
                IndexingResponse::ok()
            }
            Err(e) => {
                tracing::error!("Failed to reset index: {}", e);
                IndexingResponse::error(e.to_string())
            }
        }
    }

    fn site_for(&self, url: &Url) -> Option<&SiteEntry> {
        self.config.sites.iter().find(|site| {
            Url::parse(&site.url)
                .map(|root| same_host(&root, url))
                .unwrap_or(false)
        })
    }

    fn find_or_create_site(&self, entry: &SiteEntry) -> StorageResult<i64> {
        let mut storage = lock_storage(&self.storage)?;
        if let Some(site) = storage.find_site_by_url(&entry.url)? {
            return Ok(site.id);
        }
        storage.create_site(&entry.url, &entry.name, SiteStatus::Indexed)
    }
}

/// Everything one spawned run needs, detached from the coordinator
struct IndexingRun {
    storage: Arc<Mutex<SqliteStorage>>,
    crawler: Crawler,
    indexer: Arc<PageIndexer>,
    context: RunContext,
    site_workers: usize,
    batch_size: usize,
    run_id: i64,
}

impl IndexingRun {
    async fn execute(self, sites: Vec<SiteEntry>) {
        let run = Arc::new(self);
        tracing::debug!(
            "Run {} (generation {}) covers {} sites",
            run.run_id,
            run.context.generation,
            sites.len()
        );
        let permits = Arc::new(Semaphore::new(run.site_workers.max(1)));
        let mut tasks = JoinSet::new();

        for site in sites {
            let run = Arc::clone(&run);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let permit = tokio::select! {
                    _ = run.context.token().cancelled() => None,
                    permit = permits.acquire_owned() => permit.ok(),
                };
                match permit {
                    Some(_permit) => run.index_site(&site).await,
                    None => run.record_skipped_site(&site),
                }
            });
        }

        let mut panicked = false;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!("Site task failed: {}", e);
                panicked = true;
            }
        }

        let status = if panicked {
            RunStatus::Failed
        } else if run.context.is_cancelled() {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        match lock_storage(&run.storage).and_then(|mut s| s.finish_run(run.run_id, status)) {
            Ok(()) => tracing::info!("Indexing run {} {}", run.run_id, status.to_db_string()),
            Err(e) => tracing::error!("Failed to finish run {}: {}", run.run_id, e),
        }
    }

    async fn index_site(&self, site: &SiteEntry) {
        let created = lock_storage(&self.storage).and_then(|mut s| {
            if self.context.is_cancelled() {
                return Ok(None);
            }
            s.create_site(&site.url, &site.name, SiteStatus::Indexing)
                .map(Some)
        });
        let site_id = match created {
            Ok(Some(site_id)) => site_id,
            Ok(None) => {
                tracing::debug!("Run cancelled before {} started", site.url);
                return;
            }
            Err(e) => {
                tracing::error!("Failed to create site {}: {}", site.url, e);
                return;
            }
        };

        tracing::info!("Indexing site {} ({})", site.name, site.url);
        let handler = Arc::new(SitePageHandler {
            indexer: Arc::clone(&self.indexer),
            site_id,
        });

        let (status, error) = match self
            .crawler
            .traverse(&site.url, handler, self.context.token())
            .await
        {
            CrawlOutcome::Success(pages) => {
                self.persist_pages(site_id, &pages);
                tracing::info!("Site {} indexed: {} pages", site.url, pages.len());
                (SiteStatus::Indexed, None)
            }
            CrawlOutcome::FetchFailure(reason) => {
                tracing::warn!("Site {} failed: {}", site.url, reason);
                (SiteStatus::Failed, Some(reason))
            }
            CrawlOutcome::Cancelled => {
                tracing::info!("Site {} stopped", site.url);
                (SiteStatus::Failed, Some(STOPPED_MESSAGE.to_string()))
            }
        };

        if let Err(e) = lock_storage(&self.storage)
            .and_then(|mut s| s.update_site_status(site_id, status, error.as_deref()))
        {
            tracing::error!("Failed to update status of {}: {}", site.url, e);
        }
    }

    /// Stores pages the handler did not manage to index, chunk by chunk
    ///
    /// A chunk that hits a duplicate path is skipped as a whole.
    fn persist_pages(&self, site_id: i64, pages: &[FetchedPage]) {
        for chunk in pages.chunks(self.batch_size.max(1)) {
            let saved = lock_storage(&self.storage).and_then(|mut storage| {
                let mut missing = Vec::new();
                for page in chunk {
                    if storage.find_page(site_id, &page.path)?.is_none() {
                        missing.push(NewPage {
                            site_id,
                            path: page.path.clone(),
                            code: page.status_code,
                            content: page.html.clone(),
                        });
                    }
                }
                storage.create_pages(&missing)
            });

            match saved {
                Ok(0) => {}
                Ok(count) => tracing::debug!("Stored {} unindexed pages", count),
                Err(StorageError::ConstraintViolation(msg)) => {
                    tracing::warn!("Skipping page batch with duplicate path: {}", msg)
                }
                Err(e) => tracing::error!("Failed to store page batch: {}", e),
            }
        }
    }

    /// Records a site whose crawl never began because the run was stopped
    fn record_skipped_site(&self, site: &SiteEntry) {
        let recorded = lock_storage(&self.storage).and_then(|mut s| {
            let site_id = s.create_site(&site.url, &site.name, SiteStatus::Failed)?;
            s.update_site_status(site_id, SiteStatus::Failed, Some(STOPPED_MESSAGE))
        });
        if let Err(e) = recorded {
            tracing::warn!("Failed to record skipped site {}: {}", site.url, e);
        }
    }
}

/// Indexes each crawled page into its site as soon as it is fetched
struct SitePageHandler {
    indexer: Arc<PageIndexer>,
    site_id: i64,
}

impl PageHandler for SitePageHandler {
    fn on_page(&self, page: &FetchedPage) -> Result<(), CrawlError> {
        self.indexer
            .index(self.site_id, &page.path, page.status_code, &page.html)?;
        Ok(())
    }
}
