//! Parallel traversal of one site's link graph
//!
//! Link discovery produces into an unbounded frontier queue; a fixed number of
//! workers consume it. Every URL is claimed through the visited set before it
//! is queued, so each path is fetched at most once per traversal. The
//! traversal ends when the outstanding-work counter drops to zero, when a fetch
//! fails, or when the caller's token is cancelled.

use crate::crawler::fetcher::{fetch_page, FetchedPage};
use crate::crawler::parser::extract_links;
use crate::crawler::CrawlError;
use crate::url::{page_path, parse_http_url, same_host};
use reqwest::Client;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// How a traversal ended
#[derive(Debug)]
pub enum CrawlOutcome {
    /// Every reachable internal page was fetched
    Success(Vec<FetchedPage>),

    /// A page could not be fetched; the whole traversal was abandoned
    FetchFailure(String),

    /// The caller's token was cancelled
    Cancelled,
}

/// Receives every page as soon as it is fetched
pub trait PageHandler: Send + Sync {
    fn on_page(&self, page: &FetchedPage) -> Result<(), CrawlError>;
}

/// Handler that ignores pages, for callers that only want the batch result
pub struct NoopHandler;

impl PageHandler for NoopHandler {
    fn on_page(&self, _page: &FetchedPage) -> Result<(), CrawlError> {
        Ok(())
    }
}

/// Same-host crawler with a bounded worker pool
#[derive(Clone)]
pub struct Crawler {
    client: Client,
    workers: usize,
}

impl Crawler {
    pub fn new(client: Client, workers: usize) -> Self {
        Self {
            client,
            workers: workers.max(1),
        }
    }

    /// Crawls every page reachable from `root_url` on the root's host
    ///
    /// `handler` is called for each page right after it is fetched. A root
    /// URL that does not parse fails immediately.
    pub async fn traverse(
        &self,
        root_url: &str,
        handler: Arc<dyn PageHandler>,
        cancel: &CancellationToken,
    ) -> CrawlOutcome {
        let root = match parse_http_url(root_url) {
            Ok(url) => url,
            Err(e) => {
                let err = CrawlError::InvalidRoot {
                    url: root_url.to_string(),
                    reason: e.to_string(),
                };
                return CrawlOutcome::FetchFailure(err.to_string());
            }
        };

        if cancel.is_cancelled() {
            return CrawlOutcome::Cancelled;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let traversal = Arc::new(Traversal {
            root: root.clone(),
            client: self.client.clone(),
            handler,
            token: cancel.child_token(),
            done: CancellationToken::new(),
            visited: Mutex::new(HashSet::new()),
            pages: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            outstanding: AtomicUsize::new(0),
            queue_tx: tx,
            queue_rx: tokio::sync::Mutex::new(rx),
        });

        tracing::debug!("Starting traversal of {} with {} workers", root, self.workers);
        traversal.enqueue(root);

        let mut workers = JoinSet::new();
        for _ in 0..self.workers {
            let traversal = Arc::clone(&traversal);
            workers.spawn(async move { traversal.work().await });
        }
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Crawl worker terminated abnormally: {}", e);
                traversal.fail(format!("Crawl worker terminated abnormally: {}", e));
            }
        }

        if cancel.is_cancelled() {
            return CrawlOutcome::Cancelled;
        }
        if let Some(reason) = traversal.take_failure() {
            return CrawlOutcome::FetchFailure(reason);
        }

        CrawlOutcome::Success(traversal.take_pages())
    }
}

/// State shared by the workers of one traversal
struct Traversal {
    root: Url,
    client: Client,
    handler: Arc<dyn PageHandler>,
    token: CancellationToken,
    done: CancellationToken,
    visited: Mutex<HashSet<String>>,
    pages: Mutex<Vec<FetchedPage>>,
    failure: Mutex<Option<String>>,
    outstanding: AtomicUsize,
    queue_tx: UnboundedSender<Url>,
    queue_rx: tokio::sync::Mutex<UnboundedReceiver<Url>>,
}

impl Traversal {
    /// Claims `url` and queues it; returns false if its path was already seen
    fn enqueue(&self, url: Url) -> bool {
        let claimed = self
            .visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(page_path(&url));
        if !claimed {
            return false;
        }

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.queue_tx.send(url).is_err() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    async fn work(&self) {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = self.done.cancelled() => break,
                url = async { self.queue_rx.lock().await.recv().await } => url,
            };
            let Some(url) = next else {
                break;
            };

            self.process(url).await;

            if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.done.cancel();
            }
        }
    }

    async fn process(&self, url: Url) {
        if self.token.is_cancelled() {
            return;
        }

        let fetched = tokio::select! {
            _ = self.token.cancelled() => return,
            result = fetch_page(&self.client, &url) => result,
        };

        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("{}", e);
                self.fail(e.to_string());
                return;
            }
        };

        if self.token.is_cancelled() {
            return;
        }

        tracing::debug!("Fetched {} ({})", url, page.status_code);
        if let Err(e) = self.handler.on_page(&page) {
            tracing::warn!("Failed to handle page {}: {}", url, e);
        }

        for link in extract_links(&page.html, &page.url) {
            if self.token.is_cancelled() {
                break;
            }
            if same_host(&link, &self.root) {
                self.enqueue(link);
            }
        }

        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(page);
    }

    /// Records the first failure and stops all workers of this traversal
    fn fail(&self, reason: String) {
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if failure.is_none() {
            *failure = Some(reason);
        }
        self.token.cancel();
    }

    fn take_failure(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn take_pages(&self) -> Vec<FetchedPage> {
        std::mem::take(&mut *self.pages.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
