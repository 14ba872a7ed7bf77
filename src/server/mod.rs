//! HTTP API for the indexer and search engine.
//!
//! A thin JSON layer over the coordinator and search engine:
//! - Statistics over the stored index
//! - Starting and stopping full indexing runs
//! - Reindexing a single page and wiping the index
//! - Ranked search with pagination

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::indexing::IndexingCoordinator;
use crate::search::SearchEngine;
use crate::storage::SqliteStorage;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<IndexingCoordinator>,
    pub search: Arc<SearchEngine>,
    pub storage: Arc<Mutex<SqliteStorage>>,
    /// Page size used when a search request has no `limit`.
    pub default_limit: i64,
}

impl AppState {
    pub fn new(
        coordinator: Arc<IndexingCoordinator>,
        search: Arc<SearchEngine>,
        default_limit: i64,
    ) -> Self {
        Self {
            storage: coordinator.storage(),
            coordinator,
            search,
            default_limit,
        }
    }
}

/// Start the web server.
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
