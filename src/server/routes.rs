//! Router configuration for the web server.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/statistics", get(handlers::statistics))
        // Indexing control
        .route("/startIndexing", get(handlers::start_indexing))
        .route("/stopIndexing", get(handlers::stop_indexing))
        .route("/indexPage", post(handlers::index_page))
        .route("/", delete(handlers::reset_index))
        .route("/search", get(handlers::search))
        .with_state(state)
}
