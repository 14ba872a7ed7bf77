//! HTTP request handlers for the web server.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::indexing::IndexingResponse;
use crate::output::{load_statistics, StatisticsResponse};
use crate::search::{SearchResponse, EMPTY_QUERY_MESSAGE};
use crate::storage::lock_storage;

const MISSING_URL_MESSAGE: &str = "Page URL is not specified";

/// Query params for search.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub site: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// Query params for single page indexing.
#[derive(Debug, Deserialize)]
pub struct IndexPageParams {
    pub url: Option<String>,
}

/// Aggregate counts and per-site status.
pub async fn statistics(State(state): State<AppState>) -> Response {
    let loaded = lock_storage(&state.storage).and_then(|storage| load_statistics(&*storage));
    match loaded {
        Ok(statistics) => Json(StatisticsResponse {
            result: true,
            statistics,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to load statistics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(IndexingResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}

pub async fn start_indexing(State(state): State<AppState>) -> Json<IndexingResponse> {
    Json(state.coordinator.start())
}

pub async fn stop_indexing(State(state): State<AppState>) -> Json<IndexingResponse> {
    Json(state.coordinator.stop().await)
}

/// Reindex one page. The URL comes from the query string or a form body.
pub async fn index_page(
    State(state): State<AppState>,
    Query(params): Query<IndexPageParams>,
    body: String,
) -> Json<IndexingResponse> {
    let url = params
        .url
        .or_else(|| form_value(&body, "url"))
        .filter(|url| !url.trim().is_empty());

    match url {
        Some(url) => Json(state.coordinator.index_single_page(&url).await),
        None => Json(IndexingResponse::error(MISSING_URL_MESSAGE)),
    }
}

/// Delete every site, page, lemma and index entry.
pub async fn reset_index(State(state): State<AppState>) -> Json<IndexingResponse> {
    Json(state.coordinator.reset_all().await)
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let Some(query) = params.query else {
        return Json(SearchResponse::failure(EMPTY_QUERY_MESSAGE, 0));
    };

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(state.default_limit);
    let engine = state.search.clone();
    let site = params.site;

    // Ranking and snippet building hold the storage lock for the whole query
    let response = tokio::task::spawn_blocking(move || {
        engine.query(&query, site.as_deref(), offset, limit)
    })
    .await;

    match response {
        Ok(response) => Json(response),
        Err(e) => {
            tracing::error!("Search task failed: {}", e);
            Json(SearchResponse::failure(e.to_string(), 0))
        }
    }
}

fn form_value(body: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(body.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
