//! Crawler module for web page fetching and traversal
//!
//! This module contains the crawling logic, including:
//! - HTTP client construction and single-page fetching
//! - Link extraction from HTML
//! - Cancellable, bounded-parallel traversal of one site

mod fetcher;
mod parser;
mod traversal;

pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use parser::extract_links;
pub use traversal::{CrawlOutcome, Crawler, NoopHandler, PageHandler};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors raised while crawling
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Invalid crawl root {url}: {reason}")]
    InvalidRoot { url: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
