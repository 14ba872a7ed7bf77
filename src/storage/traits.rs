//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::SiteStatus;
use crate::storage::{
    IndexRecord, LemmaRecord, NewPage, PageRecord, RunRecord, RunStatus, SiteRecord,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Lemma not found: {0}")]
    LemmaNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StorageError::ConstraintViolation(
                    msg.clone().unwrap_or_else(|| e.to_string()),
                )
            }
            _ => StorageError::Sqlite(err),
        }
    }
}

impl StorageError {
    /// True for unique/foreign key violations
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StorageError::ConstraintViolation(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Entities reference each other by id only. Deleting a site removes its
/// pages and lemmas; deleting a page or a lemma removes its index entries.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new indexing run and returns its id
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets a run's status and, for terminal statuses, its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Sites =====

    /// Creates a site and returns its id
    fn create_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64>;

    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord>;

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    fn find_sites_by_urls(&self, urls: &[String]) -> StorageResult<Vec<SiteRecord>>;

    /// All sites ordered by id
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Sets status, status time and last error of a site
    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Moves every site in `from` status to `to`, returning how many changed
    fn update_sites_in_status(
        &mut self,
        from: SiteStatus,
        to: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<usize>;

    /// Deletes the sites with these root URLs and everything they own
    fn delete_sites_by_urls(&mut self, urls: &[String]) -> StorageResult<usize>;

    /// Deletes every site, page, lemma and index entry
    fn delete_all(&mut self) -> StorageResult<()>;

    // ===== Pages =====

    fn create_page(&mut self, page: &NewPage) -> StorageResult<i64>;

    /// Inserts all pages or none of them
    fn create_pages(&mut self, pages: &[NewPage]) -> StorageResult<usize>;

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Deletes a page together with its index entries
    fn delete_page(&mut self, page_id: i64) -> StorageResult<()>;

    fn delete_pages_by_site_ids(&mut self, site_ids: &[i64]) -> StorageResult<usize>;

    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64>;

    fn count_pages(&self) -> StorageResult<u64>;

    // ===== Lemmas =====

    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    fn get_lemma(&self, lemma_id: i64) -> StorageResult<LemmaRecord>;

    /// Creates a lemma with frequency 0
    fn create_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<LemmaRecord>;

    fn update_lemma_frequency(&mut self, lemma_id: i64, frequency: i64) -> StorageResult<()>;

    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()>;

    fn count_lemmas_by_site(&self, site_id: i64) -> StorageResult<u64>;

    fn count_lemmas(&self) -> StorageResult<u64>;

    // ===== Index Entries =====

    fn create_index_entry(&mut self, page_id: i64, lemma_id: i64, rank: f64)
        -> StorageResult<i64>;

    fn find_index_entries_by_page(&self, page_id: i64) -> StorageResult<Vec<IndexRecord>>;

    /// Ids of the pages that contain a lemma
    fn find_pages_by_lemma(&self, lemma_id: i64) -> StorageResult<Vec<i64>>;

    /// Sum of ranks on a page over the given lemmas only
    fn sum_ranks_by_page(&self, page_id: i64, lemma_ids: &[i64]) -> StorageResult<f64>;

    fn delete_index_entries_by_pages(&mut self, page_ids: &[i64]) -> StorageResult<usize>;
}
