//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    IndexRecord, LemmaRecord, NewPage, PageRecord, RunRecord, RunStatus, SiteRecord,
};
use crate::SearchEngineError;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";
const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database file and applies the schema
    pub fn new(path: &Path) -> Result<Self, SearchEngineError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SearchEngineError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Runs `f` inside a single transaction
    ///
    /// Commits when `f` succeeds and rolls back otherwise. When a transaction
    /// is already open, `f` simply joins it.
    pub fn with_transaction<T, F>(&mut self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Self) -> StorageResult<T>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// `?, ?, ?` for an IN list of `n` values
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SiteStatus::Failed),
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now(), config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let finished_at = match status {
            RunStatus::Running => None,
            _ => Some(now()),
        };
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), finished_at, run_id],
        )?;
        Ok(())
    }

    // ===== Sites =====

    fn create_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO sites (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, name, status.to_db_string(), now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE id = ?1", SITE_COLUMNS),
                params![site_id],
                site_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::SiteNotFound(format!("Site ID {}", site_id)))
    }

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE url = ?1", SITE_COLUMNS),
                params![url],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn find_sites_by_urls(&self, urls: &[String]) -> StorageResult<Vec<SiteRecord>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {} FROM sites WHERE url IN ({}) ORDER BY id",
            SITE_COLUMNS,
            placeholders(urls.len())
        );
        let mut stmt = self.conn.prepare(&query)?;
        let sites = stmt
            .query_map(params_from_iter(urls.iter()), site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM sites ORDER BY id", SITE_COLUMNS))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE id = ?4",
            params![status.to_db_string(), now(), last_error, site_id],
        )?;
        if updated == 0 {
            return Err(StorageError::SiteNotFound(format!("Site ID {}", site_id)));
        }
        Ok(())
    }

    fn update_sites_in_status(
        &mut self,
        from: SiteStatus,
        to: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<usize> {
        let updated = self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE status = ?4",
            params![to.to_db_string(), now(), last_error, from.to_db_string()],
        )?;
        Ok(updated)
    }

    fn delete_sites_by_urls(&mut self, urls: &[String]) -> StorageResult<usize> {
        if urls.is_empty() {
            return Ok(0);
        }

        let query = format!("DELETE FROM sites WHERE url IN ({})", placeholders(urls.len()));
        let deleted = self.conn.execute(&query, params_from_iter(urls.iter()))?;
        Ok(deleted)
    }

    fn delete_all(&mut self) -> StorageResult<()> {
        self.with_transaction(|s| {
            s.conn.execute_batch(
                "
                DELETE FROM index_entries;
                DELETE FROM lemmas;
                DELETE FROM pages;
                DELETE FROM sites;
            ",
            )?;
            Ok(())
        })
    }

    // ===== Pages =====

    fn create_page(&mut self, page: &NewPage) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
            params![page.site_id, page.path, page.code, page.content],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn create_pages(&mut self, pages: &[NewPage]) -> StorageResult<usize> {
        self.with_transaction(|s| {
            for page in pages {
                s.create_page(page)?;
            }
            Ok(pages.len())
        })
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![page_id],
                page_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::PageNotFound(format!("Page ID {}", page_id)))
    }

    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM pages WHERE site_id = ?1 AND path = ?2",
                    PAGE_COLUMNS
                ),
                params![site_id, path],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn delete_page(&mut self, page_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;
        Ok(())
    }

    fn delete_pages_by_site_ids(&mut self, site_ids: &[i64]) -> StorageResult<usize> {
        if site_ids.is_empty() {
            return Ok(0);
        }

        let query = format!(
            "DELETE FROM pages WHERE site_id IN ({})",
            placeholders(site_ids.len())
        );
        let deleted = self.conn.execute(&query, params_from_iter(site_ids.iter()))?;
        Ok(deleted)
    }

    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Lemmas =====

    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, site_id, lemma, frequency FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
                params![site_id, lemma],
                |row| {
                    Ok(LemmaRecord {
                        id: row.get(0)?,
                        site_id: row.get(1)?,
                        lemma: row.get(2)?,
                        frequency: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn get_lemma(&self, lemma_id: i64) -> StorageResult<LemmaRecord> {
        self.conn
            .query_row(
                "SELECT id, site_id, lemma, frequency FROM lemmas WHERE id = ?1",
                params![lemma_id],
                |row| {
                    Ok(LemmaRecord {
                        id: row.get(0)?,
                        site_id: row.get(1)?,
                        lemma: row.get(2)?,
                        frequency: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::LemmaNotFound(lemma_id))
    }

    fn create_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<LemmaRecord> {
        self.conn.execute(
            "INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?1, ?2, 0)",
            params![site_id, lemma],
        )?;
        Ok(LemmaRecord {
            id: self.conn.last_insert_rowid(),
            site_id,
            lemma: lemma.to_string(),
            frequency: 0,
        })
    }

    fn update_lemma_frequency(&mut self, lemma_id: i64, frequency: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE lemmas SET frequency = ?1 WHERE id = ?2",
            params![frequency, lemma_id],
        )?;
        Ok(())
    }

    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM lemmas WHERE id = ?1", params![lemma_id])?;
        Ok(())
    }

    fn count_lemmas_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemmas WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_lemmas(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM lemmas", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Index Entries =====

    fn create_index_entry(
        &mut self,
        page_id: i64,
        lemma_id: i64,
        rank: f64,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO index_entries (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)",
            params![page_id, lemma_id, rank],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_index_entries_by_page(&self, page_id: i64) -> StorageResult<Vec<IndexRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, page_id, lemma_id, rank FROM index_entries WHERE page_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![page_id], |row| {
                Ok(IndexRecord {
                    id: row.get(0)?,
                    page_id: row.get(1)?,
                    lemma_id: row.get(2)?,
                    rank: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn find_pages_by_lemma(&self, lemma_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT page_id FROM index_entries WHERE lemma_id = ?1 ORDER BY page_id")?;
        let pages = stmt
            .query_map(params![lemma_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(pages)
    }

    fn sum_ranks_by_page(&self, page_id: i64, lemma_ids: &[i64]) -> StorageResult<f64> {
        if lemma_ids.is_empty() {
            return Ok(0.0);
        }

        let query = format!(
            "SELECT COALESCE(SUM(rank), 0.0) FROM index_entries WHERE page_id = ? AND lemma_id IN ({})",
            placeholders(lemma_ids.len())
        );
        let values: Vec<i64> = std::iter::once(page_id)
            .chain(lemma_ids.iter().copied())
            .collect();
        let sum: f64 = self
            .conn
            .query_row(&query, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(sum)
    }

    fn delete_index_entries_by_pages(&mut self, page_ids: &[i64]) -> StorageResult<usize> {
        if page_ids.is_empty() {
            return Ok(0);
        }

        let query = format!(
            "DELETE FROM index_entries WHERE page_id IN ({})",
            placeholders(page_ids.len())
        );
        let deleted = self.conn.execute(&query, params_from_iter(page_ids.iter()))?;
        Ok(deleted)
    }
}
