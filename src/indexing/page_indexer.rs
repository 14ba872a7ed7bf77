//! Atomic indexing of a single page

use crate::lemma::LemmaExtractor;
use crate::storage::{lock_storage, NewPage, SqliteStorage, Storage, StorageResult};
use std::sync::{Arc, Mutex};

/// Writes one page and its lemmas into the index
///
/// Indexing a path that is already stored first retracts the old version, so
/// reindexing is idempotent and lemma frequencies never double count.
pub struct PageIndexer {
    storage: Arc<Mutex<SqliteStorage>>,
    extractor: LemmaExtractor,
}

impl PageIndexer {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, extractor: LemmaExtractor) -> Self {
        Self { storage, extractor }
    }

    /// Stores the page at (site, path) and indexes its lemmas
    ///
    /// Runs in a single transaction. Returns the new page id.
    pub fn index(&self, site_id: i64, path: &str, status_code: u16, html: &str) -> StorageResult<i64> {
        let lemmas = self.extractor.extract_from_html(html);

        let mut storage = lock_storage(&self.storage)?;
        let page_id = storage.with_transaction(|s| {
            if let Some(existing) = s.find_page(site_id, path)? {
                retract_page(s, existing.id)?;
            }

            let page_id = s.create_page(&NewPage {
                site_id,
                path: path.to_string(),
                code: status_code,
                content: html.to_string(),
            })?;

            for (lemma, count) in &lemmas {
                let record = match s.find_lemma(site_id, lemma)? {
                    Some(record) => record,
                    None => s.create_lemma(site_id, lemma)?,
                };
                s.update_lemma_frequency(record.id, record.frequency + 1)?;
                s.create_index_entry(page_id, record.id, f64::from(*count))?;
            }

            Ok(page_id)
        })?;

        tracing::debug!(
            "Indexed page {} of site {} with {} lemmas",
            path,
            site_id,
            lemmas.len()
        );
        Ok(page_id)
    }
}

/// Removes a page and takes it out of every lemma's frequency
///
/// Lemmas left on no page are deleted.
pub fn retract_page<S: Storage>(storage: &mut S, page_id: i64) -> StorageResult<()> {
    for entry in storage.find_index_entries_by_page(page_id)? {
        let lemma = storage.get_lemma(entry.lemma_id)?;
        let frequency = lemma.frequency - 1;
        if frequency <= 0 {
            storage.delete_lemma(lemma.id)?;
        } else {
            storage.update_lemma_frequency(lemma.id, frequency)?;
        }
    }

    storage.delete_index_entries_by_pages(&[page_id])?;
    storage.delete_page(page_id)
}
