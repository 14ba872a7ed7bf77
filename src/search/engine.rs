//! Ranked lemma search over the persisted index

use crate::config::SearchConfig;
use crate::lemma::{extract_title, LemmaExtractor};
use crate::search::snippet::build_snippet;
use crate::search::types::{
    paginate, SearchItem, SearchResponse, EMPTY_QUERY_MESSAGE, SITE_NOT_INDEXED_MESSAGE,
};
use crate::storage::{
    lock_storage, LemmaRecord, PageRecord, SiteRecord, SqliteStorage, Storage, StorageResult,
};
use crate::url::normalize_site_url;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// A candidate page with its relative relevance, before snippets are built
struct Hit {
    site: SiteRecord,
    page: PageRecord,
    relevance: f64,
}

/// Answers search queries against the index built by the coordinator
pub struct SearchEngine {
    storage: Arc<Mutex<SqliteStorage>>,
    extractor: LemmaExtractor,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(
        storage: Arc<Mutex<SqliteStorage>>,
        extractor: LemmaExtractor,
        config: SearchConfig,
    ) -> Self {
        Self {
            storage,
            extractor,
            config,
        }
    }

    /// Runs a query, optionally restricted to one site root
    ///
    /// Results from all candidate sites are merged and ordered by relevance
    /// (stable on ties), then paginated. Validation problems come back as an
    /// unsuccessful response rather than an error.
    pub fn query(&self, text: &str, site: Option<&str>, offset: i64, limit: i64) -> SearchResponse {
        if text.trim().is_empty() {
            return SearchResponse::failure(EMPTY_QUERY_MESSAGE, 0);
        }

        let hits = match self.collect_hits(text, site) {
            Ok(Some(hits)) => hits,
            Ok(None) => return SearchResponse::failure(SITE_NOT_INDEXED_MESSAGE, 0),
            Err(e) => {
                tracing::error!("Search for {:?} failed: {}", text, e);
                return SearchResponse::failure(e.to_string(), 0);
            }
        };

        let mut items: Vec<SearchItem> = hits
            .into_iter()
            .map(|hit| SearchItem {
                site: hit.site.url,
                site_name: hit.site.name,
                uri: hit.page.path,
                title: extract_title(&hit.page.content).unwrap_or_default(),
                snippet: build_snippet(&hit.page.content, text, self.config.snippet_radius),
                relevance: hit.relevance,
            })
            .collect();

        tracing::debug!("Query {:?} matched {} pages", text, items.len());
        if items.is_empty() {
            return SearchResponse::nothing_found();
        }

        items.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        });
        paginate(items, offset, limit)
    }

    /// Ranked hits of every candidate site; None if the site filter matches
    /// no stored site
    fn collect_hits(&self, text: &str, site: Option<&str>) -> StorageResult<Option<Vec<Hit>>> {
        let query_lemmas = self.extractor.lemma_set(text);
        let storage = lock_storage(&self.storage)?;

        let sites = match site.map(str::trim).filter(|s| !s.is_empty()) {
            Some(filter) => {
                let url = normalize_site_url(filter).unwrap_or_else(|_| filter.to_string());
                match storage.find_site_by_url(&url)? {
                    Some(site) => vec![site],
                    None => return Ok(None),
                }
            }
            None => storage.list_sites()?,
        };

        let mut hits = Vec::new();
        for site in sites {
            hits.extend(self.site_hits(&storage, site, &query_lemmas)?);
        }
        Ok(Some(hits))
    }

    /// One site's contribution: intersect page sets of the surviving query
    /// lemmas, rarest first, and normalize by the site's best page
    fn site_hits(
        &self,
        storage: &SqliteStorage,
        site: SiteRecord,
        query_lemmas: &[String],
    ) -> StorageResult<Vec<Hit>> {
        let lemmas = self.filtered_lemmas(storage, &site, query_lemmas)?;
        let Some((rarest, rest)) = lemmas.split_first() else {
            return Ok(Vec::new());
        };

        let mut candidates = storage.find_pages_by_lemma(rarest.id)?;
        for lemma in rest {
            if candidates.is_empty() {
                break;
            }
            let pages: HashSet<i64> = storage.find_pages_by_lemma(lemma.id)?.into_iter().collect();
            candidates.retain(|page_id| pages.contains(page_id));
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let lemma_ids: Vec<i64> = lemmas.iter().map(|l| l.id).collect();
        let mut scored = Vec::with_capacity(candidates.len());
        for page_id in candidates {
            let absolute = storage.sum_ranks_by_page(page_id, &lemma_ids)?;
            scored.push((page_id, absolute));
        }

        let max = scored.iter().map(|(_, abs)| *abs).fold(0.0_f64, f64::max);
        let mut hits = Vec::with_capacity(scored.len());
        for (page_id, absolute) in scored {
            let relevance = if max == 0.0 { 0.0 } else { absolute / max };
            hits.push(Hit {
                site: site.clone(),
                page: storage.get_page(page_id)?,
                relevance,
            });
        }
        Ok(hits)
    }

    /// Query lemmas present on the site and not over-common, rarest first
    fn filtered_lemmas(
        &self,
        storage: &SqliteStorage,
        site: &SiteRecord,
        query_lemmas: &[String],
    ) -> StorageResult<Vec<LemmaRecord>> {
        if query_lemmas.is_empty() {
            return Ok(Vec::new());
        }

        let total_pages = storage.count_pages_by_site(site.id)?;
        if total_pages == 0 {
            return Ok(Vec::new());
        }
        let threshold =
            ((total_pages as f64 * self.config.max_lemma_fraction).round() as i64).max(1);

        let mut lemmas = Vec::new();
        for text in query_lemmas {
            if let Some(lemma) = storage.find_lemma(site.id, text)? {
                if lemma.frequency <= threshold {
                    lemmas.push(lemma);
                }
            }
        }
        lemmas.sort_by_key(|lemma| lemma.frequency);
        Ok(lemmas)
    }
}
