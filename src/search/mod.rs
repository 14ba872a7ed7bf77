//! Search and ranking
//!
//! Queries are lemmatized with the same extractor used for indexing, matched
//! against each site's inverted index and ranked by summed lemma rank
//! relative to the site's best page.

mod engine;
mod snippet;
mod types;

pub use engine::SearchEngine;
pub use snippet::{build_snippet, query_tokens, MIN_TOKEN_LENGTH};
pub use types::{
    paginate, SearchItem, SearchResponse, EMPTY_QUERY_MESSAGE, INVALID_PAGE_MESSAGE,
    NOTHING_FOUND_MESSAGE, SITE_NOT_INDEXED_MESSAGE,
};
