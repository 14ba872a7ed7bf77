//! Indexing orchestration
//!
//! `IndexingCoordinator` owns the run lifecycle and launches one crawl per
//! configured site; `PageIndexer` maintains the inverted index one page at a
//! time.

mod coordinator;
mod page_indexer;

pub use coordinator::{IndexingCoordinator, IndexingResponse, STOPPED_MESSAGE};
pub use page_indexer::{retract_page, PageIndexer};
