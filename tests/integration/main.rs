//! Integration tests for Lemma Search
//!
//! These tests use wiremock to serve small sites and drive the crawler,
//! the indexing coordinator and the search engine end-to-end.

mod crawl_tests;
mod indexing_tests;
mod search_tests;
mod support;
