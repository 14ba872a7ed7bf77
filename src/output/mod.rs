//! Output module for reporting on the index
//!
//! This module handles:
//! - Aggregating per-site and total statistics
//! - Printing statistics and search results for the CLI

pub mod stats;

pub use stats::{
    load_statistics, print_statistics, RunSummary, SiteStatistics, Statistics,
    StatisticsResponse, TotalStatistics,
};

use crate::search::SearchResponse;

/// Prints a page of search results to stdout
pub fn print_search_results(query: &str, response: &SearchResponse) {
    if let Some(error) = &response.error {
        println!("{}", error);
    }
    if !response.result {
        return;
    }

    println!(
        "=== {} result(s) for {:?}, showing {} ===\n",
        response.count,
        query,
        response.data.len()
    );
    for item in &response.data {
        println!("[{:.3}] {}{}", item.relevance, item.site, item.uri);
        if !item.title.is_empty() {
            println!("  {}", item.title);
        }
        println!("  {}", item.snippet);
        println!();
    }
}
