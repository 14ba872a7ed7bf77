//! Statistics over the index
//!
//! This module provides functionality for extracting and displaying
//! index statistics from the storage layer.

use crate::storage::{RunRecord, Storage, StorageResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body of `GET /statistics`
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsResponse {
    pub result: bool,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
    #[serde(rename = "lastRun", skip_serializing_if = "Option::is_none")]
    pub last_run: Option<RunSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalStatistics {
    pub sites: u64,
    pub pages: u64,
    pub lemmas: u64,
    /// True while any site is being crawled
    pub indexing: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: String,
    /// Last status change, epoch milliseconds
    pub status_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pages: u64,
    pub lemmas: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: i64,
    pub status: String,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

impl From<RunRecord> for RunSummary {
    fn from(run: RunRecord) -> Self {
        let duration_seconds = match (parse_time(&run.started_at), run.finished_at.as_deref()) {
            (Some(started), Some(finished)) => {
                parse_time(finished).map(|finished| (finished - started).num_seconds())
            }
            _ => None,
        };

        Self {
            id: run.id,
            status: run.status.to_db_string().to_string(),
            started_at: run.started_at,
            finished_at: run.finished_at,
            duration_seconds,
        }
    }
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<Statistics> {
    let sites = storage.list_sites()?;

    let mut detailed = Vec::with_capacity(sites.len());
    for site in &sites {
        detailed.push(SiteStatistics {
            url: site.url.clone(),
            name: site.name.clone(),
            status: site.status.to_db_string().to_string(),
            status_time: parse_time(&site.status_time)
                .map(|t| t.timestamp_millis())
                .unwrap_or(0),
            error: site.last_error.clone(),
            pages: storage.count_pages_by_site(site.id)?,
            lemmas: storage.count_lemmas_by_site(site.id)?,
        });
    }

    Ok(Statistics {
        total: TotalStatistics {
            sites: sites.len() as u64,
            pages: storage.count_pages()?,
            lemmas: storage.count_lemmas()?,
            indexing: sites.iter().any(|s| !s.status.is_terminal()),
        },
        detailed,
        last_run: storage.get_latest_run()?.map(RunSummary::from),
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &Statistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites: {}", stats.total.sites);
    println!("  Pages: {}", stats.total.pages);
    println!("  Lemmas: {}", stats.total.lemmas);
    println!(
        "  Indexing: {}",
        if stats.total.indexing { "in progress" } else { "idle" }
    );
    println!();

    if !stats.detailed.is_empty() {
        println!("Sites:");
        for site in &stats.detailed {
            println!("  {} ({})", site.name, site.url);
            println!(
                "    Status: {}  Pages: {}  Lemmas: {}",
                site.status, site.pages, site.lemmas
            );
            if let Some(error) = &site.error {
                println!("    Error: {}", error);
            }
        }
        println!();
    }

    if let Some(run) = &stats.last_run {
        print!("Last run #{}: {} (started {}", run.id, run.status, run.started_at);
        match run.duration_seconds {
            Some(seconds) => println!(", took {}s)", seconds),
            None => println!(")"),
        }
    }
}
