use serde::Deserialize;

/// Main configuration structure for Lemma Search
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub indexing: IndexingConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// Indexing run behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct IndexingConfig {
    /// Number of sites crawled at the same time
    #[serde(rename = "site-workers", default = "default_site_workers")]
    pub site_workers: u32,

    /// Number of fetch workers draining one site's link queue
    #[serde(rename = "crawl-workers", default = "default_crawl_workers")]
    pub crawl_workers: u32,

    /// Chunk size for bulk page persistence after a traversal
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// How long a stop request waits for in-flight tasks (milliseconds)
    #[serde(rename = "stop-grace-ms", default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            site_workers: default_site_workers(),
            crawl_workers: default_crawl_workers(),
            batch_size: default_batch_size(),
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

/// HTTP client parameters used for every page fetch
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(default)]
    pub referrer: String,

    /// Request timeout (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Search and lemmatization settings
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub language: Language,

    /// Characters taken on each side of the first query hit
    #[serde(rename = "snippet-radius", default = "default_snippet_radius")]
    pub snippet_radius: usize,

    /// Lemmas present on more than this share of a site's pages are ignored
    #[serde(rename = "max-lemma-fraction", default = "default_max_lemma_fraction")]
    pub max_lemma_fraction: f64,

    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            snippet_radius: default_snippet_radius(),
            max_lemma_fraction: default_max_lemma_fraction(),
            default_limit: default_limit(),
        }
    }
}

/// Language of the indexed texts; selects alphabet, stemmer and function words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Russian,
    English,
}

/// A site root to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    pub url: String,
    pub name: String,
}

fn default_site_workers() -> u32 {
    4
}

fn default_crawl_workers() -> u32 {
    16
}

fn default_batch_size() -> usize {
    50
}

fn default_stop_grace_ms() -> u64 {
    3000
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_snippet_radius() -> usize {
    120
}

fn default_max_lemma_fraction() -> f64 {
    0.8
}

fn default_limit() -> i64 {
    20
}
