//! Lemma Search main entry point
//!
//! This is the command-line interface for the Lemma Search crawler and
//! search engine.

use anyhow::Context;
use clap::Parser;
use lemma_search::config::{load_config_with_hash, Config};
use lemma_search::indexing::IndexingCoordinator;
use lemma_search::lemma::LemmaExtractor;
use lemma_search::output::{load_statistics, print_search_results, print_statistics};
use lemma_search::search::SearchEngine;
use lemma_search::server::{serve, AppState};
use lemma_search::storage::{lock_storage, open_storage, SqliteStorage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Lemma Search: a site crawler and lemma-based search engine
///
/// Lemma Search crawls the configured sites, indexes each page by the normal
/// forms of its words and answers ranked queries over an HTTP API.
#[derive(Parser, Debug)]
#[command(name = "lemma-search")]
#[command(version = "0.1.0")]
#[command(about = "A site crawler and lemma-based search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run one full indexing pass in the foreground and exit
    #[arg(long, conflicts_with_all = ["search", "stats", "reset"])]
    index: bool,

    /// Search the index and print the results
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["index", "stats", "reset"])]
    search: Option<String>,

    /// Restrict the search to one site root URL
    #[arg(long, requires = "search")]
    site: Option<String>,

    /// Number of results to skip
    #[arg(long, default_value_t = 0, allow_negative_numbers = true, requires = "search")]
    offset: i64,

    /// Maximum number of results to print
    #[arg(long, allow_negative_numbers = true, requires = "search")]
    limit: Option<i64>,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["index", "search", "reset"])]
    stats: bool,

    /// Delete all indexed data and exit
    #[arg(long, conflicts_with_all = ["index", "search", "stats"])]
    reset: bool,
}

/// Components shared by every mode
struct App {
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    coordinator: Arc<IndexingCoordinator>,
    search: Arc<SearchEngine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let app = build_app(config, config_hash)?;

    if cli.index {
        handle_index(&app).await
    } else if let Some(query) = cli.search.as_deref() {
        handle_search(&app, query, cli.site.as_deref(), cli.offset, cli.limit)
    } else if cli.stats {
        handle_stats(&app)
    } else if cli.reset {
        handle_reset(&app).await
    } else {
        handle_serve(&app).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lemma_search=info,warn"),
            1 => EnvFilter::new("lemma_search=debug,info"),
            2 => EnvFilter::new("lemma_search=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn build_app(config: Config, config_hash: String) -> anyhow::Result<App> {
    let storage = open_storage(Path::new(&config.storage.database_path))
        .with_context(|| format!("failed to open {}", config.storage.database_path))?;
    let storage = Arc::new(Mutex::new(storage));
    let config = Arc::new(config);

    let extractor = LemmaExtractor::for_language(config.search.language);
    let search = SearchEngine::new(
        Arc::clone(&storage),
        extractor.clone(),
        config.search.clone(),
    );
    let coordinator = IndexingCoordinator::new(
        Arc::clone(&config),
        config_hash,
        Arc::clone(&storage),
        extractor,
    )?;

    Ok(App {
        config,
        storage,
        coordinator: Arc::new(coordinator),
        search: Arc::new(search),
    })
}

/// Handles the default mode: serves the HTTP API until interrupted
async fn handle_serve(app: &App) -> anyhow::Result<()> {
    let state = AppState::new(
        Arc::clone(&app.coordinator),
        Arc::clone(&app.search),
        app.config.search.default_limit,
    );
    serve(state, &app.config.server.bind).await
}

/// Handles the --index mode: one full run, stopped cleanly on Ctrl-C
async fn handle_index(app: &App) -> anyhow::Result<()> {
    tracing::info!("Indexing {} sites", app.config.sites.len());

    let response = app.coordinator.start();
    if !response.result {
        anyhow::bail!(response.error.unwrap_or_default());
    }

    tokio::select! {
        _ = app.coordinator.wait_for_completion() => {
            tracing::info!("Indexing completed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping indexing");
            app.coordinator.stop().await;
        }
    }

    let storage = lock_storage(&app.storage)?;
    print_statistics(&load_statistics(&*storage)?);
    Ok(())
}

/// Handles the --search mode
fn handle_search(
    app: &App,
    query: &str,
    site: Option<&str>,
    offset: i64,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let limit = limit.unwrap_or(app.config.search.default_limit);
    let response = app.search.query(query, site, offset, limit);
    print_search_results(query, &response);
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(app: &App) -> anyhow::Result<()> {
    println!("Database: {}\n", app.config.storage.database_path);

    let storage = lock_storage(&app.storage)?;
    let stats = load_statistics(&*storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --reset mode
async fn handle_reset(app: &App) -> anyhow::Result<()> {
    let response = app.coordinator.reset_all().await;
    match response.error {
        Some(error) => anyhow::bail!(error),
        None => {
            println!("All indexed data deleted");
            Ok(())
        }
    }
}
