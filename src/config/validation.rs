use crate::config::types::{Config, HttpConfig, IndexingConfig, SearchConfig, ServerConfig, SiteEntry};
use crate::ConfigError;
use std::collections::HashSet;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_indexing_config(&config.indexing)?;
    validate_http_config(&config.http)?;
    validate_storage_path(&config.storage.database_path)?;
    validate_server_config(&config.server)?;
    validate_search_config(&config.search)?;
    validate_sites(&config.sites)?;
    Ok(())
}

fn validate_indexing_config(config: &IndexingConfig) -> Result<(), ConfigError> {
    if config.site_workers < 1 || config.site_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "site-workers must be between 1 and 64, got {}",
            config.site_workers
        )));
    }

    if config.crawl_workers < 1 || config.crawl_workers > 256 {
        return Err(ConfigError::Validation(format!(
            "crawl-workers must be between 1 and 256, got {}",
            config.crawl_workers
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout-ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }

    Ok(())
}

fn validate_storage_path(path: &str) -> Result<(), ConfigError> {
    if path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid server bind address '{}': {}", config.bind, e))
    })?;
    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.snippet_radius < 1 {
        return Err(ConfigError::Validation(
            "snippet-radius must be >= 1".to_string(),
        ));
    }

    if !(config.max_lemma_fraction > 0.0 && config.max_lemma_fraction <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "max-lemma-fraction must be in (0, 1], got {}",
            config.max_lemma_fraction
        )));
    }

    if config.default_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "default-limit must be >= 1, got {}",
            config.default_limit
        )));
    }

    Ok(())
}

/// Validates the configured site roots
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[sites]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have a name",
                site.url
            )));
        }

        let url = Url::parse(&site.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' must use http or https",
                site.url
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Site URL '{}' has no host",
                site.url
            )));
        }

        let key = site.url.trim_end_matches('/').to_lowercase();
        if !seen.insert(key) {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' is listed more than once",
                site.url
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(url: &str, name: &str) -> SiteEntry {
        SiteEntry {
            url: url.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_validate_sites() {
        assert!(validate_sites(&[site("https://example.com", "Example")]).is_ok());
        assert!(validate_sites(&[site("http://127.0.0.1:8080", "Local")]).is_ok());

        assert!(validate_sites(&[]).is_err());
        assert!(validate_sites(&[site("ftp://example.com", "Ftp")]).is_err());
        assert!(validate_sites(&[site("not a url", "Broken")]).is_err());
        assert!(validate_sites(&[site("https://example.com", "  ")]).is_err());
    }

    #[test]
    fn test_duplicate_sites_rejected() {
        let sites = [
            site("https://example.com", "One"),
            site("https://EXAMPLE.com/", "Two"),
        ];
        assert!(matches!(
            validate_sites(&sites),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_http_config() {
        let mut http = HttpConfig {
            user_agent: "LemmaBot".to_string(),
            referrer: String::new(),
            timeout_ms: 1000,
        };
        assert!(validate_http_config(&http).is_ok());

        http.timeout_ms = 10;
        assert!(validate_http_config(&http).is_err());

        http.timeout_ms = 1000;
        http.user_agent = String::new();
        assert!(validate_http_config(&http).is_err());
    }

    #[test]
    fn test_validate_search_fraction() {
        let mut search = SearchConfig::default();
        assert!(validate_search_config(&search).is_ok());

        search.max_lemma_fraction = 0.0;
        assert!(validate_search_config(&search).is_err());

        search.max_lemma_fraction = 1.5;
        assert!(validate_search_config(&search).is_err());
    }

    #[test]
    fn test_validate_snippet_radius() {
        let mut search = SearchConfig::default();
        search.snippet_radius = 0;
        assert!(matches!(
            validate_search_config(&search),
            Err(ConfigError::Validation(_))
        ));

        search.snippet_radius = 1;
        assert!(validate_search_config(&search).is_ok());
    }
}
