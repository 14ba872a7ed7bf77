//! HTTP fetcher implementation
//!
//! Builds the shared HTTP client from the configured user agent, referrer and
//! timeout, and fetches single pages. Any HTTP status is a successful fetch;
//! only transport-level failures are errors.

use crate::config::HttpConfig;
use crate::crawler::CrawlError;
use crate::url::page_path;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// A page as it came off the wire
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects; base for resolving the page's links
    pub url: Url,

    /// Site-relative path of the requested URL
    pub path: String,

    pub status_code: u16,

    pub html: String,
}

/// Builds an HTTP client with the configured identity and timeout
///
/// An empty referrer sends no `Referer` header.
///
/// # Example
///
/// ```no_run
/// use lemma_search::config::HttpConfig;
/// use lemma_search::crawler::build_http_client;
///
/// let config = HttpConfig {
///     user_agent: "LemmaSearchBot/1.0".to_string(),
///     referrer: "https://www.google.com".to_string(),
///     timeout_ms: 10_000,
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if !config.referrer.is_empty() {
        match HeaderValue::from_str(&config.referrer) {
            Ok(value) => {
                headers.insert(REFERER, value);
            }
            Err(e) => tracing::warn!("Ignoring invalid referrer {:?}: {}", config.referrer, e),
        }
    }

    let timeout = Duration::from_millis(config.timeout_ms);

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one page
///
/// Non-2xx responses are returned with their status code and body. Network,
/// timeout and body-read failures become [`CrawlError::Fetch`].
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, CrawlError> {
    let fetch_error = |e: reqwest::Error| {
        let reason = if e.is_timeout() {
            "Request timeout".to_string()
        } else if e.is_connect() {
            format!("Connection failed: {}", e)
        } else {
            e.to_string()
        };
        CrawlError::Fetch {
            url: url.to_string(),
            reason,
        }
    };

    let response = client.get(url.clone()).send().await.map_err(fetch_error)?;
    let status_code = response.status().as_u16();
    let final_url = response.url().clone();
    let html = response.text().await.map_err(fetch_error)?;

    Ok(FetchedPage {
        url: final_url,
        path: page_path(url),
        status_code,
        html,
    })
}
