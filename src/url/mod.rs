//! URL handling module for Lemma Search
//!
//! This module provides host extraction and comparison, site root
//! normalization and the site-relative page path used as page identity.

mod domain;
mod path;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{extract_host, same_host};
pub use path::page_path;

/// Normalizes a configured site root URL
///
/// The scheme must be http or https and a host must be present. The host is
/// lower-cased by the URL parser, and the trailing slash is removed so that
/// `https://example.com/` and `https://example.com` name the same site.
///
/// # Examples
///
/// ```
/// use lemma_search::url::normalize_site_url;
///
/// let url = normalize_site_url("https://EXAMPLE.com/").unwrap();
/// assert_eq!(url, "https://example.com");
/// ```
pub fn normalize_site_url(url_str: &str) -> Result<String, UrlError> {
    let url = parse_http_url(url_str.trim())?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Parses a URL and checks that it is an http(s) URL with a host
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
