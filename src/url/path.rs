use url::Url;

/// Returns the site-relative path used as a page's identity
///
/// The path keeps the query string (pages that differ only by query are
/// distinct pages) and drops the fragment.
///
/// ```
/// use url::Url;
/// use lemma_search::url::page_path;
///
/// let url = Url::parse("https://example.com/news?page=2#top").unwrap();
/// assert_eq!(page_path(&url), "/news?page=2");
/// ```
pub fn page_path(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
