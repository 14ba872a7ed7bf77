//! Search result types and pagination

use serde::Serialize;

pub const EMPTY_QUERY_MESSAGE: &str = "Empty search query";
pub const SITE_NOT_INDEXED_MESSAGE: &str = "This site has not been indexed yet";
pub const NOTHING_FOUND_MESSAGE: &str = "Nothing found";
pub const INVALID_PAGE_MESSAGE: &str = "Invalid offset or limit";

/// One ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    /// Root URL of the page's site
    pub site: String,
    pub site_name: String,
    /// Site-relative page path
    pub uri: String,
    pub title: String,
    pub snippet: String,
    /// Relevance relative to the best page of the same site, in [0, 1]
    pub relevance: f64,
}

/// A page of search results
///
/// `count` is always the total number of hits, not the page length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub result: bool,
    pub count: usize,
    pub data: Vec<SearchItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn failure(message: impl Into<String>, count: usize) -> Self {
        Self {
            result: false,
            count,
            data: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn nothing_found() -> Self {
        Self {
            result: true,
            count: 0,
            data: Vec::new(),
            error: Some(NOTHING_FOUND_MESSAGE.to_string()),
        }
    }
}

/// Slices ranked items into the requested page
///
/// A negative offset or a non-positive limit is rejected with the total
/// count. An offset past the end yields an empty page.
pub fn paginate(items: Vec<SearchItem>, offset: i64, limit: i64) -> SearchResponse {
    let total = items.len();

    if offset < 0 || limit <= 0 {
        return SearchResponse::failure(INVALID_PAGE_MESSAGE, total);
    }

    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let data = if offset >= total {
        Vec::new()
    } else {
        let end = total.min(offset.saturating_add(limit));
        items.into_iter().skip(offset).take(end - offset).collect()
    };

    SearchResponse {
        result: true,
        count: total,
        data,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<SearchItem> {
        (0..n)
            .map(|i| SearchItem {
                site: "https://example.com".to_string(),
                site_name: "Example".to_string(),
                uri: format!("/{}", i),
                title: String::new(),
                snippet: String::new(),
                relevance: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_page_slice() {
        let response = paginate(items(5), 1, 2);
        assert!(response.result);
        assert_eq!(response.count, 5);
        let uris: Vec<_> = response.data.iter().map(|i| i.uri.as_str()).collect();
        assert_eq!(uris, vec!["/1", "/2"]);
    }

    #[test]
    fn test_last_page_is_short() {
        let response = paginate(items(5), 4, 20);
        assert_eq!(response.data.len(), 1);
    }

    #[test]
    fn test_offset_past_end() {
        let response = paginate(items(3), 3, 10);
        assert!(response.result);
        assert_eq!(response.count, 3);
        assert!(response.data.is_empty());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_invalid_offset_or_limit() {
        for (offset, limit) in [(-1, 10), (0, 0), (0, -5)] {
            let response = paginate(items(4), offset, limit);
            assert!(!response.result);
            assert_eq!(response.count, 4);
            assert!(response.data.is_empty());
            assert_eq!(response.error.as_deref(), Some(INVALID_PAGE_MESSAGE));
        }
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let json = serde_json::to_value(&items(1)[0]).unwrap();
        assert_eq!(json["siteName"], "Example");
        assert_eq!(json["uri"], "/0");
    }
}
