//! Markup stripping for lemma extraction, titles and snippets

use scraper::{Html, Node, Selector};

/// Elements whose text is never shown to a reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Strips markup from an HTML document and returns its visible text
///
/// Text nodes are joined with single spaces and whitespace runs are
/// collapsed, so adjacent block elements never glue words together.
///
/// # Example
///
/// ```
/// use lemma_search::lemma::extract_plain_text;
///
/// let text = extract_plain_text("<p>Hello</p><p>world</p><script>x()</script>");
/// assert_eq!(text, "Hello world");
/// ```
pub fn extract_plain_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut chunks: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|element| HIDDEN_ELEMENTS.contains(&element.name()))
                .unwrap_or(false)
        });
        if !hidden {
            chunks.push(text);
        }
    }

    collapse_whitespace(&chunks.join(" "))
}

/// Extracts the page title from the `<title>` element
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
