//! Snippet construction and query-term highlighting

use crate::lemma::extract_plain_text;
use regex::Regex;

/// Query tokens shorter than this are neither searched for nor highlighted
pub const MIN_TOKEN_LENGTH: usize = 3;

/// Builds a highlighted excerpt of `html` around the first query hit
///
/// The window reaches `radius` characters to each side of the earliest
/// occurrence of any query token and is widened to whole words. Ellipses mark
/// a cut at either end. Without a hit, the excerpt starts at the beginning of
/// the document and nothing is highlighted.
pub fn build_snippet(html: &str, query: &str, radius: usize) -> String {
    let text = extract_plain_text(html);
    if text.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let tokens = query_tokens(query);
    if tokens.is_empty() {
        return cut_raw_snippet(&chars, 0, radius);
    }

    let lower: Vec<char> = chars.iter().map(|c| lower_char(*c)).collect();
    let center = tokens
        .iter()
        .filter_map(|token| find_chars(&lower, &token.chars().collect::<Vec<_>>()))
        .min();

    match center {
        Some(center) => highlight(&cut_raw_snippet(&chars, center, radius), &tokens),
        None => cut_raw_snippet(&chars, 0, radius),
    }
}

/// Lower-cased query tokens of at least [`MIN_TOKEN_LENGTH`] characters,
/// deduplicated in order of first appearance
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in query.split_whitespace() {
        if token.chars().count() < MIN_TOKEN_LENGTH {
            continue;
        }
        let token: String = token.chars().map(lower_char).collect();
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Cuts the window around `center` (a char index) and widens it to word
/// boundaries
fn cut_raw_snippet(chars: &[char], center: usize, radius: usize) -> String {
    let length = chars.len();
    let mut start = center.saturating_sub(radius);
    let mut end = length.min(center + radius);

    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    while end < length && (end <= center || !chars[end - 1].is_whitespace()) {
        end += 1;
    }

    let raw: String = chars[start..end].iter().collect();
    let mut snippet = String::with_capacity(raw.len() + 6);
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(raw.trim());
    if end < length {
        snippet.push_str("...");
    }
    snippet
}

/// Wraps whole-word, case-insensitive matches of each token in `<b>`
///
/// Longer tokens go first so a short token never lands inside the markup of
/// a longer one.
fn highlight(snippet: &str, tokens: &[String]) -> String {
    let mut ordered: Vec<&String> = tokens.iter().collect();
    ordered.sort_by_key(|token| std::cmp::Reverse(token.chars().count()));

    let mut result = snippet.to_string();
    for token in ordered {
        let pattern = format!(r"(?iu)\b{}\b", regex::escape(token));
        match Regex::new(&pattern) {
            Ok(re) => result = re.replace_all(&result, "<b>$0</b>").into_owned(),
            Err(e) => tracing::warn!("Cannot highlight {:?}: {}", token, e),
        }
    }
    result
}

/// Single-char lower-casing so char positions stay aligned with the source text
fn lower_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
