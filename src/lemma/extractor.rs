use super::morphology::{Morphology, StemmerMorphology};
use super::text::extract_plain_text;
use crate::config::Language;
use std::collections::HashMap;
use std::sync::Arc;

/// Tag markers of parts of speech that never become lemmas
///
/// Interjections, prepositions, conjunctions and particles, in both the
/// Russian and the English tag sets.
const FUNCTION_WORD_MARKERS: &[&str] = &[
    "МЕЖД", "ПРЕДЛ", "СОЮЗ", "ЧАСТ", "INTJ", "PREP", "CONJ", "PART",
];

/// Turns text into a map of lemma -> occurrence count
///
/// Cheap to clone; the analyzer is shared.
#[derive(Clone)]
pub struct LemmaExtractor {
    morphology: Arc<dyn Morphology>,
    language: Language,
}

impl LemmaExtractor {
    pub fn new(morphology: Arc<dyn Morphology>, language: Language) -> Self {
        Self {
            morphology,
            language,
        }
    }

    /// Creates an extractor backed by the Snowball stemmer for `language`
    pub fn for_language(language: Language) -> Self {
        Self::new(Arc::new(StemmerMorphology::new(language)), language)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Counts lemma occurrences in plain text
    ///
    /// The text is lower-cased, every character outside the language's
    /// alphabet (other than whitespace) is dropped, and the rest is split on
    /// whitespace. Tokens the analyzer cannot normalize and function words
    /// are skipped. The first normal form is taken when a word is ambiguous.
    pub fn extract(&self, text: &str) -> HashMap<String, u32> {
        let mut lemmas = HashMap::new();

        for word in self.tokenize(text) {
            let forms = self.morphology.normal_forms(&word);
            let Some(lemma) = forms.into_iter().next() else {
                continue;
            };
            if self.is_function_word(&word) {
                continue;
            }
            *lemmas.entry(lemma).or_insert(0) += 1;
        }

        lemmas
    }

    /// Strips markup and counts lemma occurrences in the visible text
    pub fn extract_from_html(&self, html: &str) -> HashMap<String, u32> {
        self.extract(&extract_plain_text(html))
    }

    /// Lemmas of `text` without counts, in no particular order
    pub fn lemma_set(&self, text: &str) -> Vec<String> {
        self.extract(text).into_keys().collect()
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_whitespace() || in_alphabet(self.language, *c))
            .collect();

        cleaned.split_whitespace().map(str::to_string).collect()
    }

    fn is_function_word(&self, word: &str) -> bool {
        self.morphology.morph_info(word).iter().any(|info| {
            let info = info.to_uppercase();
            FUNCTION_WORD_MARKERS
                .iter()
                .any(|marker| info.contains(marker))
        })
    }
}

/// Whether a lower-case character belongs to the language's alphabet
fn in_alphabet(language: Language, c: char) -> bool {
    match language {
        Language::Russian => matches!(c, 'а'..='я' | 'ё'),
        Language::English => c.is_ascii_lowercase(),
    }
}
