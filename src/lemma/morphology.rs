//! Morphological analyzer interface and the Snowball-backed implementation

use crate::config::Language;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashMap;

/// Word -> base forms + grammatical tags
///
/// Implementations must be cheap to share between crawl workers.
pub trait Morphology: Send + Sync {
    /// Dictionary (normal) forms of `word`, most likely first. Empty if the
    /// analyzer does not know the word.
    fn normal_forms(&self, word: &str) -> Vec<String>;

    /// Grammatical tag strings describing `word`.
    fn morph_info(&self, word: &str) -> Vec<String>;
}

/// Tag attached to open-class words
const LEXICAL_TAG: &str = "LEX";

const RUSSIAN_PREPOSITIONS: &[&str] = &[
    "в", "во", "на", "с", "со", "к", "ко", "по", "о", "об", "обо", "от", "ото", "до", "из", "изо",
    "у", "за", "над", "под", "при", "про", "без", "для", "через", "между", "перед", "около",
    "вокруг", "после", "среди", "кроме", "ради", "сквозь",
];

const RUSSIAN_CONJUNCTIONS: &[&str] = &[
    "и", "а", "но", "или", "либо", "да", "что", "чтобы", "если", "когда", "как", "потому",
    "также", "тоже", "зато", "однако", "хотя", "поэтому", "ибо",
];

const RUSSIAN_PARTICLES: &[&str] = &[
    "не", "ни", "же", "ли", "бы", "вот", "вон", "даже", "лишь", "только", "уже", "ведь", "разве",
    "неужели", "пусть", "давай",
];

const RUSSIAN_INTERJECTIONS: &[&str] = &[
    "ах", "ох", "эх", "ой", "ай", "увы", "ура", "ого", "ага", "эй", "фу",
];

const ENGLISH_PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "by", "for", "with", "about", "from", "to", "of", "into", "onto", "over",
    "under", "between", "through", "during", "without", "within", "before", "after", "above",
    "below", "among", "against", "upon", "via",
];

const ENGLISH_CONJUNCTIONS: &[&str] = &[
    "and", "or", "but", "nor", "so", "yet", "because", "although", "though", "if", "while",
    "whereas", "unless", "whether",
];

const ENGLISH_PARTICLES: &[&str] = &["not", "no"];

const ENGLISH_INTERJECTIONS: &[&str] = &["oh", "ah", "wow", "hey", "alas", "ouch", "oops", "hmm"];

/// Morphology backed by a Snowball stemmer and closed-class word lists
///
/// The stem is reported as the single normal form. Prepositions,
/// conjunctions, particles and interjections are tagged with the analyzer's
/// function-word markers so the extractor can drop them.
pub struct StemmerMorphology {
    language: Language,
    stemmer: Stemmer,
    function_words: HashMap<&'static str, &'static str>,
}

impl StemmerMorphology {
    pub fn new(language: Language) -> Self {
        let (algorithm, groups): (Algorithm, [(&[&'static str], &'static str); 4]) = match language {
            Language::Russian => (
                Algorithm::Russian,
                [
                    (RUSSIAN_PREPOSITIONS, "ПРЕДЛ"),
                    (RUSSIAN_CONJUNCTIONS, "СОЮЗ"),
                    (RUSSIAN_PARTICLES, "ЧАСТ"),
                    (RUSSIAN_INTERJECTIONS, "МЕЖД"),
                ],
            ),
            Language::English => (
                Algorithm::English,
                [
                    (ENGLISH_PREPOSITIONS, "PREP"),
                    (ENGLISH_CONJUNCTIONS, "CONJ"),
                    (ENGLISH_PARTICLES, "PART"),
                    (ENGLISH_INTERJECTIONS, "INTJ"),
                ],
            ),
        };

        let mut function_words = HashMap::new();
        for (words, tag) in groups {
            for word in words {
                function_words.entry(*word).or_insert(tag);
            }
        }

        Self {
            language,
            stemmer: Stemmer::create(algorithm),
            function_words,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

impl Morphology for StemmerMorphology {
    fn normal_forms(&self, word: &str) -> Vec<String> {
        if word.is_empty() {
            return Vec::new();
        }
        if self.function_words.contains_key(word) {
            return vec![word.to_string()];
        }
        let stem = self.stemmer.stem(word);
        if stem.is_empty() {
            Vec::new()
        } else {
            vec![stem.into_owned()]
        }
    }

    fn morph_info(&self, word: &str) -> Vec<String> {
        match self.function_words.get(word) {
            Some(tag) => vec![format!("{} {}", tag, word)],
            None => vec![LEXICAL_TAG.to_string()],
        }
    }
}
