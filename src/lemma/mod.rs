//! Lemma extraction
//!
//! Reduces text to normalized word roots through a pluggable morphological
//! analyzer, dropping function words.

mod extractor;
mod morphology;
mod text;

pub use extractor::LemmaExtractor;
pub use morphology::{Morphology, StemmerMorphology};
pub use text::{extract_plain_text, extract_title};
