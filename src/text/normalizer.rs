//! Text normalization helpers
//!
//! - Input clean-up before phonemization
//! - Word counting for speaking-rate estimation
//! - Quote normalization for phoneme strings

/// Prepare raw input text for phonemization
///
/// Surrounding whitespace is removed and internal runs collapse to one space.
pub fn prepare_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove ASCII punctuation
pub fn strip_punctuation(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}

/// Number of words after punctuation is stripped
///
/// "don't" counts as one word and a lone "-" counts as none.
pub fn count_words(text: &str) -> usize {
    strip_punctuation(text).split_whitespace().count()
}

/// Replace the two-character quote sequences some phonemizers emit with `"`
pub fn normalize_phoneme_quotes(phonemes: &str) -> String {
    phonemes.replace("``", "\"").replace("''", "\"")
}
