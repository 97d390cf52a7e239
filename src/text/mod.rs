//! Text processing modules
//!
//! - Input normalization and word counting
//! - Phonemizer seam (grapheme-to-phoneme is external)
//! - Phoneme symbol table / tokenization
//! - Sentence segmentation for longform narration

mod normalizer;
mod phonemizer;
mod segmenter;
mod symbols;

pub use normalizer::{count_words, normalize_phoneme_quotes, prepare_text, strip_punctuation};
pub use phonemizer::{IdentityPhonemizer, Phonemizer};
pub use segmenter::{segment_for_longform, split_sentences};
pub use symbols::{SymbolTable, PAD, PAD_ID};
