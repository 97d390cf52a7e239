//! Text-to-phoneme conversion seam
//!
//! Grapheme-to-phoneme conversion lives outside this crate (espeak,
//! a neural G2P, a lexicon service). The pipeline only needs a pure
//! text-in, phonemes-out function.

use crate::core::error::Result;

/// Converts normalized text into an IPA phoneme string
pub trait Phonemizer: Send + Sync {
    /// Phonemize one utterance, without the end-of-utterance marker
    fn phonemize(&self, text: &str) -> Result<String>;
}

/// Treats the input text as already phonemized
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPhonemizer;

impl Phonemizer for IdentityPhonemizer {
    fn phonemize(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

impl<F> Phonemizer for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn phonemize(&self, text: &str) -> Result<String> {
        self(text)
    }
}
