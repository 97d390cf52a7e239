//! Phoneme symbol table
//!
//! Maps each character of a phoneme string to the integer id the text
//! encoder was trained with. Id 0 is the pad symbol `$`, which also serves
//! as the start token and the end-of-utterance marker.

use std::collections::HashMap;

/// Pad / start / end-of-utterance symbol
pub const PAD: char = '$';

/// Id of [`PAD`]
pub const PAD_ID: u32 = 0;

const PUNCTUATION: &str = ";:,.!?¡¿—…\"«»“” ";
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const LETTERS_IPA: &str = "ɑɐɒæɓʙβɔɕçɗɖðʤəɘɚɛɜɝɞɟʄɡɠɢʛɦɧħɥʜɨɪʝɭɬɫɮʟɱɯɰŋɳɲɴøɵɸθœɶʘɹɺɾɻʀʁɽʂʃʈʧʉʊʋⱱʌɣɤʍχʎʏʑʐʒʔʡʕʢǀǁǂǃˈˌːˑʼʴʰʱʲʷˠˤ˞↓↑→↗↘'\u{0329}'ᵻ";

/// Character to id lookup
#[derive(Debug, Clone)]
pub struct SymbolTable {
    index: HashMap<char, u32>,
    len: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        let inventory: String = std::iter::once(PAD)
            .chain(PUNCTUATION.chars())
            .chain(LETTERS.chars())
            .chain(LETTERS_IPA.chars())
            .collect();
        Self::from_symbols(&inventory)
    }
}

impl SymbolTable {
    /// Build a table from an ordered symbol inventory
    ///
    /// Ids follow inventory position. A repeated symbol keeps the id of
    /// its last occurrence.
    pub fn from_symbols(inventory: &str) -> Self {
        let mut index = HashMap::new();
        let mut len = 0;
        for (i, c) in inventory.chars().enumerate() {
            index.insert(c, i as u32);
            len = i + 1;
        }
        Self { index, len }
    }

    /// Number of ids in the inventory, duplicates included
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn id(&self, symbol: char) -> Option<u32> {
        self.index.get(&symbol).copied()
    }

    /// Convert a phoneme string to ids
    ///
    /// Characters outside the inventory are dropped with a warning.
    pub fn tokenize(&self, phonemes: &str) -> Vec<u32> {
        let mut ids = Vec::with_capacity(phonemes.len());
        let mut unknown = Vec::new();
        for c in phonemes.chars() {
            match self.index.get(&c) {
                Some(&id) => ids.push(id),
                None => unknown.push(c),
            }
        }
        if !unknown.is_empty() {
            tracing::warn!(
                "Dropped {} unknown symbol(s) {:?} from {:?}",
                unknown.len(),
                unknown,
                phonemes
            );
        }
        ids
    }
}
