//! Sentence segmentation for longform narration
//!
//! Paragraphs are split at sentence-ending punctuation. Sentences longer
//! than a character budget are split further at clause separators, then
//! at whitespace, so each piece stays within what one utterance can carry.

/// Sentence-ending punctuation characters
const SENTENCE_ENDINGS: &[char] = &['.', '!', '?', '…'];

/// Clause-separating punctuation (for fallback splitting)
const CLAUSE_SEPARATORS: &[char] = &[',', ';', ':', '—'];

/// Closing characters that stay attached to the sentence they end
const TRAILING_CLOSERS: &[char] = &['"', '\'', ')', ']', '”', '’', '»'];

/// Split a paragraph into sentences
///
/// Terminal punctuation runs ("?!", "...") and closing quotes stay with
/// their sentence. Empty pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if SENTENCE_ENDINGS.contains(&c) {
            while let Some(&next) = chars.peek() {
                if SENTENCE_ENDINGS.contains(&next) || TRAILING_CLOSERS.contains(&next) {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            // A period followed directly by a letter ("3.5", "e.g") is not a boundary
            if chars.peek().map_or(true, |n| n.is_whitespace()) {
                push_trimmed(&mut sentences, &current);
                current.clear();
            }
        }
    }
    push_trimmed(&mut sentences, &current);
    sentences
}

/// Split a paragraph into sentences no longer than `max_chars`
pub fn segment_for_longform(text: &str, max_chars: usize) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .flat_map(|s| split_long_sentence(&s, max_chars))
        .collect()
}

/// Split one sentence at the best boundary inside the budget
fn split_long_sentence(sentence: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut remaining = sentence.trim();

    while remaining.chars().count() > max_chars {
        let window_end = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..window_end];

        let split_at = find_last_boundary(window, CLAUSE_SEPARATORS)
            .or_else(|| window.rfind(char::is_whitespace).filter(|&i| i > 0))
            .unwrap_or(window_end);

        let (head, rest) = remaining.split_at(split_at);
        push_trimmed(&mut pieces, head);
        remaining = rest.trim_start();
    }
    push_trimmed(&mut pieces, remaining);
    pieces
}

/// Byte index just past the last boundary character in `text`
fn find_last_boundary(text: &str, boundaries: &[char]) -> Option<usize> {
    text.char_indices()
        .rev()
        .find(|(_, c)| boundaries.contains(c))
        .map(|(i, c)| i + c.len_utf8())
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}
