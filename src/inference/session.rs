//! Longform narration state
//!
//! Consecutive utterances of one narration carry the previous style
//! forward so timbre and prosody drift smoothly between sentences.

use crate::core::error::{Result, TtsError};
use crate::style::StyleVector;
use crate::text::segment_for_longform;

use super::options::SynthesisOptions;
use super::pipeline::{StyleTts, SynthesisOutput};

/// Style carried from one longform utterance to the next
#[derive(Debug, Clone, Default)]
pub struct SynthesisState {
    previous: Option<StyleVector>,
    utterances: usize,
}

impl SynthesisState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Style of the last utterance, if any
    pub fn previous(&self) -> Option<&StyleVector> {
        self.previous.as_ref()
    }

    /// Number of utterances since the session started or was reset
    pub fn utterance_count(&self) -> usize {
        self.utterances
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_none()
    }

    pub fn update(&mut self, style: StyleVector) {
        self.previous = Some(style);
        self.utterances += 1;
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.utterances = 0;
    }
}

/// Default sentence length limit for narration segments
pub const DEFAULT_SEGMENT_CHARS: usize = 300;

/// Narrates text sentence by sentence with style carry-over
pub struct LongformSession<'a> {
    tts: &'a StyleTts,
    reference: StyleVector,
    options: SynthesisOptions,
    state: SynthesisState,
    max_segment_chars: usize,
}

impl<'a> LongformSession<'a> {
    pub fn new(tts: &'a StyleTts, reference: StyleVector, options: SynthesisOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            tts,
            reference,
            options,
            state: SynthesisState::new(),
            max_segment_chars: DEFAULT_SEGMENT_CHARS,
        })
    }

    pub fn with_max_segment_chars(mut self, max_chars: usize) -> Self {
        self.max_segment_chars = max_chars;
        self
    }

    pub fn state(&self) -> &SynthesisState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Synthesize one utterance and carry its style forward
    ///
    /// A seeded session advances the seed by one per utterance, so a
    /// narration is reproducible without every sentence drawing the same noise.
    pub fn synthesize(&mut self, text: &str) -> Result<SynthesisOutput> {
        let options = self.options.for_utterance(self.state.utterance_count());
        let output =
            self.tts
                .infer_longform_with(text, self.state.previous(), &self.reference, &options)?;
        self.state.update(output.style.clone());
        Ok(output)
    }

    /// Split a passage into sentences and synthesize them in order
    ///
    /// The returned output holds the concatenated audio and durations and
    /// the style of the last sentence. Any failing sentence aborts the
    /// whole passage.
    pub fn narrate(&mut self, passage: &str) -> Result<SynthesisOutput> {
        let segments = segment_for_longform(passage, self.max_segment_chars);
        tracing::info!("Narrating {} segments", segments.len());

        let mut combined: Option<SynthesisOutput> = None;
        for (i, segment) in segments.iter().enumerate() {
            tracing::debug!("Segment {}/{}: {:?}", i + 1, segments.len(), segment);
            let output = self.synthesize(segment)?;
            combined = Some(match combined {
                None => output,
                Some(mut acc) => {
                    acc.audio.extend_from_slice(&output.audio);
                    acc.durations.extend_from_slice(&output.durations);
                    acc.style = output.style;
                    acc
                }
            });
        }

        combined.ok_or_else(|| TtsError::EmptyInput {
            message: "passage contains no sentences".to_string(),
        })
    }
}
