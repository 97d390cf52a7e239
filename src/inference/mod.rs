//! Inference module for text-to-speech synthesis
//!
//! - StyleTts: the synthesis pipeline (single utterance and longform)
//! - SynthesisOptions: per-utterance settings
//! - DurationScaler / AlignmentExpander: duration post-processing
//! - LongformSession: sentence-by-sentence narration with style carry-over

mod alignment;
mod duration;
mod options;
mod pipeline;
mod session;

pub use alignment::{round_durations, Alignment, AlignmentExpander};
pub use duration::{DurationScaler, DurationScaling};
pub use options::SynthesisOptions;
pub use pipeline::{StyleTts, SynthesisOutput};
pub use session::{LongformSession, SynthesisState, DEFAULT_SEGMENT_CHARS};
