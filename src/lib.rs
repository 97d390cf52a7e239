//! # styletts-rs - StyleTTS 2 inference
//!
//! Text-to-speech inference for StyleTTS 2 style models: a reference clip
//! gives the speaker's timbre and prosody, a diffusion sampler draws an
//! utterance style conditioned on the text, and the predictors and decoder
//! turn phonemes into a waveform at 24 kHz.
//!
//! ## Features
//!
//! - **Reference styles**: from one clip, or timbre and prosody from two clips
//! - **Style diffusion**: seeded ADPM2 sampling over a Karras schedule
//! - **Speaking-rate control**: durations rescaled to a target words per minute
//! - **Longform narration**: style carried from one sentence to the next
//! - **GPU Acceleration**: CUDA and Metal support via Candle
//!
//! The networks themselves are supplied by the caller through the traits in
//! [`core::traits`]; this crate binds their weights from a checkpoint and
//! runs the inference pipeline around them.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use styletts::{IdentityPhonemizer, StyleTts, SynthesisOptions};
//!
//! let (tts, _report) = StyleTts::load(
//!     "Models/LibriTTS/config.yml",
//!     "Models/LibriTTS/epochs_2nd_00020.safetensors",
//!     my_models,
//!     Box::new(IdentityPhonemizer),
//!     candle_core::Device::Cpu,
//! )?;
//!
//! let reference = tts.style_from_path("speaker.wav")?;
//! let output = tts.infer("Hello, world!", &reference, &SynthesisOptions::default())?;
//! output.save("output.wav")?;
//! ```
//!
//! ## Longform
//!
//! ```rust,ignore
//! let mut session = tts.session(reference, SynthesisOptions::longform())?;
//! let output = session.narrate("First sentence. Second sentence. Third one.")?;
//! ```

pub mod audio;
pub mod config;
pub mod core;
pub mod inference;
pub mod models;
pub mod style;
pub mod text;
pub mod utils;

// Re-exports for convenience
pub use config::ModelConfig;
pub use core::{
    error::{AudioOperation, InferenceStage, Result, ResultExt, TtsError},
    traits::{
        BertEmbedder, FeatureProjection, ModelComponent, ParameterSpec, ProsodyPredictor,
        StyleDenoiser, StyleEncoder, TextEncoder, WaveformDecoder,
    },
};
pub use inference::{
    AlignmentExpander, DurationScaler, DurationScaling, LongformSession, StyleTts,
    SynthesisOptions, SynthesisOutput, SynthesisState,
};
pub use models::{Checkpoint, LoadReport, ModelBundle};
pub use style::{SamplerConfig, StyleDiffusionSampler, StyleExtractor, StyleVector};
pub use text::{IdentityPhonemizer, Phonemizer, SymbolTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default sample rate for output audio (24000 Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

/// Full style vector width (reference part + prosody part)
pub const STYLE_DIM: usize = 256;

/// Samples dropped from the end of a single utterance
///
/// Empirical: the decoder leaves a pulse at the very end of its output.
pub const SINGLE_TRIM_SAMPLES: usize = 50;

/// Samples dropped from the end of a longform utterance
pub const LONGFORM_TRIM_SAMPLES: usize = 100;
