//! Structured error handling for StyleTTS inference
//!
//! Every failure in the synthesis pipeline surfaces as a [`TtsError`]
//! carrying enough context (stage, component, field) to tell where the
//! utterance was aborted. No partial waveform is ever returned alongside
//! an error.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias with TtsError
pub type Result<T> = std::result::Result<T, TtsError>;

/// Main error type for StyleTTS inference
#[derive(Error, Debug, Clone)]
pub enum TtsError {
    /// Tokenization produced no symbols, so there is nothing to encode
    #[error("Empty input: {message}")]
    EmptyInput { message: String },

    /// A sub-model could not be bound to the checkpoint
    #[error("Model loading error in {component}: {message}")]
    ModelLoad {
        message: String,
        component: String,
        path: Option<PathBuf>,
    },

    /// Speaking-rate adjustment factor was zero, negative or not finite
    #[error("Degenerate duration adjustment factor {factor} ({word_count} words)")]
    DegenerateDuration { factor: f32, word_count: usize },

    /// Rounded durations do not describe a usable alignment
    #[error("Alignment length mismatch: {num_tokens} tokens cover {total_frames} frames")]
    AlignmentLengthMismatch {
        num_tokens: usize,
        total_frames: usize,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Inference errors
    #[error("Inference error in {stage}: {message}")]
    Inference {
        stage: InferenceStage,
        message: String,
    },

    /// Audio processing errors
    #[error("Audio processing error ({operation}): {message}")]
    Audio {
        message: String,
        operation: AudioOperation,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Internal/bug errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        location: Option<String>,
    },
}

impl TtsError {
    /// Shorthand for an inference failure at a given stage
    pub fn inference(stage: InferenceStage, message: impl Into<String>) -> Self {
        TtsError::Inference {
            stage,
            message: message.into(),
        }
    }

    /// Shorthand for a validation failure on a named field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        TtsError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

/// Per-utterance pipeline states, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InferenceStage {
    Tokenized,
    TextEncoded,
    StyleSampled,
    DurationPredicted,
    Aligned,
    ProsodyPredicted,
    Decoded,
}

impl fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceStage::Tokenized => write!(f, "tokenization"),
            InferenceStage::TextEncoded => write!(f, "text encoding"),
            InferenceStage::StyleSampled => write!(f, "style sampling"),
            InferenceStage::DurationPredicted => write!(f, "duration prediction"),
            InferenceStage::Aligned => write!(f, "alignment"),
            InferenceStage::ProsodyPredicted => write!(f, "prosody prediction"),
            InferenceStage::Decoded => write!(f, "decoding"),
        }
    }
}

/// Audio operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOperation {
    Loading,
    Trimming,
    Resampling,
    MelSpectrogram,
    Saving,
}

impl fmt::Display for AudioOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioOperation::Loading => write!(f, "loading"),
            AudioOperation::Trimming => write!(f, "silence trimming"),
            AudioOperation::Resampling => write!(f, "resampling"),
            AudioOperation::MelSpectrogram => write!(f, "mel spectrogram computation"),
            AudioOperation::Saving => write!(f, "saving"),
        }
    }
}

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Wrap the error as a failure of the given pipeline stage
    fn at_stage(self, stage: InferenceStage) -> Result<T>;

    /// Wrap the error as a failure of the given audio operation
    fn audio_context(self, operation: AudioOperation) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn at_stage(self, stage: InferenceStage) -> Result<T> {
        self.map_err(|e| TtsError::Inference {
            stage,
            message: e.to_string(),
        })
    }

    fn audio_context(self, operation: AudioOperation) -> Result<T> {
        // {:#} keeps the anyhow context chain on one line
        self.map_err(|e| TtsError::Audio {
            message: format!("{:#}", DisplayChain(&e)),
            operation,
        })
    }
}

struct DisplayChain<'a, E: fmt::Display>(&'a E);

impl<E: fmt::Display> fmt::Display for DisplayChain<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{:#}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for TtsError {
    fn from(err: anyhow::Error) -> Self {
        TtsError::Internal {
            message: format!("{:#}", err),
            location: None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for TtsError {
    fn from(err: std::io::Error) -> Self {
        TtsError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

/// Convert from candle_core::Error
impl From<candle_core::Error> for TtsError {
    fn from(err: candle_core::Error) -> Self {
        TtsError::Internal {
            message: format!("Tensor operation failed: {}", err),
            location: None,
        }
    }
}
