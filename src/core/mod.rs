//! Core abstractions
//!
//! - `error`: Structured error handling for every pipeline stage
//! - `traits`: Tensor contracts for the model collaborators

pub mod error;
pub mod traits;

pub use error::{AudioOperation, InferenceStage, Result, ResultExt, TtsError};
pub use traits::{
    BertEmbedder, FeatureProjection, ModelComponent, ParameterSpec, ProsodyPredictor,
    StyleDenoiser, StyleEncoder, TextEncoder, WaveformDecoder,
};
