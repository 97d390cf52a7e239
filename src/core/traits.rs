//! Core traits defining the model collaborator interfaces
//!
//! The synthesis pipeline never looks inside a network. Each sub-model is
//! consumed through one of these traits with a fixed tensor contract, and
//! every sub-model is a [`ModelComponent`] so checkpoint binding can treat
//! them uniformly.
//!
//! Shapes below use `T` for token count, `F` for frame count and `S` for
//! waveform samples. Batch is always 1.

use candle_core::Tensor;
use std::collections::HashMap;

use super::error::Result;

/// One named parameter a component expects from a checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Key relative to the component, e.g. `"encoder.layers.0.weight"`
    pub name: String,
    pub shape: Vec<usize>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, shape: &[usize]) -> Self {
        Self {
            name: name.into(),
            shape: shape.to_vec(),
        }
    }
}

/// Base trait for all model components
pub trait ModelComponent: Send + Sync {
    /// Component name for identification and logging
    fn name(&self) -> &str;

    /// Every parameter this component holds, with its expected shape
    fn parameter_specs(&self) -> Vec<ParameterSpec>;

    /// Replace parameters by key
    ///
    /// `params` may be a subset of [`parameter_specs`](Self::parameter_specs);
    /// parameters not present keep their current values. Shapes have already
    /// been checked by the caller.
    fn bind_parameters(&mut self, params: &HashMap<String, Tensor>) -> Result<()>;

    /// Check if the component is ready for inference
    fn is_ready(&self) -> bool {
        true
    }
}

/// Phoneme-level text encoder
pub trait TextEncoder: ModelComponent {
    /// `tokens` `[1, T]` u32, `lengths` `[1]` u32, `mask` `[1, T]` u8 (1 = padded)
    ///
    /// # Returns
    /// `[1, C, T]`
    fn encode(&self, tokens: &Tensor, lengths: &Tensor, mask: &Tensor) -> Result<Tensor>;
}

/// Contextual phoneme embedder (PL-BERT style)
pub trait BertEmbedder: ModelComponent {
    /// `tokens` `[1, T]`, `attention_mask` `[1, T]` u8 (1 = attend)
    ///
    /// # Returns
    /// `[1, T, H]`
    fn embed(&self, tokens: &Tensor, attention_mask: &Tensor) -> Result<Tensor>;
}

/// Projection of embedder output into the prosody encoder width
pub trait FeatureProjection: ModelComponent {
    /// `[1, T, H]` to `[1, T, C]`
    fn project(&self, x: &Tensor) -> Result<Tensor>;
}

/// Duration, pitch and energy predictor
pub trait ProsodyPredictor: ModelComponent {
    /// Style-conditioned duration encoding
    ///
    /// `d_en` `[1, C, T]`, `style` `[1, style_dim]` (prosody part),
    /// `lengths` `[1]`, `mask` `[1, T]`.
    ///
    /// # Returns
    /// `[1, T, D]`
    fn encode(&self, d_en: &Tensor, style: &Tensor, lengths: &Tensor, mask: &Tensor)
        -> Result<Tensor>;

    /// Per-token duration logits from the encoding, `[1, T, D]` to `[1, T, K]`
    ///
    /// The raw duration of a token is the sum of `sigmoid(logits)` over `K`.
    fn duration_logits(&self, encoded: &Tensor) -> Result<Tensor>;

    /// Pitch and energy curves from frame-level features
    ///
    /// `frames` `[1, D, F]`, `style` `[1, style_dim]`.
    ///
    /// # Returns
    /// `(f0, energy)`, each `[1, F']` where `F'` is a fixed multiple of `F`
    fn predict_f0_energy(&self, frames: &Tensor, style: &Tensor) -> Result<(Tensor, Tensor)>;
}

/// Waveform decoder (vocoder)
pub trait WaveformDecoder: ModelComponent {
    /// `aligned` `[1, C, F]`, `f0`/`energy` from the predictor,
    /// `reference` `[1, style_dim]` (reference part).
    ///
    /// # Returns
    /// Waveform with `S` samples in the last dimension, any leading dims of size 1
    fn decode(&self, aligned: &Tensor, f0: &Tensor, energy: &Tensor, reference: &Tensor)
        -> Result<Tensor>;

    /// Whether frame-level inputs must be delayed by one frame (first frame repeated)
    fn requires_frame_shift(&self) -> bool {
        false
    }

    /// Native output sample rate
    fn sample_rate(&self) -> u32 {
        crate::DEFAULT_SAMPLE_RATE
    }
}

/// Mel-to-style encoder (used for both the reference and the prosody part)
pub trait StyleEncoder: ModelComponent {
    /// `mel` `[1, 1, n_mels, F]` to `[1, style_dim]`
    fn encode(&self, mel: &Tensor) -> Result<Tensor>;
}

/// Noise-conditioned style denoising network
pub trait StyleDenoiser: ModelComponent {
    /// One network evaluation
    ///
    /// `x` `[1, 1, style_dim_total]` (already input-scaled), `noise_level`
    /// `[1]`, `embedding` `[1, T, H]` or `None` for the learned
    /// unconditional embedding, `features` `[1, style_dim_total]`.
    ///
    /// # Returns
    /// Same shape as `x`
    fn forward(
        &self,
        x: &Tensor,
        noise_level: &Tensor,
        embedding: Option<&Tensor>,
        features: &Tensor,
    ) -> Result<Tensor>;
}
