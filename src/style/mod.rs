//! Style vectors and where they come from
//!
//! - `vector`: the reference + prosody embedding, blending and persistence
//! - `extractor`: reference audio to style vector
//! - `sampler`: text-conditioned diffusion sampling of an utterance style

mod extractor;
mod sampler;
mod vector;

pub use extractor::StyleExtractor;
pub use sampler::{SamplerConfig, StyleDiffusionSampler};
pub use vector::StyleVector;
