//! Model configuration

mod model_config;

pub use model_config::{
    DecoderConfig, DecoderKind, DiffusionConfig, DiffusionDistribution, ModelConfig, ModelParams,
    PreprocessParams, SpectParams,
};
