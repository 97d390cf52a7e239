//! The sub-models behind one synthesizer

use crate::core::error::Result;
use crate::core::traits::{
    BertEmbedder, FeatureProjection, ModelComponent, ProsodyPredictor, StyleDenoiser,
    StyleEncoder, TextEncoder, WaveformDecoder,
};

use super::weights::{Checkpoint, ComponentReport, LoadReport};

/// Checkpoint keys of the inference-time sub-models, in load order
pub const COMPONENT_KEYS: [&str; 8] = [
    "bert",
    "bert_encoder",
    "predictor",
    "decoder",
    "text_encoder",
    "predictor_encoder",
    "style_encoder",
    "diffusion",
];

/// Owned set of sub-models
///
/// Each bundle is independent, so several synthesizers can run side by
/// side with their own weights.
pub struct ModelBundle {
    pub text_encoder: Box<dyn TextEncoder>,
    pub bert: Box<dyn BertEmbedder>,
    pub bert_encoder: Box<dyn FeatureProjection>,
    pub predictor: Box<dyn ProsodyPredictor>,
    pub decoder: Box<dyn WaveformDecoder>,
    pub style_encoder: Box<dyn StyleEncoder>,
    pub predictor_encoder: Box<dyn StyleEncoder>,
    pub diffusion: Box<dyn StyleDenoiser>,
}

impl ModelBundle {
    /// Bind every sub-model from a checkpoint
    ///
    /// Any sub-model failing to bind (absent, shape mismatch, nothing
    /// matching) aborts the whole load.
    pub fn load_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let components = &mut report.components;
        components.push(bind_logged(checkpoint, "bert", self.bert.as_mut())?);
        components.push(bind_logged(checkpoint, "bert_encoder", self.bert_encoder.as_mut())?);
        components.push(bind_logged(checkpoint, "predictor", self.predictor.as_mut())?);
        components.push(bind_logged(checkpoint, "decoder", self.decoder.as_mut())?);
        components.push(bind_logged(checkpoint, "text_encoder", self.text_encoder.as_mut())?);
        components.push(bind_logged(
            checkpoint,
            "predictor_encoder",
            self.predictor_encoder.as_mut(),
        )?);
        components.push(bind_logged(checkpoint, "style_encoder", self.style_encoder.as_mut())?);
        components.push(bind_logged(checkpoint, "diffusion", self.diffusion.as_mut())?);

        let ignored: Vec<&str> = checkpoint
            .component_names()
            .filter(|name| !COMPONENT_KEYS.contains(name))
            .collect();
        if !ignored.is_empty() {
            tracing::debug!("Checkpoint components not used for inference: {:?}", ignored);
        }
        Ok(report)
    }

    /// Whether every sub-model reports ready
    pub fn is_ready(&self) -> bool {
        self.text_encoder.is_ready()
            && self.bert.is_ready()
            && self.bert_encoder.is_ready()
            && self.predictor.is_ready()
            && self.decoder.is_ready()
            && self.style_encoder.is_ready()
            && self.predictor_encoder.is_ready()
            && self.diffusion.is_ready()
    }
}

fn bind_logged<C: ModelComponent + ?Sized>(
    checkpoint: &Checkpoint,
    key: &str,
    component: &mut C,
) -> Result<ComponentReport> {
    match checkpoint.bind(key, component) {
        Ok(report) => {
            tracing::info!(
                "{} loaded ({}, {} parameters)",
                key,
                report.mode,
                report.bound
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!("{} failed to load: {}", key, e);
            Err(e)
        }
    }
}
