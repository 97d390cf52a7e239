//! Deterministic stand-ins for the networks, shared by the integration tests
//!
//! Every mock is a real [`ModelComponent`] with named parameters, so the
//! same mocks exercise checkpoint binding and the synthesis pipeline.

#![allow(dead_code)]

use candle_core::{DType, Device, Tensor, D};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use styletts::models::LinearProjection;
use styletts::{
    BertEmbedder, IdentityPhonemizer, ModelBundle, ModelComponent, ModelConfig, ParameterSpec,
    ProsodyPredictor, Result, StyleDenoiser, StyleEncoder, StyleTts, StyleVector, SymbolTable,
    TextEncoder, WaveformDecoder,
};

/// Width of each style part
pub const STYLE_PART: usize = 4;
/// Text encoder channels
pub const CHANNELS: usize = 6;
/// Embedder hidden width
pub const HIDDEN: usize = 5;
/// Prosody encoder width
pub const PRED_DIM: usize = 3;
/// Duration bins
pub const DUR_BINS: usize = 8;

/// Bounded deterministic values
pub fn ramp(rows: usize, cols: usize, scale: f32) -> Tensor {
    let data: Vec<f32> = (0..rows * cols).map(|i| (i as f32 * 0.37).sin() * scale).collect();
    Tensor::from_vec(data, (rows, cols), &Device::Cpu).unwrap()
}

pub fn filled(shape: &[usize], value: f32) -> Tensor {
    let n: usize = shape.iter().product();
    Tensor::from_vec(vec![value; n], shape, &Device::Cpu).unwrap()
}

/// Named parameter store behind every mock
#[derive(Clone)]
pub struct Params(BTreeMap<String, Tensor>);

impl Params {
    pub fn new(entries: Vec<(&str, Tensor)>) -> Self {
        Self(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    pub fn get(&self, name: &str) -> &Tensor {
        &self.0[name]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Tensor)> {
        self.0.iter()
    }

    fn specs(&self) -> Vec<ParameterSpec> {
        self.0
            .iter()
            .map(|(k, t)| ParameterSpec::new(k.clone(), t.dims()))
            .collect()
    }

    fn bind(&mut self, params: &HashMap<String, Tensor>) {
        for (k, t) in params {
            if self.0.contains_key(k) {
                self.0.insert(k.clone(), t.clone());
            }
        }
    }
}

macro_rules! component {
    ($ty:ty, $name:expr) => {
        impl ModelComponent for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn parameter_specs(&self) -> Vec<ParameterSpec> {
                self.params.specs()
            }

            fn bind_parameters(&mut self, params: &HashMap<String, Tensor>) -> Result<()> {
                self.params.bind(params);
                Ok(())
            }
        }
    };
}

/// Embedding lookup, `[1, C, T]`
pub struct MockTextEncoder {
    pub params: Params,
}
component!(MockTextEncoder, "text_encoder");

impl TextEncoder for MockTextEncoder {
    fn encode(&self, tokens: &Tensor, _lengths: &Tensor, _mask: &Tensor) -> Result<Tensor> {
        let ids = tokens.flatten_all()?;
        let emb = self.params.get("embedding.weight").index_select(&ids, 0)?;
        Ok(emb.t()?.unsqueeze(0)?.contiguous()?)
    }
}

/// Embedding lookup gated by the attention mask, `[1, T, H]`
pub struct MockBert {
    pub params: Params,
}
component!(MockBert, "bert");

impl BertEmbedder for MockBert {
    fn embed(&self, tokens: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let ids = tokens.flatten_all()?;
        let emb = self
            .params
            .get("embeddings.word_embeddings.weight")
            .index_select(&ids, 0)?
            .unsqueeze(0)?;
        let gate = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        Ok(emb.broadcast_mul(&gate)?)
    }
}

/// Linear encoder, bias-dominated duration logits, summed pitch/energy
pub struct MockPredictor {
    pub params: Params,
}
component!(MockPredictor, "predictor");

impl ProsodyPredictor for MockPredictor {
    fn encode(&self, d_en: &Tensor, style: &Tensor, _lengths: &Tensor, _mask: &Tensor)
        -> Result<Tensor> {
        let w = self.params.get("text_encoder.proj.weight").t()?.contiguous()?.unsqueeze(0)?;
        let x = d_en.transpose(1, 2)?.contiguous()?.matmul(&w)?;
        let shift = style.mean_all()?.to_scalar::<f32>()? as f64;
        Ok((x + shift)?)
    }

    fn duration_logits(&self, encoded: &Tensor) -> Result<Tensor> {
        let bias = self.params.get("duration_proj.bias");
        let varying = (encoded.mean_keepdim(D::Minus1)? * 0.05)?;
        Ok(varying.broadcast_add(bias)?)
    }

    fn predict_f0_energy(&self, frames: &Tensor, style: &Tensor) -> Result<(Tensor, Tensor)> {
        let shift = style.mean_all()?.to_scalar::<f32>()? as f64;
        let f0 = (frames.sum(1)? + shift)?;
        let energy = frames.mean(1)?;
        Ok((f0, energy))
    }
}

/// Per-frame tanh level held for `hop` samples; records its frame input
pub struct MockDecoder {
    pub params: Params,
    pub hop: usize,
    pub frame_shift: bool,
    pub seen: Arc<Mutex<Option<Tensor>>>,
}
component!(MockDecoder, "decoder");

impl WaveformDecoder for MockDecoder {
    fn decode(&self, aligned: &Tensor, f0: &Tensor, _energy: &Tensor, reference: &Tensor)
        -> Result<Tensor> {
        if let Ok(mut seen) = self.seen.lock() {
            *seen = Some(aligned.clone());
        }
        let offset = reference.mean_all()?.to_scalar::<f32>()? as f64
            + self.params.get("generator.bias").mean_all()?.to_scalar::<f32>()? as f64;
        let level = ((aligned.mean(1)? + offset)? + (f0 * 0.01)?)?.tanh()?;
        let levels = level.flatten_all()?.to_vec1::<f32>()?;
        let samples: Vec<f32> = levels
            .iter()
            .flat_map(|&v| std::iter::repeat(v * 0.5).take(self.hop))
            .collect();
        let n = samples.len();
        Ok(Tensor::from_vec(samples, (1, 1, n), aligned.device())?)
    }

    fn requires_frame_shift(&self) -> bool {
        self.frame_shift
    }
}

/// Mean of the first bands over time plus a learned offset, `[1, STYLE_PART]`
pub struct MockStyleEncoder {
    pub name: &'static str,
    pub params: Params,
}

impl ModelComponent for MockStyleEncoder {
    fn name(&self) -> &str {
        self.name
    }

    fn parameter_specs(&self) -> Vec<ParameterSpec> {
        self.params.specs()
    }

    fn bind_parameters(&mut self, params: &HashMap<String, Tensor>) -> Result<()> {
        self.params.bind(params);
        Ok(())
    }
}

impl StyleEncoder for MockStyleEncoder {
    fn encode(&self, mel: &Tensor) -> Result<Tensor> {
        let bands = mel.squeeze(0)?.squeeze(0)?.narrow(0, 0, STYLE_PART)?;
        let pooled = bands.mean(1)?;
        Ok(pooled.broadcast_add(self.params.get("offset"))?.unsqueeze(0)?)
    }
}

/// Predicts the reference features, nudged by the text embedding
pub struct MockDenoiser {
    pub params: Params,
}
component!(MockDenoiser, "diffusion");

impl StyleDenoiser for MockDenoiser {
    fn forward(
        &self,
        x: &Tensor,
        _noise_level: &Tensor,
        embedding: Option<&Tensor>,
        features: &Tensor,
    ) -> Result<Tensor> {
        let mut target = features.unsqueeze(1)?;
        if let Some(e) = embedding {
            target = (target + e.mean_all()?.to_scalar::<f32>()? as f64 * 0.1)?;
        }
        let gain = self.params.get("gain").to_vec1::<f32>()?[0] as f64;
        Ok(((target * gain)? + (x * 0.01)?)?)
    }
}

/// Knobs for one mock model set
#[derive(Clone, Debug)]
pub struct MockSetup {
    pub frame_shift: bool,
    pub duration_bias: f32,
    pub hop: usize,
}

impl Default for MockSetup {
    fn default() -> Self {
        Self {
            frame_shift: true,
            duration_bias: 0.5,
            hop: 300,
        }
    }
}

impl MockSetup {
    pub fn config(&self) -> ModelConfig {
        ModelConfig::from_yaml(&self.config_yaml()).unwrap()
    }

    pub fn config_yaml(&self) -> String {
        let decoder = if self.frame_shift { "hifigan" } else { "istftnet" };
        format!(
            "model_params:\n  style_dim: {}\n  max_dur: {}\n  decoder:\n    type: {}\n    upsample_rates: [{}]\n",
            STYLE_PART, DUR_BINS, decoder, self.hop
        )
    }

    /// Parameters of every component, keyed by checkpoint component name
    pub fn component_params(&self) -> Vec<(&'static str, Params)> {
        let n_token = SymbolTable::default().len();
        vec![
            ("text_encoder", Params::new(vec![("embedding.weight", ramp(n_token, CHANNELS, 1.0))])),
            (
                "bert",
                Params::new(vec![("embeddings.word_embeddings.weight", ramp(n_token, HIDDEN, 0.5))]),
            ),
            (
                "bert_encoder",
                Params::new(vec![("weight", ramp(CHANNELS, HIDDEN, 0.3)), ("bias", filled(&[CHANNELS], 0.0))]),
            ),
            (
                "predictor",
                Params::new(vec![
                    ("text_encoder.proj.weight", ramp(PRED_DIM, CHANNELS, 0.2)),
                    ("duration_proj.bias", filled(&[DUR_BINS], self.duration_bias)),
                ]),
            ),
            ("decoder", Params::new(vec![("generator.bias", filled(&[1], 0.0))])),
            ("style_encoder", Params::new(vec![("offset", filled(&[STYLE_PART], 0.0))])),
            ("predictor_encoder", Params::new(vec![("offset", filled(&[STYLE_PART], 1.0))])),
            ("diffusion", Params::new(vec![("gain", filled(&[1], 1.0))])),
        ]
    }

    pub fn bundle(&self) -> (ModelBundle, Arc<Mutex<Option<Tensor>>>) {
        let mut params: HashMap<&str, Params> = self.component_params().into_iter().collect();
        let mut take = |key: &str| params.remove(key).unwrap();
        let seen = Arc::new(Mutex::new(None));

        let projection = take("bert_encoder");
        let bundle = ModelBundle {
            text_encoder: Box::new(MockTextEncoder { params: take("text_encoder") }),
            bert: Box::new(MockBert { params: take("bert") }),
            bert_encoder: Box::new(
                LinearProjection::from_weights(
                    projection.get("weight").clone(),
                    projection.get("bias").clone(),
                )
                .unwrap(),
            ),
            predictor: Box::new(MockPredictor { params: take("predictor") }),
            decoder: Box::new(MockDecoder {
                params: take("decoder"),
                hop: self.hop,
                frame_shift: self.frame_shift,
                seen: Arc::clone(&seen),
            }),
            style_encoder: Box::new(MockStyleEncoder {
                name: "style_encoder",
                params: take("style_encoder"),
            }),
            predictor_encoder: Box::new(MockStyleEncoder {
                name: "predictor_encoder",
                params: take("predictor_encoder"),
            }),
            diffusion: Box::new(MockDenoiser { params: take("diffusion") }),
        };
        (bundle, seen)
    }

    pub fn tts(&self) -> StyleTts {
        self.tts_with_recorder().0
    }

    pub fn tts_with_recorder(&self) -> (StyleTts, Arc<Mutex<Option<Tensor>>>) {
        let (bundle, seen) = self.bundle();
        let tts = StyleTts::new(self.config(), bundle, Box::new(IdentityPhonemizer), Device::Cpu)
            .unwrap();
        (tts, seen)
    }

    /// Flat checkpoint tensors, `net.<component>.<parameter>`
    pub fn checkpoint_tensors(&self) -> HashMap<String, Tensor> {
        let mut tensors = HashMap::new();
        for (component, params) in self.component_params() {
            for (name, tensor) in params.iter() {
                tensors.insert(format!("net.{}.{}", component, name), tensor.clone());
            }
        }
        tensors
    }
}

/// Fixed reference style of the mock width
pub fn reference_style() -> StyleVector {
    let values: Vec<f32> = (0..2 * STYLE_PART).map(|i| 0.1 * i as f32 - 0.3).collect();
    StyleVector::from_vec(values, &Device::Cpu).unwrap()
}

/// One second of a 220 Hz tone
pub fn tone(sample_rate: u32) -> Vec<f32> {
    (0..sample_rate as usize)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sample_rate as f32).sin())
        .collect()
}

pub fn values(style: &StyleVector) -> Vec<f32> {
    style.to_vec().unwrap()
}
