//! Model configuration types matching the StyleTTS2 `config.yml` structure
//!
//! Only the fields inference depends on are modelled; training sections
//! (`data_params`, `loss_params`, `optimizer_params`, ...) are ignored.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::MelConfig;
use crate::core::error::{Result, TtsError};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Audio preprocessing parameters
    #[serde(default)]
    pub preprocess_params: PreprocessParams,

    /// Network hyperparameters
    pub model_params: ModelParams,
}

impl ModelConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TtsError::Config {
            message: format!("Failed to read config file: {}", e),
            path: Some(path.to_path_buf()),
        })?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            TtsError::Config { message, .. } => TtsError::Config {
                message,
                path: Some(path.to_path_buf()),
            },
            other => other,
        })?;
        tracing::debug!(
            "Loaded model config {:?}: style_dim={}, decoder={:?}",
            path,
            config.model_params.style_dim,
            config.model_params.decoder.decoder_type
        );
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| TtsError::Config {
            message: format!("Failed to parse config YAML: {}", e),
            path: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| TtsError::Config {
            message,
            path: None,
        };
        if self.model_params.style_dim == 0 {
            return Err(invalid("model_params.style_dim must be positive".into()));
        }
        if self.model_params.n_token == 0 || self.model_params.max_dur == 0 {
            return Err(invalid(
                "model_params.n_token and model_params.max_dur must be positive".into(),
            ));
        }
        if self.preprocess_params.sr == 0 {
            return Err(invalid("preprocess_params.sr must be positive".into()));
        }
        let spect = &self.preprocess_params.spect_params;
        if spect.hop_length == 0 || spect.win_length == 0 || spect.win_length > spect.n_fft {
            return Err(invalid(format!(
                "spect_params need 0 < win_length <= n_fft and hop_length > 0 (got n_fft={}, win_length={}, hop_length={})",
                spect.n_fft, spect.win_length, spect.hop_length
            )));
        }
        let sigma_data = self.model_params.diffusion.dist.sigma_data;
        if !(sigma_data.is_finite() && sigma_data > 0.0) {
            return Err(invalid(format!(
                "model_params.diffusion.dist.sigma_data must be positive, got {}",
                sigma_data
            )));
        }
        Ok(())
    }

    /// Full style vector width (reference part + prosody part)
    pub fn style_vector_dim(&self) -> usize {
        self.model_params.style_dim * 2
    }

    /// Mel parameters for reference feature extraction
    pub fn mel_config(&self) -> MelConfig {
        let spect = &self.preprocess_params.spect_params;
        MelConfig {
            n_fft: spect.n_fft,
            win_length: spect.win_length,
            hop_length: spect.hop_length,
            n_mels: self.model_params.n_mels,
            ..MelConfig::default()
        }
    }
}

/// Audio preprocessing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// Model sample rate
    #[serde(default = "default_sr")]
    pub sr: u32,

    /// Spectrogram parameters
    #[serde(default)]
    pub spect_params: SpectParams,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            sr: default_sr(),
            spect_params: SpectParams::default(),
        }
    }
}

fn default_sr() -> u32 {
    24000
}

/// Spectrogram parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectParams {
    pub n_fft: usize,
    pub win_length: usize,
    pub hop_length: usize,
}

impl Default for SpectParams {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            win_length: 1200,
            hop_length: 300,
        }
    }
}

/// Network hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Width of each style sub-vector
    #[serde(default = "default_style_dim")]
    pub style_dim: usize,

    /// Symbol inventory size (text encoder and embedder vocabulary)
    #[serde(default = "default_n_token")]
    pub n_token: usize,

    /// Mel bands
    #[serde(default = "default_n_mels")]
    pub n_mels: usize,

    /// Duration predictor bins (width of the duration logits)
    #[serde(default = "default_max_dur")]
    pub max_dur: usize,

    /// Waveform decoder
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Style diffusion
    #[serde(default)]
    pub diffusion: DiffusionConfig,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            style_dim: default_style_dim(),
            n_token: default_n_token(),
            n_mels: default_n_mels(),
            max_dur: default_max_dur(),
            decoder: DecoderConfig::default(),
            diffusion: DiffusionConfig::default(),
        }
    }
}

fn default_style_dim() -> usize {
    128
}

fn default_n_token() -> usize {
    178
}

fn default_n_mels() -> usize {
    80
}

fn default_max_dur() -> usize {
    50
}

/// Decoder architecture family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    Hifigan,
    Istftnet,
    Other,
}

impl DecoderKind {
    fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "hifigan" => DecoderKind::Hifigan,
            "istftnet" => DecoderKind::Istftnet,
            _ => DecoderKind::Other,
        }
    }
}

/// Waveform decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(rename = "type", default = "default_decoder_type")]
    pub decoder_type: String,

    #[serde(default)]
    pub upsample_rates: Vec<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            decoder_type: default_decoder_type(),
            upsample_rates: Vec::new(),
        }
    }
}

fn default_decoder_type() -> String {
    "hifigan".to_string()
}

impl DecoderConfig {
    pub fn kind(&self) -> DecoderKind {
        DecoderKind::parse(&self.decoder_type)
    }

    /// Whether this decoder family expects frame-level inputs delayed by one frame
    pub fn requires_frame_shift(&self) -> bool {
        self.kind() == DecoderKind::Hifigan
    }

    /// Waveform samples produced per frame, when the upsample rates are known
    ///
    /// The synthesizer checks decoder output length against this.
    pub fn samples_per_frame(&self) -> Option<usize> {
        if self.upsample_rates.is_empty() {
            None
        } else {
            Some(self.upsample_rates.iter().product())
        }
    }
}

/// Style diffusion configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiffusionConfig {
    #[serde(default)]
    pub embedding_mask_proba: f32,

    #[serde(default)]
    pub dist: DiffusionDistribution,
}

/// Noise distribution parameters of the style diffusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffusionDistribution {
    #[serde(default = "default_sigma_data")]
    pub sigma_data: f64,

    #[serde(default)]
    pub estimate_sigma_data: bool,

    #[serde(default = "default_dist_mean")]
    pub mean: f64,

    #[serde(default = "default_dist_std")]
    pub std: f64,
}

impl Default for DiffusionDistribution {
    fn default() -> Self {
        Self {
            sigma_data: default_sigma_data(),
            estimate_sigma_data: false,
            mean: default_dist_mean(),
            std: default_dist_std(),
        }
    }
}

fn default_sigma_data() -> f64 {
    0.2
}

fn default_dist_mean() -> f64 {
    -3.0
}

fn default_dist_std() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const LIBRITTS_YAML: &str = r#"
log_dir: "Models/LibriTTS"
save_freq: 1
F0_path: "Utils/JDC/bst.t7"
ASR_config: "Utils/ASR/config.yml"
ASR_path: "Utils/ASR/epoch_00080.pth"
PLBERT_dir: 'Utils/PLBERT/'
data_params:
  root_path: ""
  min_length: 50
preprocess_params:
  sr: 24000
  spect_params:
    n_fft: 2048
    win_length: 1200
    hop_length: 300
model_params:
  multispeaker: true
  dim_in: 64
  hidden_dim: 512
  max_conv_dim: 512
  n_layer: 3
  n_mels: 80
  n_token: 178
  max_dur: 50
  style_dim: 128
  dropout: 0.2
  decoder:
    type: 'hifigan'
    resblock_kernel_sizes: [3,7,11]
    upsample_rates: [10,5,3,2]
    upsample_initial_channel: 512
  diffusion:
    embedding_mask_proba: 0.1
    transformer:
      num_layers: 3
      num_heads: 8
    dist:
      sigma_data: 0.2
      estimate_sigma_data: true
      mean: -3.0
      std: 1.0
"#;

    #[test]
    fn test_config_parse() {
        let config = ModelConfig::from_yaml(LIBRITTS_YAML).unwrap();
        assert_eq!(config.model_params.style_dim, 128);
        assert_eq!(config.style_vector_dim(), crate::STYLE_DIM);
        assert_eq!(config.preprocess_params.sr, 24000);
        assert_eq!(config.model_params.decoder.kind(), DecoderKind::Hifigan);
        assert!(config.model_params.decoder.requires_frame_shift());
        assert_eq!(config.model_params.decoder.samples_per_frame(), Some(300));
        assert_eq!(config.model_params.diffusion.dist.sigma_data, 0.2);
        assert_eq!(config.model_params.n_token, 178);
        assert_eq!(config.model_params.max_dur, 50);
    }

    #[test]
    fn test_istftnet_needs_no_shift() {
        let yaml = "model_params:\n  decoder:\n    type: istftnet\n";
        let config = ModelConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.model_params.decoder.kind(), DecoderKind::Istftnet);
        assert!(!config.model_params.decoder.requires_frame_shift());
    }

    #[test]
    fn test_unknown_decoder_type() {
        let yaml = "model_params:\n  decoder:\n    type: vocos\n";
        let config = ModelConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.model_params.decoder.kind(), DecoderKind::Other);
    }

    #[test]
    fn test_defaults_for_minimal_config() {
        let config = ModelConfig::from_yaml("model_params: {}\n").unwrap();
        assert_eq!(config.model_params.style_dim, 128);
        assert_eq!(config.preprocess_params.spect_params.hop_length, 300);
        let mel = config.mel_config();
        assert_eq!(mel.n_fft, 2048);
        assert_eq!(mel.n_mels, 80);
        assert_eq!(mel.filterbank_sample_rate, 16000);
    }

    #[test]
    fn test_rejects_bad_window() {
        let yaml = "preprocess_params:\n  spect_params:\n    n_fft: 512\n    win_length: 1200\n    hop_length: 300\nmodel_params: {}\n";
        match ModelConfig::from_yaml(yaml) {
            Err(TtsError::Config { message, .. }) => assert!(message.contains("win_length")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_carries_path() {
        match ModelConfig::load("/nonexistent/config.yml") {
            Err(TtsError::Config { path, .. }) => {
                assert_eq!(path, Some(PathBuf::from("/nonexistent/config.yml")))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
