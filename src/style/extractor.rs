//! Reference style extraction
//!
//! Reference clip -> silence trim -> 24 kHz -> normalized log mel ->
//! the two style encoders. The timbre encoder gives the reference part,
//! the prosody encoder gives the prosody part.

use candle_core::{Device, Tensor};
use std::path::Path;

use crate::audio::{trim_silence, AudioLoader, MelConfig, MelSpectrogram, Resampler, TrimConfig};
use crate::config::ModelConfig;
use crate::core::error::{AudioOperation, Result, ResultExt, TtsError};
use crate::core::traits::StyleEncoder;

use super::StyleVector;

/// Turns reference audio into style vectors
pub struct StyleExtractor {
    mel: MelSpectrogram,
    trim: TrimConfig,
    target_sr: u32,
    device: Device,
}

impl StyleExtractor {
    pub fn new(mel_config: MelConfig, target_sr: u32, device: Device) -> Self {
        Self {
            mel: MelSpectrogram::new(mel_config),
            trim: TrimConfig::default(),
            target_sr,
            device,
        }
    }

    /// Extractor matching a model's preprocessing parameters
    pub fn from_config(config: &ModelConfig, device: Device) -> Self {
        Self::new(config.mel_config(), config.preprocess_params.sr, device)
    }

    pub fn with_trim(mut self, trim: TrimConfig) -> Self {
        self.trim = trim;
        self
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sr
    }

    /// Normalized log-mel features of a mono clip
    ///
    /// # Returns
    /// `[1, 1, n_mels, frames]`
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<Tensor> {
        if samples.is_empty() {
            return Err(TtsError::Audio {
                message: "reference clip has no samples".to_string(),
                operation: AudioOperation::Loading,
            });
        }

        let (trimmed, (start, end)) =
            trim_silence(samples, &self.trim).audio_context(AudioOperation::Trimming)?;
        if trimmed.is_empty() {
            return Err(TtsError::Audio {
                message: "reference clip is silent".to_string(),
                operation: AudioOperation::Trimming,
            });
        }
        tracing::debug!(
            "Trimmed reference to samples [{}, {}) of {}",
            start,
            end,
            samples.len()
        );

        let audio = if sample_rate != self.target_sr {
            Resampler::resample(&trimmed, sample_rate, self.target_sr)
                .audio_context(AudioOperation::Resampling)?
        } else {
            trimmed
        };

        let features = self
            .mel
            .style_features(&audio, &self.device)
            .audio_context(AudioOperation::MelSpectrogram)?;
        tracing::debug!("Reference features: {:?}", features.dims());
        Ok(features)
    }

    /// Single-source style: both parts from the same clip
    pub fn style_from_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
        style_encoder: &dyn StyleEncoder,
        predictor_encoder: &dyn StyleEncoder,
    ) -> Result<StyleVector> {
        let features = self.extract(samples, sample_rate)?;
        let reference = style_encoder.encode(&features)?;
        let prosody = predictor_encoder.encode(&features)?;
        StyleVector::from_parts(&reference, &prosody)
    }

    /// Dual-source style: reference part from one clip, prosody part from another
    pub fn style_from_two(
        &self,
        reference_clip: (&[f32], u32),
        prosody_clip: (&[f32], u32),
        style_encoder: &dyn StyleEncoder,
        predictor_encoder: &dyn StyleEncoder,
    ) -> Result<StyleVector> {
        let reference = style_encoder.encode(&self.extract(reference_clip.0, reference_clip.1)?)?;
        let prosody = predictor_encoder.encode(&self.extract(prosody_clip.0, prosody_clip.1)?)?;
        StyleVector::from_parts(&reference, &prosody)
    }

    pub fn style_from_path<P: AsRef<Path>>(
        &self,
        path: P,
        style_encoder: &dyn StyleEncoder,
        predictor_encoder: &dyn StyleEncoder,
    ) -> Result<StyleVector> {
        let (samples, sr) = self.load(path.as_ref())?;
        self.style_from_samples(&samples, sr, style_encoder, predictor_encoder)
    }

    pub fn style_from_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        reference_path: P,
        prosody_path: Q,
        style_encoder: &dyn StyleEncoder,
        predictor_encoder: &dyn StyleEncoder,
    ) -> Result<StyleVector> {
        let (reference, reference_sr) = self.load(reference_path.as_ref())?;
        let (prosody, prosody_sr) = self.load(prosody_path.as_ref())?;
        self.style_from_two(
            (&reference, reference_sr),
            (&prosody, prosody_sr),
            style_encoder,
            predictor_encoder,
        )
    }

    fn load(&self, path: &Path) -> Result<(Vec<f32>, u32)> {
        tracing::info!("Loading reference audio {:?}", path);
        AudioLoader::load(path, self.target_sr).audio_context(AudioOperation::Loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{ModelComponent, ParameterSpec};
    use candle_core::D;
    use std::collections::HashMap;

    /// Mean over frames of the first `width` mel bands, plus an offset
    struct BandMean {
        width: usize,
        offset: f32,
    }

    impl ModelComponent for BandMean {
        fn name(&self) -> &str {
            "band_mean"
        }

        fn parameter_specs(&self) -> Vec<ParameterSpec> {
            Vec::new()
        }

        fn bind_parameters(&mut self, _params: &HashMap<String, Tensor>) -> Result<()> {
            Ok(())
        }
    }

    impl StyleEncoder for BandMean {
        fn encode(&self, mel: &Tensor) -> Result<Tensor> {
            let bands = mel.squeeze(0)?.squeeze(0)?.narrow(0, 0, self.width)?;
            Ok((bands.mean(D::Minus1)?.unsqueeze(0)? + self.offset as f64)?)
        }
    }

    fn tone(freq: f32, sr: u32, secs: f32) -> Vec<f32> {
        let n = (sr as f32 * secs) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    fn extractor() -> StyleExtractor {
        StyleExtractor::new(MelConfig::default(), 24000, Device::Cpu)
    }

    #[test]
    fn test_feature_layout() {
        let features = extractor().extract(&tone(220.0, 24000, 1.0), 24000).unwrap();
        let dims = features.dims();
        assert_eq!(&dims[..3], &[1, 1, 80]);
        assert!(dims[3] > 0);
    }

    #[test]
    fn test_resamples_before_mel() {
        let ex = extractor();
        let native = ex.extract(&tone(220.0, 24000, 1.0), 24000).unwrap();
        let from_16k = ex.extract(&tone(220.0, 16000, 1.0), 16000).unwrap();
        // Same duration, so the same frame count within the resampler's rounding
        let diff = native.dims()[3] as i64 - from_16k.dims()[3] as i64;
        assert!(diff.abs() <= 1, "{:?} vs {:?}", native.dims(), from_16k.dims());
    }

    #[test]
    fn test_silent_clip_is_rejected() {
        let err = extractor().extract(&vec![0.0; 24000], 24000).unwrap_err();
        assert!(matches!(
            err,
            TtsError::Audio {
                operation: AudioOperation::Trimming,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_clip_is_rejected() {
        assert!(extractor().extract(&[], 24000).is_err());
    }

    #[test]
    fn test_single_source_style() {
        let ex = extractor();
        let timbre = BandMean { width: 4, offset: 0.0 };
        let prosody = BandMean { width: 4, offset: 10.0 };
        let style = ex
            .style_from_samples(&tone(220.0, 24000, 1.0), 24000, &timbre, &prosody)
            .unwrap();
        assert_eq!(style.dim(), 8);
        let v = style.to_vec().unwrap();
        for i in 0..4 {
            assert!((v[i + 4] - v[i] - 10.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_dual_source_takes_parts_from_each_clip() {
        let ex = extractor();
        let enc = BandMean { width: 80, offset: 0.0 };
        let low = tone(110.0, 24000, 1.0);
        let high = tone(3000.0, 24000, 1.0);

        let low_only = ex.style_from_samples(&low, 24000, &enc, &enc).unwrap();
        let high_only = ex.style_from_samples(&high, 24000, &enc, &enc).unwrap();
        let mixed = ex.style_from_two((&low, 24000), (&high, 24000), &enc, &enc).unwrap();

        let r = |s: &StyleVector| s.reference().unwrap().flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let p = |s: &StyleVector| s.prosody().unwrap().flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(r(&mixed), r(&low_only));
        assert_eq!(p(&mixed), p(&high_only));
    }

    #[test]
    fn test_style_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.wav");
        crate::audio::AudioOutput::save(&tone(220.0, 24000, 1.0), 24000, &path).unwrap();

        let enc = BandMean { width: 2, offset: 0.0 };
        let style = extractor().style_from_path(&path, &enc, &enc).unwrap();
        assert_eq!(style.dim(), 4);

        let missing = extractor().style_from_path(dir.path().join("nope.wav"), &enc, &enc);
        assert!(matches!(
            missing,
            Err(TtsError::Audio {
                operation: AudioOperation::Loading,
                ..
            })
        ));
    }
}
