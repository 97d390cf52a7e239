//! Mel spectrogram computation
//!
//! Reproduces the power mel spectrogram the style encoders were trained on:
//! centered frames with reflect padding, a periodic Hann window of
//! `win_length` centered inside each `n_fft` frame, HTK mel scale with
//! unnormalized triangular filters, then `ln(1e-5 + mel)` standardized
//! with a fixed mean and std.

use anyhow::{bail, Result};
use candle_core::{Device, Tensor};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Mel spectrogram parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MelConfig {
    /// FFT size
    pub n_fft: usize,
    /// Window length, centered inside the FFT frame
    pub win_length: usize,
    /// Hop length between frames
    pub hop_length: usize,
    /// Number of mel bands
    pub n_mels: usize,
    /// Rate the filterbank is laid out for. The style encoders were trained
    /// with a 16 kHz filterbank applied to 24 kHz audio, so this is not the
    /// audio rate.
    pub filterbank_sample_rate: u32,
    /// Minimum frequency
    pub fmin: f32,
    /// Maximum frequency (None = filterbank Nyquist)
    pub fmax: Option<f32>,
    /// Mean subtracted from the log mel
    pub log_mean: f32,
    /// Std the centered log mel is divided by
    pub log_std: f32,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            win_length: 1200,
            hop_length: 300,
            n_mels: 80,
            filterbank_sample_rate: 16000,
            fmin: 0.0,
            fmax: None,
            log_mean: -4.0,
            log_std: 4.0,
        }
    }
}

/// Mel spectrogram computer
pub struct MelSpectrogram {
    config: MelConfig,
    /// `[n_mels][n_fft / 2 + 1]`
    mel_filters: Vec<Vec<f32>>,
    /// Hann window zero-padded to `n_fft`
    window: Vec<f32>,
    fft: Arc<dyn rustfft::Fft<f32>>,
}

impl MelSpectrogram {
    /// Create a mel spectrogram computer
    pub fn new(config: MelConfig) -> Self {
        let window = Self::padded_hann_window(config.win_length, config.n_fft);
        let fmax = config
            .fmax
            .unwrap_or(config.filterbank_sample_rate as f32 / 2.0);
        let mel_filters = Self::mel_filterbank(
            config.n_fft,
            config.n_mels,
            config.filterbank_sample_rate,
            config.fmin,
            fmax,
        );

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.n_fft);

        Self {
            config,
            mel_filters,
            window,
            fft,
        }
    }

    /// Create with the style encoder defaults (80 bands, FFT 2048, hop 300)
    pub fn new_default() -> Self {
        Self::new(MelConfig::default())
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    /// Compute the power mel spectrogram
    ///
    /// # Returns
    /// `[n_mels][n_frames]`
    pub fn compute(&self, audio: &[f32]) -> Result<Vec<Vec<f32>>> {
        let power = self.power_spectrum(audio)?;
        let n_frames = power.len();
        let mut mel = vec![vec![0.0f32; n_frames]; self.config.n_mels];
        for (t, frame) in power.iter().enumerate() {
            for (m, filter) in self.mel_filters.iter().enumerate() {
                mel[m][t] = filter.iter().zip(frame.iter()).map(|(f, p)| f * p).sum();
            }
        }
        Ok(mel)
    }

    /// Log-compress and standardize a mel spectrogram in place
    pub fn normalize(&self, mel: &mut [Vec<f32>]) {
        const LOG_OFFSET: f32 = 1e-5;
        for band in mel.iter_mut() {
            for v in band.iter_mut() {
                *v = ((LOG_OFFSET + *v).ln() - self.config.log_mean) / self.config.log_std;
            }
        }
    }

    /// Normalized log mel as a `[1, 1, n_mels, n_frames]` tensor
    pub fn style_features(&self, audio: &[f32], device: &Device) -> Result<Tensor> {
        let mut mel = self.compute(audio)?;
        self.normalize(&mut mel);
        let n_frames = mel.first().map(|b| b.len()).unwrap_or(0);
        let flat: Vec<f32> = mel.into_iter().flatten().collect();
        Ok(Tensor::from_vec(
            flat,
            (1, 1, self.config.n_mels, n_frames),
            device,
        )?)
    }

    /// Number of frames produced for a given audio length
    pub fn num_frames(&self, audio_len: usize) -> usize {
        audio_len / self.config.hop_length + 1
    }

    /// Centered STFT power spectrum, `[n_frames][n_fft / 2 + 1]`
    fn power_spectrum(&self, audio: &[f32]) -> Result<Vec<Vec<f32>>> {
        let n_fft = self.config.n_fft;
        let pad = n_fft / 2;
        if audio.len() <= pad {
            bail!(
                "Audio too short for reflect padding: {} samples, need more than {}",
                audio.len(),
                pad
            );
        }

        // Reflect padding excludes the edge sample
        let n = audio.len();
        let mut padded = Vec::with_capacity(n + 2 * pad);
        padded.extend((1..=pad).rev().map(|i| audio[i]));
        padded.extend_from_slice(audio);
        padded.extend((1..=pad).map(|i| audio[n - 1 - i]));

        let num_frames = self.num_frames(n);
        let mut frames = Vec::with_capacity(num_frames);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];

        for i in 0..num_frames {
            let start = i * self.config.hop_length;
            for (j, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + j] * self.window[j], 0.0);
            }
            self.fft.process(&mut buffer);
            frames.push(buffer[..n_fft / 2 + 1].iter().map(|c| c.norm_sqr()).collect());
        }

        Ok(frames)
    }

    /// Periodic Hann window of `win_length`, centered in `n_fft` zeros
    fn padded_hann_window(win_length: usize, n_fft: usize) -> Vec<f32> {
        let mut window = vec![0.0f32; n_fft];
        let offset = (n_fft - win_length) / 2;
        for i in 0..win_length {
            window[offset + i] = 0.5 * (1.0 - (2.0 * PI * i as f32 / win_length as f32).cos());
        }
        window
    }

    /// Hz to Mel conversion (HTK formula)
    fn hz_to_mel(hz: f32) -> f32 {
        2595.0 * (1.0 + hz / 700.0).log10()
    }

    /// Mel to Hz conversion (HTK formula)
    fn mel_to_hz(mel: f32) -> f32 {
        700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
    }

    /// Triangular filters without area normalization
    fn mel_filterbank(n_fft: usize, n_mels: usize, sr: u32, fmin: f32, fmax: f32) -> Vec<Vec<f32>> {
        let n_freqs = n_fft / 2 + 1;
        let nyquist = (sr / 2) as f32;
        let all_freqs: Vec<f32> = (0..n_freqs)
            .map(|i| nyquist * i as f32 / (n_freqs - 1) as f32)
            .collect();

        let mel_min = Self::hz_to_mel(fmin);
        let mel_max = Self::hz_to_mel(fmax);
        let f_pts: Vec<f32> = (0..n_mels + 2)
            .map(|i| Self::mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
            .collect();

        let mut filters = vec![vec![0.0f32; n_freqs]; n_mels];
        for (m, filter) in filters.iter_mut().enumerate() {
            let (left, center, right) = (f_pts[m], f_pts[m + 1], f_pts[m + 2]);
            for (j, &freq) in all_freqs.iter().enumerate() {
                let down = (freq - left) / (center - left);
                let up = (right - freq) / (right - center);
                filter[j] = down.min(up).max(0.0);
            }
        }
        filters
    }
}
