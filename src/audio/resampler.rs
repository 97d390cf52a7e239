//! Audio resampling using rubato
//!
//! Sinc interpolation in fixed-size chunks. The filter delay is flushed
//! and removed so the output is time-aligned with the input and has
//! `round(len * to / from)` samples.

use anyhow::{Context, Result};
use rubato::{
    calculate_cutoff, Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

/// Input chunk size fed to the sinc resampler
const CHUNK_SIZE: usize = 1024;

/// Audio resampler using sinc interpolation
pub struct Resampler;

impl Resampler {
    /// Resample mono audio from one sample rate to another
    pub fn resample(samples: &[f32], from_sr: u32, to_sr: u32) -> Result<Vec<f32>> {
        if from_sr == to_sr {
            return Ok(samples.to_vec());
        }
        if samples.is_empty() {
            return Ok(vec![]);
        }
        anyhow::ensure!(from_sr > 0 && to_sr > 0, "Sample rates must be positive");

        let sinc_len = 256;
        let window = WindowFunction::BlackmanHarris2;
        let params = SincInterpolationParameters {
            sinc_len,
            f_cutoff: calculate_cutoff(sinc_len, window),
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window,
        };

        let ratio = to_sr as f64 / from_sr as f64;
        let chunk = CHUNK_SIZE.min(samples.len());
        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, chunk, 1)
            .context("Failed to create resampler")?;

        let delay = resampler.output_delay();
        let expected = (samples.len() as f64 * ratio).round() as usize;
        let mut output = Vec::with_capacity(expected + delay);

        let mut pos = 0;
        while pos + chunk <= samples.len() {
            let block = resampler
                .process(&[&samples[pos..pos + chunk]], None)
                .context("Resampling failed")?;
            output.extend_from_slice(&block[0]);
            pos += chunk;
        }
        if pos < samples.len() {
            let block = resampler
                .process_partial(Some(&[&samples[pos..]]), None)
                .context("Resampling tail failed")?;
            output.extend_from_slice(&block[0]);
        }

        // Flush the filter so the last `delay` samples come out
        while output.len() < expected + delay {
            let block = resampler
                .process_partial::<Vec<f32>>(None, None)
                .context("Resampler flush failed")?;
            if block[0].is_empty() {
                break;
            }
            output.extend_from_slice(&block[0]);
        }

        Ok(output.into_iter().skip(delay).take(expected).collect())
    }

    /// Resample to the 24 kHz rate the style encoders expect
    pub fn resample_to_24k(samples: &[f32], from_sr: u32) -> Result<Vec<f32>> {
        Self::resample(samples, from_sr, 24000)
    }
}
