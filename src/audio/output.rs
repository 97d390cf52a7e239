//! WAV writing for synthesized audio

use anyhow::{Context, Result};
use std::path::Path;

/// Sample encoding used when writing WAV files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavEncoding {
    /// 16-bit PCM, clipped to [-1, 1]
    #[default]
    Pcm16,
    /// 32-bit IEEE float, written as-is
    Float32,
}

/// Audio output handler
pub struct AudioOutput;

impl AudioOutput {
    /// Save mono samples as 16-bit PCM WAV
    pub fn save<P: AsRef<Path>>(samples: &[f32], sample_rate: u32, path: P) -> Result<()> {
        Self::save_with(samples, sample_rate, path, WavEncoding::Pcm16)
    }

    /// Save mono samples with an explicit encoding
    pub fn save_with<P: AsRef<Path>>(
        samples: &[f32],
        sample_rate: u32,
        path: P,
        encoding: WavEncoding,
    ) -> Result<()> {
        let path = path.as_ref();
        let (bits_per_sample, sample_format) = match encoding {
            WavEncoding::Pcm16 => (16, hound::SampleFormat::Int),
            WavEncoding::Float32 => (32, hound::SampleFormat::Float),
        };
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample,
            sample_format,
        };

        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        match encoding {
            WavEncoding::Pcm16 => {
                for &sample in samples {
                    let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                    writer.write_sample(scaled)?;
                }
            }
            WavEncoding::Float32 => {
                for &sample in samples {
                    writer.write_sample(sample)?;
                }
            }
        }

        writer
            .finalize()
            .with_context(|| format!("Failed to finalize WAV file: {:?}", path))?;
        tracing::debug!("Wrote {} samples to {:?}", samples.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_pcm16_clips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        AudioOutput::save(&[0.0, 0.5, 2.0, -2.0], 24000, &path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16383, 32767, -32768]);
    }

    #[test]
    fn test_save_float_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out_f32.wav");
        let input = [0.125f32, -0.75, 0.333];
        AudioOutput::save_with(&input, 24000, &path, WavEncoding::Float32).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, input.to_vec());
    }
}
