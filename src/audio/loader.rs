//! Reference audio loading
//!
//! WAV goes through hound; everything else (MP3, FLAC, OGG/Vorbis, ...)
//! through symphonia. Output is always mono f32 at the requested rate.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::Resampler;

/// Interleaved samples straight out of a decoder
struct Decoded {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

/// Audio loader for reference clips
pub struct AudioLoader;

impl AudioLoader {
    /// Load audio as mono samples at `target_sr`
    ///
    /// # Returns
    /// Tuple of (samples, sample_rate) where samples are normalized to [-1, 1]
    pub fn load<P: AsRef<Path>>(path: P, target_sr: u32) -> Result<(Vec<f32>, u32)> {
        let (samples, sample_rate) = Self::load_native(path)?;
        Self::from_samples(samples, sample_rate, target_sr)
    }

    /// Load audio as mono samples at the file's own rate
    pub fn load_native<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32)> {
        let path = path.as_ref();
        let decoded = if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("wav")) {
            Self::decode_wav(path)?
        } else {
            Self::decode_with_symphonia(path)?
        };
        tracing::debug!(
            "Decoded {:?}: {} frames, {} ch @ {} Hz",
            path,
            decoded.samples.len() / decoded.channels.max(1),
            decoded.channels,
            decoded.sample_rate
        );
        Ok((
            downmix(&decoded.samples, decoded.channels),
            decoded.sample_rate,
        ))
    }

    /// Resample in-memory mono samples to `target_sr`
    pub fn from_samples(
        samples: Vec<f32>,
        sample_rate: u32,
        target_sr: u32,
    ) -> Result<(Vec<f32>, u32)> {
        if sample_rate == target_sr {
            return Ok((samples, sample_rate));
        }
        let resampled = Resampler::resample(&samples, sample_rate, target_sr)
            .with_context(|| format!("Failed to resample {} Hz -> {} Hz", sample_rate, target_sr))?;
        Ok((resampled, target_sr))
    }

    fn decode_wav(path: &Path) -> Result<Decoded> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {:?}", path))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .context("Corrupt float WAV data")?,
            hound::SampleFormat::Int => {
                let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_value))
                    .collect::<std::result::Result<_, _>>()
                    .context("Corrupt PCM WAV data")?
            }
        };

        Ok(Decoded {
            samples,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
        })
    }

    fn decode_with_symphonia(path: &Path) -> Result<Decoded> {
        let src =
            File::open(path).with_context(|| format!("Failed to open audio file: {:?}", path))?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("Unsupported audio format: {:?}", path))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow!("No supported audio tracks found in {:?}", path))?;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| anyhow!("Unknown sample rate in {:?}", path))?;
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Unsupported codec")?;

        let mut samples: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(anyhow!("Error reading packet: {}", e)),
            };
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let buf = sample_buf.get_or_insert_with(|| {
                        SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
                    });
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                // Corrupted packets are skipped
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(anyhow!("Decode error: {}", e)),
            }
        }

        Ok(Decoded {
            samples,
            channels,
            sample_rate,
        })
    }
}

/// Average interleaved channels into one
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
