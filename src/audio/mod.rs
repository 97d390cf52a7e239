//! Audio processing modules
//!
//! - Reference clip loading and decoding (WAV, MP3, FLAC, OGG)
//! - Sample rate conversion to the 24 kHz model rate
//! - Leading/trailing silence trimming
//! - Normalized log-mel features for the style encoders
//! - WAV output

mod loader;
mod mel;
mod output;
mod resampler;
mod trim;

pub use loader::AudioLoader;
pub use mel::{MelConfig, MelSpectrogram};
pub use output::{AudioOutput, WavEncoding};
pub use resampler::Resampler;
pub use trim::{trim_silence, TrimConfig};
