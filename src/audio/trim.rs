//! Leading/trailing silence trimming
//!
//! Frame-wise RMS energy in dB relative to the loudest frame; frames
//! quieter than `-top_db` count as silence. The kept region runs from the
//! first to the last non-silent frame, converted back to sample indices
//! the way centered framing places them.

use anyhow::{ensure, Result};

/// Silence trimming parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimConfig {
    /// Threshold below the peak (in dB) regarded as silence
    pub top_db: f32,
    /// Analysis frame length
    pub frame_length: usize,
    /// Hop between frames
    pub hop_length: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            top_db: 30.0,
            frame_length: 2048,
            hop_length: 512,
        }
    }
}

/// Trim leading and trailing silence
///
/// Returns the trimmed slice and its `[start, end)` range in the input.
/// Fully silent input comes back empty.
pub fn trim_silence(samples: &[f32], config: &TrimConfig) -> Result<(Vec<f32>, (usize, usize))> {
    ensure!(
        config.frame_length > 0 && config.hop_length > 0,
        "Trim frame and hop length must be positive"
    );
    if samples.is_empty() {
        return Ok((Vec::new(), (0, 0)));
    }

    let rms = frame_rms(samples, config.frame_length, config.hop_length);
    let power: Vec<f32> = rms.iter().map(|r| r * r).collect();
    let peak = power.iter().cloned().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return Ok((Vec::new(), (0, 0)));
    }

    // power_to_db with amin 1e-10, referenced to the loudest frame
    const AMIN: f32 = 1e-10;
    let ref_db = 10.0 * peak.max(AMIN).log10();
    let non_silent: Vec<bool> = power
        .iter()
        .map(|p| 10.0 * p.max(AMIN).log10() - ref_db > -config.top_db)
        .collect();

    let first = non_silent.iter().position(|&b| b);
    let last = non_silent.iter().rposition(|&b| b);
    let (first, last) = match (first, last) {
        (Some(f), Some(l)) => (f, l),
        _ => return Ok((Vec::new(), (0, 0))),
    };

    let start = first * config.hop_length;
    let end = ((last + 1) * config.hop_length).min(samples.len());
    Ok((samples[start..end].to_vec(), (start, end)))
}

/// Centered frame RMS with zero padding
fn frame_rms(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    let pad = frame_length / 2;
    let n_frames = samples.len() / hop_length + 1;
    (0..n_frames)
        .map(|i| {
            // Frame i covers padded[i*hop .. i*hop + frame], i.e. samples shifted by -pad
            let start = (i * hop_length) as isize - pad as isize;
            let end = start + frame_length as isize;
            let lo = start.max(0) as usize;
            let hi = (end.max(0) as usize).min(samples.len());
            let energy: f32 = if lo < hi {
                samples[lo..hi].iter().map(|s| s * s).sum()
            } else {
                0.0
            };
            (energy / frame_length as f32).sqrt()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded_tone(silence: usize, tone: usize) -> Vec<f32> {
        let mut samples = vec![0.0f32; silence];
        samples.extend((0..tone).map(|i| 0.5 * (i as f32 * 0.1).sin()));
        samples.extend(vec![0.0f32; silence]);
        samples
    }

    #[test]
    fn test_trims_surrounding_silence() {
        let samples = padded_tone(24000, 24000);
        let (trimmed, (start, end)) = trim_silence(&samples, &TrimConfig::default()).unwrap();
        // Boundaries land within one frame of the tone edges
        assert!(start <= 24000 && 24000 - start <= 2048, "start {}", start);
        assert!(end >= 48000 && end - 48000 <= 2048, "end {}", end);
        assert_eq!(trimmed.len(), end - start);
        assert!(trimmed.len() < samples.len());
    }

    #[test]
    fn test_all_silent_is_empty() {
        let (trimmed, range) = trim_silence(&vec![0.0; 10000], &TrimConfig::default()).unwrap();
        assert!(trimmed.is_empty());
        assert_eq!(range, (0, 0));
    }

    #[test]
    fn test_loud_signal_is_kept_whole() {
        let samples: Vec<f32> = (0..8192).map(|i| 0.8 * (i as f32 * 0.07).sin()).collect();
        let (trimmed, range) = trim_silence(&samples, &TrimConfig::default()).unwrap();
        assert_eq!(range, (0, samples.len()));
        assert_eq!(trimmed.len(), samples.len());
    }

    #[test]
    fn test_quiet_tail_below_threshold_is_cut() {
        let mut samples: Vec<f32> = (0..20000).map(|i| 0.5 * (i as f32 * 0.05).sin()).collect();
        // -60 dB relative tail
        samples.extend((0..20000).map(|i| 0.0005 * (i as f32 * 0.05).sin()));
        let (_, (_, end)) = trim_silence(&samples, &TrimConfig::default()).unwrap();
        assert!(end < 20000 + 2048);
    }

    #[test]
    fn test_rejects_zero_hop() {
        let config = TrimConfig {
            hop_length: 0,
            ..Default::default()
        };
        assert!(trim_silence(&[0.1; 100], &config).is_err());
    }
}
