//! Token-to-frame alignment from integer durations

use candle_core::{Device, Tensor};

use crate::core::error::{Result, TtsError};

/// Round scaled durations half-to-even and clamp each to at least one frame
pub fn round_durations(scaled: &[f32]) -> Vec<u32> {
    scaled
        .iter()
        .map(|&d| d.round_ties_even().max(1.0) as u32)
        .collect()
}

/// Hard monotonic alignment: token `i` owns a contiguous run of `durations[i]` frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    durations: Vec<u32>,
    total_frames: usize,
}

impl Alignment {
    pub fn durations(&self) -> &[u32] {
        &self.durations
    }

    pub fn num_tokens(&self) -> usize {
        self.durations.len()
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// `[start, end)` frame span of every token, in token order
    pub fn spans(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.durations.iter().scan(0usize, |cursor, &d| {
            let start = *cursor;
            *cursor += d as usize;
            Some((start, *cursor))
        })
    }

    /// Binary `[num_tokens, total_frames]` matrix
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor> {
        let frames = self.total_frames;
        let mut data = vec![0f32; self.num_tokens() * frames];
        for (row, (start, end)) in self.spans().enumerate() {
            data[row * frames + start..row * frames + end].fill(1.0);
        }
        Ok(Tensor::from_vec(data, (self.num_tokens(), frames), device)?)
    }
}

/// Expands per-token durations into an [`Alignment`]
pub struct AlignmentExpander;

impl AlignmentExpander {
    /// Lay durations end to end along the frame axis
    ///
    /// Fails with [`TtsError::AlignmentLengthMismatch`] when there are no
    /// tokens or the durations cover no frames.
    pub fn expand(durations: &[u32]) -> Result<Alignment> {
        let total_frames: usize = durations.iter().map(|&d| d as usize).sum();
        if durations.is_empty() || total_frames == 0 {
            return Err(TtsError::AlignmentLengthMismatch {
                num_tokens: durations.len(),
                total_frames,
            });
        }
        Ok(Alignment {
            durations: durations.to_vec(),
            total_frames,
        })
    }
}
