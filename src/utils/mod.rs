//! Utility functions and helpers
//!
//! This module provides common utilities used across the crate.

/// Tensor utilities
pub mod tensor_utils {
    use candle_core::{Device, Result, Tensor, D};

    /// Padding mask for a batch of sequence lengths (1 = padded position)
    ///
    /// Position `i` of row `b` is masked when `i + 1 > lengths[b]`.
    /// Shape is `[batch, max(lengths)]`, dtype u8.
    pub fn length_to_mask(lengths: &[usize], device: &Device) -> Result<Tensor> {
        let max_len = lengths.iter().copied().max().unwrap_or(0);
        let data: Vec<u8> = lengths
            .iter()
            .flat_map(|&len| (0..max_len).map(move |i| u8::from(i + 1 > len)))
            .collect();
        Tensor::from_vec(data, (lengths.len(), max_len), device)
    }

    /// Flip a u8 padding mask into an attention mask (1 = attend)
    pub fn invert_mask(mask: &Tensor) -> Result<Tensor> {
        mask.eq(0u8)
    }

    /// Delay frame-level features by one frame, duplicating the first
    ///
    /// `[B, C, F]` in and out; frame `f` of the output is frame `f - 1` of
    /// the input and frame 0 is repeated.
    pub fn shift_frames_right(x: &Tensor) -> Result<Tensor> {
        let frames = x.dim(D::Minus1)?;
        if frames <= 1 {
            return Ok(x.clone());
        }
        let first = x.narrow(D::Minus1, 0, 1)?;
        let body = x.narrow(D::Minus1, 0, frames - 1)?;
        Tensor::cat(&[&first, &body], D::Minus1)
    }
}
