//! Style diffusion math
//!
//! - `schedule`: Karras noise levels
//! - `sampler`: ancestral DPM-2 stepping
//! - `denoiser`: K-diffusion preconditioning and classifier-free guidance

mod denoiser;
mod sampler;
mod schedule;

pub use denoiser::{Conditioning, KDiffusion, ScaleWeights};
pub use sampler::{Adpm2Sampler, StepSigmas};
pub use schedule::KarrasSchedule;

use candle_core::{Device, Tensor};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::core::error::Result;

/// Standard normal tensor drawn from `rng`
pub fn gaussian_noise<R: Rng + ?Sized>(dims: &[usize], rng: &mut R, device: &Device) -> Result<Tensor> {
    let count: usize = dims.iter().product();
    let data: Vec<f32> = (0..count).map(|_| rng.sample(StandardNormal)).collect();
    Ok(Tensor::from_vec(data, dims, device)?)
}

/// Standard normal tensor with the shape and device of `like`
pub fn gaussian_like<R: Rng + ?Sized>(like: &Tensor, rng: &mut R) -> Result<Tensor> {
    gaussian_noise(like.dims(), rng, like.device())
}
