//! Ancestral DPM-2 sampler

use candle_core::Tensor;
use rand::Rng;

use super::gaussian_like;
use crate::core::error::Result;

/// Second-order ancestral sampler
///
/// Each step denoises at `sigma`, moves to a midpoint noise level,
/// denoises again there, takes the full step to `sigma_down` with the
/// midpoint slope, then re-injects `sigma_up` worth of fresh noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adpm2Sampler {
    /// Interpolation exponent for the midpoint noise level
    pub rho: f64,
}

impl Default for Adpm2Sampler {
    fn default() -> Self {
        Self { rho: 1.0 }
    }
}

/// Noise levels derived for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSigmas {
    pub up: f64,
    pub down: f64,
    pub mid: f64,
}

impl Adpm2Sampler {
    pub fn step_sigmas(&self, sigma: f64, sigma_next: f64) -> StepSigmas {
        let next2 = sigma_next * sigma_next;
        let up = (next2 * (sigma * sigma - next2) / (sigma * sigma)).max(0.0).sqrt();
        let down = (next2 - up * up).max(0.0).sqrt();
        let r = self.rho;
        let mid = ((sigma.powf(1.0 / r) + down.powf(1.0 / r)) / 2.0).powf(r);
        StepSigmas { up, down, mid }
    }

    /// Run the sampler from unit noise
    ///
    /// `noise` is scaled by `sigmas[0]`. Steps run over consecutive pairs of
    /// `sigmas` except the final pair into 0, so `n` noise levels give
    /// `n - 1` steps ending at the smallest non-zero sigma. A one-level
    /// schedule `[sigma_max, 0]` runs its single step into 0.
    pub fn sample<R, F>(&self, noise: &Tensor, sigmas: &[f64], mut denoise: F, rng: &mut R)
        -> Result<Tensor>
    where
        R: Rng + ?Sized,
        F: FnMut(&Tensor, f64) -> Result<Tensor>,
    {
        let Some(&sigma_start) = sigmas.first() else {
            return Ok(noise.clone());
        };
        let mut x = (noise * sigma_start)?;

        let num_steps = match sigmas.len() {
            0 | 1 => 0,
            2 => 1,
            n => n - 2,
        };

        for i in 0..num_steps {
            x = self.step(&x, sigmas[i], sigmas[i + 1], &mut denoise, rng)?;
        }
        Ok(x)
    }

    fn step<R, F>(&self, x: &Tensor, sigma: f64, sigma_next: f64, denoise: &mut F, rng: &mut R)
        -> Result<Tensor>
    where
        R: Rng + ?Sized,
        F: FnMut(&Tensor, f64) -> Result<Tensor>,
    {
        let s = self.step_sigmas(sigma, sigma_next);

        let d = ((x - denoise(x, sigma)?)? / sigma)?;
        let x_mid = (x + (&d * (s.mid - sigma))?)?;
        let d_mid = ((&x_mid - denoise(&x_mid, s.mid)?)? / s.mid)?;
        let x = (x + (d_mid * (s.down - sigma))?)?;

        let fresh = gaussian_like(&x, rng)?;
        Ok((x + (fresh * s.up)?)?)
    }
}
