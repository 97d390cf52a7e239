//! K-diffusion preconditioning around the style denoising network
//!
//! The network sees `c_in * x` and `ln(sigma) / 4`; its output is mixed
//! back with the noisy input using the skip/output weights of Karras et al.
//! Classifier-free guidance evaluates the network a second time with its
//! learned unconditional embedding.

use candle_core::Tensor;

use crate::core::error::Result;
use crate::core::traits::StyleDenoiser;

/// Conditioning shared by every denoiser call of one sampling run
pub struct Conditioning<'a> {
    /// Text embedding `[1, T, H]`
    pub embedding: &'a Tensor,
    /// Reference style `[1, style_dim_total]`
    pub features: &'a Tensor,
    /// Guidance scale; 1 disables the unconditional pass
    pub scale: f64,
}

/// Preconditioned denoiser
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KDiffusion {
    pub sigma_data: f64,
    /// Clamp the denoised estimate to [-1, 1]
    pub clamp: bool,
}

impl Default for KDiffusion {
    fn default() -> Self {
        Self {
            sigma_data: 0.2,
            clamp: false,
        }
    }
}

/// Scalar preconditioning weights for one noise level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleWeights {
    pub c_skip: f64,
    pub c_out: f64,
    pub c_in: f64,
    pub c_noise: f64,
}

impl KDiffusion {
    pub fn new(sigma_data: f64) -> Self {
        Self {
            sigma_data,
            ..Self::default()
        }
    }

    pub fn scale_weights(&self, sigma: f64) -> ScaleWeights {
        let sd2 = self.sigma_data * self.sigma_data;
        let s2 = sigma * sigma;
        ScaleWeights {
            c_skip: sd2 / (s2 + sd2),
            c_out: sigma * self.sigma_data / (sd2 + s2).sqrt(),
            c_in: 1.0 / (s2 + sd2).sqrt(),
            c_noise: sigma.ln() * 0.25,
        }
    }

    /// Denoised estimate of `x` at noise level `sigma`
    pub fn denoise(
        &self,
        net: &dyn StyleDenoiser,
        x: &Tensor,
        sigma: f64,
        cond: &Conditioning<'_>,
    ) -> Result<Tensor> {
        let w = self.scale_weights(sigma);
        let x_in = (x * w.c_in)?;
        let noise_level = Tensor::new(&[w.c_noise as f32], x.device())?;

        let mut out = net.forward(&x_in, &noise_level, Some(cond.embedding), cond.features)?;
        if cond.scale != 1.0 {
            let uncond = net.forward(&x_in, &noise_level, None, cond.features)?;
            out = (&uncond + ((&out - &uncond)? * cond.scale)?)?;
        }

        let denoised = ((x * w.c_skip)? + (out * w.c_out)?)?;
        if self.clamp {
            Ok(denoised.clamp(-1.0f32, 1.0f32)?)
        } else {
            Ok(denoised)
        }
    }
}
