//! Style diffusion sampling
//!
//! Wraps the denoising network with the K-diffusion preconditioning, the
//! Karras schedule and the ancestral DPM-2 sampler, and owns the seeded RNG
//! every random draw of one run comes from.

use candle_core::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::ModelConfig;
use crate::core::error::{Result, TtsError};
use crate::core::traits::StyleDenoiser;
use crate::models::diffusion::{gaussian_noise, Adpm2Sampler, Conditioning, KDiffusion, KarrasSchedule};

use super::StyleVector;

/// Diffusion sampler constants
///
/// The schedule values are empirical; the style diffusion was tuned with them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SamplerConfig {
    pub schedule: KarrasSchedule,
    pub sampler: Adpm2Sampler,
    pub denoiser: KDiffusion,
}

impl SamplerConfig {
    /// Defaults with `sigma_data` taken from the model configuration
    pub fn from_model_config(config: &ModelConfig) -> Self {
        Self {
            denoiser: KDiffusion::new(config.model_params.diffusion.dist.sigma_data),
            ..Self::default()
        }
    }
}

/// Produces an utterance style vector from noise
#[derive(Debug, Clone, Default)]
pub struct StyleDiffusionSampler {
    config: SamplerConfig,
}

impl StyleDiffusionSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample a style vector
    ///
    /// # Arguments
    /// * `net` - Denoising network
    /// * `seed` - Seed for every random draw of this run; `None` seeds from the OS
    /// * `embedding` - Text conditioning `[1, T, H]`
    /// * `guidance_scale` - Classifier-free guidance strength (1 = off)
    /// * `reference` - External reference style the network is conditioned on
    /// * `num_steps` - Number of noise levels in the schedule
    pub fn sample(
        &self,
        net: &dyn StyleDenoiser,
        seed: Option<u64>,
        embedding: &Tensor,
        guidance_scale: f64,
        reference: &StyleVector,
        num_steps: usize,
    ) -> Result<StyleVector> {
        if num_steps == 0 {
            return Err(TtsError::validation(
                "diffusion_steps",
                "at least one diffusion step is required",
            ));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let dim = reference.dim();
        let noise = gaussian_noise(&[1, 1, dim], &mut rng, embedding.device())?;
        let sigmas = self.config.schedule.sigmas(num_steps);
        tracing::debug!(
            "Sampling style: {} noise levels, guidance {}, seed {:?}",
            sigmas.len(),
            guidance_scale,
            seed
        );

        let cond = Conditioning {
            embedding,
            features: reference.tensor(),
            scale: guidance_scale,
        };
        let denoiser = self.config.denoiser;
        let sampled = self.config.sampler.sample(
            &noise,
            &sigmas,
            |x, sigma| denoiser.denoise(net, x, sigma, &cond),
            &mut rng,
        )?;

        StyleVector::new(sampled.squeeze(1)?)
    }
}
