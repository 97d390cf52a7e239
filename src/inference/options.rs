//! Per-utterance synthesis options

use crate::core::error::{Result, TtsError};

/// Synthesis options
///
/// `Default` gives the single-utterance settings, [`longform`](Self::longform)
/// the narration settings.
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisOptions {
    /// Weight of the external reference in the reference (timbre) part
    pub alpha: f64,
    /// Weight of the external reference in the prosody part
    pub beta: f64,
    /// Weight of the previous utterance's style in longform synthesis
    pub continuity_weight: f64,
    /// Noise levels in the diffusion schedule
    pub diffusion_steps: usize,
    /// Classifier-free guidance strength (1 = off)
    pub guidance_scale: f64,
    /// Target speaking rate
    pub target_wpm: f64,
    /// Phoneme string used verbatim instead of phonemizing the text
    pub phonemes: Option<String>,
    /// Seed for the diffusion sampler (None = OS entropy)
    pub seed: Option<u64>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.7,
            continuity_weight: 0.7,
            diffusion_steps: 5,
            guidance_scale: 1.0,
            target_wpm: 170.0,
            phonemes: None,
            seed: None,
        }
    }
}

impl SynthesisOptions {
    /// Narration defaults: slower speaking rate
    pub fn longform() -> Self {
        Self {
            target_wpm: 150.0,
            ..Self::default()
        }
    }

    pub fn with_blend(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    pub fn with_continuity_weight(mut self, t: f64) -> Self {
        self.continuity_weight = t;
        self
    }

    pub fn with_diffusion_steps(mut self, steps: usize) -> Self {
        self.diffusion_steps = steps;
        self
    }

    pub fn with_guidance_scale(mut self, scale: f64) -> Self {
        self.guidance_scale = scale;
        self
    }

    pub fn with_target_wpm(mut self, wpm: f64) -> Self {
        self.target_wpm = wpm;
        self
    }

    pub fn with_phonemes(mut self, phonemes: impl Into<String>) -> Self {
        self.phonemes = Some(phonemes.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Options for the `index`-th utterance of a longform passage
    ///
    /// A set seed is advanced by `index` so each sentence draws its own noise
    /// while the passage stays reproducible.
    pub fn for_utterance(&self, index: usize) -> Self {
        Self {
            seed: self.seed.map(|s| s.wrapping_add(index as u64)),
            ..self.clone()
        }
    }

    /// Validate option ranges
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("continuity_weight", self.continuity_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TtsError::validation(
                    field,
                    format!("{} must be in [0, 1], got {}", field, value),
                ));
            }
        }

        if self.diffusion_steps == 0 {
            return Err(TtsError::validation(
                "diffusion_steps",
                "at least one diffusion step is required",
            ));
        }

        if !self.guidance_scale.is_finite() {
            return Err(TtsError::validation(
                "guidance_scale",
                format!("guidance scale must be finite, got {}", self.guidance_scale),
            ));
        }

        if !(self.target_wpm.is_finite() && self.target_wpm > 0.0) {
            return Err(TtsError::validation(
                "target_wpm",
                format!("target speaking rate must be positive, got {}", self.target_wpm),
            ));
        }

        Ok(())
    }
}
