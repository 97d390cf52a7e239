//! Main synthesis pipeline
//!
//! Orchestrates the sub-models for one utterance:
//! 1. Text preparation, phonemization and tokenization
//! 2. Text encoding and contextual embedding
//! 3. Style sampling by diffusion, blended with the reference style
//! 4. Duration prediction and speaking-rate correction
//! 5. Alignment of token features onto frames
//! 6. Pitch and energy prediction
//! 7. Waveform decoding

use candle_core::{DType, Device, Tensor, D};
use std::path::Path;

use crate::audio::AudioOutput;
use crate::config::ModelConfig;
use crate::core::error::{AudioOperation, InferenceStage, Result, ResultExt, TtsError};
use crate::models::{Checkpoint, LoadReport, ModelBundle};
use crate::style::{SamplerConfig, StyleDiffusionSampler, StyleExtractor, StyleVector};
use crate::text::{normalize_phoneme_quotes, prepare_text, Phonemizer, SymbolTable, PAD, PAD_ID};
use crate::utils::tensor_utils::{invert_mask, length_to_mask, shift_frames_right};
use crate::{LONGFORM_TRIM_SAMPLES, SINGLE_TRIM_SAMPLES};

use super::alignment::{round_durations, AlignmentExpander};
use super::duration::{DurationScaler, DurationScaling};
use super::options::SynthesisOptions;
use super::session::{LongformSession, SynthesisState};

/// Result of synthesis
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    /// Generated audio samples
    pub audio: Vec<f32>,
    /// Sample rate
    pub sample_rate: u32,
    /// Frames per input token, start token included
    pub durations: Vec<u32>,
    /// Style the utterance was decoded with
    pub style: StyleVector,
}

impl SynthesisOutput {
    /// Save audio as 16-bit WAV
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        AudioOutput::save(&self.audio, self.sample_rate, path).audio_context(AudioOperation::Saving)
    }

    /// Get duration in seconds
    pub fn duration(&self) -> f32 {
        self.audio.len() as f32 / self.sample_rate as f32
    }
}

/// Which entry point an utterance came through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Single,
    Longform,
}

impl Mode {
    fn trim_samples(self) -> usize {
        match self {
            Mode::Single => SINGLE_TRIM_SAMPLES,
            Mode::Longform => LONGFORM_TRIM_SAMPLES,
        }
    }
}

/// StyleTTS synthesizer
///
/// Owns its sub-models; independent instances can run side by side.
/// Stateless entry points take `&self`; the stateful longform entry point
/// takes `&mut self`.
pub struct StyleTts {
    device: Device,
    config: ModelConfig,
    models: ModelBundle,
    symbols: SymbolTable,
    phonemizer: Box<dyn Phonemizer>,
    sampler: StyleDiffusionSampler,
    scaling: DurationScaling,
    extractor: StyleExtractor,
    state: SynthesisState,
}

impl StyleTts {
    /// Create a synthesizer from already-bound sub-models
    pub fn new(
        config: ModelConfig,
        models: ModelBundle,
        phonemizer: Box<dyn Phonemizer>,
        device: Device,
    ) -> Result<Self> {
        config.validate()?;
        if !models.is_ready() {
            return Err(TtsError::ModelLoad {
                message: "one or more sub-models are not ready".to_string(),
                component: "bundle".to_string(),
                path: None,
            });
        }
        let config_shift = config.model_params.decoder.requires_frame_shift();
        if models.decoder.requires_frame_shift() != config_shift {
            return Err(TtsError::Config {
                message: format!(
                    "decoder type '{}' {} a one-frame input shift but the bound decoder reports {}",
                    config.model_params.decoder.decoder_type,
                    if config_shift { "needs" } else { "does not use" },
                    models.decoder.requires_frame_shift()
                ),
                path: None,
            });
        }
        let symbols = SymbolTable::default();
        check_vocabulary(&config, &symbols)?;

        let sampler = StyleDiffusionSampler::new(SamplerConfig::from_model_config(&config));
        let extractor = StyleExtractor::from_config(&config, device.clone());
        let scaling = DurationScaling {
            sample_rate: models.decoder.sample_rate(),
            ..DurationScaling::default()
        };

        tracing::info!(
            "StyleTTS ready: style dim {}, decoder {} ({} Hz)",
            config.style_vector_dim(),
            config.model_params.decoder.decoder_type,
            scaling.sample_rate
        );

        Ok(Self {
            device,
            config,
            models,
            symbols,
            phonemizer,
            sampler,
            scaling,
            extractor,
            state: SynthesisState::new(),
        })
    }

    /// Load configuration and checkpoint, bind them into `models`, and build the synthesizer
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        config_path: P,
        checkpoint_path: Q,
        mut models: ModelBundle,
        phonemizer: Box<dyn Phonemizer>,
        device: Device,
    ) -> Result<(Self, LoadReport)> {
        let config = ModelConfig::load(&config_path)?;
        let checkpoint = Checkpoint::load(&checkpoint_path, &device)?;
        let report = models.load_checkpoint(&checkpoint)?;
        if !report.is_strict() {
            tracing::warn!("Checkpoint bound with partial fallback for some sub-models");
        }
        let tts = Self::new(config, models, phonemizer, device)?;
        Ok((tts, report))
    }

    /// Replace the symbol table; its size must match `model_params.n_token`
    pub fn with_symbols(mut self, symbols: SymbolTable) -> Result<Self> {
        check_vocabulary(&self.config, &symbols)?;
        self.symbols = symbols;
        Ok(self)
    }

    pub fn with_sampler_config(mut self, config: SamplerConfig) -> Self {
        self.sampler = StyleDiffusionSampler::new(config);
        self
    }

    /// Override speaking-rate parameters; the target rate still comes from the options
    pub fn with_duration_scaling(mut self, scaling: DurationScaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn models(&self) -> &ModelBundle {
        &self.models
    }

    pub fn sample_rate(&self) -> u32 {
        self.models.decoder.sample_rate()
    }

    /// Reference style from in-memory audio
    pub fn style_from_samples(&self, samples: &[f32], sample_rate: u32) -> Result<StyleVector> {
        self.extractor.style_from_samples(
            samples,
            sample_rate,
            self.models.style_encoder.as_ref(),
            self.models.predictor_encoder.as_ref(),
        )
    }

    /// Reference style from an audio file
    pub fn style_from_path<P: AsRef<Path>>(&self, path: P) -> Result<StyleVector> {
        self.extractor.style_from_path(
            path,
            self.models.style_encoder.as_ref(),
            self.models.predictor_encoder.as_ref(),
        )
    }

    /// Reference part from one file, prosody part from another
    pub fn style_from_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        reference_path: P,
        prosody_path: Q,
    ) -> Result<StyleVector> {
        self.extractor.style_from_paths(
            reference_path,
            prosody_path,
            self.models.style_encoder.as_ref(),
            self.models.predictor_encoder.as_ref(),
        )
    }

    /// Synthesize one utterance
    ///
    /// # Arguments
    /// * `text` - Input text
    /// * `reference` - Reference style from [`style_from_path`](Self::style_from_path) or similar
    /// * `options` - Blend weights, diffusion and speaking-rate settings
    pub fn infer(
        &self,
        text: &str,
        reference: &StyleVector,
        options: &SynthesisOptions,
    ) -> Result<SynthesisOutput> {
        options.validate()?;
        self.synthesize(text, None, reference, options, Mode::Single)
    }

    /// Synthesize one longform utterance given the previous utterance's style
    ///
    /// The returned style is the blended style this utterance used; pass it
    /// as `previous` for the next one.
    pub fn infer_longform_with(
        &self,
        text: &str,
        previous: Option<&StyleVector>,
        reference: &StyleVector,
        options: &SynthesisOptions,
    ) -> Result<SynthesisOutput> {
        options.validate()?;
        self.synthesize(text, previous, reference, options, Mode::Longform)
    }

    /// Synthesize the next utterance of this synthesizer's longform session
    ///
    /// Like [`LongformSession`], a seeded call advances the seed by one per
    /// utterance since the last reset.
    pub fn infer_longform(
        &mut self,
        text: &str,
        reference: &StyleVector,
        options: &SynthesisOptions,
    ) -> Result<SynthesisOutput> {
        let options = options.for_utterance(self.state.utterance_count());
        let output = self.infer_longform_with(text, self.state.previous(), reference, &options)?;
        self.state.update(output.style.clone());
        Ok(output)
    }

    /// Forget the carried style
    pub fn reset_longform(&mut self) {
        self.state.reset();
    }

    pub fn longform_state(&self) -> &SynthesisState {
        &self.state
    }

    /// Start a narration session with its own carried style
    pub fn session(
        &self,
        reference: StyleVector,
        options: SynthesisOptions,
    ) -> Result<LongformSession<'_>> {
        LongformSession::new(self, reference, options)
    }

    fn synthesize(
        &self,
        text: &str,
        previous: Option<&StyleVector>,
        reference: &StyleVector,
        options: &SynthesisOptions,
        mode: Mode,
    ) -> Result<SynthesisOutput> {
        let m = &self.models;
        let expected_dim = self.config.style_vector_dim();
        if reference.dim() != expected_dim {
            return Err(TtsError::validation(
                "reference",
                format!("reference style has width {}, model expects {}", reference.dim(), expected_dim),
            ));
        }

        // Tokenize
        let text = prepare_text(text);
        let ids = self.tokenize(&text, options, mode)?;
        let num_tokens = ids.len();
        let tokens = Tensor::from_vec(ids, (1, num_tokens), &self.device)?;
        let lengths = Tensor::new(&[num_tokens as u32], &self.device)?;
        let mask = length_to_mask(&[num_tokens], &self.device)?;
        let attention_mask = invert_mask(&mask)?;
        tracing::debug!("{}: {} tokens", InferenceStage::Tokenized, num_tokens);

        // Encode text
        let t_en = m
            .text_encoder
            .encode(&tokens, &lengths, &mask)
            .at_stage(InferenceStage::TextEncoded)?;
        expect_last_dim(&t_en, num_tokens, InferenceStage::TextEncoded, "text encoding")?;
        let bert_dur = m
            .bert
            .embed(&tokens, &attention_mask)
            .at_stage(InferenceStage::TextEncoded)?;
        let d_en = m
            .bert_encoder
            .project(&bert_dur)
            .at_stage(InferenceStage::TextEncoded)?
            .transpose(1, 2)?
            .contiguous()?;
        tracing::debug!(
            "{}: t_en {:?}, bert {:?}, d_en {:?}",
            InferenceStage::TextEncoded,
            t_en.dims(),
            bert_dur.dims(),
            d_en.dims()
        );

        // Sample style
        let sampled = self
            .sampler
            .sample(
                m.diffusion.as_ref(),
                options.seed,
                &bert_dur,
                options.guidance_scale,
                reference,
                options.diffusion_steps,
            )
            .at_stage(InferenceStage::StyleSampled)?;
        let sampled = match (mode, previous) {
            (Mode::Longform, Some(prev)) => sampled.carry_over(prev, options.continuity_weight)?,
            _ => sampled,
        };
        let style = reference.blend(&sampled, options.alpha, options.beta)?;
        let ref_part = style.reference()?;
        let prosody = style.prosody()?;
        tracing::debug!("{}: {} dims", InferenceStage::StyleSampled, style.dim());

        // Predict durations
        let d = m
            .predictor
            .encode(&d_en, &prosody, &lengths, &mask)
            .at_stage(InferenceStage::DurationPredicted)?;
        let logits = m
            .predictor
            .duration_logits(&d)
            .at_stage(InferenceStage::DurationPredicted)?;
        let bins = logits.dim(D::Minus1)?;
        if bins != self.config.model_params.max_dur {
            return Err(TtsError::inference(
                InferenceStage::DurationPredicted,
                format!(
                    "duration logits have {} bins, config max_dur is {}",
                    bins, self.config.model_params.max_dur
                ),
            ));
        }
        let raw = candle_nn::ops::sigmoid(&logits)?
            .sum(D::Minus1)?
            .to_dtype(DType::F32)?
            .flatten_all()?
            .to_vec1::<f32>()?;
        if raw.len() != num_tokens {
            return Err(TtsError::inference(
                InferenceStage::DurationPredicted,
                format!("predicted {} durations for {} tokens", raw.len(), num_tokens),
            ));
        }
        let scaler = DurationScaler::new(DurationScaling {
            target_wpm: options.target_wpm,
            ..self.scaling
        });
        let durations = round_durations(&scaler.scale(&text, &raw));
        tracing::debug!("{}: {:?}", InferenceStage::DurationPredicted, durations);

        // Align
        let alignment = AlignmentExpander::expand(&durations)?;
        let aln = alignment.to_tensor(&self.device)?.unsqueeze(0)?;
        let mut en = d.transpose(1, 2)?.contiguous()?.matmul(&aln)?;
        let mut asr = t_en.contiguous()?.matmul(&aln)?;
        if m.decoder.requires_frame_shift() {
            en = shift_frames_right(&en)?;
            asr = shift_frames_right(&asr)?;
        }
        tracing::debug!(
            "{}: {} frames, en {:?}, asr {:?}",
            InferenceStage::Aligned,
            alignment.total_frames(),
            en.dims(),
            asr.dims()
        );

        // Predict pitch and energy
        let (f0, energy) = m
            .predictor
            .predict_f0_energy(&en, &prosody)
            .at_stage(InferenceStage::ProsodyPredicted)?;
        tracing::debug!(
            "{}: f0 {:?}, energy {:?}",
            InferenceStage::ProsodyPredicted,
            f0.dims(),
            energy.dims()
        );

        // Decode
        let waveform = m
            .decoder
            .decode(&asr, &f0, &energy, &ref_part)
            .at_stage(InferenceStage::Decoded)?;
        let mut audio = waveform.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
        if let Some(per_frame) = self.config.model_params.decoder.samples_per_frame() {
            let expected = alignment.total_frames() * per_frame;
            if audio.len() != expected {
                return Err(TtsError::inference(
                    InferenceStage::Decoded,
                    format!(
                        "decoder produced {} samples for {} frames, expected {} ({} per frame)",
                        audio.len(),
                        alignment.total_frames(),
                        expected,
                        per_frame
                    ),
                ));
            }
        }

        // The decoder leaves an artifact at the very end of every utterance
        let trim = mode.trim_samples();
        if audio.len() <= trim {
            return Err(TtsError::inference(
                InferenceStage::Decoded,
                format!("decoder produced {} samples, not more than the {} trimmed", audio.len(), trim),
            ));
        }
        audio.truncate(audio.len() - trim);
        tracing::info!(
            "Synthesized {} samples ({} tokens, {} frames)",
            audio.len(),
            num_tokens,
            alignment.total_frames()
        );

        Ok(SynthesisOutput {
            audio,
            sample_rate: m.decoder.sample_rate(),
            durations,
            style,
        })
    }

    /// Phoneme ids with the start token prepended
    fn tokenize(&self, text: &str, options: &SynthesisOptions, mode: Mode) -> Result<Vec<u32>> {
        let phonemes = match &options.phonemes {
            Some(phonemes) => phonemes.clone(),
            None => {
                if text.is_empty() {
                    return Err(TtsError::EmptyInput {
                        message: "text is empty".to_string(),
                    });
                }
                let mut phonemes = self
                    .phonemizer
                    .phonemize(text)
                    .at_stage(InferenceStage::Tokenized)?;
                phonemes.push(PAD);
                phonemes
            }
        };
        let phonemes = match mode {
            Mode::Longform => normalize_phoneme_quotes(&phonemes),
            Mode::Single => phonemes,
        };

        let symbol_ids = self.symbols.tokenize(&phonemes);
        if symbol_ids.iter().all(|&id| id == PAD_ID) {
            return Err(TtsError::EmptyInput {
                message: format!("no known symbols in phonemes {:?}", phonemes),
            });
        }

        let mut ids = Vec::with_capacity(symbol_ids.len() + 1);
        ids.push(PAD_ID);
        ids.extend(symbol_ids);
        Ok(ids)
    }
}

/// Token ids must index the text encoder and embedder vocabularies exactly
fn check_vocabulary(config: &ModelConfig, symbols: &SymbolTable) -> Result<()> {
    let n_token = config.model_params.n_token;
    if symbols.len() != n_token {
        return Err(TtsError::Config {
            message: format!(
                "symbol table has {} entries but model_params.n_token is {}",
                symbols.len(),
                n_token
            ),
            path: None,
        });
    }
    Ok(())
}

fn expect_last_dim(x: &Tensor, expected: usize, stage: InferenceStage, what: &str) -> Result<()> {
    let actual = x.dim(D::Minus1)?;
    if actual != expected {
        return Err(TtsError::inference(
            stage,
            format!("{} has {} positions, expected {} ({:?})", what, actual, expected, x.dims()),
        ));
    }
    Ok(())
}
