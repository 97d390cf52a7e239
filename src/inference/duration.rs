//! Speaking-rate correction of predicted durations

use crate::core::error::{Result, TtsError};
use crate::text::count_words;

/// Utterances with fewer words than this are slowed down further
const SHORT_SENTENCE_WORDS: usize = 5;

/// Floor for a degenerate adjustment factor
const MIN_ADJUSTMENT_FACTOR: f64 = 1e-3;

/// Speaking-rate parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationScaling {
    /// Target words per minute
    pub target_wpm: f64,
    /// Output sample rate
    pub sample_rate: u32,
    /// Waveform samples one duration unit stands for when estimating time
    pub frame_duration_units: f64,
    /// Extra slow-down for utterances under five words
    pub short_sentence_penalty: f64,
    /// Slow-down growing with word count
    pub long_sentence_penalty: f64,
}

impl Default for DurationScaling {
    fn default() -> Self {
        Self {
            target_wpm: 170.0,
            sample_rate: 24000,
            frame_duration_units: 590.0,
            short_sentence_penalty: 0.3,
            long_sentence_penalty: 0.05,
        }
    }
}

/// Rescales raw per-token durations toward a target speaking rate
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationScaler {
    params: DurationScaling,
}

impl DurationScaler {
    pub fn new(params: DurationScaling) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DurationScaling {
        &self.params
    }

    /// Words per minute the raw durations would be spoken at
    pub fn estimated_wpm(&self, word_count: usize, raw: &[f32]) -> f64 {
        let total: f64 = raw.iter().map(|&d| d as f64).sum();
        let seconds = total * self.params.frame_duration_units / self.params.sample_rate as f64;
        word_count as f64 / (seconds / 60.0)
    }

    /// Factor the raw durations are divided by
    ///
    /// Fails with [`TtsError::DegenerateDuration`] when the factor is zero,
    /// negative or not finite.
    pub fn adjustment_factor(&self, word_count: usize, raw: &[f32]) -> Result<f64> {
        let p = &self.params;
        let mut factor = p.target_wpm / self.estimated_wpm(word_count, raw);
        if word_count < SHORT_SENTENCE_WORDS {
            factor *= 1.0 - p.short_sentence_penalty;
        }
        factor *= 1.0 - p.long_sentence_penalty * word_count as f64 / p.target_wpm;

        if factor.is_finite() && factor > 0.0 {
            Ok(factor)
        } else {
            Err(TtsError::DegenerateDuration {
                factor: factor as f32,
                word_count,
            })
        }
    }

    /// Rescale `raw` for the words in `text`
    ///
    /// Text without words leaves the durations untouched. A degenerate
    /// factor is clamped to a small positive value instead of failing.
    pub fn scale(&self, text: &str, raw: &[f32]) -> Vec<f32> {
        let word_count = count_words(text);
        if word_count == 0 {
            return raw.to_vec();
        }

        let factor = match self.adjustment_factor(word_count, raw) {
            Ok(factor) => factor,
            Err(e) => {
                tracing::warn!("{}; clamping to {}", e, MIN_ADJUSTMENT_FACTOR);
                MIN_ADJUSTMENT_FACTOR
            }
        };
        tracing::debug!(
            "Duration scaling: {} words, factor {:.4} (target {} wpm)",
            word_count,
            factor,
            self.params.target_wpm
        );
        raw.iter().map(|&d| (d as f64 / factor) as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Vec<f32> {
        vec![3.2, 5.7, 1.1, 8.4, 2.6, 4.0, 6.3]
    }

    #[test]
    fn test_no_words_is_identity() {
        let scaler = DurationScaler::default();
        assert_eq!(scaler.scale("", &raw()), raw());
        assert_eq!(scaler.scale(" ... !? ", &raw()), raw());
    }

    #[test]
    fn test_length_preserved_sum_changes() {
        let scaled = DurationScaler::default().scale("Hello world", &raw());
        assert_eq!(scaled.len(), raw().len());
        let before: f32 = raw().iter().sum();
        let after: f32 = scaled.iter().sum();
        assert!((before - after).abs() > 1e-3);
    }

    #[test]
    fn test_long_sentence_length_preserved_sum_changes() {
        let scaler = DurationScaler::default();
        let text = "The quick brown fox jumps over the lazy dog.";
        assert_eq!(count_words(text), 9);

        let scaled = scaler.scale(text, &raw());
        assert_eq!(scaled.len(), raw().len());
        let before: f32 = raw().iter().sum();
        let after: f32 = scaled.iter().sum();
        assert!((before - after).abs() > 1e-3, "{} vs {}", before, after);

        // Every duration is divided by the same factor
        let factor = scaler.adjustment_factor(9, &raw()).unwrap();
        for (r, s) in raw().iter().zip(&scaled) {
            assert!((*r as f64 / factor - *s as f64).abs() < 1e-4);
        }
    }

    #[test]
    fn test_matching_rate_without_penalties_is_identity() {
        let base = DurationScaler::default();
        let target = base.estimated_wpm(2, &raw());
        let scaler = DurationScaler::new(DurationScaling {
            target_wpm: target,
            short_sentence_penalty: 0.0,
            long_sentence_penalty: 0.0,
            ..DurationScaling::default()
        });
        assert_eq!(scaler.scale("Hello, world.", &raw()), raw());
    }

    #[test]
    fn test_factor_formula() {
        // 2 words over 0.5 s is 240 wpm, so 170 / 240, then both penalties
        let scaler = DurationScaler::default();
        let units = 0.5 * 24000.0 / 590.0;
        let factor = scaler.adjustment_factor(2, &[units as f32]).unwrap();
        let expected = 170.0 / 240.0 * 0.7 * (1.0 - 0.05 * 2.0 / 170.0);
        assert!((factor - expected).abs() < 1e-4, "{} vs {}", factor, expected);
    }

    #[test]
    fn test_short_penalty_only_below_five_words() {
        let scaler = DurationScaler::new(DurationScaling {
            long_sentence_penalty: 0.0,
            ..DurationScaling::default()
        });
        let d = [10.0f32; 4];
        let four = scaler.adjustment_factor(4, &d).unwrap();
        let five = scaler.adjustment_factor(5, &d).unwrap();
        // Without the penalty the factor scales as 1 / word count
        assert!((four / 0.7 * 4.0 - five * 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_slower_target_lengthens() {
        let fast = DurationScaler::new(DurationScaling { target_wpm: 200.0, ..Default::default() });
        let slow = DurationScaler::new(DurationScaling { target_wpm: 120.0, ..Default::default() });
        let text = "the quick brown fox jumps over the lazy dog";
        let fast_sum: f32 = fast.scale(text, &raw()).iter().sum();
        let slow_sum: f32 = slow.scale(text, &raw()).iter().sum();
        assert!(slow_sum > fast_sum);
    }

    #[test]
    fn test_degenerate_factor_is_clamped() {
        // Zero total duration gives an infinite rate and a zero factor
        let scaler = DurationScaler::default();
        assert!(matches!(
            scaler.adjustment_factor(3, &[0.0, 0.0]),
            Err(TtsError::DegenerateDuration { word_count: 3, .. })
        ));
        let scaled = scaler.scale("one two three", &[0.0, 0.0]);
        assert!(scaled.iter().all(|d| d.is_finite()));

        // A long-sentence penalty past 100% flips the sign
        let harsh = DurationScaler::new(DurationScaling {
            long_sentence_penalty: 100.0,
            ..DurationScaling::default()
        });
        assert!(harsh.adjustment_factor(10, &raw()).is_err());
        let scaled = harsh.scale("a b c d e f g h i j", &raw());
        assert!(scaled.iter().all(|d| d.is_finite() && *d > 0.0));
    }
}
