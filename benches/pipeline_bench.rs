//! Benchmarks for the model-free stages of the synthesis pipeline
//!
//! Run with: cargo bench

use candle_core::Device;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use styletts::audio::{MelConfig, MelSpectrogram};
use styletts::inference::round_durations;
use styletts::models::diffusion::KarrasSchedule;
use styletts::text::{segment_for_longform, SymbolTable};
use styletts::{AlignmentExpander, DurationScaler, DurationScaling, StyleExtractor, StyleVector};

fn raw_durations(n: usize) -> Vec<f32> {
    (0..n).map(|i| 2.0 + (i as f32 * 0.7).sin().abs() * 6.0).collect()
}

fn tone(seconds: f32, sample_rate: u32) -> Vec<f32> {
    let n = (seconds * sample_rate as f32) as usize;
    (0..n)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Benchmark speaking-rate correction
fn bench_duration_scaling(c: &mut Criterion) {
    let scaler = DurationScaler::new(DurationScaling::default());
    let text = "The quick brown fox jumps over the lazy dog and keeps on running.";

    let mut group = c.benchmark_group("duration_scaling");
    for tokens in [16, 64, 256] {
        let raw = raw_durations(tokens);
        group.bench_with_input(BenchmarkId::new("scale", tokens), &raw, |b, raw| {
            b.iter(|| round_durations(&scaler.scale(black_box(text), black_box(raw))))
        });
    }
    group.finish();
}

/// Benchmark alignment expansion
fn bench_alignment(c: &mut Criterion) {
    let device = Device::Cpu;

    let mut group = c.benchmark_group("alignment");
    for tokens in [16, 64, 256] {
        let durations = round_durations(&raw_durations(tokens));
        group.bench_with_input(BenchmarkId::new("expand", tokens), &durations, |b, d| {
            b.iter(|| {
                let alignment = AlignmentExpander::expand(black_box(d)).unwrap();
                alignment.to_tensor(&device).unwrap()
            })
        });
    }
    group.finish();
}

/// Benchmark reference feature extraction
fn bench_mel_features(c: &mut Criterion) {
    let device = Device::Cpu;
    let mel = MelSpectrogram::new(MelConfig::default());
    let extractor = StyleExtractor::new(MelConfig::default(), 24000, Device::Cpu);

    let mut group = c.benchmark_group("mel_features");
    group.measurement_time(Duration::from_secs(10));
    for seconds in [1.0f32, 3.0, 6.0] {
        let audio = tone(seconds, 24000);
        group.bench_with_input(BenchmarkId::new("style_features", seconds), &audio, |b, audio| {
            b.iter(|| mel.style_features(black_box(audio), &device).unwrap())
        });
    }

    let audio_16k = tone(3.0, 16000);
    group.bench_function("extract_resampled", |b| {
        b.iter(|| extractor.extract(black_box(&audio_16k), 16000).unwrap())
    });
    group.finish();
}

/// Benchmark text preparation for longform narration
fn bench_text(c: &mut Criterion) {
    let passage = "Hello world. This is a test. The quick brown fox jumps over the lazy dog. \
                   How are you doing today? I hope everything is going well. \
                   This is a longer piece of text that should be segmented into multiple parts.";
    let symbols = SymbolTable::default();

    let mut group = c.benchmark_group("text");
    for max_chars in [40, 100, 300] {
        group.bench_with_input(BenchmarkId::new("segment", max_chars), &max_chars, |b, &m| {
            b.iter(|| segment_for_longform(black_box(passage), m))
        });
    }
    group.bench_function("tokenize", |b| {
        b.iter(|| symbols.tokenize(black_box("ðə kwɪk bɹaʊn fɑks dʒʌmps oʊvɚ ðə leɪzi dɑɡ$")))
    });
    group.finish();
}

/// Benchmark style blending and the noise schedule
fn bench_style(c: &mut Criterion) {
    let device = Device::Cpu;
    let reference = StyleVector::from_vec((0..256).map(|i| i as f32 / 256.0).collect(), &device)
        .unwrap();
    let sampled = StyleVector::from_vec(vec![0.1; 256], &device).unwrap();

    let mut group = c.benchmark_group("style");
    group.bench_function("blend", |b| {
        b.iter(|| reference.blend(black_box(&sampled), 0.3, 0.7).unwrap())
    });
    group.bench_function("carry_over", |b| {
        b.iter(|| sampled.carry_over(black_box(&reference), 0.7).unwrap())
    });
    for steps in [5, 10, 50] {
        group.bench_with_input(BenchmarkId::new("karras_schedule", steps), &steps, |b, &n| {
            b.iter(|| KarrasSchedule::default().sigmas(black_box(n)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_duration_scaling,
    bench_alignment,
    bench_mel_features,
    bench_text,
    bench_style,
);

criterion_main!(benches);
