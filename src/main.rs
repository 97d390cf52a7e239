//! styletts CLI - diagnostics for checkpoints, reference features and pacing
//!
//! Synthesis needs caller-supplied networks, so the CLI covers the parts of
//! the pipeline that run on their own:
//! - Checkpoint inspection
//! - Reference feature extraction
//! - Speaking-rate and alignment preview

use anyhow::{bail, Context, Result};
use candle_core::Device;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use styletts::audio::{AudioLoader, MelConfig};
use styletts::inference::round_durations;
use styletts::models::weights::DISTRIBUTED_PREFIX;
use styletts::{
    AlignmentExpander, Checkpoint, DurationScaler, DurationScaling, ModelConfig, StyleExtractor,
    DEFAULT_SAMPLE_RATE, VERSION,
};

/// StyleTTS inference tooling
#[derive(Parser, Debug)]
#[command(name = "styletts")]
#[command(author, version, about, long_about = None)]
#[command(long_about = "
Diagnostics for StyleTTS 2 inference.

Examples:
  # Show which sub-models a checkpoint carries
  styletts inspect Models/LibriTTS/epochs_2nd_00020.safetensors
  styletts inspect Models/LibriTTS/epochs_2nd_00020.safetensors --json

  # Precompute reference features
  styletts features speaker1.wav speaker2.flac --out-dir features/

  # Preview speaking-rate correction for predicted durations
  styletts pace --text \"Hello world\" --durations 1.2,3.4,2.2,5.0
")]
struct Cli {
    /// Enable verbose logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Group checkpoint tensors by sub-model
    Inspect {
        /// Path to a .safetensors checkpoint
        checkpoint: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract normalized log-mel reference features
    Features {
        /// Reference audio files
        #[arg(required = true)]
        audio: Vec<PathBuf>,

        /// Output directory for the feature files
        #[arg(short, long, default_value = "features")]
        out_dir: PathBuf,

        /// Model config (spectrogram parameters and sample rate)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Rescale durations to a speaking rate and show the alignment
    Pace {
        /// Utterance text (only its words are counted)
        #[arg(short, long)]
        text: String,

        /// Raw per-token durations, comma separated
        #[arg(short, long)]
        durations: String,

        /// Target words per minute
        #[arg(long, default_value = "170")]
        target_wpm: f64,

        /// Penalty for utterances under five words
        #[arg(long, default_value = "0.3")]
        short_penalty: f64,

        /// Penalty growing with word count
        #[arg(long, default_value = "0.05")]
        long_penalty: f64,
    },
}

/// `RUST_LOG` takes precedence; otherwise `--verbose` picks debug over info
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "info" };
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

fn setup_logging(verbose: bool) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(verbose, rust_log.as_deref()))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn create_progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn run_inspect(checkpoint: &Path, json: bool) -> Result<()> {
    let ckpt = Checkpoint::load(checkpoint, &Device::Cpu)?;
    let missing: Vec<&str> = styletts::models::bundle::COMPONENT_KEYS
        .iter()
        .copied()
        .filter(|key| ckpt.component(key).is_none())
        .collect();

    if json {
        let components: Vec<serde_json::Value> = ckpt
            .component_names()
            .map(|name| {
                serde_json::json!({
                    "name": name,
                    "tensors": ckpt.component(name).map_or(0, |c| c.len()),
                    "distributed_prefix": ckpt.has_distributed_prefix(name),
                })
            })
            .collect();
        let summary = serde_json::json!({
            "checkpoint": checkpoint,
            "tensors": ckpt.tensor_count(),
            "components": components,
            "missing": missing,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Checkpoint: {:?}", checkpoint);
    println!("Tensors:    {}", ckpt.tensor_count());
    println!();
    println!("{:<20} {:>8}  prefix", "component", "tensors");
    for name in ckpt.component_names() {
        let count = ckpt.component(name).map_or(0, |c| c.len());
        let prefix = if ckpt.has_distributed_prefix(name) {
            DISTRIBUTED_PREFIX
        } else {
            "-"
        };
        println!("{:<20} {:>8}  {}", name, count, prefix);
    }

    if !missing.is_empty() {
        warn!("Missing inference sub-models: {}", missing.join(", "));
    }
    Ok(())
}

fn run_features(audio: &[PathBuf], out_dir: &Path, config: Option<&PathBuf>) -> Result<()> {
    let extractor = match config {
        Some(path) => StyleExtractor::from_config(&ModelConfig::load(path)?, Device::Cpu),
        None => StyleExtractor::new(MelConfig::default(), DEFAULT_SAMPLE_RATE, Device::Cpu),
    };
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;

    let pb = create_progress_bar(audio.len() as u64)?;
    let start = Instant::now();
    for path in audio {
        pb.set_message(path.display().to_string());
        let (samples, sr) = AudioLoader::load_native(path)?;
        let features = extractor.extract(&samples, sr)?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reference".to_string());
        let out = out_dir.join(format!("{}.safetensors", stem));
        let dims = features.dims().to_vec();
        let tensors = HashMap::from([("mel".to_string(), features)]);
        candle_core::safetensors::save(&tensors, &out)
            .with_context(|| format!("Failed to save features to {:?}", out))?;
        info!("{:?} -> {:?} {:?}", path, out, dims);
        pb.inc(1);
    }
    pb.finish_with_message("done");
    info!("Extracted {} reference(s) in {:.2?}", audio.len(), start.elapsed());
    Ok(())
}

fn run_pace(
    text: &str,
    durations: &str,
    target_wpm: f64,
    short_penalty: f64,
    long_penalty: f64,
) -> Result<()> {
    let raw = durations
        .split(',')
        .map(|d| d.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Durations must be comma-separated numbers")?;
    if raw.is_empty() {
        bail!("No durations given");
    }

    let scaler = DurationScaler::new(DurationScaling {
        target_wpm,
        short_sentence_penalty: short_penalty,
        long_sentence_penalty: long_penalty,
        ..DurationScaling::default()
    });
    let words = styletts::text::count_words(text);
    let scaled = scaler.scale(text, &raw);
    let rounded = round_durations(&scaled);
    let alignment = AlignmentExpander::expand(&rounded)?;

    println!("Words:        {}", words);
    if words > 0 {
        println!("Estimated:    {:.1} wpm", scaler.estimated_wpm(words, &raw));
        println!("After:        {:.1} wpm", scaler.estimated_wpm(words, &scaled));
    }
    println!("Scaled:       {:?}", scaled);
    println!("Rounded:      {:?}", rounded);
    println!(
        "Frames:       {} ({:.2} s at {} Hz)",
        alignment.total_frames(),
        alignment.total_frames() as f64 * scaler.params().frame_duration_units
            / scaler.params().sample_rate as f64,
        scaler.params().sample_rate
    );
    for (i, (start, end)) in alignment.spans().enumerate() {
        println!("  token {:>3}: frames [{}, {})", i, start, end);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    info!("styletts v{}", VERSION);

    match &cli.command {
        Commands::Inspect { checkpoint, json } => run_inspect(checkpoint, *json),
        Commands::Features {
            audio,
            out_dir,
            config,
        } => run_features(audio, out_dir, config.as_ref()),
        Commands::Pace {
            text,
            durations,
            target_wpm,
            short_penalty,
            long_penalty,
        } => run_pace(text, durations, *target_wpm, *short_penalty, *long_penalty),
    }
}
