//! loudnessctl - apply EBU R 128 loudness normalization to raw PCM

use anyhow::Context;
use clap::{Parser, Subcommand};
use loudness_cli::{apply_stream, CliConfig, Overrides, TargetPreset};
use loudness_control::{GainComputer, SampleFormat};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "loudnessctl")]
#[command(about = "Normalize raw PCM streams to a target loudness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the gain for a loudness / target pair
    Gain {
        /// Measured integrated loudness [LUFS]
        #[arg(short, long, allow_hyphen_values = true)]
        loudness: f64,
        /// Target level [LUFS]
        #[arg(short, long, default_value_t = -23.0, allow_hyphen_values = true)]
        target: f64,
        /// Use a well-known target level instead of --target
        #[arg(short, long, value_enum, conflicts_with = "target")]
        preset: Option<TargetPreset>,
    },
    /// Stream a raw PCM file through the loudness control stage
    Apply {
        /// Raw interleaved PCM input
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the processed PCM
        #[arg(short, long)]
        output: PathBuf,
        /// Configuration file (TOML)
        #[arg(short, long, env = "LOUDNESS_CONFIG")]
        config: Option<PathBuf>,
        /// Sample format (overrides config)
        #[arg(short, long)]
        format: Option<SampleFormat>,
        /// Channel count (overrides config)
        #[arg(long)]
        channels: Option<u16>,
        /// Measured integrated loudness [LUFS] (overrides config)
        #[arg(short, long, allow_hyphen_values = true)]
        loudness: Option<f64>,
        /// Target level [LUFS] (overrides config)
        #[arg(short, long, allow_hyphen_values = true)]
        target: Option<f64>,
        /// Use a well-known target level instead of --target
        #[arg(short, long, value_enum, conflicts_with = "target")]
        preset: Option<TargetPreset>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loudness_control=info,loudnessctl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Gain {
            loudness,
            target,
            preset,
        } => {
            let target = preset.map_or(target, TargetPreset::lufs);
            let parameters = GainComputer::compute(loudness, target);
            println!("{}", serde_json::to_string_pretty(&parameters)?);
        }
        Commands::Apply {
            input,
            output,
            config,
            format,
            channels,
            loudness,
            target,
            preset,
        } => {
            let mut settings = CliConfig::load(config.as_deref())?;
            settings.apply_overrides(Overrides {
                format,
                channels,
                integrated_loudness_lufs: loudness,
                target_level_lufs: preset.map(TargetPreset::lufs).or(target),
            });
            settings.validate()?;

            tracing::info!(
                input = %input.display(),
                output = %output.display(),
                format = %settings.stream.format,
                "Applying loudness control"
            );

            let reader = BufReader::new(
                File::open(&input).with_context(|| format!("opening {}", input.display()))?,
            );
            let writer = BufWriter::new(
                File::create(&output).with_context(|| format!("creating {}", output.display()))?,
            );

            let summary = apply_stream(&settings, reader, writer)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
