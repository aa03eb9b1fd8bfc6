use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tts_core::wav;
use ttsapi::{config, TextToSpeech};

/// Synthesize speech through the remote API and optionally enhance it
#[derive(Parser, Debug)]
#[command(name = "ttsapi")]
#[command(version)]
struct Cli {
    /// Text to synthesize
    #[arg(long)]
    text: String,

    /// Language symbol passed to the API (e.g. en, de)
    #[arg(long, default_value = "en")]
    lang: String,

    /// Configuration file (defaults to $TTSAPI_CONFIG or configs.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the enhancement pipeline on the synthesized audio
    #[arg(long)]
    enhance: bool,

    /// Where to write the WAV file
    #[arg(long, short, default_value = "speech.wav", conflicts_with = "base64")]
    output: PathBuf,

    /// Print the WAV file as base64 instead of writing it
    #[arg(long)]
    base64: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenv::dotenv();

    run(Cli::parse())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(config::default_config_path()));
    info!("Loading configuration from {}", config_path.display());

    let tts = TextToSpeech::from_config_file(&config_path)
        .with_context(|| format!("failed to set up from {}", config_path.display()))?;

    let waveform = tts
        .produce(&cli.text, &cli.lang, cli.enhance)
        .context("speech production failed")?;
    info!(
        sample_rate = waveform.sample_rate(),
        duration_secs = waveform.duration_secs(),
        enhanced = cli.enhance,
        "speech ready"
    );

    if cli.base64 {
        println!("{}", wav::encode_wav_base64(&waveform)?);
    } else {
        let bytes = wav::encode_wav(&waveform)?;
        std::fs::write(&cli.output, bytes)
            .with_context(|| format!("failed to write {}", cli.output.display()))?;
        info!("Wrote {}", cli.output.display());
    }
    Ok(())
}
