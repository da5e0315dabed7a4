use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use hrmel::mel::BandSpec;

#[derive(Parser, Debug)]
#[command(name = "hrmel", about = "High-resolution multi-band Mel extraction and evaluation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare STFT, Mel and HR-Mel representations on a file or directory
    Analyze(AnalyzeArgs),
    /// Extract HR-Mel from one file into hr_mel.npz
    Extract(ExtractArgs),
}

/// Options shared by both subcommands. Unset values fall back to the config
/// file, then to built-in defaults.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory for the JSON outputs
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Target sample rate in Hz
    #[arg(long)]
    pub sr: Option<u32>,

    /// Upper frequency in Hz (clipped to Nyquist)
    #[arg(long)]
    pub fmax: Option<f64>,

    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// HR-Mel band as fmin:fmax:bins:compression (repeatable)
    #[arg(long = "band", value_parser = parse_band)]
    pub bands: Vec<BandSpec>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Audio file or directory of audio files
    #[arg(short, long, default_value = ".")]
    pub input: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Worker threads (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Abort on the first file that fails instead of skipping it
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Audio file to encode
    #[arg(short, long, default_value = "playlist.mp3")]
    pub input: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

fn parse_band(s: &str) -> Result<BandSpec, String> {
    s.parse::<BandSpec>().map_err(|e| e.to_string())
}
