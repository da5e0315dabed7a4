mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use cli::{AnalyzeArgs, Cli, Command, CommonArgs, ExtractArgs};
use hrmel::analysis::{self, BatchOptions};
use hrmel::config::{self, Config};
use hrmel::extract;
use hrmel::mel::BandSet;
use hrmel::PipelineConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Extract(args) => run_extract(args),
    }
}

/// Load the config file (if any) and apply CLI overrides on top.
fn build_pipeline(common: &CommonArgs) -> Result<PipelineConfig> {
    let file_config = match config::find_config(common.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    let mut settings = file_config.analysis;
    if let Some(sr) = common.sr {
        settings.sample_rate = sr;
    }
    if let Some(fmax) = common.fmax {
        settings.fmax = fmax;
    }

    let bands = if !common.bands.is_empty() {
        BandSet::new(common.bands.clone()).context("Invalid --band list")?
    } else {
        file_config.bands.unwrap_or_default()
    };

    let pipeline = PipelineConfig::new(&settings, bands).context("Invalid analysis settings")?;
    log::info!(
        "sr {} Hz, fmax {:.1} Hz, n_fft {}, hop {}, win {}, HR-Mel {}",
        pipeline.sample_rate(),
        pipeline.fmax(),
        pipeline.stft().n_fft,
        pipeline.stft().hop_length,
        pipeline.stft().win_length,
        pipeline.bands().describe()
    );
    Ok(pipeline)
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let pipeline = build_pipeline(&args.common)?;

    let files = analysis::collect_audio_files(&args.input)
        .with_context(|| format!("No input audio at {}", args.input.display()))?;
    log::info!("Input: {} ({} file(s))", args.input.display(), files.len());

    let options = BatchOptions {
        fail_fast: args.fail_fast,
        jobs: args.jobs,
        progress: true,
    };
    let report = analysis::analyze_paths(&files, &pipeline, &options).context("Analysis failed")?;

    let path = analysis::write_report(&report, &args.common.output_dir)
        .with_context(|| format!("Failed to write report to {}", args.common.output_dir.display()))?;
    log::info!("Report written to {}", path.display());
    print_json(&report)
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let pipeline = build_pipeline(&args.common)?;
    let out_dir: &Path = &args.common.output_dir;

    let summary = extract::run_extract(&args.input, out_dir, &pipeline)
        .with_context(|| format!("Extraction failed for {}", args.input.display()))?;
    log::info!("Done! Output: {}", out_dir.join(extract::PAYLOAD_FILE).display());
    print_json(&summary)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
