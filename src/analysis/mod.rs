pub mod report;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::audio::decode::load_mono;
use crate::audio::stft::power_spectrogram;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::eval::reconstruct::{relative_error, PseudoInverse, IDENTITY_ERROR};
use crate::eval::size::compressed_size_bytes;
use crate::mel::band::Compression;
use crate::mel::basis::{build_basis, clip_fmax, mel_basis, MelBasis};
use crate::mel::codec;
use report::{aggregate, Failure, FileAnalysis, Metric, Report, Settings};

/// How a multi-file run treats individual failures.
#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    /// Abort the whole batch on the first failing file instead of skipping it.
    pub fail_fast: bool,
    /// Worker threads; 0 uses rayon's global pool.
    pub jobs: usize,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

/// Resolve the input path to a sorted list of audio files.
///
/// A file is taken as-is; a directory contributes its direct children with a
/// known audio extension.
pub fn collect_audio_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(Error::NotFound(format!("Input path not found: {}", input.display())));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_file() && has_audio_extension(&path) {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(Error::NotFound(format!(
            "No audio files with extensions {:?} found in {}",
            crate::AUDIO_EXTENSIONS,
            input.display()
        )));
    }
    Ok(files)
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| crate::AUDIO_EXTENSIONS.contains(&e.as_str()))
}

/// Load one file at the configured rate and analyze it.
pub fn analyze_file(path: &Path, config: &PipelineConfig) -> Result<FileAnalysis> {
    let audio = load_mono(path, config.sample_rate())?;
    analyze_samples(&path.display().to_string(), &audio.samples, audio.sample_rate, config)
}

/// Compute every representation of one waveform and its metrics.
///
/// All bases are built before the spectrogram so that a band layout that is
/// invalid at `sample_rate` fails without any STFT work.
pub fn analyze_samples(
    file: &str,
    samples: &[f32],
    sample_rate: u32,
    config: &PipelineConfig,
) -> Result<FileAnalysis> {
    let stft = config.stft();
    let fmax = clip_fmax(config.fmax(), sample_rate);

    let mel_bins = config.mel_bins();
    let hr_bins = config.bands().total_bins();
    let standard = mel_basis(sample_rate, stft.n_fft, mel_bins, 0.0, fmax).map_err(|e| e.in_representation("mel"))?;
    let matched = mel_basis(sample_rate, stft.n_fft, hr_bins, 0.0, fmax)
        .map_err(|e| e.in_representation(format!("mel_{}", hr_bins)))?;
    let hr = build_basis(sample_rate, stft.n_fft, fmax, config.bands()).map_err(|e| e.in_representation("hr_mel"))?;

    let power = power_spectrogram(samples, stft)?;
    let frames = power.ncols();

    let mut representations = Vec::with_capacity(6);

    representations.push(Metric {
        name: "stft".to_string(),
        bins: power.nrows(),
        frames,
        relative_recon_error: IDENTITY_ERROR,
        bytes_compressed: compressed_size_bytes(&[("S", &power)]).map_err(|e| e.in_representation("stft"))?,
        note: None,
    });

    representations.extend(uniform_pair(
        &power,
        &standard,
        config,
        ("mel".to_string(), format!("{}-bin mel power", mel_bins)),
        ("log_mel".to_string(), format!("log1p on {}-bin mel power", mel_bins)),
    )?);

    representations.extend(uniform_pair(
        &power,
        &matched,
        config,
        (
            format!("mel_{}", hr_bins),
            format!("{}-bin mel power (baseline to match HR bins)", hr_bins),
        ),
        (
            format!("log_mel_{}", hr_bins),
            format!("log1p on {}-bin mel power", hr_bins),
        ),
    )?);

    representations.push(hr_metric(&power, &hr, config).map_err(|e| e.in_representation("hr_mel"))?);

    for m in &representations {
        log::debug!(
            "{}: {:<12} bins={:<5} err={:.6} bytes={}",
            file,
            m.name,
            m.bins,
            m.relative_recon_error,
            m.bytes_compressed
        );
    }

    Ok(FileAnalysis {
        file: file.to_string(),
        input_sr: sample_rate,
        duration_sec: round2(samples.len() as f64 / sample_rate as f64),
        frames,
        n_fft: stft.n_fft,
        hop_length: stft.hop_length,
        win_length: stft.win_length,
        fmax,
        representations,
    })
}

/// Uniform Mel baseline as raw power and as log1p, sharing one basis and
/// pseudo-inverse.
fn uniform_pair(
    power: &DMatrix<f64>,
    basis: &MelBasis,
    config: &PipelineConfig,
    (power_name, power_note): (String, String),
    (log_name, log_note): (String, String),
) -> Result<[Metric; 2]> {
    let mel = basis.project(power).map_err(|e| e.in_representation(&power_name))?;
    let pinv = PseudoInverse::new(basis.matrix(), config.pinv_rcond()).map_err(|e| e.in_representation(&power_name))?;

    let plain = evaluate(power, &pinv, &mel, &mel, power_name, power_note)?;

    let log = codec::encode_all(&mel, Compression::Log1p);
    let decoded = codec::decode_all(&log, Compression::Log1p);
    let logged = evaluate(power, &pinv, &log, &decoded, log_name, log_note)?;

    Ok([plain, logged])
}

fn hr_metric(power: &DMatrix<f64>, basis: &MelBasis, config: &PipelineConfig) -> Result<Metric> {
    let bands = config.bands();
    let mel = basis.project(power)?;
    let encoded = codec::encode(&mel, basis.ranges(), bands)?;
    let decoded = codec::decode(&encoded, basis.ranges(), bands)?;
    let pinv = PseudoInverse::new(basis.matrix(), config.pinv_rcond())?;
    evaluate(power, &pinv, &encoded, &decoded, "hr_mel".to_string(), bands.describe())
}

/// Metric for a stored matrix (`encoded`) whose decoded Mel power is `decoded`.
fn evaluate(
    power: &DMatrix<f64>,
    pinv: &PseudoInverse,
    encoded: &DMatrix<f64>,
    decoded: &DMatrix<f64>,
    name: String,
    note: String,
) -> Result<Metric> {
    let approx = pinv.reconstruct(decoded).map_err(|e| e.in_representation(&name))?;
    let bytes = compressed_size_bytes(&[("M", encoded)]).map_err(|e| e.in_representation(&name))?;
    let error = relative_error(power, &approx).map_err(|e| e.in_representation(&name))?;
    Ok(Metric {
        bins: encoded.nrows(),
        frames: encoded.ncols(),
        relative_recon_error: error,
        bytes_compressed: bytes,
        note: Some(note),
        name,
    })
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Analyze `paths` in parallel and assemble the report.
///
/// Results keep input order. Without `fail_fast`, a failing file is logged,
/// listed under `failures`, and skipped; the run only fails when no file
/// succeeds.
pub fn analyze_paths(paths: &[PathBuf], config: &PipelineConfig, options: &BatchOptions) -> Result<Report> {
    let pb = if options.progress {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    log::info!("Analyzing {} file(s)", paths.len());

    // Lowest input index that has failed so far; fail-fast skips anything after it
    let first_failure = AtomicUsize::new(usize::MAX);

    let analyze_one = |(index, path): (usize, &PathBuf)| -> Option<Result<FileAnalysis>> {
        if options.fail_fast && index > first_failure.load(Ordering::Acquire) {
            pb.inc(1);
            return None;
        }
        let result = analyze_file(path, config).map_err(|e| e.in_file(path.display().to_string()));
        if options.fail_fast && result.is_err() {
            first_failure.fetch_min(index, Ordering::AcqRel);
        }
        pb.inc(1);
        Some(result)
    };

    // Every index below the earliest failure is always analyzed, so the first
    // error in input order is the one reported under fail-fast.
    let run = || -> Vec<Result<FileAnalysis>> {
        paths
            .par_iter()
            .enumerate()
            .map(analyze_one)
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    };

    let results = if options.jobs > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .map_err(|e| Error::config(format!("failed to build worker pool: {}", e)))?;
        pool.install(run)
    } else {
        run()
    };

    let mut per_file = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    let mut first_error = None;

    for result in results {
        match result {
            Ok(analysis) => per_file.push(analysis),
            Err(e) if options.fail_fast => {
                pb.abandon();
                return Err(e);
            }
            Err(e) => {
                log::warn!("Skipping file after failure: {}", e);
                let file = match &e {
                    Error::File { file, .. } => file.clone(),
                    _ => String::new(),
                };
                failures.push(Failure {
                    file,
                    error: e.to_string(),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    pb.finish_with_message(format!("{} analyzed, {} failed", per_file.len(), failures.len()));

    if per_file.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    let aggregate = if per_file.len() > 1 { aggregate(&per_file) } else { None };

    let stft = config.stft();
    Ok(Report {
        settings: Settings {
            target_sr: config.sample_rate(),
            fmax: config.fmax(),
            n_fft: stft.n_fft,
            hop_length: stft.hop_length,
            win_length: stft.win_length,
            pinv_rcond: config.pinv_rcond(),
        },
        audio_files: paths.iter().map(|p| p.display().to_string()).collect(),
        per_file,
        aggregate,
        failures,
    })
}

/// Write `analysis.json` into `out_dir` and return its path.
pub fn write_report(report: &Report, out_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join("analysis.json");
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
    Ok(path)
}
