//! HR-Mel extraction: encode one waveform and persist it with its metadata.

use std::path::{Path, PathBuf};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::archive::{save_npz, Entry};
use crate::audio::decode::load_mono;
use crate::audio::stft::power_spectrogram;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::mel::band::{BandSet, Compression};
use crate::mel::basis::{build_basis, clip_fmax};
use crate::mel::codec;

pub const PAYLOAD_FILE: &str = "hr_mel.npz";
pub const SUMMARY_FILE: &str = "summary.json";

/// One band as recorded next to the payload, with its clipped upper edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandMeta {
    pub range_hz: [f64; 2],
    pub bins: usize,
    pub compression: Compression,
}

/// Parameters needed to interpret an encoded HR-Mel matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub sr: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
    pub n_mels: usize,
    pub fmax: f64,
    pub bands: Vec<BandMeta>,
}

impl Metadata {
    fn new(sample_rate: u32, fmax: f64, config: &PipelineConfig, bands: &BandSet) -> Self {
        let stft = config.stft();
        Self {
            sr: sample_rate,
            n_fft: stft.n_fft,
            hop_length: stft.hop_length,
            win_length: stft.win_length,
            n_mels: bands.total_bins(),
            fmax,
            bands: bands
                .iter()
                .map(|b| BandMeta {
                    range_hz: [b.fmin, b.effective_fmax(fmax)],
                    bins: b.bins,
                    compression: b.compression,
                })
                .collect(),
        }
    }
}

/// What `hrmel extract` reports for one file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractSummary {
    pub input_sr: u32,
    pub duration_sec: f64,
    pub hr_mel_encoded: [usize; 2],
    pub bands: Vec<BandMeta>,
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
    pub fmax: f64,
}

/// Encoded HR-Mel matrix (rows x frames) of a waveform, with its metadata.
pub fn hr_mel(samples: &[f32], sample_rate: u32, config: &PipelineConfig) -> Result<(DMatrix<f64>, Metadata)> {
    let fmax = clip_fmax(config.fmax(), sample_rate);
    let bands = config.bands();
    let basis = build_basis(sample_rate, config.stft().n_fft, fmax, bands)?;
    let power = power_spectrogram(samples, config.stft())?;
    let mel = basis.project(&power)?;
    let encoded = codec::encode(&mel, basis.ranges(), bands)?;
    Ok((encoded, Metadata::new(sample_rate, fmax, config, bands)))
}

/// Persist `encoded` as `encoded.npy` and `meta` as `meta.json` in one
/// compressed archive.
pub fn save_hr_mel(encoded: &DMatrix<f64>, meta: &Metadata, out_path: &Path) -> Result<()> {
    let meta_json = serde_json::to_string(meta)?;
    save_npz(out_path, &[Entry::Array("encoded", encoded), Entry::Text("meta.json", &meta_json)])
}

/// Decode `input`, extract HR-Mel into `out_dir`, and write the summary.
pub fn run_extract(input: &Path, out_dir: &Path, config: &PipelineConfig) -> Result<ExtractSummary> {
    if !input.exists() {
        return Err(Error::NotFound(format!("Input file not found: {}", input.display())));
    }
    std::fs::create_dir_all(out_dir)?;

    log::info!("Decoding {}", input.display());
    let audio = load_mono(input, config.sample_rate())?;

    log::info!("Extracting HR-Mel ({})", config.bands().describe());
    let (encoded, meta) = hr_mel(&audio.samples, audio.sample_rate, config)?;
    save_hr_mel(&encoded, &meta, &out_dir.join(PAYLOAD_FILE))?;

    let summary = ExtractSummary {
        input_sr: audio.sample_rate,
        duration_sec: (audio.duration_secs() * 100.0).round() / 100.0,
        hr_mel_encoded: [encoded.nrows(), encoded.ncols()],
        bands: meta.bands,
        n_fft: meta.n_fft,
        hop_length: meta.hop_length,
        win_length: meta.win_length,
        fmax: meta.fmax,
    };
    write_summary(&summary, out_dir)?;
    Ok(summary)
}

/// Write `summary.json` into `out_dir` and return its path.
pub fn write_summary(summary: &ExtractSummary, out_dir: &Path) -> Result<PathBuf> {
    let path = out_dir.join(SUMMARY_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(summary)?)?;
    Ok(path)
}
