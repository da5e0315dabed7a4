use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::stft::{StftParams, DEFAULT_HOP_LENGTH, DEFAULT_N_FFT, DEFAULT_WIN_LENGTH};
use crate::error::{Error, Result};
use crate::eval::reconstruct::DEFAULT_RCOND;
use crate::mel::band::BandSet;
use crate::mel::basis::clip_fmax;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_FMAX: f64 = 20_000.0;
pub const DEFAULT_MEL_BINS: usize = 80;

/// Contents of an optional `hrmel.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisSettings,
    /// `[[bands]]` tables; the built-in 40/32/24 layout when absent
    #[serde(default)]
    pub bands: Option<BandSet>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub sample_rate: u32,
    pub fmax: f64,
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
    pub mel_bins: usize,
    pub pinv_rcond: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fmax: DEFAULT_FMAX,
            n_fft: DEFAULT_N_FFT,
            hop_length: DEFAULT_HOP_LENGTH,
            win_length: DEFAULT_WIN_LENGTH,
            mel_bins: DEFAULT_MEL_BINS,
            pinv_rcond: DEFAULT_RCOND,
        }
    }
}

/// Validated, immutable settings for one pipeline run.
///
/// Built once up front so that bad bands or framing fail before any audio
/// is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    sample_rate: u32,
    fmax: f64,
    stft: StftParams,
    mel_bins: usize,
    bands: BandSet,
    pinv_rcond: f64,
}

impl PipelineConfig {
    pub fn new(settings: &AnalysisSettings, bands: BandSet) -> Result<Self> {
        if settings.sample_rate == 0 {
            return Err(Error::config("sample rate must be positive"));
        }
        if !settings.fmax.is_finite() || settings.fmax <= 0.0 {
            return Err(Error::config(format!("fmax must be positive, got {}", settings.fmax)));
        }
        if settings.mel_bins == 0 {
            return Err(Error::config("mel_bins must be positive"));
        }
        if !settings.pinv_rcond.is_finite() || settings.pinv_rcond < 0.0 {
            return Err(Error::config(format!(
                "pinv_rcond must be finite and >= 0, got {}",
                settings.pinv_rcond
            )));
        }

        let stft = StftParams::new(settings.n_fft, settings.hop_length, settings.win_length)?;
        let fmax = clip_fmax(settings.fmax, settings.sample_rate);
        if fmax < settings.fmax {
            log::info!(
                "fmax {:.1} Hz clipped to Nyquist {:.1} Hz",
                settings.fmax,
                fmax
            );
        }
        bands.validate(fmax)?;

        Ok(Self {
            sample_rate: settings.sample_rate,
            fmax,
            stft,
            mel_bins: settings.mel_bins,
            bands,
            pinv_rcond: settings.pinv_rcond,
        })
    }

    /// Target sample rate every input is resampled to.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frequency ceiling, already clipped to Nyquist.
    pub fn fmax(&self) -> f64 {
        self.fmax
    }

    pub fn stft(&self) -> &StftParams {
        &self.stft
    }

    /// Bin count of the standard Mel baseline.
    pub fn mel_bins(&self) -> usize {
        self.mel_bins
    }

    pub fn bands(&self) -> &BandSet {
        &self.bands
    }

    pub fn pinv_rcond(&self) -> f64 {
        self.pinv_rcond
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fmax: DEFAULT_FMAX,
            stft: StftParams::default(),
            mel_bins: DEFAULT_MEL_BINS,
            bands: BandSet::hr_default(),
            pinv_rcond: DEFAULT_RCOND,
        }
    }
}

/// Parse a TOML config file. Unknown compression tags and invalid bands are
/// configuration errors.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
        .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
}

pub fn parse_config(content: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(content)
}

/// Resolve the config file: explicit path, then `./hrmel.toml`, then the
/// platform config dir (`<config>/hrmel/config.toml`).
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(format!("{}.toml", crate::APP_NAME));
    if local.exists() {
        return Some(local);
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join(crate::APP_NAME).join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
