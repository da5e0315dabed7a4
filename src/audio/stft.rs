use nalgebra::DMatrix;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_N_FFT: usize = 2048;
pub const DEFAULT_HOP_LENGTH: usize = 441;
pub const DEFAULT_WIN_LENGTH: usize = 2048;

/// Framing parameters shared by every representation built from one waveform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StftParams {
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
}

impl Default for StftParams {
    fn default() -> Self {
        Self {
            n_fft: DEFAULT_N_FFT,
            hop_length: DEFAULT_HOP_LENGTH,
            win_length: DEFAULT_WIN_LENGTH,
        }
    }
}

impl StftParams {
    pub fn new(n_fft: usize, hop_length: usize, win_length: usize) -> Result<Self> {
        let params = Self {
            n_fft,
            hop_length,
            win_length,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_fft == 0 {
            return Err(Error::config("n_fft must be positive"));
        }
        if self.hop_length == 0 {
            return Err(Error::config("hop_length must be positive"));
        }
        if self.win_length == 0 {
            return Err(Error::config("win_length must be positive"));
        }
        if self.win_length > self.n_fft {
            return Err(Error::config(format!(
                "win_length ({}) exceeds n_fft ({})",
                self.win_length, self.n_fft
            )));
        }
        Ok(())
    }

    pub fn freq_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frame count for a centered STFT of `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }
}

/// Magnitude-squared STFT, shape `(n_fft/2 + 1, frames)`.
///
/// Frames are centered: the signal is zero-padded by `n_fft/2` on both sides
/// and frame `t` covers `[t*hop, t*hop + n_fft)` of the padded signal.
pub fn power_spectrogram(samples: &[f32], params: &StftParams) -> Result<DMatrix<f64>> {
    params.validate()?;

    let n_fft = params.n_fft;
    let pad = n_fft / 2;
    let n_bins = params.freq_bins();
    let n_frames = params.frame_count(samples.len());
    let window = padded_window(params.win_length, n_fft);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut power = DMatrix::<f64>::zeros(n_bins, n_frames);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];

    for frame in 0..n_frames {
        let start = frame * params.hop_length;
        for (i, slot) in buffer.iter_mut().enumerate() {
            // Position in the unpadded signal
            let sample = (start + i)
                .checked_sub(pad)
                .and_then(|idx| samples.get(idx))
                .copied()
                .unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process(&mut buffer);

        for (bin, c) in buffer[..n_bins].iter().enumerate() {
            power[(bin, frame)] = c.norm_sqr() as f64;
        }
    }

    log::debug!(
        "STFT: {} samples -> {} bins x {} frames",
        samples.len(),
        n_bins,
        n_frames
    );

    Ok(power)
}

/// Periodic Hann window of `size` samples.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Hann window of `win_length` centered inside `n_fft` zeros.
fn padded_window(win_length: usize, n_fft: usize) -> Vec<f32> {
    let mut window = vec![0.0f32; n_fft];
    let offset = (n_fft - win_length) / 2;
    window[offset..offset + win_length].copy_from_slice(&hann_window(win_length));
    window
}
