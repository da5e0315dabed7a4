use std::ops::Range;

use nalgebra::DMatrix;

use super::band::BandSet;
use super::scale::{fft_frequencies, mel_frequencies};
use crate::error::{Error, Result};

/// Linear map from FFT bins to Mel bins, plus the rows owned by each band.
#[derive(Clone, Debug)]
pub struct MelBasis {
    matrix: DMatrix<f64>,
    ranges: Vec<Range<usize>>,
    fmax: f64,
}

impl MelBasis {
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Half-open row range of each band, in band order.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn n_mels(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn freq_bins(&self) -> usize {
        self.matrix.ncols()
    }

    /// Ceiling actually used, after clipping to Nyquist.
    pub fn fmax(&self) -> f64 {
        self.fmax
    }

    /// Mel power for a power spectrogram: `basis · power`.
    pub fn project(&self, power: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if power.nrows() != self.freq_bins() {
            return Err(Error::config(format!(
                "power spectrogram has {} bins, basis expects {}",
                power.nrows(),
                self.freq_bins()
            )));
        }
        Ok(&self.matrix * power)
    }
}

/// Clip a requested ceiling to the Nyquist frequency of `sample_rate`.
pub fn clip_fmax(fmax: f64, sample_rate: u32) -> f64 {
    fmax.min(sample_rate as f64 / 2.0)
}

/// Multi-band HR basis: each band gets its own triangular filter bank between
/// `fmin` and `min(fmax, global_fmax)`, stacked in band order.
pub fn build_basis(sample_rate: u32, n_fft: usize, global_fmax: f64, bands: &BandSet) -> Result<MelBasis> {
    let fmax = clip_fmax(global_fmax, sample_rate);
    bands.validate(fmax)?;
    let layout: Vec<(f64, f64, usize)> = bands
        .iter()
        .map(|b| (b.fmin, b.effective_fmax(fmax), b.bins))
        .collect();
    assemble(sample_rate, n_fft, fmax, &layout)
}

/// Uniform `n_mels` filter bank over `[fmin, fmax]`.
pub fn mel_basis(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Result<MelBasis> {
    let fmax = clip_fmax(fmax, sample_rate);
    if n_mels == 0 {
        return Err(Error::config("n_mels must be positive"));
    }
    if !(fmin >= 0.0 && fmin < fmax) {
        return Err(Error::config(format!(
            "invalid mel range {:.1}..{:.1} Hz",
            fmin, fmax
        )));
    }
    assemble(sample_rate, n_fft, fmax, &[(fmin, fmax, n_mels)])
}

fn assemble(sample_rate: u32, n_fft: usize, fmax: f64, layout: &[(f64, f64, usize)]) -> Result<MelBasis> {
    if sample_rate == 0 {
        return Err(Error::config("sample rate must be positive"));
    }
    if n_fft == 0 {
        return Err(Error::config("n_fft must be positive"));
    }

    let fft_freqs = fft_frequencies(sample_rate, n_fft);
    let total: usize = layout.iter().map(|&(_, _, bins)| bins).sum();
    let mut matrix = DMatrix::<f64>::zeros(total, fft_freqs.len());
    let mut ranges = Vec::with_capacity(layout.len());

    let mut offset = 0;
    for &(band_fmin, band_fmax, bins) in layout {
        write_filters(&mut matrix, offset, bins, band_fmin, band_fmax, &fft_freqs);
        ranges.push(offset..offset + bins);
        offset += bins;
    }

    log::debug!(
        "Mel basis: {} rows x {} bins, {} band(s), fmax {:.1} Hz",
        total,
        fft_freqs.len(),
        layout.len(),
        fmax
    );

    Ok(MelBasis { matrix, ranges, fmax })
}

/// Write `bins` area-normalized triangular filters starting at row `offset`.
fn write_filters(
    matrix: &mut DMatrix<f64>,
    offset: usize,
    bins: usize,
    fmin: f64,
    fmax: f64,
    fft_freqs: &[f64],
) {
    let edges = mel_frequencies(bins + 2, fmin, fmax);

    for i in 0..bins {
        let (lo, center, hi) = (edges[i], edges[i + 1], edges[i + 2]);
        let rise = center - lo;
        let fall = hi - center;
        let enorm = 2.0 / (hi - lo);

        for (k, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - lo) / rise;
            let upper = (hi - freq) / fall;
            let weight = lower.min(upper).max(0.0);
            if weight > 0.0 {
                matrix[(offset + i, k)] = enorm * weight;
            }
        }
    }
}
