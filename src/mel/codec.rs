use std::ops::Range;

use nalgebra::DMatrix;

use super::band::{BandSet, Compression};
use crate::error::{Error, Result};

/// Compress each band's rows of a Mel-power matrix with that band's function.
///
/// Returns a new matrix; rows outside every band are copied through.
pub fn encode(mel_power: &DMatrix<f64>, ranges: &[Range<usize>], bands: &BandSet) -> Result<DMatrix<f64>> {
    apply(mel_power, ranges, bands, Compression::forward)
}

/// Exact structural inverse of [`encode`].
pub fn decode(encoded: &DMatrix<f64>, ranges: &[Range<usize>], bands: &BandSet) -> Result<DMatrix<f64>> {
    apply(encoded, ranges, bands, Compression::inverse)
}

/// Apply one compression to every element (single-band baselines).
pub fn encode_all(values: &DMatrix<f64>, compression: Compression) -> DMatrix<f64> {
    values.map(|x| compression.forward(x))
}

pub fn decode_all(values: &DMatrix<f64>, compression: Compression) -> DMatrix<f64> {
    values.map(|y| compression.inverse(y))
}

fn apply(
    input: &DMatrix<f64>,
    ranges: &[Range<usize>],
    bands: &BandSet,
    op: fn(Compression, f64) -> f64,
) -> Result<DMatrix<f64>> {
    if ranges.len() != bands.len() {
        return Err(Error::config(format!(
            "{} row ranges for {} bands",
            ranges.len(),
            bands.len()
        )));
    }
    for range in ranges {
        if range.start > range.end || range.end > input.nrows() {
            return Err(Error::config(format!(
                "band rows {}..{} do not fit a matrix of {} rows",
                range.start,
                range.end,
                input.nrows()
            )));
        }
    }

    let mut out = input.clone();
    for (range, band) in ranges.iter().zip(bands.iter()) {
        let mut rows = out.rows_mut(range.start, range.len());
        rows.apply(|v| *v = op(band.compression, *v));
    }
    Ok(out)
}
