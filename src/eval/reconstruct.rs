use nalgebra::{DMatrix, SVD};

use crate::error::{Error, Result};

/// Added to the target norm so silence yields a finite error.
pub const ERROR_EPSILON: f64 = 1e-12;

/// Default relative cutoff for small singular values.
pub const DEFAULT_RCOND: f64 = 1e-15;

const SVD_MAX_ITERATIONS: usize = 10_000;

/// Moore-Penrose pseudo-inverse of a (rank-deficient) Mel basis.
#[derive(Clone, Debug)]
pub struct PseudoInverse {
    matrix: DMatrix<f64>,
    rank: usize,
    rcond: f64,
}

impl PseudoInverse {
    /// Singular values `<= rcond * sigma_max` are treated as zero.
    pub fn new(basis: &DMatrix<f64>, rcond: f64) -> Result<Self> {
        if !rcond.is_finite() || rcond < 0.0 {
            return Err(Error::config(format!("pinv rcond must be finite and >= 0, got {}", rcond)));
        }

        let (rows, cols) = basis.shape();
        if rows == 0 || cols == 0 {
            return Ok(Self {
                matrix: DMatrix::zeros(cols, rows),
                rank: 0,
                rcond,
            });
        }

        let svd = SVD::try_new(basis.clone(), true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
            .ok_or_else(|| Error::Numerical(format!("SVD of {}x{} basis did not converge", rows, cols)))?;

        let sigma_max = svd.singular_values.iter().copied().fold(0.0f64, f64::max);
        let cutoff = rcond * sigma_max;
        let rank = svd.singular_values.iter().filter(|&&s| s > cutoff).count();

        let matrix = svd
            .pseudo_inverse(cutoff)
            .map_err(|e| Error::Numerical(e.to_string()))?;

        log::debug!(
            "Pseudo-inverse: {}x{} basis, rank {} (rcond {:e})",
            rows,
            cols,
            rank,
            rcond
        );

        Ok(Self { matrix, rank, rcond })
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Number of singular values kept.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn rcond(&self) -> f64 {
        self.rcond
    }

    /// Project Mel power back to linear-frequency power, clipping negatives to 0.
    pub fn reconstruct(&self, mel_power: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if mel_power.nrows() != self.matrix.ncols() {
            return Err(Error::config(format!(
                "mel matrix has {} rows, pseudo-inverse expects {}",
                mel_power.nrows(),
                self.matrix.ncols()
            )));
        }
        let mut approx = &self.matrix * mel_power;
        approx.apply(|v| *v = v.max(0.0));
        Ok(approx)
    }
}

/// `||target - approx||_F / (||target||_F + eps)`.
pub fn relative_error(target: &DMatrix<f64>, approx: &DMatrix<f64>) -> Result<f64> {
    if target.shape() != approx.shape() {
        return Err(Error::config(format!(
            "cannot compare {}x{} target with {}x{} reconstruction",
            target.nrows(),
            target.ncols(),
            approx.nrows(),
            approx.ncols()
        )));
    }
    let diff = target
        .iter()
        .zip(approx.iter())
        .map(|(t, a)| (t - a) * (t - a))
        .sum::<f64>()
        .sqrt();
    Ok(diff / (target.norm() + ERROR_EPSILON))
}

/// Error reported for the power spectrogram against itself.
///
/// The STFT power is the ground truth, so this is a fixed value and never
/// goes through a pseudo-inverse.
pub const IDENTITY_ERROR: f64 = 0.0;
