//! Observation model `(H, R)`.

use nalgebra::DMatrix;

use crate::error::KalmanError;

/// One step's observation model: coupling matrix `H` (`m×n`) and
/// observation noise covariance `R` (`m×m`):
///
/// ```text
/// z(k) = H·x_(k) + v,    v ~ N(0, R)
/// ```
///
/// The observation count `m` may vary from step to step; absent
/// observations are dropped with [`KalmanFilterObservable::restrict`]
/// before the correction consults `H` and `R`.
#[derive(Debug, Clone)]
pub struct KalmanFilterObservable {
    h: DMatrix<f64>,
    r: DMatrix<f64>,
}

impl KalmanFilterObservable {
    pub fn new(h: DMatrix<f64>, r: DMatrix<f64>) -> Result<Self, KalmanError> {
        if r.nrows() != r.ncols() {
            return Err(KalmanError::DimensionMismatch {
                what: "observation noise R must be square",
                expected: r.nrows(),
                actual: r.ncols(),
            });
        }
        if r.nrows() != h.nrows() {
            return Err(KalmanError::DimensionMismatch {
                what: "observation noise R must match H rows",
                expected: h.nrows(),
                actual: r.nrows(),
            });
        }

        Ok(Self { h, r })
    }

    /// State dimension `n`.
    pub fn n_state(&self) -> usize {
        self.h.ncols()
    }

    /// Configured observation count `m`.
    pub fn n_observable(&self) -> usize {
        self.h.nrows()
    }

    pub fn h(&self) -> &DMatrix<f64> {
        &self.h
    }

    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    /// The observation system restricted to the present observations:
    /// keeps the rows of `H`, and the rows and columns of `R`, whose
    /// `presence` entry is `true`.
    pub fn restrict(&self, presence: &[bool]) -> Result<Self, KalmanError> {
        if presence.len() != self.n_observable() {
            return Err(KalmanError::DimensionMismatch {
                what: "presence mask must match observation count",
                expected: self.n_observable(),
                actual: presence.len(),
            });
        }

        let keep: Vec<usize> =
            presence.iter().enumerate().filter_map(|(i, &p)| p.then_some(i)).collect();

        let h = DMatrix::from_fn(keep.len(), self.n_state(), |i, j| self.h[(keep[i], j)]);
        let r = DMatrix::from_fn(keep.len(), keep.len(), |i, j| self.r[(keep[i], keep[j])]);

        Ok(Self { h, r })
    }
}
