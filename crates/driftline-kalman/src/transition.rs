//! State transition model `(F, Q)`.

use nalgebra::DMatrix;

use crate::error::KalmanError;

/// One step's process model: transition matrix `F` and process noise
/// covariance `Q`, both `n×n`:
///
/// ```text
/// x_(k+1) = F·x_(k) + w,    w ~ N(0, Q)
/// ```
#[derive(Debug, Clone)]
pub struct KalmanFilterTransition {
    f: DMatrix<f64>,
    q: DMatrix<f64>,
}

impl KalmanFilterTransition {
    pub fn new(f: DMatrix<f64>, q: DMatrix<f64>) -> Result<Self, KalmanError> {
        if f.nrows() != f.ncols() {
            return Err(KalmanError::DimensionMismatch {
                what: "transition F must be square",
                expected: f.nrows(),
                actual: f.ncols(),
            });
        }
        if q.nrows() != f.nrows() || q.ncols() != f.ncols() {
            return Err(KalmanError::DimensionMismatch {
                what: "process noise Q must match F",
                expected: f.nrows(),
                actual: q.nrows().max(q.ncols()),
            });
        }

        Ok(Self { f, q })
    }

    /// State dimension `n`.
    pub fn n_state(&self) -> usize {
        self.f.nrows()
    }

    pub fn f(&self) -> &DMatrix<f64> {
        &self.f
    }

    pub fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    /// Verifies this model steps a state of dimension `n`.
    pub fn check_size(&self, n: usize) -> Result<(), KalmanError> {
        if self.n_state() == n {
            Ok(())
        } else {
            Err(KalmanError::DimensionMismatch {
                what: "transition does not match state dimension",
                expected: n,
                actual: self.n_state(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_square_matrices() {
        let model =
            KalmanFilterTransition::new(DMatrix::identity(2, 2), DMatrix::zeros(2, 2)).expect("valid model");

        assert_eq!(model.n_state(), 2);
        assert!(model.check_size(2).is_ok());
        assert!(model.check_size(3).is_err());
    }

    #[test]
    fn rejects_non_square_f() {
        assert!(KalmanFilterTransition::new(DMatrix::zeros(2, 3), DMatrix::zeros(2, 2)).is_err());
    }

    #[test]
    fn rejects_mismatched_q() {
        assert!(KalmanFilterTransition::new(DMatrix::identity(2, 2), DMatrix::zeros(3, 3)).is_err());
    }
}
