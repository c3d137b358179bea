//! Filter state snapshots.

use std::rc::Rc;

use driftline_types::Timestamp;
use nalgebra::{DMatrix, DVector};

use crate::error::KalmanError;
use crate::input::KalmanFilterInput;
use crate::transition::KalmanFilterTransition;

/// Observable-index sentinel recorded when a step applied a batched
/// correction (or none), rather than a single scalar observation.
pub const OBSERVABLE_BATCH: i32 = -1;

// ============================================================================
// KalmanFilterState
// ============================================================================

/// Core filter state at step `k`: the estimate `x(k)` and its error
/// covariance `P(k)`.
///
/// States are immutable snapshots: one is created per step and never
/// mutated. `P` is maintained symmetric positive-semidefinite by the
/// engine (symmetrized after every extrapolation and correction).
#[derive(Debug, Clone)]
pub struct KalmanFilterState {
    step_no: u32,
    tm: Timestamp,
    x: DVector<f64>,
    p: DMatrix<f64>,
}

impl KalmanFilterState {
    pub fn new(
        step_no: u32,
        tm: Timestamp,
        x: DVector<f64>,
        p: DMatrix<f64>,
    ) -> Result<Self, KalmanError> {
        if p.nrows() != p.ncols() {
            return Err(KalmanError::DimensionMismatch {
                what: "covariance P must be square",
                expected: p.nrows(),
                actual: p.ncols(),
            });
        }
        if p.nrows() != x.len() {
            return Err(KalmanError::DimensionMismatch {
                what: "covariance P must match state vector",
                expected: x.len(),
                actual: p.nrows(),
            });
        }

        Ok(Self { step_no, tm, x, p })
    }

    pub fn step_no(&self) -> u32 {
        self.step_no
    }

    pub fn tm(&self) -> Timestamp {
        self.tm
    }

    /// State dimension `n`.
    pub fn n_state(&self) -> usize {
        self.x.len()
    }

    /// State estimate `x(k)`.
    pub fn state_v(&self) -> &DVector<f64> {
        &self.x
    }

    /// Error covariance `P(k)`.
    pub fn state_cov(&self) -> &DMatrix<f64> {
        &self.p
    }
}

// ============================================================================
// KalmanFilterStateExt
// ============================================================================

/// Extended state: the core snapshot plus step provenance, namely the
/// transition used, the gain `K(k)`, which observation was applied, and
/// the input that produced this state.
#[derive(Debug, Clone)]
pub struct KalmanFilterStateExt {
    state: KalmanFilterState,
    transition: KalmanFilterTransition,
    gain: DMatrix<f64>,
    /// [`OBSERVABLE_BATCH`] for a batched (or skipped) correction;
    /// `j >= 0` when exactly one scalar observation `j` was applied.
    observable: i32,
    input: Option<Rc<KalmanFilterInput>>,
    numerics_failed: bool,
}

impl KalmanFilterStateExt {
    pub fn new(
        state: KalmanFilterState,
        transition: KalmanFilterTransition,
        gain: DMatrix<f64>,
        observable: i32,
        input: Option<Rc<KalmanFilterInput>>,
    ) -> Self {
        Self { state, transition, gain, observable, input, numerics_failed: false }
    }

    /// A step that failed numerically: the extrapolated state is adopted
    /// unchanged and the failure is flagged.
    pub(crate) fn failed(
        state: KalmanFilterState,
        transition: KalmanFilterTransition,
        input: Option<Rc<KalmanFilterInput>>,
    ) -> Self {
        let n = state.n_state();
        Self {
            state,
            transition,
            gain: DMatrix::zeros(n, 0),
            observable: OBSERVABLE_BATCH,
            input,
            numerics_failed: true,
        }
    }

    /// A starting state for a filter of dimension `n = x.len()`: step 0,
    /// no gain, no input. `F`, `Q`, `K`, and the observable index are
    /// unused for the initial state.
    pub fn initial(tm: Timestamp, x: DVector<f64>, p: DMatrix<f64>) -> Result<Rc<Self>, KalmanError> {
        let n = x.len();
        let state = KalmanFilterState::new(0, tm, x, p)?;
        let transition = KalmanFilterTransition::new(DMatrix::zeros(n, n), DMatrix::zeros(n, n))?;

        Ok(Rc::new(Self::new(state, transition, DMatrix::zeros(n, 0), OBSERVABLE_BATCH, None)))
    }

    pub fn state(&self) -> &KalmanFilterState {
        &self.state
    }

    pub fn step_no(&self) -> u32 {
        self.state.step_no()
    }

    pub fn tm(&self) -> Timestamp {
        self.state.tm()
    }

    pub fn n_state(&self) -> usize {
        self.state.n_state()
    }

    pub fn state_v(&self) -> &DVector<f64> {
        self.state.state_v()
    }

    pub fn state_cov(&self) -> &DMatrix<f64> {
        self.state.state_cov()
    }

    /// The transition `(F, Q)` that produced this state from its
    /// predecessor.
    pub fn transition(&self) -> &KalmanFilterTransition {
        &self.transition
    }

    /// Kalman gain `K(k)` (`n × m_k`; zero-width when no observation was
    /// applied).
    pub fn gain(&self) -> &DMatrix<f64> {
        &self.gain
    }

    /// Which observation this step applied: `j >= 0` for a single scalar
    /// observation, [`OBSERVABLE_BATCH`] otherwise.
    pub fn observable(&self) -> i32 {
        self.observable
    }

    /// The input that produced this state.
    pub fn input(&self) -> Option<&Rc<KalmanFilterInput>> {
        self.input.as_ref()
    }

    /// True when this step's correction failed numerically and the
    /// extrapolated state was adopted unchanged.
    pub fn numerics_failed(&self) -> bool {
        self.numerics_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tm() -> Timestamp {
        Timestamp::from_ymd_midnight(20220707)
    }

    #[test]
    fn state_checks_covariance_shape() {
        let x = DVector::from_vec(vec![1.0, 2.0]);

        assert!(KalmanFilterState::new(0, tm(), x.clone(), DMatrix::identity(2, 2)).is_ok());
        assert!(KalmanFilterState::new(0, tm(), x.clone(), DMatrix::identity(3, 3)).is_err());
        assert!(KalmanFilterState::new(0, tm(), x, DMatrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn initial_state_is_step_zero_without_provenance() {
        let s0 = KalmanFilterStateExt::initial(
            tm(),
            DVector::from_vec(vec![10.0]),
            DMatrix::identity(1, 1),
        )
        .expect("valid initial state");

        assert_eq!(s0.step_no(), 0);
        assert_eq!(s0.tm(), tm());
        assert_eq!(s0.n_state(), 1);
        assert_eq!(s0.observable(), OBSERVABLE_BATCH);
        assert_eq!(s0.gain().ncols(), 0);
        assert!(s0.input().is_none());
        assert!(!s0.numerics_failed());
    }
}
