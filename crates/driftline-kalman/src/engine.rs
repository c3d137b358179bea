//! Pure stepping algorithms: extrapolate, gain, correct.
//!
//! Every function here is a pure transformation over immutable state
//! snapshots. Covariance updates use the Joseph form
//! `(I − KH)·P·(I − KH)ᵀ + K·R·Kᵀ`, which stays positive-semidefinite
//! under roundoff where the textbook `(I − KH)·P` can drift; results are
//! additionally symmetrized.
//!
//! Numerical failure (an innovation covariance that is not positive
//! definite) is reported through the returned extended state rather
//! than as an error: the extrapolated state is adopted unchanged and
//! [`KalmanFilterStateExt::numerics_failed`] is set.

use std::rc::Rc;

use driftline_types::Timestamp;
use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector, RowDVector};

use crate::error::KalmanError;
use crate::observable::KalmanFilterObservable;
use crate::state::{KalmanFilterState, KalmanFilterStateExt, OBSERVABLE_BATCH};
use crate::step::KalmanFilterStep;
use crate::transition::KalmanFilterTransition;

/// `(P + Pᵀ) / 2`, the defense against symmetry drift.
fn symmetrize(p: &DMatrix<f64>) -> DMatrix<f64> {
    0.5 * (p + p.transpose())
}

// ============================================================================
// Extrapolation
// ============================================================================

/// Propagates `(x, P)` forward to `tkp1` using the transition `(F, Q)`,
/// without consulting an observation:
///
/// ```text
/// x_(k+1|k) = F·x_k
/// P_(k+1|k) = F·P_k·Fᵀ + Q
/// ```
///
/// The result carries `step_no + 1`; a subsequent correction refines it
/// in place of the same step.
pub fn extrapolate(
    tkp1: Timestamp,
    state: &KalmanFilterState,
    model: &KalmanFilterTransition,
) -> Result<KalmanFilterState, KalmanError> {
    model.check_size(state.n_state())?;

    let x1 = model.f() * state.state_v();
    let p1 = symmetrize(&(model.f() * state.state_cov() * model.f().transpose() + model.q()));

    KalmanFilterState::new(state.step_no() + 1, tkp1, x1, p1)
}

// ============================================================================
// Gain
// ============================================================================

/// Batched Kalman gain `K = P·Hᵀ·S⁻¹` with `S = H·P·Hᵀ + R`, inverted
/// by Cholesky factorization of `S`. `None` when `S` is not positive
/// definite.
pub fn kalman_gain(p: &DMatrix<f64>, obs: &KalmanFilterObservable) -> Option<DMatrix<f64>> {
    let s = obs.h() * p * obs.h().transpose() + obs.r();

    let s_inv = Cholesky::new(s)?.inverse();

    Some(p * obs.h().transpose() * s_inv)
}

/// Scalar gain for a single observation row `h` with variance `r`:
/// `k = P·hᵀ / s` with `s = h·P·hᵀ + r`. `None` when `s` is not
/// strictly positive.
pub fn kalman_gain1(p: &DMatrix<f64>, h: &RowDVector<f64>, r: f64) -> Option<DVector<f64>> {
    let s = (h * p * h.transpose())[(0, 0)] + r;

    if !(s.is_finite() && s > 0.0) {
        return None;
    }

    Some(p * h.transpose() / s)
}

// ============================================================================
// Correction
// ============================================================================

/// Batched correction of an extrapolated state with observation vector
/// `z` under the (already presence-restricted) observation model.
///
/// Returns the corrected state and gain, or `None` on numerical failure.
pub fn correct(
    extrapolated: &KalmanFilterState,
    obs: &KalmanFilterObservable,
    z: &DVector<f64>,
) -> Result<Option<(KalmanFilterState, DMatrix<f64>)>, KalmanError> {
    let n = extrapolated.n_state();

    if obs.n_state() != n {
        return Err(KalmanError::DimensionMismatch {
            what: "observable does not match state dimension",
            expected: n,
            actual: obs.n_state(),
        });
    }
    if z.len() != obs.n_observable() {
        return Err(KalmanError::DimensionMismatch {
            what: "observation vector does not match observable",
            expected: obs.n_observable(),
            actual: z.len(),
        });
    }

    let p = extrapolated.state_cov();
    let Some(k) = kalman_gain(p, obs) else {
        return Ok(None);
    };

    let innovation = z - obs.h() * extrapolated.state_v();
    let x1 = extrapolated.state_v() + &k * innovation;

    // Joseph form.
    let i_kh = DMatrix::identity(n, n) - &k * obs.h();
    let p1 = symmetrize(&(&i_kh * p * i_kh.transpose() + &k * obs.r() * k.transpose()));

    let state = KalmanFilterState::new(extrapolated.step_no(), extrapolated.tm(), x1, p1)?;
    Ok(Some((state, k)))
}

/// Scalar correction applying only observation `j` of the configured
/// observation model; the one-at-a-time variant that avoids the
/// `m_k × m_k` solve when observation errors are independent.
///
/// Returns the corrected state and gain column, or `None` on numerical
/// failure.
pub fn correct1(
    extrapolated: &KalmanFilterState,
    obs: &KalmanFilterObservable,
    z_j: f64,
    j: usize,
) -> Result<Option<(KalmanFilterState, DVector<f64>)>, KalmanError> {
    let n = extrapolated.n_state();

    if obs.n_state() != n {
        return Err(KalmanError::DimensionMismatch {
            what: "observable does not match state dimension",
            expected: n,
            actual: obs.n_state(),
        });
    }
    if j >= obs.n_observable() {
        return Err(KalmanError::DimensionMismatch {
            what: "observation index out of range",
            expected: obs.n_observable(),
            actual: j,
        });
    }

    let p = extrapolated.state_cov();
    let h: RowDVector<f64> = obs.h().row(j).into_owned();
    let r = obs.r()[(j, j)];

    let Some(k) = kalman_gain1(p, &h, r) else {
        return Ok(None);
    };

    let innovation = z_j - (&h * extrapolated.state_v())[(0, 0)];
    let x1 = extrapolated.state_v() + &k * innovation;

    // Joseph form, rank-1.
    let i_kh = DMatrix::identity(n, n) - &k * &h;
    let p1 = symmetrize(&(&i_kh * p * i_kh.transpose() + (&k * k.transpose()) * r));

    let state = KalmanFilterState::new(extrapolated.step_no(), extrapolated.tm(), x1, p1)?;
    Ok(Some((state, k)))
}

// ============================================================================
// Step orchestration
// ============================================================================

/// One complete filter step with batched correction: extrapolate to the
/// input's time, restrict the observation system to the present
/// observations, correct, and package the result.
///
/// A step with zero present observations degenerates to pure
/// extrapolation. The recorded observable index is
/// [`OBSERVABLE_BATCH`].
pub fn step(step: &KalmanFilterStep) -> Result<Rc<KalmanFilterStateExt>, KalmanError> {
    let input = step.input();

    let extrapolated = extrapolate(input.tm(), step.prev(), step.model())?;

    if input.n_present() == 0 {
        let n = extrapolated.n_state();
        return Ok(Rc::new(KalmanFilterStateExt::new(
            extrapolated,
            step.model().clone(),
            DMatrix::zeros(n, 0),
            OBSERVABLE_BATCH,
            Some(Rc::clone(input)),
        )));
    }

    let (obs, z) = if input.is_all_present() {
        (step.obs().clone(), input.z().clone())
    } else {
        (step.obs().restrict(input.presence())?, input.present_z())
    };

    match correct(&extrapolated, &obs, &z)? {
        Some((state, gain)) => Ok(Rc::new(KalmanFilterStateExt::new(
            state,
            step.model().clone(),
            gain,
            OBSERVABLE_BATCH,
            Some(Rc::clone(input)),
        ))),
        None => {
            tracing::warn!(
                step_no = extrapolated.step_no(),
                "innovation covariance not positive definite, adopting extrapolation"
            );
            Ok(Rc::new(KalmanFilterStateExt::failed(
                extrapolated,
                step.model().clone(),
                Some(Rc::clone(input)),
            )))
        }
    }
}

/// One complete filter step applying exactly one scalar observation `j`.
/// The recorded observable index is `j`.
pub fn step1(step: &KalmanFilterStep, j: usize) -> Result<Rc<KalmanFilterStateExt>, KalmanError> {
    let input = step.input();

    let extrapolated = extrapolate(input.tm(), step.prev(), step.model())?;

    if !input.is_present(j) {
        return Err(KalmanError::ObservationAbsent { j, step_no: extrapolated.step_no() });
    }

    match correct1(&extrapolated, step.obs(), input.z()[j], j)? {
        Some((state, k)) => {
            let n = state.n_state();
            let gain = DMatrix::from_column_slice(n, 1, k.as_slice());

            Ok(Rc::new(KalmanFilterStateExt::new(
                state,
                step.model().clone(),
                gain,
                j as i32,
                Some(Rc::clone(input)),
            )))
        }
        None => {
            tracing::warn!(
                step_no = extrapolated.step_no(),
                j,
                "scalar innovation variance not positive, adopting extrapolation"
            );
            Ok(Rc::new(KalmanFilterStateExt::failed(
                extrapolated,
                step.model().clone(),
                Some(Rc::clone(input)),
            )))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
