//! # driftline-kalman: discrete linear Kalman filter
//!
//! The filter estimates the state of a process observed at a discrete
//! set of times `t_k`:
//!
//! ```text
//! x_(k+1) = F(k)·x_(k) + w(k)        w(k) ~ N(0, Q(k))    (system)
//! z(k)    = H(k)·x_(k) + v(k)        v(k) ~ N(0, R(k))    (observation)
//! ```
//!
//! Outputs per step are the state estimate `x(k)` and its covariance
//! `P(k)`. Observation times are not specified in advance: stepping is
//! observation-driven, so `t_k` comes from each arriving input and the
//! step matrices may depend on elapsed time (see [`KalmanFilterSpec`]).
//!
//! The crate splits into:
//! - an immutable data model ([`KalmanFilterState`],
//!   [`KalmanFilterStateExt`], [`KalmanFilterTransition`],
//!   [`KalmanFilterObservable`], [`KalmanFilterInput`],
//!   [`KalmanFilterStep`]);
//! - pure stepping algorithms in [`engine`] (extrapolate, gain, batched
//!   and scalar-sequential correction);
//! - a passive [`KalmanFilter`] holding the most recent state, and
//!   [`KalmanFilterSvc`] adapting it as a reactor sink + source.
//!
//! Covariance updates use the Joseph form and are symmetrized after
//! every step to defend against numerical drift. Numerical failure
//! (non-positive-definite innovation covariance) is not an error: the
//! affected step adopts the extrapolated state and flags the returned
//! extended state.

#![cfg_attr(test, allow(clippy::float_cmp))]

mod error;
pub mod engine;
mod filter;
mod input;
mod observable;
mod spec;
mod state;
mod step;
mod svc;
mod transition;

pub use error::KalmanError;
pub use filter::KalmanFilter;
pub use input::KalmanFilterInput;
pub use observable::KalmanFilterObservable;
pub use spec::{KalmanFilterSpec, MkStepFn};
pub use state::{KalmanFilterState, KalmanFilterStateExt, OBSERVABLE_BATCH};
pub use step::KalmanFilterStep;
pub use svc::{KalmanFilterSvc, KalmanInputEvent, KalmanStateEvent};
pub use transition::KalmanFilterTransition;
