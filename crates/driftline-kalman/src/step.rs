//! Complete inputs to one filter step.

use std::rc::Rc;

use driftline_types::Timestamp;

use crate::input::KalmanFilterInput;
use crate::observable::KalmanFilterObservable;
use crate::state::KalmanFilterState;
use crate::transition::KalmanFilterTransition;

/// Everything [`crate::engine::step`] needs for one step
/// `t(k) -> t(k+1)`: the previous state, the process model `(F, Q)`,
/// the observation model `(H, R)`, and the arriving input `z(k+1)`.
///
/// Built on demand by a [`crate::KalmanFilterSpec`]'s step builder, so
/// the matrices may depend on the previous state (elapsed time) and on
/// the input (which observations are present).
#[derive(Debug, Clone)]
pub struct KalmanFilterStep {
    prev: KalmanFilterState,
    model: KalmanFilterTransition,
    obs: KalmanFilterObservable,
    input: Rc<KalmanFilterInput>,
}

impl KalmanFilterStep {
    pub fn new(
        prev: KalmanFilterState,
        model: KalmanFilterTransition,
        obs: KalmanFilterObservable,
        input: Rc<KalmanFilterInput>,
    ) -> Self {
        Self { prev, model, obs, input }
    }

    pub fn prev(&self) -> &KalmanFilterState {
        &self.prev
    }

    pub fn model(&self) -> &KalmanFilterTransition {
        &self.model
    }

    pub fn obs(&self) -> &KalmanFilterObservable {
        &self.obs
    }

    pub fn input(&self) -> &Rc<KalmanFilterInput> {
        &self.input
    }

    /// Target time `t(k+1)` of this step.
    pub fn tm(&self) -> Timestamp {
        self.input.tm()
    }
}
