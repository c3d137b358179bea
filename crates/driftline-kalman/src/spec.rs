//! Full filter specification: initial state plus step builder.

use std::rc::Rc;

use crate::input::KalmanFilterInput;
use crate::state::{KalmanFilterState, KalmanFilterStateExt};
use crate::step::KalmanFilterStep;

/// Builds the step parameters (the matrices `F`, `Q`, `H`, `R`) for one
/// step `t(k) -> t(k+1)`.
///
/// The builder receives the previous state and the new input:
/// - stepping is observation-driven, so transition matrices are usually
///   a function of the elapsed time `input.tm() - prev.tm()`;
/// - the input's presence mask lets a builder choose observation models
///   (or error levels, via [`KalmanFilterInput::z_err`]) per step.
///
/// A textbook constant-matrix filter ignores both arguments:
///
/// ```ignore
/// let mk_step: MkStepFn = Box::new(move |prev, input| {
///     let model = KalmanFilterTransition::new(f.clone(), q.clone()).expect("square");
///     let obs = KalmanFilterObservable::new(h.clone(), r.clone()).expect("conformant");
///     KalmanFilterStep::new(prev.clone(), model, obs, Rc::clone(input))
/// });
/// ```
pub type MkStepFn = Box<dyn FnMut(&KalmanFilterState, &Rc<KalmanFilterInput>) -> KalmanFilterStep>;

/// Specification for a linear Kalman filter: a starting extended state
/// and the step builder producing per-step matrices on demand.
pub struct KalmanFilterSpec {
    start_ext: Rc<KalmanFilterStateExt>,
    mk_step_fn: MkStepFn,
}

impl KalmanFilterSpec {
    pub fn new(start_ext: Rc<KalmanFilterStateExt>, mk_step_fn: MkStepFn) -> Self {
        Self { start_ext, mk_step_fn }
    }

    pub fn start_ext(&self) -> &Rc<KalmanFilterStateExt> {
        &self.start_ext
    }

    /// Step parameters for `t(k) -> t(k+1)`, given the `t(k)` state and
    /// the `t(k+1)` input.
    pub fn make_step(
        &mut self,
        sk: &KalmanFilterState,
        zkp1: &Rc<KalmanFilterInput>,
    ) -> KalmanFilterStep {
        (self.mk_step_fn)(sk, zkp1)
    }
}

impl std::fmt::Debug for KalmanFilterSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KalmanFilterSpec").field("start_ext", &self.start_ext).finish_non_exhaustive()
    }
}
