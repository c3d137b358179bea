//! Passive filter: spec + most recent state.

use std::rc::Rc;

use driftline_types::Timestamp;

use crate::engine;
use crate::error::KalmanError;
use crate::input::KalmanFilterInput;
use crate::spec::KalmanFilterSpec;
use crate::state::KalmanFilterStateExt;

/// A linear Kalman filter holding its specification and the most recent
/// extended state. Stepping is observation-driven: each call to
/// [`KalmanFilter::notify_input`] advances the filter to the input's
/// timestamp.
#[derive(Debug)]
pub struct KalmanFilter {
    spec: KalmanFilterSpec,
    state_ext: Rc<KalmanFilterStateExt>,
}

impl KalmanFilter {
    pub fn new(spec: KalmanFilterSpec) -> Self {
        let state_ext = Rc::clone(spec.start_ext());
        Self { spec, state_ext }
    }

    pub fn step_no(&self) -> u32 {
        self.state_ext.step_no()
    }

    pub fn tm(&self) -> Timestamp {
        self.state_ext.tm()
    }

    /// The most recent extended state.
    pub fn state_ext(&self) -> &Rc<KalmanFilterStateExt> {
        &self.state_ext
    }

    /// Advances the filter with the input for `t(k+1)`.
    ///
    /// Requires `input.tm() >= self.tm()`. On success the filter's step
    /// number has incremented, its timestamp equals the input's, and the
    /// returned state reflects the observations present in the input.
    pub fn notify_input(
        &mut self,
        input: &Rc<KalmanFilterInput>,
    ) -> Result<&Rc<KalmanFilterStateExt>, KalmanError> {
        if input.tm() < self.tm() {
            return Err(KalmanError::NonMonotonicInput {
                input_tm: input.tm(),
                state_tm: self.tm(),
            });
        }

        let filter_step = self.spec.make_step(self.state_ext.state(), input);
        self.state_ext = engine::step(&filter_step)?;

        Ok(&self.state_ext)
    }
}
