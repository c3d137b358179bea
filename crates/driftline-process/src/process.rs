//! Abstraction for a scalar stochastic process.

use driftline_types::Timestamp;
use serde::{Deserialize, Serialize};

/// One known sample `(t, x)` of a realization. Also the payload type
/// published by [`crate::RealizationSource`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessEvent {
    pub tm: Timestamp,
    pub value: f64,
}

impl ProcessEvent {
    pub fn new(tm: Timestamp, value: f64) -> Self {
        Self { tm, value }
    }
}

/// A scalar stochastic process: a collection of paths together with a
/// probability measure on path space.
///
/// Sampling mutates the process's RNG, so both sampling methods take
/// `&mut self`; the law itself is immutable.
pub trait StochasticProcess {
    /// Starting time for this process.
    fn t0(&self) -> Timestamp;

    /// Starting value for this process.
    fn t0_value(&self) -> f64;

    /// Samples the process at time `t`, given the preceding known sample
    /// `lo` with `lo.tm < t`.
    fn exterior_sample(&mut self, t: Timestamp, lo: ProcessEvent) -> f64;

    /// Samples the process at time `t` between two known samples,
    /// `lo.tm < t < hi.tm`. Returns `None` for processes without
    /// bounded-interval sampling.
    fn interior_sample(&mut self, _t: Timestamp, _lo: ProcessEvent, _hi: ProcessEvent) -> Option<f64> {
        None
    }
}
