//! Filter error types.

use driftline_types::Timestamp;

/// Precondition violations surfaced by the filter.
///
/// These are fatal for the offending operation; state stays consistent
/// and the operation does not take effect. Numerical failure is *not* an
/// error; it is reported through the returned extended state (see
/// [`crate::KalmanFilterStateExt::numerics_failed`]).
#[derive(Debug, thiserror::Error)]
pub enum KalmanError {
    /// A matrix or vector has the wrong dimension for its role.
    #[error("{what}: expected dimension {expected}, got {actual}")]
    DimensionMismatch { what: &'static str, expected: usize, actual: usize },

    /// A scalar correction referenced an observation the input does not
    /// carry.
    #[error("observation {j} is not present in the input for step {step_no}")]
    ObservationAbsent { j: usize, step_no: u32 },

    /// An input's timestamp precedes the filter's current state time.
    #[error("input timestamp {input_tm} precedes filter state timestamp {state_tm}")]
    NonMonotonicInput { input_tm: Timestamp, state_tm: Timestamp },
}
