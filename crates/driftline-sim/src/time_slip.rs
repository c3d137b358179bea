//! Simulated-time / real-time cross-reference for throttled replay.

use driftline_types::Timestamp;

/// Pins simulation-time coordinates to realtime coordinates.
///
/// A throttled replay wants simulated time to evolve at a constant rate
/// relative to real elapsed time; a `TimeSlip` records one simultaneous
/// observation of both clocks so the target wall-clock time of any later
/// simulated instant can be computed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlip {
    sim_tm: Timestamp,
    real_tm: Timestamp,
}

impl TimeSlip {
    pub fn new(sim_tm: Timestamp, real_tm: Timestamp) -> Self {
        Self { sim_tm, real_tm }
    }

    pub fn sim_tm(&self) -> Timestamp {
        self.sim_tm
    }

    pub fn real_tm(&self) -> Timestamp {
        self.real_tm
    }
}
