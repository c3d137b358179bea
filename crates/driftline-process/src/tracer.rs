//! Lazy one-way iteration over a realization.

use driftline_types::{Duration, Timestamp};

use crate::process::{ProcessEvent, StochasticProcess};

/// Develops a single sampled path of a stochastic process with a
/// monotonically increasing current time.
///
/// The tracer owns its process and a single `(t, x)` pair, the most
/// recent known sample. It caches no history; callers needing
/// bounded-interval sampling supply both endpoints to
/// [`RealizationTracer::interior_sample`] themselves.
pub struct RealizationTracer {
    current: ProcessEvent,
    process: Box<dyn StochasticProcess>,
}

impl RealizationTracer {
    pub fn new(process: Box<dyn StochasticProcess>) -> Self {
        let current = ProcessEvent::new(process.t0(), process.t0_value());
        Self { current, process }
    }

    pub fn current_ev(&self) -> ProcessEvent {
        self.current
    }

    pub fn current_tm(&self) -> Timestamp {
        self.current.tm
    }

    /// Value of this path at the current time.
    pub fn current_value(&self) -> f64 {
        self.current.value
    }

    /// Advances the realization to `t1`, drawing a new sample consistent
    /// with the process law. A target at or before the current time is a
    /// silent no-op.
    pub fn advance_until(&mut self, t1: Timestamp) {
        if t1 <= self.current.tm {
            return;
        }

        let x1 = self.process.exterior_sample(t1, self.current);
        self.current = ProcessEvent::new(t1, x1);
    }

    /// Advances the realization by `dt` from the current time.
    pub fn advance_dt(&mut self, dt: Duration) {
        let t1 = self.current.tm + dt;
        self.advance_until(t1);
    }

    /// Samples between two already-known samples of this realization,
    /// `lo.tm < t < hi.tm`, without moving the current time. `None` for
    /// processes that do not support bounded-interval sampling.
    pub fn interior_sample(&mut self, t: Timestamp, lo: ProcessEvent, hi: ProcessEvent) -> Option<f64> {
        self.process.interior_sample(t, lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use crate::brownian::BrownianMotion;

    use super::*;

    fn tracer() -> RealizationTracer {
        let t0 = Timestamp::from_ymd_midnight(20220610);
        RealizationTracer::new(Box::new(BrownianMotion::new(t0, 0.30, 12345678)))
    }

    #[test]
    fn starts_at_process_origin() {
        let tr = tracer();

        assert_eq!(tr.current_tm(), Timestamp::from_ymd_midnight(20220610));
        assert_eq!(tr.current_value(), 0.0);
    }

    #[test]
    fn advance_until_moves_time_forward() {
        let mut tr = tracer();
        let t1 = tr.current_tm() + Duration::from_secs(10);

        tr.advance_until(t1);
        assert_eq!(tr.current_tm(), t1);
    }

    #[test]
    fn backwards_advance_is_a_silent_noop() {
        let mut tr = tracer();
        tr.advance_dt(Duration::from_secs(10));

        let before = tr.current_ev();
        tr.advance_until(before.tm - Duration::from_secs(5));
        tr.advance_until(before.tm);

        assert_eq!(tr.current_ev(), before);
    }

    #[test]
    fn advance_dt_steps_relative_to_current() {
        let mut tr = tracer();
        let t0 = tr.current_tm();

        tr.advance_dt(Duration::from_secs(1));
        tr.advance_dt(Duration::from_secs(2));

        assert_eq!(tr.current_tm(), t0 + Duration::from_secs(3));
    }

    #[test]
    fn interior_sample_passes_through() {
        let mut tr = tracer();
        let lo = tr.current_ev();

        tr.advance_dt(Duration::from_secs(60));
        let hi = tr.current_ev();

        let mid = lo.tm + Duration::from_secs(30);
        assert!(tr.interior_sample(mid, lo, hi).is_some());
        // Interior sampling leaves the current time alone.
        assert_eq!(tr.current_ev(), hi);
    }
}
