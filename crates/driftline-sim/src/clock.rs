//! Wall-clock adapter for throttled replay.
//!
//! The simulator never reads the system clock directly: throttled replay
//! goes through the `WallClock` trait so tests substitute a
//! deterministic fake and assert on the sleeps the throttle requested.

use driftline_types::{Duration, Timestamp};

/// A monotonic UTC clock plus the ability to block until a deadline.
pub trait WallClock {
    /// Current wall-clock time.
    fn now(&mut self) -> Timestamp;

    /// Blocks for `dt`. Non-positive spans return immediately.
    fn sleep(&mut self, dt: Duration);
}

// ============================================================================
// Production implementation
// ============================================================================

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&mut self) -> Timestamp {
        Timestamp::now()
    }

    fn sleep(&mut self, dt: Duration) {
        if dt > Duration::ZERO {
            std::thread::sleep(std::time::Duration::from_nanos(dt.as_nanos() as u64));
        }
    }
}

// ============================================================================
// Test implementation
// ============================================================================

/// Deterministic clock for tests: `sleep` advances the clock instantly
/// and records the requested span.
#[derive(Debug, Clone)]
pub struct FakeClock {
    now: Timestamp,
    sleeps: Vec<Duration>,
}

impl FakeClock {
    pub fn new(start: Timestamp) -> Self {
        Self { now: start, sleeps: Vec::new() }
    }

    /// Every span passed to `sleep`, in call order.
    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }

    /// Moves the clock forward without recording a sleep.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now + dt;
    }
}

impl WallClock for FakeClock {
    fn now(&mut self) -> Timestamp {
        self.now
    }

    fn sleep(&mut self, dt: Duration) {
        if dt > Duration::ZERO {
            self.sleeps.push(dt);
            self.now = self.now + dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_on_sleep() {
        let t0 = Timestamp::from_nanos(1_000);
        let mut clock = FakeClock::new(t0);

        clock.sleep(Duration::from_millis(5));
        assert_eq!(clock.now(), t0 + Duration::from_millis(5));
        assert_eq!(clock.sleeps(), [Duration::from_millis(5)]);
    }

    #[test]
    fn fake_clock_ignores_non_positive_sleeps() {
        let mut clock = FakeClock::new(Timestamp::EPOCH);

        clock.sleep(Duration::ZERO);
        clock.sleep(Duration::from_nanos(-5));

        assert!(clock.sleeps().is_empty());
        assert_eq!(clock.now(), Timestamp::EPOCH);
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let mut clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
