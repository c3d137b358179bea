//! # driftline-types: Core time types for `Driftline`
//!
//! This crate contains the time model shared across the `Driftline` system:
//! - UTC instants with nanosecond resolution ([`Timestamp`])
//! - Signed nanosecond spans ([`Duration`])
//!
//! Simulation correctness rests on total ordering of timestamps, so both
//! types are plain `Copy` integers with total arithmetic. Overflow is not
//! expected at the domain scale (the `u64` nanosecond range covers ~584
//! years from the Unix epoch); arithmetic saturates rather than wraps so a
//! pathological input degrades to a clamped value instead of corrupting
//! event order.

use std::{
    fmt::{self, Display},
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Duration - signed nanosecond count
// ============================================================================

/// A signed span of time with nanosecond resolution.
///
/// Stored as `i64` nanoseconds, giving ~292 years of range in either
/// direction. Negative durations arise naturally from `Timestamp`
/// subtraction and from clock-skew arithmetic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Duration(i64);

const NANOS_PER_SEC: i64 = 1_000_000_000;
const SECS_PER_DAY: i64 = 86_400;

impl Duration {
    /// The zero-length duration.
    pub const ZERO: Duration = Duration(0);

    /// Creates a duration from a nanosecond count.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Creates a duration from microseconds.
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros * 1_000)
    }

    /// Creates a duration from milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Creates a duration from whole seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * NANOS_PER_SEC)
    }

    /// Creates a duration from whole minutes.
    pub const fn from_minutes(minutes: i64) -> Self {
        Self::from_secs(minutes * 60)
    }

    /// Creates a duration from whole hours.
    pub const fn from_hours(hours: i64) -> Self {
        Self::from_secs(hours * 3_600)
    }

    /// Creates a duration from whole days (a day is exactly 86 400 s).
    pub const fn from_days(days: i64) -> Self {
        Self::from_secs(days * SECS_PER_DAY)
    }

    /// Returns the duration as nanoseconds.
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Returns the duration as fractional seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// Returns the duration as fractional days (day = 86 400 s).
    pub fn as_days_f64(self) -> f64 {
        self.as_secs_f64() / SECS_PER_DAY as f64
    }

    /// True when the duration is strictly negative.
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute value.
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Scales the duration by a float factor, rounding to the nearest
    /// nanosecond and saturating at the type bounds.
    pub fn mul_f64(self, factor: f64) -> Self {
        Self(saturating_f64_to_i64(self.0 as f64 * factor))
    }

    /// Divides the duration by a float divisor, rounding to the nearest
    /// nanosecond and saturating at the type bounds.
    ///
    /// Division by zero saturates; callers wanting "as fast as possible"
    /// replay semantics coerce the divisor first (see the simulator's
    /// throttle logic).
    pub fn div_f64(self, divisor: f64) -> Self {
        Self(saturating_f64_to_i64(self.0 as f64 / divisor))
    }
}

fn saturating_f64_to_i64(x: f64) -> i64 {
    if x.is_nan() {
        0
    } else if x >= i64::MAX as f64 {
        i64::MAX
    } else if x <= i64::MIN as f64 {
        i64::MIN
    } else {
        x.round() as i64
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Duration) {
        *self = *self - rhs;
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        Duration(self.0.saturating_neg())
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}s", self.as_secs_f64())
    }
}

// ============================================================================
// Timestamp - UTC instant with nanosecond resolution
// ============================================================================

/// A UTC instant with nanosecond resolution.
///
/// Stored as nanoseconds since the Unix epoch (1970-01-01 00:00:00 UTC).
/// Timestamps order events across heterogeneous sources, so the type is a
/// bare `Copy` integer with a total order and total arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch (1970-01-01 00:00:00 UTC).
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from nanoseconds since the Unix epoch.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Returns the timestamp as nanoseconds since the Unix epoch.
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Creates a timestamp for the current wall-clock time.
    ///
    /// # Panics
    ///
    /// Panics if the system clock is before the Unix epoch (should never
    /// happen).
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before Unix epoch");
        Self(elapsed.as_nanos() as u64)
    }

    /// Midnight UTC on a `yyyymmdd`-encoded calendar date, e.g.
    /// `Timestamp::from_ymd_midnight(20220707)`.
    ///
    /// # Panics
    ///
    /// Panics on an invalid calendar date.
    pub fn from_ymd_midnight(ymd: u32) -> Self {
        Self::from_ymd_hms_usec(ymd, 0, 0)
    }

    /// A `yyyymmdd` date plus `hhmmss` time-of-day plus microseconds, e.g.
    /// `Timestamp::from_ymd_hms_usec(20220610, 162905, 123456)`.
    ///
    /// # Panics
    ///
    /// Panics on an invalid calendar date or time-of-day.
    pub fn from_ymd_hms_usec(ymd: u32, hms: u32, usec: u32) -> Self {
        let (year, month, day) = (ymd / 10_000, (ymd / 100) % 100, ymd % 100);
        let (hour, min, sec) = (hms / 10_000, (hms / 100) % 100, hms % 100);

        let nanos = NaiveDate::from_ymd_opt(year as i32, month, day)
            .and_then(|d| d.and_hms_micro_opt(hour, min, sec, usec))
            .map(|dt| dt.and_utc())
            .and_then(|dt| dt.timestamp_nanos_opt())
            .expect("valid yyyymmdd / hhmmss / usec");

        Self(nanos as u64)
    }

    /// Converts to a chrono UTC datetime, for diagnostics.
    pub fn to_datetime(self) -> DateTime<Utc> {
        let secs = (self.0 / NANOS_PER_SEC as u64) as i64;
        let nanos = (self.0 % NANOS_PER_SEC as u64) as u32;
        DateTime::from_timestamp(secs, nanos).unwrap_or_default()
    }

    /// Elapsed span from `earlier` to `self` (negative when `self` is
    /// earlier).
    pub fn since(self, earlier: Timestamp) -> Duration {
        self - earlier
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add_signed(rhs.0))
    }
}

impl AddAssign<Duration> for Timestamp {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add_signed(rhs.0.saturating_neg()))
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Duration {
        let dt = i128::from(self.0) - i128::from(rhs.0);
        Duration(dt.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / NANOS_PER_SEC as u64;
        let nanos = self.0 % NANOS_PER_SEC as u64;
        write!(f, "{secs}.{nanos:09}")
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl From<u64> for Timestamp {
    fn from(nanos: u64) -> Self {
        Self(nanos)
    }
}

impl From<Timestamp> for u64 {
    fn from(tm: Timestamp) -> Self {
        tm.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    #[test]
    fn epoch_is_zero() {
        assert_eq!(Timestamp::EPOCH.as_nanos(), 0);
        assert_eq!(Timestamp::from_ymd_midnight(19700101), Timestamp::EPOCH);
    }

    #[test]
    fn ymd_hms_usec_round_trips_through_chrono() {
        let tm = Timestamp::from_ymd_hms_usec(20220610, 162905, 123456);
        let dt = tm.to_datetime();

        assert_eq!(dt.format("%Y%m%d:%H:%M:%S%.6f").to_string(), "20220610:16:29:05.123456");
    }

    #[test]
    fn midnight_precedes_same_day_noon() {
        let midnight = Timestamp::from_ymd_midnight(20220707);
        let noon = Timestamp::from_ymd_hms_usec(20220707, 120000, 0);

        assert!(midnight < noon);
        assert_eq!(noon - midnight, Duration::from_hours(12));
    }

    #[test_case(Duration::from_secs(1), 1_000_000_000; "one second")]
    #[test_case(Duration::from_millis(1), 1_000_000; "one millisecond")]
    #[test_case(Duration::from_micros(1), 1_000; "one microsecond")]
    #[test_case(Duration::from_minutes(1), 60_000_000_000; "one minute")]
    #[test_case(Duration::from_hours(1), 3_600_000_000_000; "one hour")]
    #[test_case(Duration::from_days(1), 86_400_000_000_000; "one day")]
    fn duration_constructors(d: Duration, nanos: i64) {
        assert_eq!(d.as_nanos(), nanos);
    }

    #[test]
    fn duration_float_views() {
        assert!((Duration::from_days(1).as_secs_f64() - 86_400.0).abs() < 1e-9);
        assert!((Duration::from_hours(12).as_days_f64() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn duration_scaling() {
        let d = Duration::from_secs(10);
        assert_eq!(d.div_f64(2.0), Duration::from_secs(5));
        assert_eq!(d.mul_f64(0.5), Duration::from_secs(5));
        // Division by a tiny positive factor saturates instead of wrapping.
        assert_eq!(Duration::from_secs(1_000_000).div_f64(1e-300).as_nanos(), i64::MAX);
    }

    #[test]
    fn negative_durations() {
        let a = Timestamp::from_nanos(1_000);
        let b = Timestamp::from_nanos(3_000);

        let dt = a - b;
        assert!(dt.is_negative());
        assert_eq!(dt.abs(), Duration::from_nanos(2_000));
        assert_eq!(-dt, Duration::from_nanos(2_000));
    }

    #[test]
    fn timestamp_display_is_secs_dot_nanos() {
        let tm = Timestamp::from_nanos(5 * 1_000_000_000 + 42);
        assert_eq!(tm.to_string(), "5.000000042");
    }

    #[test]
    fn now_is_after_2020() {
        assert!(Timestamp::now() > Timestamp::from_ymd_midnight(20200101));
    }

    #[test]
    fn serde_round_trip() {
        let tm = Timestamp::from_ymd_hms_usec(20220707, 93000, 250_000);
        let json = serde_json::to_string(&tm).expect("serialize");
        let back: Timestamp = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, tm);
    }

    proptest! {
        #[test]
        fn add_then_sub_round_trips(nanos in 0u64..(1u64 << 62), dt in 0i64..(1i64 << 40)) {
            let tm = Timestamp::from_nanos(nanos);
            let d = Duration::from_nanos(dt);

            prop_assert_eq!((tm + d) - d, tm);
            prop_assert_eq!((tm + d) - tm, d);
        }

        #[test]
        fn ordering_matches_nanos(a in any::<u64>(), b in any::<u64>()) {
            let (ta, tb) = (Timestamp::from_nanos(a), Timestamp::from_nanos(b));
            prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
        }
    }
}
