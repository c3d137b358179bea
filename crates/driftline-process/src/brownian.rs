//! Brownian motion with constant annualized volatility.

use driftline_types::{Duration, Timestamp};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::process::{ProcessEvent, StochasticProcess};

/// One year, in days, for annualized-volatility scaling.
const DAYS_PER_YEAR: f64 = 365.25;

/// Brownian motion starting at value zero at `t0`.
///
/// For a process with annualized volatility `s`, the variance accumulated
/// over a horizon `dt` is `s²·dt` (so volatility has units `1/sqrt(t)`,
/// with a year of 365.25 days).
pub struct BrownianMotion {
    t0: Timestamp,
    /// Annualized volatility.
    volatility: f64,
    /// Daily variance for this brownian motion.
    vol2_day: f64,
    rng: SmallRng,
}

impl BrownianMotion {
    /// A brownian motion with the given start time, annualized
    /// volatility, and RNG seed.
    pub fn new(t0: Timestamp, volatility: f64, seed: u64) -> Self {
        Self {
            t0,
            volatility,
            vol2_day: (volatility * volatility) / DAYS_PER_YEAR,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Variance accumulated over the interval `dt`.
    pub fn variance_dt(&self, dt: Duration) -> f64 {
        self.vol2_day * dt.as_days_f64()
    }

    fn sample_n01(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

impl StochasticProcess for BrownianMotion {
    fn t0(&self) -> Timestamp {
        self.t0
    }

    fn t0_value(&self) -> f64 {
        0.0
    }

    fn exterior_sample(&mut self, t: Timestamp, lo: ProcessEvent) -> f64 {
        let dt = t - lo.tm;
        debug_assert!(!dt.is_negative(), "exterior sample must look forward from lo");

        let dx = self.variance_dt(dt).max(0.0).sqrt() * self.sample_n01();
        lo.value + dx
    }

    fn interior_sample(&mut self, t: Timestamp, lo: ProcessEvent, hi: ProcessEvent) -> Option<f64> {
        // Brownian bridge: condition the increment on the known endpoint
        // hi. The bridge mean interpolates linearly; the bridge variance
        // at t is var1·var2/(var1+var2) where var1, var2 are the free
        // increment variances on [lo,t] and [t,hi].
        debug_assert!(lo.tm < t && t < hi.tm, "interior sample requires lo.tm < t < hi.tm");

        let t_frac = (t - lo.tm).as_secs_f64() / (hi.tm - lo.tm).as_secs_f64();
        let mean_dx = (hi.value - lo.value) * t_frac;

        let var1 = self.variance_dt(t - lo.tm);
        let var2 = self.variance_dt(hi.tm - t);
        let var_bridge = var1 * var2 / (var1 + var2);

        let dx = var_bridge.max(0.0).sqrt() * self.sample_n01();

        Some(lo.value + mean_dx + dx)
    }
}
