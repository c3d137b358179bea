//! Exponentiated process, `P(t) = scale · exp(S(t))`.

use driftline_types::Timestamp;

use crate::brownian::BrownianMotion;
use crate::process::{ProcessEvent, StochasticProcess};

/// A process defined by exponentiating another process:
///
/// ```text
/// P(t) = scale · exp(S(t))
/// ```
///
/// In particular, when `S(t)` is brownian motion, `P(t)` is log-normal.
///
/// Known samples handed to the sampling methods are values of the
/// *exponentiated* process; they are mapped back to the exponent process
/// through `ln(value / scale)` before delegating.
pub struct ExpProcess {
    scale: f64,
    exponent: Box<dyn StochasticProcess>,
}

impl ExpProcess {
    /// Exponentiates `exponent`, scaling by `scale`.
    ///
    /// # Panics
    ///
    /// Panics when `scale` is not strictly positive; the inverse map is
    /// undefined otherwise.
    pub fn new(scale: f64, exponent: Box<dyn StochasticProcess>) -> Self {
        assert!(scale > 0.0, "ExpProcess scale must be strictly positive");
        Self { scale, exponent }
    }

    /// A log-normal process starting at `(t0, x0)` whose logs follow a
    /// brownian motion with the given annualized volatility and seed.
    pub fn log_normal(t0: Timestamp, x0: f64, volatility: f64, seed: u64) -> Self {
        Self::new(x0, Box::new(BrownianMotion::new(t0, volatility, seed)))
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn to_exponent(&self, ev: ProcessEvent) -> ProcessEvent {
        ProcessEvent::new(ev.tm, (ev.value / self.scale).ln())
    }
}

impl StochasticProcess for ExpProcess {
    fn t0(&self) -> Timestamp {
        self.exponent.t0()
    }

    fn t0_value(&self) -> f64 {
        self.scale * self.exponent.t0_value().exp()
    }

    fn exterior_sample(&mut self, t: Timestamp, lo: ProcessEvent) -> f64 {
        let lo_exp = self.to_exponent(lo);
        let e = self.exponent.exterior_sample(t, lo_exp);

        self.scale * e.exp()
    }

    fn interior_sample(&mut self, t: Timestamp, lo: ProcessEvent, hi: ProcessEvent) -> Option<f64> {
        let lo_exp = self.to_exponent(lo);
        let hi_exp = self.to_exponent(hi);

        self.exponent.interior_sample(t, lo_exp, hi_exp).map(|e| self.scale * e.exp())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use driftline_types::Duration;

    use super::*;

    fn t0() -> Timestamp {
        Timestamp::from_ymd_midnight(20220610)
    }

    #[test]
    fn log_normal_starts_at_x0() {
        let p = ExpProcess::log_normal(t0(), 2.5, 0.30, 12345678);

        assert_eq!(p.t0(), t0());
        assert_relative_eq!(p.t0_value(), 2.5, max_relative = 1e-12);
    }

    #[test]
    fn samples_are_strictly_positive() {
        let mut p = ExpProcess::log_normal(t0(), 1.0, 0.50, 65431123);
        let mut lo = ProcessEvent::new(t0(), p.t0_value());

        for i in 1..=200u64 {
            let t = t0() + Duration::from_secs(i as i64);
            let x = p.exterior_sample(t, lo);

            assert!(x > 0.0, "log-normal sample must stay positive, got {x}");
            lo = ProcessEvent::new(t, x);
        }
    }

    #[test]
    fn exponentiation_matches_underlying_path() {
        // Same seed: the exponent process draws the same deviates, so the
        // exp-process path must be the pointwise exponential of the
        // brownian path (scaled).
        let mut bm = BrownianMotion::new(t0(), 0.30, 99);
        let mut p = ExpProcess::log_normal(t0(), 3.0, 0.30, 99);

        let t = t0() + Duration::from_days(1);
        let bm_x = bm.exterior_sample(t, ProcessEvent::new(t0(), 0.0));
        let p_x = p.exterior_sample(t, ProcessEvent::new(t0(), 3.0));

        assert_relative_eq!(p_x, 3.0 * bm_x.exp(), max_relative = 1e-12);
    }

    #[test]
    fn interior_sample_delegates_to_exponent() {
        let mut p = ExpProcess::log_normal(t0(), 1.0, 0.30, 7);

        let lo = ProcessEvent::new(t0(), 1.0);
        let hi = ProcessEvent::new(t0() + Duration::from_days(2), 1.5);
        let mid = t0() + Duration::from_days(1);

        let x = p.interior_sample(mid, lo, hi).expect("brownian exponent supports interior sampling");
        assert!(x > 0.0);
    }

    #[test]
    #[should_panic(expected = "strictly positive")]
    fn zero_scale_is_rejected() {
        let _ = ExpProcess::log_normal(t0(), 0.0, 0.30, 1);
    }
}
