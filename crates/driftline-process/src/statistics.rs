//! Online sample statistics.

/// Accumulates mean and second moment for a sample, one value at a time.
///
/// The mean update avoids a running sum (adding floats of distant
/// magnitudes); the second moment uses Welford's recurrence:
///
/// ```text
/// mean(S(n+1)) = mean(S(n)) + (x - mean(S(n))) / (n+1)
/// M2(n+1)      = M2(n) + (x - mean(S(n))) · (x - mean(S(n+1)))
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleStatistics {
    n_sample: u32,
    mean: f64,
    moment2: f64,
}

impl SampleStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean of a sample of size `n + 1`, given the mean of the first `n`
    /// values and one new value `x`.
    pub fn update_online_mean(x: f64, n: u32, mean: f64) -> f64 {
        mean + (x - mean) / f64::from(n + 1)
    }

    /// Welford second-moment update; `mean_n` and `mean_np1` are the
    /// means before and after including `x`.
    pub fn update_online_moment2(x: f64, mean_n: f64, mean_np1: f64, moment2: f64) -> f64 {
        moment2 + (x - mean_n) * (x - mean_np1)
    }

    pub fn include_sample(&mut self, x: f64) {
        let mean_np1 = Self::update_online_mean(x, self.n_sample, self.mean);
        let moment2_np1 = Self::update_online_moment2(x, self.mean, mean_np1, self.moment2);

        self.n_sample += 1;
        self.mean = mean_np1;
        self.moment2 = moment2_np1;
    }

    pub fn n_sample(&self) -> u32 {
        self.n_sample
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn moment2(&self) -> f64 {
        self.moment2
    }

    /// Biased variance estimate, `M2 / n`.
    ///
    /// Requires `n_sample >= 1`.
    pub fn variance(&self) -> f64 {
        self.moment2 / f64::from(self.n_sample)
    }

    /// Variance estimate with Bessel's correction, `M2 / (n - 1)`.
    ///
    /// Requires `n_sample >= 2`.
    pub fn sample_variance(&self) -> f64 {
        self.moment2 / f64::from(self.n_sample - 1)
    }
}
