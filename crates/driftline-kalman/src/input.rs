//! Observation input for one filter step.

use driftline_types::Timestamp;
use nalgebra::DVector;

use crate::error::KalmanError;

/// A snapshot of the observations available at `t_(k+1)`: the
/// observation vector `z`, a presence mask selecting which of the
/// configured observations actually arrived, and optional
/// per-observation error standard deviations for builders whose `R`
/// depends on the input.
///
/// Inputs are immutable and shared (`Rc`); each extended filter state
/// keeps a reference to the input that produced it.
#[derive(Debug, Clone)]
pub struct KalmanFilterInput {
    tm: Timestamp,
    presence: Vec<bool>,
    z: DVector<f64>,
    z_err: Option<DVector<f64>>,
}

impl KalmanFilterInput {
    /// An input with every configured observation present.
    pub fn present(tm: Timestamp, z: DVector<f64>) -> Self {
        let presence = vec![true; z.len()];
        Self { tm, presence, z, z_err: None }
    }

    /// An input carrying only the observations flagged in `presence`.
    /// Entries of `z` at absent positions are ignored.
    pub fn with_presence(
        tm: Timestamp,
        presence: Vec<bool>,
        z: DVector<f64>,
    ) -> Result<Self, KalmanError> {
        if presence.len() != z.len() {
            return Err(KalmanError::DimensionMismatch {
                what: "presence mask must match observation vector",
                expected: z.len(),
                actual: presence.len(),
            });
        }

        Ok(Self { tm, presence, z, z_err: None })
    }

    /// Attaches per-observation error standard deviations.
    pub fn with_errors(mut self, z_err: DVector<f64>) -> Result<Self, KalmanError> {
        if z_err.len() != self.z.len() {
            return Err(KalmanError::DimensionMismatch {
                what: "error stdevs must match observation vector",
                expected: self.z.len(),
                actual: z_err.len(),
            });
        }

        self.z_err = Some(z_err);
        Ok(self)
    }

    /// Observation time `t_(k+1)`.
    pub fn tm(&self) -> Timestamp {
        self.tm
    }

    /// Configured observation count (present or not).
    pub fn n_obs(&self) -> usize {
        self.z.len()
    }

    /// Count of present observations, `m_k`.
    pub fn n_present(&self) -> usize {
        self.presence.iter().filter(|&&p| p).count()
    }

    pub fn is_all_present(&self) -> bool {
        self.presence.iter().all(|&p| p)
    }

    pub fn is_present(&self, j: usize) -> bool {
        self.presence.get(j).copied().unwrap_or(false)
    }

    pub fn presence(&self) -> &[bool] {
        &self.presence
    }

    pub fn z(&self) -> &DVector<f64> {
        &self.z
    }

    pub fn z_err(&self) -> Option<&DVector<f64>> {
        self.z_err.as_ref()
    }

    /// The observation vector restricted to present entries, in
    /// configured order.
    pub fn present_z(&self) -> DVector<f64> {
        let kept: Vec<f64> = self
            .presence
            .iter()
            .zip(self.z.iter())
            .filter_map(|(&p, &z)| p.then_some(z))
            .collect();

        DVector::from_vec(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tm() -> Timestamp {
        Timestamp::from_ymd_midnight(20220707)
    }

    #[test]
    fn present_marks_everything_present() {
        let input = KalmanFilterInput::present(tm(), DVector::from_vec(vec![1.0, 2.0]));

        assert_eq!(input.n_obs(), 2);
        assert_eq!(input.n_present(), 2);
        assert!(input.is_all_present());
        assert_eq!(input.present_z(), DVector::from_vec(vec![1.0, 2.0]));
    }

    #[test]
    fn partial_presence_filters_z() {
        let input = KalmanFilterInput::with_presence(
            tm(),
            vec![false, true, true],
            DVector::from_vec(vec![9.0, 2.0, 3.0]),
        )
        .expect("mask matches");

        assert_eq!(input.n_present(), 2);
        assert!(!input.is_all_present());
        assert!(!input.is_present(0));
        assert!(input.is_present(2));
        assert!(!input.is_present(7), "out-of-range index is simply absent");
        assert_eq!(input.present_z(), DVector::from_vec(vec![2.0, 3.0]));
    }

    #[test]
    fn mask_length_is_checked() {
        assert!(
            KalmanFilterInput::with_presence(tm(), vec![true], DVector::from_vec(vec![1.0, 2.0]))
                .is_err()
        );
    }

    #[test]
    fn error_stdevs_are_checked_and_kept() {
        let input = KalmanFilterInput::present(tm(), DVector::from_vec(vec![1.0]))
            .with_errors(DVector::from_vec(vec![0.5]))
            .expect("matching stdevs");

        assert_eq!(input.z_err().expect("stored")[0], 0.5);

        let bad = KalmanFilterInput::present(tm(), DVector::from_vec(vec![1.0]))
            .with_errors(DVector::from_vec(vec![0.5, 0.7]));
        assert!(bad.is_err());
    }
}
