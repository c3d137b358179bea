//! End-to-end filter scenarios through the public `KalmanFilter` API.

use std::rc::Rc;

use approx::assert_relative_eq;
use driftline::prelude::*;
use nalgebra::{DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::{Rng as _, SeedableRng};
use rand_distr::StandardNormal;

fn t0() -> Timestamp {
    Timestamp::from_ymd_midnight(20220707)
}

fn constant_matrix_spec(
    s0: Rc<KalmanFilterStateExt>,
    f: DMatrix<f64>,
    q: DMatrix<f64>,
    h: DMatrix<f64>,
    r: DMatrix<f64>,
) -> KalmanFilterSpec {
    KalmanFilterSpec::new(
        s0,
        Box::new(move |prev, input| {
            let model = KalmanFilterTransition::new(f.clone(), q.clone()).expect("square model");
            let obs = KalmanFilterObservable::new(h.clone(), r.clone()).expect("conformant");
            KalmanFilterStep::new(prev.clone(), model, obs, Rc::clone(input))
        }),
    )
}

/// Repeated direct observation of a constant: the filter converges to
/// the sample mean, with covariance and gain decaying as `1/n`.
#[test]
fn identity_filter_tracks_repeated_scalar_observations() {
    let seed = 14950319842636922572u64;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut draw = move || 10.0 + rng.sample::<f64, _>(StandardNormal);

    let mut z_stats = SampleStatistics::new();

    let x0 = draw();
    z_stats.include_sample(x0);

    let s0 = KalmanFilterStateExt::initial(
        t0(),
        DVector::from_vec(vec![x0]),
        DMatrix::identity(1, 1),
    )
    .expect("valid initial state");

    let spec = constant_matrix_spec(
        s0,
        DMatrix::identity(1, 1),
        DMatrix::zeros(1, 1),
        DMatrix::identity(1, 1),
        DMatrix::identity(1, 1),
    );
    let mut filter = KalmanFilter::new(spec);

    for i_step in 1..100u32 {
        let tkp1 = filter.tm() + Duration::from_secs(1);
        let z = draw();
        z_stats.include_sample(z);

        let input = Rc::new(KalmanFilterInput::present(tkp1, DVector::from_vec(vec![z])));
        let state = filter.notify_input(&input).expect("monotonic input");

        assert_eq!(state.step_no(), i_step);
        assert_eq!(state.tm(), tkp1);
        assert_eq!(state.n_state(), 1);
        assert_eq!(state.observable(), driftline::kalman::OBSERVABLE_BATCH);

        let n = f64::from(z_stats.n_sample());
        assert_relative_eq!(state.state_v()[0], z_stats.mean(), max_relative = 1e-6);
        assert_relative_eq!(state.state_cov()[(0, 0)], 1.0 / n, max_relative = 1e-6);
        assert_relative_eq!(state.gain()[(0, 0)], 1.0 / n, max_relative = 1e-6);
    }

    let final_state = filter.state_ext();
    assert_relative_eq!(final_state.state_v()[0], 10.0, max_relative = 5e-2);
    assert_relative_eq!(final_state.state_cov()[(0, 0)], 0.01, epsilon = 1e-6);
    assert_relative_eq!(final_state.gain()[(0, 0)], 0.01, epsilon = 1e-6);
}

/// Two simultaneous observations per step: convergence at twice the
/// rate, tracking the combined sample statistics.
#[test]
fn identity_filter_with_two_observations_per_step() {
    let seed = 14950319842636922572u64;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut draw = move || 10.0 + rng.sample::<f64, _>(StandardNormal);

    let mut z_stats = SampleStatistics::new();

    let x0 = draw();
    z_stats.include_sample(x0);

    let s0 = KalmanFilterStateExt::initial(
        t0(),
        DVector::from_vec(vec![x0]),
        DMatrix::identity(1, 1),
    )
    .expect("valid initial state");

    let spec = constant_matrix_spec(
        s0,
        DMatrix::identity(1, 1),
        DMatrix::zeros(1, 1),
        DMatrix::from_element(2, 1, 1.0),
        DMatrix::identity(2, 2),
    );
    let mut filter = KalmanFilter::new(spec);

    for _ in 1..51u32 {
        let tkp1 = filter.tm() + Duration::from_secs(1);
        let (z0, z1) = (draw(), draw());
        z_stats.include_sample(z0);
        z_stats.include_sample(z1);

        let input = Rc::new(KalmanFilterInput::present(tkp1, DVector::from_vec(vec![z0, z1])));
        let state = filter.notify_input(&input).expect("monotonic input");

        assert_eq!(state.gain().nrows(), 1);
        assert_eq!(state.gain().ncols(), 2);
        assert_relative_eq!(state.state_v()[0], z_stats.mean(), max_relative = 1e-6);
    }

    let final_state = filter.state_ext();
    assert_eq!(final_state.step_no(), 50);
    assert_relative_eq!(final_state.state_v()[0], z_stats.mean(), max_relative = 1e-6);
    assert_relative_eq!(
        final_state.state_cov()[(0, 0)],
        1.0 / f64::from(z_stats.n_sample()),
        max_relative = 1e-3
    );
}

/// Mean-reverting model with a constant second component: the structural
/// zeros in `P` and `K` survive every step exactly, and the constant
/// component never moves.
#[test]
#[allow(clippy::float_cmp)]
fn mean_reverting_filter_preserves_structural_zeros() {
    let seed = 14950139742636922572u64;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut draw = move || 1.0 + rng.sample::<f64, _>(StandardNormal);

    let x0 = draw();
    let s0 = KalmanFilterStateExt::initial(
        t0(),
        DVector::from_vec(vec![x0, 1.0]),
        DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]),
    )
    .expect("valid initial state");

    let spec = constant_matrix_spec(
        s0,
        DMatrix::from_row_slice(2, 2, &[0.95, 0.05, 0.0, 1.0]),
        DMatrix::from_row_slice(2, 2, &[1e-4, 0.0, 0.0, 0.0]),
        DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
        DMatrix::from_vec(1, 1, vec![0.25]),
    );
    let mut filter = KalmanFilter::new(spec);

    for i_step in 1..100u32 {
        let tkp1 = filter.tm() + Duration::from_secs(1);
        let input = Rc::new(KalmanFilterInput::present(tkp1, DVector::from_vec(vec![draw()])));

        let state = filter.notify_input(&input).expect("monotonic input");

        assert_eq!(state.step_no(), i_step);
        assert_eq!(state.n_state(), 2);

        assert_eq!(state.state_v()[1], 1.0);

        assert!(state.state_cov()[(0, 0)] >= 0.0);
        assert_eq!(state.state_cov()[(1, 0)], 0.0);
        assert_eq!(state.state_cov()[(0, 1)], 0.0);
        assert_eq!(state.state_cov()[(1, 1)], 0.0);

        assert!(state.gain()[(0, 0)] > 0.0);
        assert_eq!(state.gain()[(1, 0)], 0.0);
    }
}

/// An input whose observations are all absent degenerates to pure
/// extrapolation.
#[test]
#[allow(clippy::float_cmp)]
fn all_absent_input_extrapolates_only() {
    let s0 = KalmanFilterStateExt::initial(
        t0(),
        DVector::from_vec(vec![10.0]),
        DMatrix::identity(1, 1),
    )
    .expect("valid initial state");

    let spec = constant_matrix_spec(
        s0,
        DMatrix::identity(1, 1),
        DMatrix::zeros(1, 1),
        DMatrix::identity(1, 1),
        DMatrix::identity(1, 1),
    );
    let mut filter = KalmanFilter::new(spec);

    let input = Rc::new(
        KalmanFilterInput::with_presence(
            t0() + Duration::from_secs(1),
            vec![false],
            DVector::from_vec(vec![42.0]),
        )
        .expect("mask matches"),
    );

    let state = filter.notify_input(&input).expect("monotonic input");

    assert_eq!(state.step_no(), 1);
    assert_eq!(state.state_v()[0], 10.0);
    assert_eq!(state.state_cov()[(0, 0)], 1.0);
    assert_eq!(state.gain().ncols(), 0);
}
