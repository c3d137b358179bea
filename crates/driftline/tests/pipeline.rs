//! Full pipeline: stochastic source → relay → Kalman filter service,
//! all driven by the simulator.

use std::rc::Rc;

use driftline::prelude::*;
use nalgebra::{DMatrix, DVector};

fn t0() -> Timestamp {
    Timestamp::from_ymd_midnight(20220707)
}

/// Random-walk tracking filter: F = I, small Q, direct observation with
/// tiny noise so the estimate hugs the observed path.
fn tracking_spec(x0: f64) -> KalmanFilterSpec {
    let s0 = KalmanFilterStateExt::initial(
        t0(),
        DVector::from_vec(vec![x0]),
        DMatrix::identity(1, 1),
    )
    .expect("valid initial state");

    KalmanFilterSpec::new(
        s0,
        Box::new(|prev, input| {
            let model = KalmanFilterTransition::new(
                DMatrix::identity(1, 1),
                DMatrix::from_vec(1, 1, vec![1e-2]),
            )
            .expect("square model");
            let obs = KalmanFilterObservable::new(
                DMatrix::identity(1, 1),
                DMatrix::from_vec(1, 1, vec![1e-6]),
            )
            .expect("conformant");

            KalmanFilterStep::new(prev.clone(), model, obs, Rc::clone(input))
        }),
    )
}

#[test]
fn filter_service_consumes_simulated_observations() {
    let sim = Simulator::new(t0());

    // Brownian samples every second.
    let source = RealizationSource::new(
        "bm",
        RealizationTracer::new(Box::new(BrownianMotion::new(t0(), 0.30, 12345678))),
        Duration::from_secs(1),
    );

    // Relay queue: converts process samples into filter inputs and
    // re-enters the simulator's schedule as a secondary source.
    let relay = SecondarySource::<KalmanInputEvent>::new("obs-relay");
    {
        let relay = relay.clone();
        source.attach_sink(FnSink::new_ref("obs-adapter", move |ev: &ProcessEvent| {
            let input =
                Rc::new(KalmanFilterInput::present(ev.tm, DVector::from_vec(vec![ev.value])));
            relay.push(ev.tm, input);
        }));
    }

    // The filter service consumes relayed inputs and publishes states.
    let svc = KalmanFilterSvc::new("kalman", tracking_spec(0.0));
    assert!(relay.attach_sink(svc.as_sink_ref()).is_valid());

    let states = VecSink::<KalmanStateEvent>::new_ref("states");
    assert!(svc.attach_sink(states.clone()).is_valid());

    sim.add_source(&source.as_source_ref());
    sim.add_source(&relay.as_source_ref());
    // The service registers as a source too; being unprimed it never
    // enters the schedule and publishes only in response to inputs.
    sim.add_source(&svc.as_source_ref());

    sim.run_until(t0() + Duration::from_secs(10));

    // 11 samples (t0..=t0+10s), each relayed once: 22 dispatches.
    assert_eq!(sim.n_event(), 22);

    let published = states.borrow().events().to_vec();
    assert_eq!(published.len(), 11);

    for (i, state) in published.iter().enumerate() {
        assert_eq!(state.step_no(), i as u32 + 1);
        assert_eq!(state.tm(), t0() + Duration::from_secs(i as i64));

        // R = 1e-6 against Q = 1e-2: the estimate hugs the observation.
        let observed = state.input().expect("provenance recorded").z()[0];
        assert!(
            (state.state_v()[0] - observed).abs() < 1e-2,
            "estimate should track the observed path"
        );
    }

    // The service is registered as a source but never primed; all its
    // publishing rode along on relay deliveries.
    let svc_src = svc.as_source_ref();
    assert!(!svc_src.borrow().is_primed());
    assert_eq!(svc_src.borrow().n_out_ev(), 11);
}

#[test]
fn filter_service_can_join_mid_simulation() {
    let sim = Simulator::new(t0());

    let source = RealizationSource::new(
        "bm",
        RealizationTracer::new(Box::new(BrownianMotion::new(t0(), 0.30, 42))),
        Duration::from_secs(1),
    );

    let relay = SecondarySource::<KalmanInputEvent>::new("obs-relay");
    {
        let relay = relay.clone();
        source.attach_sink(FnSink::new_ref("obs-adapter", move |ev: &ProcessEvent| {
            let input =
                Rc::new(KalmanFilterInput::present(ev.tm, DVector::from_vec(vec![ev.value])));
            relay.push(ev.tm, input);
        }));
    }

    sim.add_source(&source.as_source_ref());

    // Half the run without the relay registered: pushes queue up.
    sim.run_until(t0() + Duration::from_secs(4));
    assert_eq!(sim.n_event(), 5);
    assert_eq!(relay.n_queued(), 5);

    // Register the relay mid-flight; it is primed from its queue and
    // replays the backlog in order before the source's next sample.
    let svc = KalmanFilterSvc::new("kalman", tracking_spec(0.0));
    relay.attach_sink(svc.as_sink_ref());

    sim.add_source(&relay.as_source_ref());
    sim.run_until(t0() + Duration::from_secs(6));

    // Samples at 0..=6 (7 events) plus 7 relayed deliveries.
    assert_eq!(sim.n_event(), 14);
    assert_eq!(svc.step_no(), 7);
    assert_eq!(svc.state_ext().tm(), t0() + Duration::from_secs(6));
}
