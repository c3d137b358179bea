//! # Driftline
//!
//! A discrete-event, reactor-style simulation engine coupled with a
//! linear Kalman filter that participates as one of its event
//! processors.
//!
//! The workspace decomposes bottom-up:
//!
//! - [`types`]: UTC timestamps and durations with nanosecond precision;
//! - [`reactor`]: the source/sink contract, subscription tables, and
//!   the abstract dispatcher;
//! - [`process`]: stochastic processes (brownian, log-normal) exposed
//!   lazily as realizations and adapted as event sources;
//! - [`sim`]: the simulator, with min-heap time-ordered dispatch over a
//!   dynamic source population, reentrancy-safe membership, and
//!   throttled wall-clock replay;
//! - [`kalman`]: the discrete linear Kalman filter (batched and
//!   scalar-sequential corrections) and its reactor service.
//!
//! ## Example
//!
//! ```
//! use driftline::prelude::*;
//!
//! let t0 = Timestamp::from_ymd_midnight(20220610);
//! let sim = Simulator::new(t0);
//!
//! let tracer = RealizationTracer::new(Box::new(BrownianMotion::new(t0, 0.30, 12345678)));
//! let source = RealizationSource::new("bm", tracer, Duration::from_secs(1));
//!
//! let samples = VecSink::<ProcessEvent>::new_ref("samples");
//! source.attach_sink(samples.clone());
//!
//! sim.add_source(&source.as_source_ref());
//! sim.run_until(t0 + Duration::from_secs(60));
//!
//! assert_eq!(samples.borrow().events().len(), 61);
//! ```

pub use driftline_kalman as kalman;
pub use driftline_process as process;
pub use driftline_reactor as reactor;
pub use driftline_sim as sim;
pub use driftline_types as types;

/// The types most callers want in scope.
pub mod prelude {
    pub use driftline_kalman::{
        KalmanFilter, KalmanFilterInput, KalmanFilterObservable, KalmanFilterSpec,
        KalmanFilterState, KalmanFilterStateExt, KalmanFilterStep, KalmanFilterSvc,
        KalmanFilterTransition, KalmanInputEvent, KalmanStateEvent,
    };
    pub use driftline_process::{
        BrownianMotion, ExpProcess, ProcessEvent, RealizationSource, RealizationTracer,
        SampleStatistics, StochasticProcess,
    };
    pub use driftline_reactor::{
        CallbackId, ConsoleSink, FnSink, Reactor, SecondarySource, Sink, SinkRef, Source,
        SourceRef, VecSink,
    };
    pub use driftline_sim::{FakeClock, Simulator, SystemClock, TimeSlip, WallClock};
    pub use driftline_types::{Duration, Timestamp};
}
