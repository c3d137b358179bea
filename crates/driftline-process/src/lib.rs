//! # driftline-process: stochastic processes as event sources
//!
//! A [`StochasticProcess`] is a law for sampling a scalar path; a
//! [`RealizationTracer`] lazily develops one sampled path (a
//! *realization*) with a monotonically increasing current time; a
//! [`RealizationSource`] adapts a tracer as a reactor source publishing
//! [`ProcessEvent`]s at a fixed discretization interval.
//!
//! Sampling is driven by a seedable RNG ([`rand::rngs::SmallRng`]), so a
//! realization replays bit-identically from its seed, the property the
//! simulator's regression scenarios rely on.

#![cfg_attr(test, allow(clippy::float_cmp))]

mod brownian;
mod exp_process;
mod process;
mod source;
mod statistics;
mod tracer;

pub use brownian::BrownianMotion;
pub use exp_process::ExpProcess;
pub use process::{ProcessEvent, StochasticProcess};
pub use source::RealizationSource;
pub use statistics::SampleStatistics;
pub use tracer::RealizationTracer;
