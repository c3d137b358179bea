//! # driftline-sim: time-ordered discrete-event simulator
//!
//! A [`Simulator`] is a [`Reactor`](driftline_reactor::Reactor)
//! specialized for deterministic, time-driven replay over a dynamic
//! population of sources:
//!
//! - a binary min-heap keyed by each primed source's next-event
//!   timestamp, with a monotone per-registration sequence number as the
//!   deterministic tie-break;
//! - reentrancy support: `add_source` / `remove_source` /
//!   `notify_source_primed` stay legal from within a sink callback while
//!   a delivery is on the stack, deferring their heap mutations to a FIFO
//!   command queue drained when the delivery scope exits (on every exit
//!   path, panics included);
//! - throttled replay pinning simulated progress to wall-clock progress
//!   through an injectable [`WallClock`].
//!
//! Scheduling is single-threaded and cooperative; the only blocking
//! point is the throttle sleep.

mod clock;
mod simulator;
mod source_timestamp;
mod time_slip;

pub use clock::{FakeClock, SystemClock, WallClock};
pub use simulator::Simulator;
pub use source_timestamp::SourceTimestamp;
pub use time_slip::TimeSlip;
