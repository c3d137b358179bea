//! # driftline-reactor: event producer/consumer contract
//!
//! This crate defines the uniform contract between event producers
//! ([`Source`]), event consumers ([`Sink`]), and the dispatchers that
//! orchestrate them ([`Reactor`]).
//!
//! Event payloads are untyped at this layer: delivery passes `&dyn Any`,
//! and each source/sink pair agrees on a concrete payload type. The
//! agreement is checked once, at attach time, by comparing `TypeId`s;
//! an incompatible sink is refused with [`CallbackId::INVALID`] rather
//! than failing at delivery time. The core never introspects payloads.
//!
//! ## Ownership
//!
//! - A reactor owns its registered sources (`Rc<RefCell<dyn Source>>`).
//! - A source owns its subscription table ([`CallbackSet`]) and therefore
//!   its sinks.
//! - A source holds at most a *weak* back-reference to its reactor, used
//!   only to announce priming transitions. Ownership is acyclic by
//!   construction.
//!
//! Scheduling is single-threaded and cooperative; handles are `Rc`, not
//! `Arc`, and there are no synchronization primitives on the dispatch
//! path.

mod callback;
mod reactor;
mod secondary;
mod sink;
mod source;

pub use callback::{CallbackId, CallbackSet};
pub use reactor::{Reactor, ReactorRef, ReactorWeak};
pub use secondary::SecondarySource;
pub use sink::{ConsoleSink, FnSink, Sink, SinkRef, VecSink};
pub use source::{Source, SourceRef};
