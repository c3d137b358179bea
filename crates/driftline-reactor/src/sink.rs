//! Event consumers.
//!
//! [`Sink`] is the type-erased half of the consumer contract: events
//! arrive as `&dyn Any` and the sink declares (via `TypeId`) the one
//! payload type it accepts. Attachment checks the declaration once, so
//! the downcast on the delivery path cannot fail in a correctly wired
//! graph.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::rc::Rc;

/// Shared handle to a sink.
pub type SinkRef = Rc<RefCell<dyn Sink>>;

/// An event consumer.
pub trait Sink {
    /// Reporting name, for diagnostics.
    fn name(&self) -> &str {
        ""
    }

    /// `TypeId` of the one payload type this sink accepts.
    fn sink_ev_type(&self) -> TypeId;

    /// Consumes one event. The payload is guaranteed (by the attach-time
    /// type check) to downcast to the declared type.
    fn notify_ev_any(&mut self, ev: &dyn Any);

    /// Lifetime count of events consumed.
    fn n_in_ev(&self) -> u64;

    /// Whether this sink tolerates transient event payloads. A sink that
    /// retains references to delivered events returns `false`, and
    /// sources publishing transient payloads must promote them before
    /// delivery.
    fn allow_volatile_source(&self) -> bool {
        true
    }
}

// ============================================================================
// FnSink - closure adapter
// ============================================================================

/// Adapts a closure as a sink for events of type `T`.
pub struct FnSink<T, F> {
    name: String,
    f: F,
    n_in_ev: u64,
    _marker: PhantomData<fn(&T)>,
}

impl<T: 'static, F: FnMut(&T) + 'static> FnSink<T, F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f, n_in_ev: 0, _marker: PhantomData }
    }

    /// Convenience constructor returning a ready-to-attach handle.
    pub fn new_ref(name: impl Into<String>, f: F) -> SinkRef {
        Rc::new(RefCell::new(Self::new(name, f)))
    }
}

impl<T: 'static, F: FnMut(&T)> Sink for FnSink<T, F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn sink_ev_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn notify_ev_any(&mut self, ev: &dyn Any) {
        if let Some(ev) = ev.downcast_ref::<T>() {
            self.n_in_ev += 1;
            (self.f)(ev);
        } else {
            debug_assert!(false, "sink {} received foreign event type", self.name);
        }
    }

    fn n_in_ev(&self) -> u64 {
        self.n_in_ev
    }
}

// ============================================================================
// VecSink - collecting sink
// ============================================================================

/// Collects every delivered event into a vector. Mostly useful in tests
/// and diagnostics.
pub struct VecSink<T> {
    name: String,
    events: Vec<T>,
}

impl<T: Clone + 'static> VecSink<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), events: Vec::new() }
    }

    /// Constructor returning a shared handle; keep a clone to read the
    /// collected events back after a run.
    pub fn new_ref(name: impl Into<String>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(name)))
    }

    pub fn events(&self) -> &[T] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<T> {
        std::mem::take(&mut self.events)
    }
}

impl<T: Clone + 'static> Sink for VecSink<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn sink_ev_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn notify_ev_any(&mut self, ev: &dyn Any) {
        if let Some(ev) = ev.downcast_ref::<T>() {
            self.events.push(ev.clone());
        } else {
            debug_assert!(false, "sink {} received foreign event type", self.name);
        }
    }

    fn n_in_ev(&self) -> u64 {
        self.events.len() as u64
    }

    // Collected events are clones; transient payloads are fine.
}

// ============================================================================
// ConsoleSink - diagnostic sink
// ============================================================================

/// Prints every delivered event to stdout.
pub struct ConsoleSink<T> {
    name: String,
    n_in_ev: u64,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Debug + 'static> ConsoleSink<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), n_in_ev: 0, _marker: PhantomData }
    }

    pub fn new_ref(name: impl Into<String>) -> SinkRef {
        Rc::new(RefCell::new(Self::new(name)))
    }
}

impl<T: Debug + 'static> Sink for ConsoleSink<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn sink_ev_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn notify_ev_any(&mut self, ev: &dyn Any) {
        if let Some(ev) = ev.downcast_ref::<T>() {
            self.n_in_ev += 1;
            println!("{}: {ev:?}", self.name);
        }
    }

    fn n_in_ev(&self) -> u64 {
        self.n_in_ev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_sink_counts_and_forwards() {
        let total = Rc::new(RefCell::new(0u64));
        let inner = Rc::clone(&total);

        let sink = FnSink::new_ref("adder", move |ev: &u64| *inner.borrow_mut() += ev);
        sink.borrow_mut().notify_ev_any(&3u64);
        sink.borrow_mut().notify_ev_any(&4u64);

        assert_eq!(*total.borrow(), 7);
        assert_eq!(sink.borrow().n_in_ev(), 2);
    }

    #[test]
    fn vec_sink_collects_clones() {
        let sink = VecSink::<String>::new_ref("collector");
        sink.borrow_mut().notify_ev_any(&"a".to_string());
        sink.borrow_mut().notify_ev_any(&"b".to_string());

        assert_eq!(sink.borrow().events(), ["a".to_string(), "b".to_string()]);
        assert_eq!(sink.borrow().n_in_ev(), 2);
    }

    #[test]
    fn sink_declares_event_type() {
        let sink = VecSink::<u32>::new(String::new());
        assert_eq!(sink.sink_ev_type(), TypeId::of::<u32>());
        assert!(sink.allow_volatile_source());
    }
}
