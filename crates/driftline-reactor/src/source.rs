//! Event producers.

use std::any::TypeId;
use std::cell::RefCell;
use std::rc::Rc;

use driftline_types::Timestamp;

use crate::callback::CallbackId;
use crate::reactor::ReactorWeak;
use crate::sink::SinkRef;

/// Shared handle to a source.
pub type SourceRef = Rc<RefCell<dyn Source>>;

/// An event producer.
///
/// A source publishes events in non-decreasing timestamp order to sinks
/// attached through its subscription table. At any time a source is
/// associated with at most one reactor; the association is announced via
/// [`Source::notify_reactor_add`] / [`Source::notify_reactor_remove`].
///
/// ## States
///
/// - *empty*: no events currently available.
/// - *primed*: the source knows the timestamp of its next event. A
///   non-primed source is excluded from a simulation heap until it primes,
///   which makes sources that depend on other sources feasible.
/// - *exhausted*: terminal; no further events, ever.
///
/// Invariants: `exhausted ⇒ !primed`, `primed ⇒ !empty`, and
/// [`Source::current_tm`] is `Some` exactly when primed.
///
/// A source that transitions from non-primed to primed while attached to
/// a reactor must call the reactor's `notify_source_primed` through its
/// stored back-reference, after releasing any borrow of itself: the
/// reactor reads the source's state to re-schedule it.
pub trait Source {
    /// Reporting name for this source, for diagnostics.
    fn name(&self) -> &str;

    fn set_name(&mut self, name: &str);

    /// True when the source currently has no events to deliver.
    fn is_empty(&self) -> bool;

    /// True when the source knows the timestamp of its next event.
    fn is_primed(&self) -> bool {
        !self.is_empty()
    }

    /// True when the source will never publish another event.
    fn is_exhausted(&self) -> bool;

    /// Timestamp of the next event; `Some` exactly when primed. No event
    /// from this source exists before the returned instant.
    fn current_tm(&self) -> Option<Timestamp>;

    /// Advances the source so that afterwards `current_tm() >= tm`, or
    /// the source is non-primed or exhausted.
    ///
    /// With `replay == false` intervening events are silently discarded
    /// and the return value is 0. With `replay == true` every pending
    /// event strictly before `tm` is published, in non-decreasing order,
    /// and the count delivered is returned. An event at exactly `tm`, if
    /// any, stays pending.
    fn advance_until(&mut self, tm: Timestamp, replay: bool) -> u64;

    /// Delivers at most one event to attached sinks; returns the count
    /// delivered (0 or 1). Afterwards `current_tm` has advanced
    /// monotonically, or the source has become non-primed or exhausted.
    fn deliver_one(&mut self) -> u64;

    /// `TypeId` of the payload type this source publishes.
    fn event_type(&self) -> TypeId;

    /// Attaches a sink; returns [`CallbackId::INVALID`] when the sink's
    /// declared event type is incompatible.
    fn attach_sink(&mut self, sink: SinkRef) -> CallbackId;

    /// Detaches a previously attached sink. Returns `true` when an entry
    /// was removed.
    fn detach_sink(&mut self, id: CallbackId) -> bool;

    /// Informs the source it was added to a reactor. The source stores
    /// the weak handle for priming announcements; it must not call back
    /// into the reactor from inside this hook.
    fn notify_reactor_add(&mut self, _reactor: ReactorWeak) {}

    /// Informs the source it was removed from its reactor.
    fn notify_reactor_remove(&mut self) {}

    /// Lifetime count of events delivered.
    fn n_out_ev(&self) -> u64;

    /// Count of events queued but not yet delivered.
    fn n_queued_out_ev(&self) -> u64 {
        0
    }
}
