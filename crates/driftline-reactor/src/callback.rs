//! Subscription table keyed by opaque callback ids.

use std::any::{Any, TypeId};
use std::fmt::{self, Display};

use crate::sink::SinkRef;

// ============================================================================
// CallbackId
// ============================================================================

/// Opaque handle for one sink subscription.
///
/// Ids are assigned monotonically per [`CallbackSet`]; id `0` is reserved
/// as the invalid sentinel returned when an attach is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    /// The invalid subscription: returned when attaching a sink whose
    /// declared event type does not match the source's.
    pub const INVALID: CallbackId = CallbackId(0);

    /// True for any id actually handed out by a [`CallbackSet`].
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cb#{}", self.0)
    }
}

// ============================================================================
// CallbackSet
// ============================================================================

/// A source's table of attached sinks.
///
/// Iteration during [`CallbackSet::notify_all`] works on a snapshot of the
/// table, so a callback that attaches or detaches subscriptions on the
/// same source takes effect after the current iteration completes instead
/// of invalidating it.
pub struct CallbackSet {
    next_id: u64,
    entries: Vec<(CallbackId, SinkRef)>,
}

impl Default for CallbackSet {
    fn default() -> Self {
        // next_id starts at 1: id 0 is the INVALID sentinel.
        Self::new()
    }
}

impl CallbackSet {
    pub fn new() -> Self {
        Self { next_id: 1, entries: Vec::new() }
    }

    /// Attaches `sink`, provided its declared event type matches
    /// `ev_type`. Returns [`CallbackId::INVALID`] on mismatch.
    pub fn attach(&mut self, sink: SinkRef, ev_type: TypeId) -> CallbackId {
        if sink.borrow().sink_ev_type() != ev_type {
            tracing::warn!(sink = sink.borrow().name(), "refusing sink with mismatched event type");
            return CallbackId::INVALID;
        }

        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, sink));
        id
    }

    /// Removes the subscription with the given id. Returns `true` when an
    /// entry was removed.
    pub fn detach(&mut self, id: CallbackId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Delivers one event to every attached sink, in attach order.
    pub fn notify_all(&self, ev: &dyn Any) {
        // Snapshot: reentrant attach/detach must not disturb this pass.
        let snapshot: Vec<SinkRef> = self.entries.iter().map(|(_, s)| SinkRef::clone(s)).collect();

        for sink in snapshot {
            sink.borrow_mut().notify_ev_any(ev);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::sink::{FnSink, VecSink};

    use super::*;

    #[test]
    fn invalid_id_is_not_valid() {
        assert!(!CallbackId::INVALID.is_valid());
    }

    #[test]
    fn attach_checks_event_type() {
        let mut set = CallbackSet::new();
        let sink = VecSink::<u32>::new_ref("u32-sink");

        let bad = set.attach(sink.clone(), TypeId::of::<String>());
        assert!(!bad.is_valid());
        assert!(set.is_empty());

        let good = set.attach(sink, TypeId::of::<u32>());
        assert!(good.is_valid());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn detach_removes_exactly_one_entry() {
        let mut set = CallbackSet::new();
        let a = set.attach(VecSink::<u32>::new_ref("a"), TypeId::of::<u32>());
        let b = set.attach(VecSink::<u32>::new_ref("b"), TypeId::of::<u32>());

        assert!(set.detach(a));
        assert!(!set.detach(a));
        assert_eq!(set.len(), 1);
        assert!(b.is_valid());
    }

    #[test]
    fn notify_all_delivers_in_attach_order() {
        let mut set = CallbackSet::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Rc::clone(&seen);
            let sink = FnSink::new_ref(tag, move |ev: &u32| seen.borrow_mut().push((tag, *ev)));
            set.attach(sink, TypeId::of::<u32>());
        }

        set.notify_all(&7u32);
        assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
    }
}
