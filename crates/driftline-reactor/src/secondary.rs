//! Queue-backed source fed by upstream pushes.
//!
//! A `SecondarySource` sits downstream of other event processors: it does
//! not generate events itself, it queues whatever is pushed into it and
//! replays the queue through the normal source contract. While the queue
//! is empty the source is not primed and therefore absent from its
//! reactor's schedule; the first push announces the priming transition so
//! the reactor can re-insert it.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use driftline_types::Timestamp;

use crate::callback::{CallbackId, CallbackSet};
use crate::reactor::ReactorWeak;
use crate::sink::SinkRef;
use crate::source::{Source, SourceRef};

/// Shared handle to a queueing source for payloads of type `T`.
///
/// Clone the handle freely; all clones refer to the same queue. Feed it
/// from an upstream sink closure:
///
/// ```ignore
/// let relay = SecondarySource::<f64>::new("relay");
/// let feeder = {
///     let relay = relay.clone();
///     FnSink::new_ref("feeder", move |ev: &ProcessEvent| relay.push(ev.tm, ev.value))
/// };
/// upstream.attach_sink(feeder);
/// sim.add_source(&relay.as_source_ref());
/// ```
pub struct SecondarySource<T> {
    core: Rc<RefCell<SecondaryCore<T>>>,
}

impl<T> Clone for SecondarySource<T> {
    fn clone(&self) -> Self {
        Self { core: Rc::clone(&self.core) }
    }
}

struct SecondaryCore<T> {
    name: String,
    queue: VecDeque<(Timestamp, T)>,
    sinks: CallbackSet,
    reactor: Option<ReactorWeak>,
    n_in_ev: u64,
    n_out_ev: u64,
}

impl<T: 'static> SecondarySource<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: Rc::new(RefCell::new(SecondaryCore {
                name: name.into(),
                queue: VecDeque::new(),
                sinks: CallbackSet::new(),
                reactor: None,
                n_in_ev: 0,
                n_out_ev: 0,
            })),
        }
    }

    /// This source as a reactor-registrable handle. All clones map to the
    /// same underlying source, so reactor membership checks behave.
    pub fn as_source_ref(&self) -> SourceRef {
        // Unsized coercion to the trait-object handle.
        let core: Rc<RefCell<SecondaryCore<T>>> = Rc::clone(&self.core);
        core as SourceRef
    }

    /// Enqueues one event. Timestamps must be non-decreasing.
    ///
    /// If the queue was empty and the source is attached to a reactor,
    /// the priming transition is announced; a reactor mid-delivery defers
    /// the re-scheduling until its delivery scope exits.
    ///
    /// # Panics
    ///
    /// Panics when `tm` precedes the most recently queued timestamp.
    pub fn push(&self, tm: Timestamp, value: T) {
        let (became_primed, reactor) = {
            let mut core = self.core.borrow_mut();

            if let Some((back_tm, _)) = core.queue.back() {
                assert!(
                    tm >= *back_tm,
                    "source {}: event timestamps must be non-decreasing ({tm} < {back_tm})",
                    core.name
                );
            }

            let was_empty = core.queue.is_empty();
            core.queue.push_back((tm, value));
            core.n_in_ev += 1;

            (was_empty, core.reactor.clone())
        };
        // Core borrow released: the reactor reads this source's state
        // when re-scheduling it.

        if became_primed {
            if let Some(reactor) = reactor.and_then(|weak| weak.upgrade()) {
                reactor.notify_source_primed(&self.as_source_ref());
            }
        }
    }

    /// Attaches a downstream sink (payload type `T`).
    pub fn attach_sink(&self, sink: SinkRef) -> CallbackId {
        self.core.borrow_mut().sinks.attach(sink, TypeId::of::<T>())
    }

    pub fn detach_sink(&self, id: CallbackId) -> bool {
        self.core.borrow_mut().sinks.detach(id)
    }

    pub fn n_queued(&self) -> usize {
        self.core.borrow().queue.len()
    }
}

impl<T: 'static> SecondaryCore<T> {
    fn publish_front(&mut self) -> u64 {
        match self.queue.pop_front() {
            Some((_, value)) => {
                self.n_out_ev += 1;
                self.sinks.notify_all(&value);
                1
            }
            None => 0,
        }
    }
}

impl<T: 'static> Source for SecondaryCore<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn is_exhausted(&self) -> bool {
        // Upstream may push again at any time; a queueing source never
        // terminates on its own.
        false
    }

    fn current_tm(&self) -> Option<Timestamp> {
        self.queue.front().map(|(tm, _)| *tm)
    }

    fn advance_until(&mut self, tm: Timestamp, replay: bool) -> u64 {
        let mut delivered = 0;

        while let Some((front_tm, _)) = self.queue.front() {
            if *front_tm >= tm {
                break;
            }
            if replay {
                delivered += self.publish_front();
            } else {
                self.queue.pop_front();
            }
        }

        delivered
    }

    fn deliver_one(&mut self) -> u64 {
        self.publish_front()
    }

    fn event_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn attach_sink(&mut self, sink: SinkRef) -> CallbackId {
        self.sinks.attach(sink, TypeId::of::<T>())
    }

    fn detach_sink(&mut self, id: CallbackId) -> bool {
        self.sinks.detach(id)
    }

    fn notify_reactor_add(&mut self, reactor: ReactorWeak) {
        self.reactor = Some(reactor);
    }

    fn notify_reactor_remove(&mut self) {
        self.reactor = None;
    }

    fn n_out_ev(&self) -> u64 {
        self.n_out_ev
    }

    fn n_queued_out_ev(&self) -> u64 {
        self.queue.len() as u64
    }
}
