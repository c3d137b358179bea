//! The filter as an event processor: sink for inputs, source of states.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use driftline_reactor::{CallbackId, CallbackSet, Sink, SinkRef, Source, SourceRef};
use driftline_types::Timestamp;

use crate::filter::KalmanFilter;
use crate::input::KalmanFilterInput;
use crate::spec::KalmanFilterSpec;
use crate::state::KalmanFilterStateExt;

/// Payload type consumed by a [`KalmanFilterSvc`].
pub type KalmanInputEvent = Rc<KalmanFilterInput>;

/// Payload type published by a [`KalmanFilterSvc`].
pub type KalmanStateEvent = Rc<KalmanFilterStateExt>;

/// Encapsulates a passive [`KalmanFilter`] as an active event
/// consumer + producer.
///
/// As a sink it consumes [`KalmanInputEvent`]s; each input triggers one
/// filter step, and the resulting [`KalmanStateEvent`] is published
/// synchronously to attached sinks. As a source it is therefore never
/// primed (it holds no schedule of its own and only emits in response
/// to inputs) and never exhausts.
pub struct KalmanFilterSvc {
    core: Rc<RefCell<SvcCore>>,
}

impl Clone for KalmanFilterSvc {
    fn clone(&self) -> Self {
        Self { core: Rc::clone(&self.core) }
    }
}

struct SvcCore {
    name: String,
    filter: KalmanFilter,
    sinks: CallbackSet,
    n_in_ev: u64,
    n_out_ev: u64,
}

impl KalmanFilterSvc {
    pub fn new(name: impl Into<String>, spec: KalmanFilterSpec) -> Self {
        Self {
            core: Rc::new(RefCell::new(SvcCore {
                name: name.into(),
                filter: KalmanFilter::new(spec),
                sinks: CallbackSet::new(),
                n_in_ev: 0,
                n_out_ev: 0,
            })),
        }
    }

    /// This service as a reactor-registrable source handle.
    pub fn as_source_ref(&self) -> SourceRef {
        let core: Rc<RefCell<SvcCore>> = Rc::clone(&self.core);
        core as SourceRef
    }

    /// This service as an attachable sink handle (payload type
    /// [`KalmanInputEvent`]).
    pub fn as_sink_ref(&self) -> SinkRef {
        let core: Rc<RefCell<SvcCore>> = Rc::clone(&self.core);
        core as SinkRef
    }

    /// Attaches a downstream sink (payload type [`KalmanStateEvent`]).
    pub fn attach_sink(&self, sink: SinkRef) -> CallbackId {
        self.core.borrow_mut().sinks.attach(sink, TypeId::of::<KalmanStateEvent>())
    }

    pub fn detach_sink(&self, id: CallbackId) -> bool {
        self.core.borrow_mut().sinks.detach(id)
    }

    /// The most recent extended filter state.
    pub fn state_ext(&self) -> KalmanStateEvent {
        Rc::clone(self.core.borrow().filter.state_ext())
    }

    pub fn step_no(&self) -> u32 {
        self.core.borrow().filter.step_no()
    }

    /// Feeds one input directly (the typed equivalent of delivering a
    /// [`KalmanInputEvent`] through the sink interface), stepping the
    /// filter and publishing the new state.
    pub fn notify_input(&self, input: &KalmanInputEvent) -> Result<(), crate::KalmanError> {
        self.core.borrow_mut().apply_input(input)
    }
}

impl SvcCore {
    fn apply_input(&mut self, input: &KalmanInputEvent) -> Result<(), crate::KalmanError> {
        let state = self.filter.notify_input(input)?;
        let ev: KalmanStateEvent = Rc::clone(state);

        self.n_in_ev += 1;
        self.n_out_ev += 1;
        self.sinks.notify_all(&ev);

        Ok(())
    }
}

impl Sink for SvcCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn sink_ev_type(&self) -> TypeId {
        TypeId::of::<KalmanInputEvent>()
    }

    fn notify_ev_any(&mut self, ev: &dyn Any) {
        let Some(input) = ev.downcast_ref::<KalmanInputEvent>() else {
            debug_assert!(false, "filter service {} received foreign event type", self.name);
            return;
        };

        // The erased sink interface has nowhere to surface a
        // precondition failure; the offending input is dropped and the
        // filter state left untouched.
        if let Err(err) = self.apply_input(input) {
            tracing::error!(svc = self.name, %err, "dropping filter input");
        }
    }

    fn n_in_ev(&self) -> u64 {
        self.n_in_ev
    }

    /// The filter captures the input pointer in its state provenance.
    fn allow_volatile_source(&self) -> bool {
        false
    }
}

impl Source for SvcCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    /// A direct publisher: never primed on its own schedule.
    fn is_empty(&self) -> bool {
        true
    }

    fn is_exhausted(&self) -> bool {
        false
    }

    fn current_tm(&self) -> Option<Timestamp> {
        None
    }

    fn advance_until(&mut self, _tm: Timestamp, _replay: bool) -> u64 {
        0
    }

    fn deliver_one(&mut self) -> u64 {
        0
    }

    fn event_type(&self) -> TypeId {
        TypeId::of::<KalmanStateEvent>()
    }

    fn attach_sink(&mut self, sink: SinkRef) -> CallbackId {
        self.sinks.attach(sink, TypeId::of::<KalmanStateEvent>())
    }

    fn detach_sink(&mut self, id: CallbackId) -> bool {
        self.sinks.detach(id)
    }

    // Default notify_reactor hooks suffice: the service never primes,
    // so it has no transition to announce.

    fn n_out_ev(&self) -> u64 {
        self.n_out_ev
    }
}
