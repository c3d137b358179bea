//! Realization tracer adapted as a reactor source.

use std::any::TypeId;
use std::cell::RefCell;
use std::rc::Rc;

use driftline_reactor::{CallbackId, CallbackSet, SinkRef, Source, SourceRef};
use driftline_types::{Duration, Timestamp};

use crate::process::ProcessEvent;
use crate::tracer::RealizationTracer;

/// Publishes a realization as a stream of [`ProcessEvent`]s at a fixed
/// discretization interval.
///
/// The realization is developed lazily by the owned tracer; consecutive
/// events are exactly `ev_interval` apart. A process has no end time, so
/// the source is always primed and never exhausts; a simulator bounds
/// the run instead (`run_until`).
pub struct RealizationSource {
    core: Rc<RefCell<RealizationCore>>,
}

impl Clone for RealizationSource {
    fn clone(&self) -> Self {
        Self { core: Rc::clone(&self.core) }
    }
}

struct RealizationCore {
    name: String,
    tracer: RealizationTracer,
    /// Discretization interval between consecutive published samples.
    ev_interval: Duration,
    sinks: CallbackSet,
    n_out_ev: u64,
}

impl RealizationSource {
    /// Wraps `tracer`, publishing one sample every `ev_interval`.
    ///
    /// # Panics
    ///
    /// Panics when `ev_interval` is not strictly positive; the source
    /// could not advance its timestamp otherwise.
    pub fn new(name: impl Into<String>, tracer: RealizationTracer, ev_interval: Duration) -> Self {
        assert!(ev_interval > Duration::ZERO, "event interval must be strictly positive");

        Self {
            core: Rc::new(RefCell::new(RealizationCore {
                name: name.into(),
                tracer,
                ev_interval,
                sinks: CallbackSet::new(),
                n_out_ev: 0,
            })),
        }
    }

    /// This source as a reactor-registrable handle.
    pub fn as_source_ref(&self) -> SourceRef {
        let core: Rc<RefCell<RealizationCore>> = Rc::clone(&self.core);
        core as SourceRef
    }

    /// Attaches a downstream sink (payload type [`ProcessEvent`]).
    pub fn attach_sink(&self, sink: SinkRef) -> CallbackId {
        self.core.borrow_mut().sinks.attach(sink, TypeId::of::<ProcessEvent>())
    }

    pub fn detach_sink(&self, id: CallbackId) -> bool {
        self.core.borrow_mut().sinks.detach(id)
    }

    pub fn current_ev(&self) -> ProcessEvent {
        self.core.borrow().tracer.current_ev()
    }

    pub fn ev_interval(&self) -> Duration {
        self.core.borrow().ev_interval
    }
}

impl RealizationCore {
    fn publish_current(&mut self) -> u64 {
        let ev = self.tracer.current_ev();

        self.n_out_ev += 1;
        self.sinks.notify_all(&ev);
        self.tracer.advance_dt(self.ev_interval);

        1
    }
}

impl Source for RealizationCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    fn is_empty(&self) -> bool {
        false
    }

    fn is_exhausted(&self) -> bool {
        false
    }

    fn current_tm(&self) -> Option<Timestamp> {
        Some(self.tracer.current_tm())
    }

    fn advance_until(&mut self, tm: Timestamp, replay: bool) -> u64 {
        if replay {
            let mut delivered = 0;
            while self.tracer.current_tm() < tm {
                delivered += self.publish_current();
            }
            delivered
        } else {
            self.tracer.advance_until(tm);
            0
        }
    }

    fn deliver_one(&mut self) -> u64 {
        self.publish_current()
    }

    fn event_type(&self) -> TypeId {
        TypeId::of::<ProcessEvent>()
    }

    fn attach_sink(&mut self, sink: SinkRef) -> CallbackId {
        self.sinks.attach(sink, TypeId::of::<ProcessEvent>())
    }

    fn detach_sink(&mut self, id: CallbackId) -> bool {
        self.sinks.detach(id)
    }

    // The default notify_reactor hooks suffice: this source is always
    // primed, so it never announces a priming transition.

    fn n_out_ev(&self) -> u64 {
        self.n_out_ev
    }
}
