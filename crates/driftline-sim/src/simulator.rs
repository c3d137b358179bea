//! The simulator scheduler.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::rc::Rc;

use driftline_reactor::{Reactor, ReactorRef, ReactorWeak, Source, SourceRef};
use driftline_types::{Duration, Timestamp};

use crate::clock::{SystemClock, WallClock};
use crate::source_timestamp::SourceTimestamp;
use crate::time_slip::TimeSlip;

/// Throttle sleeps shorter than this are skipped; below the OS
/// scheduler's useful resolution.
const MIN_THROTTLE_SLEEP: Duration = Duration::from_millis(1);

// ============================================================================
// Reentrant command queue
// ============================================================================

/// A state-changing simulator command deferred because it arrived while a
/// delivery was in progress. Drained FIFO when the delivery scope exits.
enum ReentrantCmd {
    /// Deferred `notify_source_primed(src)`.
    NotifySourcePrimed(SourceRef),
    /// Deferred heap insert for an `add_source(src)` whose registration
    /// already took effect.
    CompleteAddSource(SourceRef),
    /// Deferred `remove_source(src)`.
    CompleteRemoveSource(SourceRef),
}

// ============================================================================
// Core state
// ============================================================================

struct SourceEntry {
    /// Monotone registration sequence number; the heap tie-break.
    seq: u64,
    src: SourceRef,
}

struct SimCore {
    /// Initial simulation clock, fixed at construction.
    t0: Timestamp,
    /// Timestamp of the most recent dispatched event.
    last_tm: Timestamp,
    /// Count of dispatched events since simulation start.
    n_event: u64,
    next_seq: u64,
    /// All registered sources, exhausted and live.
    src_v: Vec<SourceEntry>,
    /// Min-heap: every primed, non-exhausted source exactly once, keyed
    /// by its next-event timestamp.
    sim_heap: BinaryHeap<Reverse<SourceTimestamp>>,
    reentrant_cmds: VecDeque<ReentrantCmd>,
    delivery_in_progress: bool,
    /// Handed to sources on add so they can announce priming.
    self_weak: Option<ReactorWeak>,
}

impl SimCore {
    fn new(t0: Timestamp) -> Self {
        Self {
            t0,
            last_tm: t0,
            n_event: 0,
            next_seq: 0,
            src_v: Vec::new(),
            sim_heap: BinaryHeap::new(),
            reentrant_cmds: VecDeque::new(),
            delivery_in_progress: false,
            self_weak: None,
        }
    }

    fn position_of(&self, src: &SourceRef) -> Option<usize> {
        self.src_v.iter().position(|entry| Rc::ptr_eq(&entry.src, src))
    }

    fn seq_of(&self, src: &SourceRef) -> Option<u64> {
        self.position_of(src).map(|pos| self.src_v[pos].seq)
    }

    fn is_source_present(&self, src: &SourceRef) -> bool {
        self.position_of(src).is_some()
    }

    fn heap_contains(&self, src: &SourceRef) -> bool {
        self.sim_heap.iter().any(|Reverse(entry)| Rc::ptr_eq(entry.src(), src))
    }

    fn next_tm(&self) -> Option<Timestamp> {
        self.sim_heap.peek().map(|Reverse(entry)| entry.tm())
    }

    fn next_src(&self) -> Option<SourceRef> {
        self.sim_heap.peek().map(|Reverse(entry)| SourceRef::clone(entry.src()))
    }

    fn add_source(&mut self, src: &SourceRef) -> bool {
        if self.is_source_present(src) {
            return false;
        }

        // Events preceding t0 are silently discarded; an event at exactly
        // t0, if any, stays pending.
        src.borrow_mut().advance_until(self.t0, false);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.src_v.push(SourceEntry { seq, src: SourceRef::clone(src) });

        if let Some(reactor) = self.self_weak.clone() {
            src.borrow_mut().notify_reactor_add(reactor);
        }

        let (exhausted, primed) = {
            let s = src.borrow();
            (s.is_exhausted(), s.is_primed())
        };

        if exhausted {
            // Retained in src_v but never scheduled.
            tracing::debug!(src = src.borrow().name(), "source exhausted at add");
        } else if !primed {
            // Stays out of the heap; the source will announce its
            // priming transition via notify_source_primed.
            tracing::trace!(src = src.borrow().name(), "added non-primed source");
        } else if self.delivery_in_progress {
            tracing::trace!(src = src.borrow().name(), "reentrant add, deferring heap insert");
            self.reentrant_cmds.push_back(ReentrantCmd::CompleteAddSource(SourceRef::clone(src)));
        } else {
            self.heap_insert_source(src);
        }

        true
    }

    fn remove_source(&mut self, src: &SourceRef) -> bool {
        if !self.is_source_present(src) {
            return false;
        }

        if self.delivery_in_progress {
            tracing::trace!(src = src.borrow().name(), "reentrant remove, deferring");
            self.reentrant_cmds.push_back(ReentrantCmd::CompleteRemoveSource(SourceRef::clone(src)));
        } else {
            self.complete_remove_source(src);
        }

        true
    }

    fn notify_source_primed(&mut self, src: &SourceRef) {
        if self.delivery_in_progress {
            self.reentrant_cmds.push_back(ReentrantCmd::NotifySourcePrimed(SourceRef::clone(src)));
        } else {
            self.heap_insert_source(src);
        }
    }

    /// Inserts a registered, primed, non-exhausted source into the heap
    /// at its current next-event timestamp. Stale requests (source
    /// removed, consumed, exhausted, or already scheduled) are dropped.
    fn heap_insert_source(&mut self, src: &SourceRef) {
        let Some(seq) = self.seq_of(src) else {
            tracing::trace!("dropping schedule request for unregistered source");
            return;
        };

        if self.heap_contains(src) {
            debug_assert!(false, "source is already scheduled");
            return;
        }

        let (exhausted, tm) = {
            let s = src.borrow();
            (s.is_exhausted(), s.current_tm())
        };
        if exhausted {
            return;
        }
        let Some(tm) = tm else { return };

        self.sim_heap.push(Reverse(SourceTimestamp::new(tm, seq, SourceRef::clone(src))));
    }

    /// Removal proper: O(n) in heap size, rebuilding the heap without the
    /// target's entry.
    fn complete_remove_source(&mut self, src: &SourceRef) {
        let Some(pos) = self.position_of(src) else {
            // Removed twice within one delivery; the first drain won.
            return;
        };
        self.src_v.remove(pos);

        let entries = std::mem::take(&mut self.sim_heap).into_vec();
        self.sim_heap =
            entries.into_iter().filter(|Reverse(entry)| !Rc::ptr_eq(entry.src(), src)).collect();

        src.borrow_mut().notify_reactor_remove();
    }

    /// Applies commands deferred during a delivery, FIFO, exactly as they
    /// would have applied outside one.
    fn drain_reentrant(&mut self) {
        while let Some(cmd) = self.reentrant_cmds.pop_front() {
            match cmd {
                ReentrantCmd::NotifySourcePrimed(src) | ReentrantCmd::CompleteAddSource(src) => {
                    self.heap_insert_source(&src);
                }
                ReentrantCmd::CompleteRemoveSource(src) => self.complete_remove_source(&src),
            }
        }
    }
}

// ============================================================================
// Delivery guard
// ============================================================================

/// Marks the reentrancy-protected delivery region. On drop (every exit
/// path from a delivery, panics included) the flag clears and the
/// deferred command queue drains, so heap invariants are re-established
/// before the next dispatch.
struct DeliveryGuard<'a> {
    core: &'a RefCell<SimCore>,
}

impl<'a> DeliveryGuard<'a> {
    fn enter(core: &'a RefCell<SimCore>) -> Self {
        core.borrow_mut().delivery_in_progress = true;
        Self { core }
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        let mut core = self.core.borrow_mut();
        core.delivery_in_progress = false;
        core.drain_reentrant();
    }
}

// ============================================================================
// Simulator
// ============================================================================

struct SimInner {
    core: RefCell<SimCore>,
}

impl SimInner {
    fn advance_one_event(&self) -> u64 {
        let src = {
            let mut core = self.core.borrow_mut();

            let (src, top_tm) = match core.sim_heap.peek() {
                None => return 0,
                Some(Reverse(top)) => (SourceRef::clone(top.src()), top.tm()),
            };

            core.last_tm = top_tm;
            tracing::trace!(tm = %top_tm, src = src.borrow().name(), "dispatching");
            src
        };

        // Reentrancy-protected region. The core borrow is released while
        // the source delivers, so sinks may call back into this
        // simulator; their mutations land in the command queue.
        let guard = DeliveryGuard::enter(&self.core);

        let delivered = src.borrow_mut().deliver_one();

        {
            let mut core = self.core.borrow_mut();
            core.n_event += delivered;

            // The top entry still belongs to src: heap mutations during
            // the delivery were deferred.
            let popped = core.sim_heap.pop();
            debug_assert!(
                matches!(&popped, Some(Reverse(entry)) if Rc::ptr_eq(entry.src(), &src)),
                "heap top changed during delivery"
            );

            let (exhausted, primed, tm) = {
                let s = src.borrow();
                (s.is_exhausted(), s.is_primed(), s.current_tm())
            };

            if exhausted || !primed {
                // Out of the heap: permanently when exhausted, until the
                // source re-primes otherwise.
            } else if let (Some(tm), Some(Reverse(entry))) = (tm, popped) {
                core.sim_heap.push(Reverse(SourceTimestamp::new(tm, entry.seq(), src)));
            }
        }

        // Exits the protected region: clears the flag, drains the queue.
        drop(guard);

        delivered
    }
}

impl Reactor for SimInner {
    fn add_source(&self, src: &SourceRef) -> bool {
        self.core.borrow_mut().add_source(src)
    }

    fn remove_source(&self, src: &SourceRef) -> bool {
        self.core.borrow_mut().remove_source(src)
    }

    fn notify_source_primed(&self, src: &SourceRef) {
        self.core.borrow_mut().notify_source_primed(src)
    }

    fn run_one(&self) -> u64 {
        self.advance_one_event()
    }
}

/// Time-ordered discrete-event simulator.
///
/// A cheap clonable handle; all clones drive the same simulation. Time
/// advances monotonically over a modifiable set of sources. A
/// newly-created simulator is exhausted; it may transition to
/// non-exhausted across [`Simulator::add_source`].
pub struct Simulator {
    inner: Rc<SimInner>,
}

impl Clone for Simulator {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl Simulator {
    pub fn new(t0: Timestamp) -> Self {
        let inner = Rc::new(SimInner { core: RefCell::new(SimCore::new(t0)) });

        let weak: ReactorWeak = Rc::downgrade(&inner) as ReactorWeak;
        inner.core.borrow_mut().self_weak = Some(weak);

        Self { inner }
    }

    /// Simulation start time; established at construction and never
    /// changed (in particular, `add_source` does not change it).
    pub fn t0(&self) -> Timestamp {
        self.inner.core.borrow().t0
    }

    /// Timestamp of the most recent dispatched event.
    pub fn last_tm(&self) -> Timestamp {
        self.inner.core.borrow().last_tm
    }

    /// Count of events dispatched since simulation start.
    pub fn n_event(&self) -> u64 {
        self.inner.core.borrow().n_event
    }

    /// True when no sources are registered. May decrease across
    /// `add_source`; registered sources that exhaust are retained, so
    /// drained simulations report progress through [`Simulator::next_tm`]
    /// returning `None` instead.
    pub fn is_exhausted(&self) -> bool {
        self.inner.core.borrow().src_v.is_empty()
    }

    /// Timestamp of the next event to dispatch; `None` when nothing is
    /// scheduled. May decrease across `add_source` and increase across
    /// `run_one`.
    pub fn next_tm(&self) -> Option<Timestamp> {
        self.inner.core.borrow().next_tm()
    }

    /// The source that will deliver the next event.
    pub fn next_src(&self) -> Option<SourceRef> {
        self.inner.core.borrow().next_src()
    }

    pub fn is_source_present(&self, src: &SourceRef) -> bool {
        self.inner.core.borrow().is_source_present(src)
    }

    /// This simulator as a shared reactor handle.
    pub fn as_reactor(&self) -> ReactorRef {
        let reactor: Rc<SimInner> = Rc::clone(&self.inner);
        reactor as ReactorRef
    }

    /// See [`Reactor::add_source`]: pre-`t0` events are discarded, and
    /// the source enters the schedule when primed.
    pub fn add_source(&self, src: &SourceRef) -> bool {
        self.inner.add_source(src)
    }

    /// See [`Reactor::remove_source`].
    pub fn remove_source(&self, src: &SourceRef) -> bool {
        self.inner.remove_source(src)
    }

    /// Emits the earliest pending event from a single source; ties
    /// resolve by registration order. Returns the count dispatched (0
    /// or 1).
    pub fn advance_one_event(&self) -> u64 {
        self.inner.advance_one_event()
    }

    /// Synonym for [`Simulator::advance_one_event`].
    pub fn run_one(&self) -> u64 {
        self.inner.advance_one_event()
    }

    /// See [`Reactor::run_n`].
    pub fn run_n(&self, n: i64) -> u64 {
        Reactor::run_n(self.inner.as_ref(), n)
    }

    /// Runs the simulation until the earliest pending event time exceeds
    /// `t1` or nothing remains scheduled.
    pub fn run_until(&self, t1: Timestamp) {
        debug_assert!(!self.inner.core.borrow().delivery_in_progress, "run_until is not reentrant");

        while let Some(t) = self.next_tm() {
            if t > t1 {
                break;
            }
            self.advance_one_event();
        }
    }

    /// Cross-references real time with simulated time for throttled
    /// replay, using the system clock.
    pub fn timeslip(&self) -> TimeSlip {
        self.timeslip_with_clock(&mut SystemClock)
    }

    pub fn timeslip_with_clock(&self, clock: &mut dyn WallClock) -> TimeSlip {
        TimeSlip::new(self.next_tm().unwrap_or_else(|| self.t0()), clock.now())
    }

    /// Realtime delay to apply before the next simulated event so the
    /// desired replay factor holds.
    ///
    /// `xref` pins simulated time to wall-clock time (see
    /// [`Simulator::timeslip`]); `replay_factor` is the desired ratio of
    /// elapsed simulation time to elapsed real time; `now` is the current
    /// wall-clock reading. This incremental API suits an external replay
    /// loop that wants to own the sleep itself:
    ///
    /// ```ignore
    /// sim.run_one();
    /// let xref = sim.timeslip();
    /// loop {
    ///     let dt = sim.throttled_event_dt(xref, replay_factor, clock.now());
    ///     clock.sleep(dt);
    ///     sim.run_one();
    /// }
    /// ```
    pub fn throttled_event_dt(&self, xref: TimeSlip, replay_factor: f64, now: Timestamp) -> Duration {
        if replay_factor <= 0.0 {
            // Degenerate factor: replay as fast as possible.
            tracing::debug!(replay_factor, "non-positive replay factor, not throttling");
            return Duration::ZERO;
        }

        let hi_sim_tm = self.next_tm().unwrap_or_else(|| self.t0());
        let sim_dt = hi_sim_tm - xref.sim_tm();
        let hi_real_tm = xref.real_tm() + sim_dt.div_f64(replay_factor);

        if now < hi_real_tm { hi_real_tm - now } else { Duration::ZERO }
    }

    /// Runs at realtime speed, throttled by `replay_factor`, until the
    /// simulation drains, `n_max` events dispatch (when `n_max > 0`), or
    /// the sim clock passes `t1` (when `t1 > t0`). Returns the count
    /// dispatched.
    ///
    /// Sleeps on the calling thread between events; for an external
    /// replay loop use [`Simulator::throttled_event_dt`] instead.
    pub fn run_throttled_until(&self, t1: Timestamp, n_max: i32, replay_factor: f64) -> u64 {
        self.run_throttled_until_with_clock(t1, n_max, replay_factor, &mut SystemClock)
    }

    pub fn run_throttled_until_with_clock(
        &self,
        t1: Timestamp,
        n_max: i32,
        replay_factor: f64,
        clock: &mut dyn WallClock,
    ) -> u64 {
        debug_assert!(
            !self.inner.core.borrow().delivery_in_progress,
            "throttled replay is not reentrant"
        );

        let mut n: u64 = 0;

        if !self.is_exhausted() {
            n += self.run_one();
        }

        // Cross-reference real time with sim time.
        let xref = self.timeslip_with_clock(clock);

        while !self.is_exhausted() {
            if n_max > 0 && n >= n_max as u64 {
                return n;
            }

            let Some(next_tm) = self.next_tm() else {
                return n;
            };
            if t1 > self.t0() && next_tm > t1 {
                return n;
            }

            // If sim time is outpacing scaled realtime, wait for real
            // elapsed time to catch up.
            let wait_dt = self.throttled_event_dt(xref, replay_factor, clock.now());
            if wait_dt > MIN_THROTTLE_SLEEP {
                tracing::debug!(sleep_dt = %wait_dt, "throttling replay");
                clock.sleep(wait_dt);
            }

            n += self.run_one();
        }

        n
    }

    /// Current heap contents in increasing time order. Non-destructive:
    /// works on a copy of the heap.
    pub fn heap_contents(&self) -> Vec<SourceTimestamp> {
        let mut heap = self.inner.core.borrow().sim_heap.clone();
        let mut contents = Vec::with_capacity(heap.len());

        while let Some(Reverse(entry)) = heap.pop() {
            contents.push(entry);
        }

        contents
    }

    /// Dumps the heap in human-readable form through the tracing layer.
    pub fn log_heap_contents(&self) {
        tracing::info!("sim heap contents (tm name n_queued_out_ev n_out_ev):");

        for entry in self.heap_contents() {
            let src = entry.src().borrow();
            tracing::info!(
                tm = %entry.tm(),
                name = src.name(),
                n_queued_out_ev = src.n_queued_out_ev(),
                n_out_ev = src.n_out_ev(),
            );
        }
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.borrow();

        f.debug_struct("Simulator")
            .field("t0", &core.t0)
            .field("last_tm", &core.last_tm)
            .field("n_event", &core.n_event)
            .field("n_source", &core.src_v.len())
            .field("heap_len", &core.sim_heap.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
