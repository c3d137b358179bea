//! Abstract event dispatcher.

use std::rc::{Rc, Weak};

use crate::source::SourceRef;

/// Shared handle to a reactor.
pub type ReactorRef = Rc<dyn Reactor>;

/// Weak back-reference to a reactor, held by sources.
pub type ReactorWeak = Weak<dyn Reactor>;

/// An event dispatcher orchestrating a set of sources.
///
/// Methods take `&self`: a reactor is a shared handle over interior
/// state, because reentrant calls are part of the contract. While a
/// delivery is on the stack, `add_source`, `remove_source`, and
/// `notify_source_primed` remain legal from within a sink callback.
/// Implementations defer such mid-delivery mutations until the delivery
/// scope exits, restoring their scheduling invariants before the next
/// dispatch.
///
/// All membership operations are idempotent with respect to repeated
/// calls.
pub trait Reactor {
    /// Adds a source. Returns `true` when the source was not already
    /// registered (i.e. on state change).
    fn add_source(&self, src: &SourceRef) -> bool;

    /// Removes a source. Returns `true` when the source was registered.
    /// The source itself is not destroyed; only the scheduling
    /// relationship is broken.
    fn remove_source(&self, src: &SourceRef) -> bool;

    /// Called by a source after a non-primed to primed transition, so the
    /// dispatcher can re-schedule it. The source must not be borrowed
    /// when it announces the transition; the dispatcher reads its state.
    fn notify_source_primed(&self, src: &SourceRef);

    /// Advances by one event; returns the count dispatched (0 or 1).
    fn run_one(&self) -> u64;

    /// Calls [`Reactor::run_one`] in a loop. `n = -1` runs forever; any
    /// other negative count dispatches nothing. Returns the total
    /// dispatched.
    fn run_n(&self, n: i64) -> u64 {
        let mut dispatched: u64 = 0;

        if n == -1 {
            loop {
                dispatched = dispatched.saturating_add(self.run_one());
            }
        }

        for _ in 0..n.max(0) {
            dispatched += self.run_one();
        }

        dispatched
    }
}
