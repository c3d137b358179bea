//! Heap entry pairing a source with its scheduled timestamp.

use std::cmp::Ordering;
use std::fmt;

use driftline_reactor::SourceRef;
use driftline_types::Timestamp;

/// One simulation-heap entry: a source keyed by the timestamp of its
/// next event.
///
/// The timestamp is copied out of the source at insert time so heap
/// invariants hold without relying on any behavior of the source while
/// it sits in the heap.
///
/// Ties between sources with identical timestamps are broken by `seq`,
/// the monotone sequence number the simulator assigns at registration.
/// That makes the order total and deterministic given a fixed
/// source-registration order.
#[derive(Clone)]
pub struct SourceTimestamp {
    tm: Timestamp,
    seq: u64,
    src: SourceRef,
}

impl SourceTimestamp {
    pub(crate) fn new(tm: Timestamp, seq: u64, src: SourceRef) -> Self {
        Self { tm, seq, src }
    }

    /// Scheduled timestamp for this entry's source.
    pub fn tm(&self) -> Timestamp {
        self.tm
    }

    /// Registration sequence number of the source.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn src(&self) -> &SourceRef {
        &self.src
    }
}

impl PartialEq for SourceTimestamp {
    fn eq(&self, other: &Self) -> bool {
        self.tm == other.tm && self.seq == other.seq
    }
}

impl Eq for SourceTimestamp {}

impl PartialOrd for SourceTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tm.cmp(&other.tm).then_with(|| self.seq.cmp(&other.seq))
    }
}

impl fmt::Debug for SourceTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .src
            .try_borrow()
            .map(|s| s.name().to_owned())
            .unwrap_or_else(|_| "<in delivery>".to_owned());

        f.debug_struct("SourceTimestamp")
            .field("tm", &self.tm)
            .field("seq", &self.seq)
            .field("src", &name)
            .finish()
    }
}
