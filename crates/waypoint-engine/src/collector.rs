//! Emission-ordered decision sink.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;
use waypoint_types::{Decision, Playlist};

#[derive(Debug, Default)]
struct CollectorState {
    /// Next sequence number the ordered tail is waiting for.
    next: u64,
    /// Decisions that arrived ahead of their turn, keyed by sequence.
    pending: BTreeMap<u64, Decision>,
    /// The in-order prefix.
    ordered: Vec<Decision>,
}

/// Re-imposes scheduler-emission order on decisions that complete out of
/// order.
///
/// `commit` buffers a decision under its sequence number and drains the
/// contiguous prefix, so each decision is moved exactly once. Snapshotting
/// consumes the collector, which is what makes "callable once, at shutdown"
/// hold by construction.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    state: Mutex<CollectorState>,
}

impl Collector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Buffer `decision` under its emission sequence number.
    pub(crate) fn commit(&self, sequence: u64, decision: Decision) {
        let mut state = self.state.lock();
        debug_assert!(
            sequence >= state.next && !state.pending.contains_key(&sequence),
            "sequence {sequence} committed twice"
        );
        debug!(sequence, point = %decision.point.key, status = %decision.status, "decision committed");
        state.pending.insert(sequence, decision);
        loop {
            let next = state.next;
            match state.pending.remove(&next) {
                Some(ready) => {
                    state.ordered.push(ready);
                    state.next += 1;
                }
                None => break,
            }
        }
    }

    /// Decisions committed so far (ordered prefix plus early arrivals).
    pub(crate) fn committed(&self) -> usize {
        let state = self.state.lock();
        state.ordered.len() + state.pending.len()
    }

    /// The final playlist, in emission order.
    ///
    /// Callers must have joined every committing task first; a gap in the
    /// sequence means an emitted point never produced a decision, which the
    /// orchestrator rules out.
    pub(crate) fn into_playlist(self) -> Playlist {
        let state = self.state.into_inner();
        debug_assert!(
            state.pending.is_empty(),
            "sequence gap left {} decisions unordered",
            state.pending.len()
        );
        Playlist::new(state.ordered)
    }
}
