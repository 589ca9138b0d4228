//! Per-point collection queue with tiered timeouts.
//!
//! One queue exists per point. Worker tasks `submit` at most one outcome per
//! kind; a single awaiter blocks in [`SmartQueue::wait`] until a termination
//! rule fires. Termination rules, in priority order against the success and
//! failure counts `(s, f)` and elapsed time `e`:
//!
//! 1. **All in**: `s + f = n` terminates immediately; `Complete` iff
//!    `s = n`, else the degradation ladder on `s`. Wins even when a
//!    deadline has already elapsed, so a simultaneously-arriving full set
//!    is never degraded.
//! 2. **Hard deadline**: `e >= hard` terminates with `HardDegraded` if
//!    `s >= hard_min`, else `Failed`.
//! 3. **Soft deadline**: `e >= soft` and `s >= soft_min` terminates with
//!    `SoftDegraded`.
//! 4. Otherwise wait, bounded by the nearer remaining deadline.
//!
//! The queue is a plain mutex-guarded state machine plus a wakeup. The
//! mutex is never held across a suspension point, and the awaiter never
//! holds it while running user code.

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{self, Instant};
use tracing::debug;
use waypoint_types::{Candidate, FailureReason, QueueStatus, WorkerKind, WorkerOutcome};

use crate::error::EngineError;

#[derive(Debug, Default)]
struct QueueState {
    successes: BTreeMap<WorkerKind, Candidate>,
    failures: BTreeMap<WorkerKind, FailureReason>,
    terminal: Option<QueueStatus>,
}

/// The per-point synchronization monitor.
///
/// Timing is driven by the runtime clock (`tokio::time`); tests pause it to
/// make every deadline deterministic.
pub struct SmartQueue {
    kinds: BTreeSet<WorkerKind>,
    soft_min: usize,
    hard_min: usize,
    soft_at: Instant,
    hard_at: Instant,
    state: Mutex<QueueState>,
    wakeup: Notify,
    awaited: AtomicBool,
}

impl SmartQueue {
    /// Create a queue expecting one outcome per kind in `kinds`.
    ///
    /// Deadlines are measured from this call. The caller is responsible for
    /// having validated `soft < hard` and
    /// `1 <= hard_min <= soft_min <= kinds.len()`.
    pub fn new(
        kinds: &[WorkerKind],
        soft: Duration,
        hard: Duration,
        soft_min: usize,
        hard_min: usize,
    ) -> Self {
        let created = Instant::now();
        debug_assert!(!kinds.is_empty() && soft < hard);
        debug_assert!(1 <= hard_min && hard_min <= soft_min && soft_min <= kinds.len());
        Self {
            kinds: kinds.iter().copied().collect(),
            soft_min,
            hard_min,
            soft_at: created + soft,
            hard_at: created + hard,
            state: Mutex::new(QueueState::default()),
            wakeup: Notify::new(),
            awaited: AtomicBool::new(false),
        }
    }

    /// Record the outcome for `kind` and wake the awaiter.
    ///
    /// Returns whether the outcome was accepted. Submissions after
    /// termination, for an unexpected kind, or for a kind that already has
    /// an outcome are ignored. None of those are errors: workers race the
    /// deadlines and lose quietly.
    pub fn submit(&self, kind: WorkerKind, outcome: WorkerOutcome) -> bool {
        let mut state = self.state.lock();
        if state.terminal.is_some() {
            debug!(%kind, "submission after termination ignored");
            return false;
        }
        if !self.kinds.contains(&kind) {
            debug!(%kind, "submission for unexpected kind ignored");
            return false;
        }
        if state.successes.contains_key(&kind) || state.failures.contains_key(&kind) {
            debug!(%kind, "duplicate submission ignored");
            return false;
        }

        match outcome {
            WorkerOutcome::Success(candidate) => {
                state.successes.insert(kind, candidate);
            }
            WorkerOutcome::Failure(reason) => {
                debug!(%kind, %reason, "failure outcome recorded");
                state.failures.insert(kind, reason);
            }
        }

        // Rule 1: a full set terminates immediately, ahead of any deadline.
        if state.successes.len() + state.failures.len() == self.kinds.len() {
            let status = QueueStatus::at_full_set(
                state.successes.len(),
                self.kinds.len(),
                self.soft_min,
                self.hard_min,
            );
            state.terminal = Some(status);
            debug!(%status, "queue terminal: all outcomes in");
        }
        drop(state);
        self.wakeup.notify_one();
        true
    }

    /// Force termination with the status the hard deadline would produce
    /// for the current counts. Idempotent; wakes the awaiter.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        if state.terminal.is_none() {
            let status = QueueStatus::at_hard_deadline(state.successes.len(), self.hard_min);
            state.terminal = Some(status);
            debug!(%status, "queue cancelled");
        }
        drop(state);
        self.wakeup.notify_one();
    }

    /// Block until a termination rule fires; return the collected successes
    /// and the terminal status.
    ///
    /// Single-awaiter: a second call returns
    /// [`EngineError::QueueAlreadyAwaited`]. Returns within the hard
    /// deadline of queue creation for any worker behaviour.
    pub async fn wait(
        &self,
    ) -> Result<(BTreeMap<WorkerKind, Candidate>, QueueStatus), EngineError> {
        if self.awaited.swap(true, Ordering::SeqCst) {
            return Err(EngineError::QueueAlreadyAwaited);
        }

        loop {
            // Register for wakeup before inspecting state, so a submission
            // landing between the check and the sleep still wakes us.
            let notified = pin!(self.wakeup.notified());
            {
                let mut state = self.state.lock();
                if let Some(status) = state.terminal {
                    return Ok((Self::drain(&mut state, status), status));
                }
                let now = Instant::now();
                if now >= self.hard_at {
                    let status =
                        QueueStatus::at_hard_deadline(state.successes.len(), self.hard_min);
                    state.terminal = Some(status);
                    debug!(%status, "queue terminal: hard deadline");
                    return Ok((Self::drain(&mut state, status), status));
                }
                if now >= self.soft_at && state.successes.len() >= self.soft_min {
                    let status = QueueStatus::SoftDegraded;
                    state.terminal = Some(status);
                    debug!(%status, "queue terminal: soft deadline");
                    return Ok((Self::drain(&mut state, status), status));
                }
            }

            let next_deadline = if Instant::now() < self.soft_at {
                self.soft_at
            } else {
                self.hard_at
            };
            tokio::select! {
                _ = notified => {}
                _ = time::sleep_until(next_deadline) => {}
            }
        }
    }

    /// Take the result set for a terminal status. `Failed` returns no
    /// results even when stragglers below `hard_min` exist.
    fn drain(state: &mut QueueState, status: QueueStatus) -> BTreeMap<WorkerKind, Candidate> {
        if status.has_results() {
            std::mem::take(&mut state.successes)
        } else {
            BTreeMap::new()
        }
    }
}
