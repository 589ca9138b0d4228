use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of a per-point collection queue.
///
/// Degradation is a normal result, not an error: every status except
/// `Failed` carries at least one usable candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Every configured kind produced a success.
    Complete,
    /// The soft deadline elapsed with at least `soft_min` successes.
    SoftDegraded,
    /// The hard deadline elapsed with at least `hard_min` successes.
    HardDegraded,
    /// Fewer than `hard_min` successes by the hard deadline.
    Failed,
}

impl QueueStatus {
    /// Status when every expected kind has submitted an outcome.
    ///
    /// This is the full-set ladder: `Complete` only when every outcome was a
    /// success, otherwise the highest degradation tier the success count
    /// still clears. Takes priority over deadline-driven termination, so a
    /// simultaneously-arriving full set is never reported degraded when all
    /// of it succeeded.
    pub fn at_full_set(successes: usize, kinds: usize, soft_min: usize, hard_min: usize) -> Self {
        debug_assert!(soft_min <= kinds && hard_min <= soft_min);
        if successes == kinds {
            Self::Complete
        } else if successes >= soft_min {
            Self::SoftDegraded
        } else if successes >= hard_min {
            Self::HardDegraded
        } else {
            Self::Failed
        }
    }

    /// Status when the hard deadline elapses (or the queue is cancelled).
    ///
    /// The soft tier is unreachable here: at the hard deadline the only
    /// question is whether enough successes exist to return anything at all.
    pub fn at_hard_deadline(successes: usize, hard_min: usize) -> Self {
        if successes >= hard_min {
            Self::HardDegraded
        } else {
            Self::Failed
        }
    }

    /// Whether any candidate survived collection.
    pub fn has_results(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    /// Returns the status name as a static string for logs and assertions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::SoftDegraded => "soft-degraded",
            Self::HardDegraded => "hard-degraded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
