use crate::candidate::Candidate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical category for a worker failure.
///
/// Coarse-grained on purpose: it drives retry policy upstream of the queue
/// and the observability dimensions of failure logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// A transient upstream error exhausted its retry budget.
    ///
    /// Examples: I/O timeout, throttling, temporary unavailability.
    Transient,
    /// A non-retryable error.
    ///
    /// Examples: configuration errors, permission denials, invalid inputs.
    Terminal,
    /// The worker was cancelled before producing an outcome.
    ///
    /// A control-flow decision, not a fault. Never logged as an error.
    Cancelled,
}

/// Structured reason attached to a `Failure` outcome.
///
/// Replaces raw string errors with a stable shape that is easy to:
/// - classify (`kind`) for policy and log dimensions,
/// - render (`message`) for user-facing summaries,
/// - enrich (`detail`) with optional low-level diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// Coarse failure category.
    pub kind: FailureKind,
    /// Human-readable summary safe to display in normal logs.
    pub message: String,
    /// Optional diagnostic detail for deep triage. Omit when nothing useful
    /// exists beyond the message.
    pub detail: Option<String>,
}

impl FailureReason {
    /// Creates a [`FailureReason`] with required fields only.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// The canonical cancellation reason.
    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "cancelled")
    }

    /// Adds or replaces the optional diagnostic detail. Last value wins.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(ref detail) = self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Terminal result of one worker execution for one `(point, kind)` pair.
///
/// At most one outcome per kind is admitted by the queue; whatever a worker
/// does after submitting is invisible to the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WorkerOutcome {
    /// The worker produced a candidate.
    Success(Candidate),
    /// The worker failed terminally (including retry exhaustion and
    /// cancellation).
    Failure(FailureReason),
}

impl WorkerOutcome {
    /// Whether this outcome carries a candidate.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The candidate, if this outcome is a success.
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Success(candidate) => Some(candidate),
            Self::Failure(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail_when_present() {
        let bare = FailureReason::new(FailureKind::Terminal, "bad credentials");
        assert_eq!(bare.to_string(), "Terminal: bad credentials");

        let detailed = bare.with_detail("HTTP 403 from upstream");
        assert_eq!(
            detailed.to_string(),
            "Terminal: bad credentials (HTTP 403 from upstream)"
        );
    }

    #[test]
    fn cancelled_constructor_uses_canonical_message() {
        let reason = FailureReason::cancelled();
        assert_eq!(reason.kind, FailureKind::Cancelled);
        assert_eq!(reason.message, "cancelled");
        assert_eq!(reason.detail, None);
    }
}
