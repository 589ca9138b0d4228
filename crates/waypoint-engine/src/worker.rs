//! The worker plug-in contract and error classification boundary.

use async_trait::async_trait;
use std::fmt;
use waypoint_types::{Candidate, Point, WorkerKind};

/// A content producer for one modality.
///
/// `produce` is the only required method. It may take as long as it likes;
/// the per-point queue deadline is the only bound, and the runner's
/// cancellation token is the only interrupt. Implementations must not retry
/// internally; transient errors are retried by the runner according to the
/// configured policy.
#[async_trait]
pub trait ContentWorker: Send + Sync {
    /// The modality this worker produces. Registered once per kind.
    fn kind(&self) -> WorkerKind;

    /// Produce one candidate for `point`.
    ///
    /// Errors are classified transient/terminal by the pipeline's
    /// [`ErrorClassifier`]; mark retryable failures with [`TransientError`]
    /// (or leave an `std::io::Error` in the chain for the default
    /// classifier).
    async fn produce(&self, point: &Point) -> anyhow::Result<Candidate>;

    /// Release held resources. Called once per worker when the pipeline
    /// finishes or is shut down.
    async fn close(&self) {}
}

/// Marker error for failures worth retrying.
///
/// Workers wrap throttling responses, upstream timeouts and the like in
/// this type; the default classifier recognizes it anywhere in an error
/// chain.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransientError {
    message: String,
}

impl TransientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Classifies a worker error once, at the boundary between `produce` and
/// the retry loop.
pub trait ErrorClassifier: Send + Sync {
    fn is_transient(&self, error: &anyhow::Error) -> bool;
}

impl fmt::Debug for dyn ErrorClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorClassifier").finish_non_exhaustive()
    }
}

/// Default policy: [`TransientError`] markers and interrupted/timed-out
/// I/O are transient; everything else is terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn is_transient(&self, error: &anyhow::Error) -> bool {
        if error.downcast_ref::<TransientError>().is_some() {
            return true;
        }
        if let Some(io) = error.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            );
        }
        false
    }
}
