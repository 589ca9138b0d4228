//! Binds one worker to one queue: attempt, classify, back off, submit.

use rand::Rng;
use std::sync::Arc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use waypoint_types::{FailureKind, FailureReason, Point, RetryConfig, WorkerOutcome};

use crate::queue::SmartQueue;
use crate::worker::{ContentWorker, ErrorClassifier};

/// Execute one `(point, kind)` fulfilment to completion.
///
/// Exactly one outcome is submitted per invocation: the first success, a
/// structured failure after classification/exhaustion, or a cancellation
/// marker. Errors never propagate out of this function. Cancellation is
/// honoured at every suspension point, including inside backoff sleeps.
pub(crate) async fn run_worker(
    worker: Arc<dyn ContentWorker>,
    point: Point,
    queue: Arc<SmartQueue>,
    retry: RetryConfig,
    classifier: Arc<dyn ErrorClassifier>,
    cancel: CancellationToken,
) {
    let kind = worker.kind();
    let mut attempt: u32 = 0;
    loop {
        let produced = tokio::select! {
            result = worker.produce(&point) => result,
            _ = cancel.cancelled() => {
                debug!(%kind, point = %point.key, "worker cancelled mid-produce");
                queue.submit(kind, WorkerOutcome::Failure(FailureReason::cancelled()));
                return;
            }
        };

        let error = match produced {
            Ok(candidate) => {
                queue.submit(kind, WorkerOutcome::Success(candidate));
                return;
            }
            Err(error) => error,
        };

        if classifier.is_transient(&error) {
            if attempt < retry.max_retries {
                let jitter_unit: f64 = rand::rng().random_range(0.0..=1.0);
                let delay = retry.delay_for(attempt, jitter_unit);
                debug!(
                    %kind,
                    point = %point.key,
                    attempt,
                    ?delay,
                    error = %error,
                    "transient failure, backing off"
                );
                tokio::select! {
                    _ = time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        debug!(%kind, point = %point.key, "worker cancelled in backoff");
                        queue.submit(kind, WorkerOutcome::Failure(FailureReason::cancelled()));
                        return;
                    }
                }
                attempt += 1;
                continue;
            }
            warn!(%kind, point = %point.key, error = %error, "retry budget exhausted");
            queue.submit(
                kind,
                WorkerOutcome::Failure(
                    FailureReason::new(FailureKind::Transient, "retry budget exhausted")
                        .with_detail(error.to_string()),
                ),
            );
        } else {
            warn!(%kind, point = %point.key, error = %error, "terminal worker failure");
            queue.submit(
                kind,
                WorkerOutcome::Failure(FailureReason::new(
                    FailureKind::Terminal,
                    error.to_string(),
                )),
            );
        }
        return;
    }
}
