//! Per-point fan-out and synchronization.

use std::collections::BTreeMap;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use waypoint_judge::Judge;
use waypoint_types::{CoreConfig, Decision, Point, WorkerKind};

use crate::error::EngineError;
use crate::queue::SmartQueue;
use crate::runner::run_worker;
use crate::worker::{ContentWorker, ErrorClassifier};

/// Runs one fan-out per point and synchronizes it through a queue.
///
/// Shared across all in-flight points; per-point state lives entirely in
/// [`Orchestrator::run_point`]'s scope, so overlapping points never touch
/// each other's queues.
pub(crate) struct Orchestrator {
    config: CoreConfig,
    pub(crate) workers: BTreeMap<WorkerKind, Arc<dyn ContentWorker>>,
    judge: Judge,
    classifier: Arc<dyn ErrorClassifier>,
    /// Caps concurrently executing worker tasks across all points.
    pool: Arc<Semaphore>,
}

impl Orchestrator {
    pub(crate) fn new(
        config: CoreConfig,
        workers: BTreeMap<WorkerKind, Arc<dyn ContentWorker>>,
        judge: Judge,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Self {
        let pool = Arc::new(Semaphore::new(config.worker_pool_size));
        Self {
            config,
            workers,
            judge,
            classifier,
            pool,
        }
    }

    /// Fan out, await the queue, judge, and tear down.
    ///
    /// The queue's deadlines start here, so pool saturation eats into a
    /// point's budget: bounded latency is measured from the moment the
    /// point entered the pipeline.
    pub(crate) async fn run_point(
        &self,
        point: Point,
        cancel: &CancellationToken,
    ) -> Result<Decision, EngineError> {
        let queue = Arc::new(SmartQueue::new(
            &self.config.kinds,
            self.config.soft_deadline,
            self.config.hard_deadline,
            self.config.soft_min,
            self.config.hard_min,
        ));
        // One scope per point: cancelling it stops this point's workers
        // without touching any other in-flight point.
        let scope = cancel.child_token();
        let mut tasks = JoinSet::new();

        for kind in &self.config.kinds {
            let worker = self
                .workers
                .get(kind)
                .cloned()
                .ok_or(EngineError::MissingWorker { kind: *kind })?;
            let permit = tokio::select! {
                permit = self.pool.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = scope.cancelled() => break,
            };
            debug!(point = %point.key, %kind, "launching worker");
            let worker_point = point.clone();
            let worker_queue = queue.clone();
            let retry = self.config.retry.clone();
            let classifier = self.classifier.clone();
            let token = scope.clone();
            tasks.spawn(async move {
                let _permit = permit;
                run_worker(worker, worker_point, worker_queue, retry, classifier, token).await;
            });
        }

        let mut wait = pin!(queue.wait());
        let collected = tokio::select! {
            result = &mut wait => Some(result),
            _ = cancel.cancelled() => None,
        };
        let (successes, status) = match collected {
            Some(result) => result?,
            // Shutdown: terminate the queue as if the hard deadline had just
            // elapsed, then let the (already registered) awaiter drain it.
            None => {
                queue.cancel();
                wait.await?
            }
        };
        debug!(point = %point.key, %status, successes = successes.len(), "queue terminal");

        // Stragglers stop here; the terminated queue ignores whatever they
        // still submit. Dropping the join set aborts anything that outlives
        // the token check.
        scope.cancel();
        drop(tasks);

        Ok(self.judge.decide(&point, &successes, status))
    }
}
