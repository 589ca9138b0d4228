use waypoint_types::{ConfigError, WorkerKind};

/// Errors produced by pipeline construction and execution.
///
/// Everything here is fatal and detected either before any point is
/// processed (configuration and registration variants) or on an internal
/// contract violation. Degraded collection is never an error; it travels as
/// a status on the decision.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("worker for kind {kind} registered more than once")]
    DuplicateWorker { kind: WorkerKind },
    #[error("no worker registered for configured kind {kind}")]
    MissingWorker { kind: WorkerKind },
    #[error("queue awaited more than once")]
    QueueAlreadyAwaited,
    #[error("point task failed: {0}")]
    PointTask(String),
    #[error("collector still shared at shutdown")]
    CollectorShared,
}
