use crate::decision::Criterion;
use crate::kind::WorkerKind;
use std::time::Duration;

/// A construction-time configuration violation.
///
/// Detected by [`crate::CoreConfig::validate`] before any point is
/// processed; every variant is fatal.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("worker kind set is empty")]
    EmptyKindSet,
    #[error("worker kind {kind} configured more than once")]
    DuplicateKind { kind: WorkerKind },
    #[error("deadlines out of order: soft deadline {soft:?} must be positive and below hard deadline {hard:?}")]
    DeadlinesOutOfOrder { soft: Duration, hard: Duration },
    #[error(
        "success thresholds out of order: need 1 <= hard_min ({hard_min}) <= soft_min ({soft_min}) <= kinds ({kinds})"
    )]
    ThresholdsOutOfOrder {
        hard_min: usize,
        soft_min: usize,
        kinds: usize,
    },
    #[error("rubric weights sum to {sum}, expected 1.0")]
    WeightsNotNormalized { sum: f64 },
    #[error("rubric weight for {criterion} is {weight}, expected a finite non-negative value")]
    NegativeWeight { criterion: Criterion, weight: f64 },
    #[error("jitter fraction {value} outside [0, 1]")]
    InvalidJitterFraction { value: f64 },
    #[error("backoff base {value} must be a finite value of at least 1.0")]
    InvalidBackoffBase { value: f64 },
    #[error("worker pool size must be at least 1")]
    EmptyWorkerPool,
    #[error("streaming mode requires a positive emission interval")]
    ZeroStreamingInterval,
}
