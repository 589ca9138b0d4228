use crate::decision::Criterion;
use crate::error::ConfigError;
use crate::kind::WorkerKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Worker retry policy applied between `produce` attempts.
///
/// The delay before attempt `a + 1` is
/// `min(base_delay * backoff_base^a * (1 + jitter), max_delay)` with
/// `jitter` sampled uniformly from `[0, jitter_fraction]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt, so `max_retries + 1` attempts total.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_base: f64,
    pub max_delay: Duration,
    /// Upper bound of the uniform jitter term, as a fraction of the delay.
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            backoff_base: 2.0,
            max_delay: Duration::from_secs(10),
            jitter_fraction: 0.25,
        }
    }
}

impl RetryConfig {
    /// The backoff delay before retrying after failed attempt `attempt`
    /// (0-indexed).
    ///
    /// `jitter_unit` is the sampled uniform variate in `[0, 1]`; passing it
    /// in keeps this function total and deterministic for tests. The caller
    /// samples it once per sleep.
    pub fn delay_for(&self, attempt: u32, jitter_unit: f64) -> Duration {
        debug_assert!((0.0..=1.0).contains(&jitter_unit));
        let exponential = self.base_delay.as_secs_f64() * self.backoff_base.powi(attempt as i32);
        let jittered = exponential * (1.0 + jitter_unit * self.jitter_fraction);
        Duration::from_secs_f64(jittered.min(self.max_delay.as_secs_f64()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.jitter_fraction) {
            return Err(ConfigError::InvalidJitterFraction {
                value: self.jitter_fraction,
            });
        }
        if self.backoff_base < 1.0 || !self.backoff_base.is_finite() {
            return Err(ConfigError::InvalidBackoffBase {
                value: self.backoff_base,
            });
        }
        Ok(())
    }
}

/// Pacing mode for point emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerMode {
    /// Emit all points as fast as the worker pool allows.
    Batch,
    /// Emit point `i + 1` exactly `interval` after point `i`, regardless of
    /// whether point `i` finished processing.
    Streaming,
}

/// Point-emission pacing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub mode: SchedulerMode,
    /// Inter-emission delay. Only meaningful in streaming mode.
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: SchedulerMode::Batch,
            interval: Duration::ZERO,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == SchedulerMode::Streaming && self.interval.is_zero() {
            return Err(ConfigError::ZeroStreamingInterval);
        }
        Ok(())
    }
}

/// The four fixed criterion weights of the scoring rubric. Must sum to 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RubricWeights {
    pub location_relevance: f64,
    pub profile_match: f64,
    pub content_quality: f64,
    pub engagement: f64,
}

impl Default for RubricWeights {
    fn default() -> Self {
        Self {
            location_relevance: 0.30,
            profile_match: 0.25,
            content_quality: 0.25,
            engagement: 0.20,
        }
    }
}

impl RubricWeights {
    /// The weight of one criterion.
    pub fn weight(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::LocationRelevance => self.location_relevance,
            Criterion::ProfileMatch => self.profile_match,
            Criterion::ContentQuality => self.content_quality,
            Criterion::Engagement => self.engagement,
        }
    }

    pub fn sum(&self) -> f64 {
        Criterion::ALL.iter().map(|c| self.weight(*c)).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for criterion in Criterion::ALL {
            let weight = self.weight(criterion);
            if weight < 0.0 || !weight.is_finite() {
                return Err(ConfigError::NegativeWeight { criterion, weight });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightsNotNormalized { sum });
        }
        Ok(())
    }
}

/// Frozen pipeline configuration, validated once at construction.
///
/// There are no process-wide singletons: everything timing- or
/// selection-related flows through this record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// The kinds fanned out per point. Defines `n = kinds.len()`.
    pub kinds: Vec<WorkerKind>,
    /// Earliest time partial results may be returned.
    pub soft_deadline: Duration,
    /// Absolute upper bound on per-point collection latency.
    pub hard_deadline: Duration,
    /// Minimum successes required to return at the soft deadline.
    pub soft_min: usize,
    /// Minimum successes required to return at the hard deadline.
    pub hard_min: usize,
    pub retry: RetryConfig,
    /// Cap on concurrently executing worker tasks across all points.
    pub worker_pool_size: usize,
    pub scheduler: SchedulerConfig,
    pub weights: RubricWeights,
}

impl CoreConfig {
    /// Create a configuration with defaults derived from the kind set:
    /// `soft_min = ceil(2n/3)`, `hard_min = 1`, pool sized for overlap.
    pub fn new(kinds: Vec<WorkerKind>, soft_deadline: Duration, hard_deadline: Duration) -> Self {
        let n = kinds.len();
        Self {
            kinds,
            soft_deadline,
            hard_deadline,
            soft_min: default_soft_min(n),
            hard_min: 1,
            retry: RetryConfig::default(),
            worker_pool_size: default_pool_size(n),
            scheduler: SchedulerConfig::default(),
            weights: RubricWeights::default(),
        }
    }

    /// Checks every construction-time constraint. Called by the pipeline
    /// builder before any point is processed; a violation is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kinds.is_empty() {
            return Err(ConfigError::EmptyKindSet);
        }
        let mut seen = BTreeSet::new();
        for kind in &self.kinds {
            if !seen.insert(*kind) {
                return Err(ConfigError::DuplicateKind { kind: *kind });
            }
        }
        if self.soft_deadline.is_zero() || self.soft_deadline >= self.hard_deadline {
            return Err(ConfigError::DeadlinesOutOfOrder {
                soft: self.soft_deadline,
                hard: self.hard_deadline,
            });
        }
        let n = self.kinds.len();
        if self.hard_min < 1 || self.hard_min > self.soft_min || self.soft_min > n {
            return Err(ConfigError::ThresholdsOutOfOrder {
                hard_min: self.hard_min,
                soft_min: self.soft_min,
                kinds: n,
            });
        }
        if self.worker_pool_size == 0 {
            return Err(ConfigError::EmptyWorkerPool);
        }
        self.retry.validate()?;
        self.scheduler.validate()?;
        self.weights.validate()?;
        Ok(())
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(
            WorkerKind::ALL.to_vec(),
            Duration::from_secs(15),
            Duration::from_secs(30),
        )
    }
}

/// `ceil(2n/3)`: the default soft-minimum threshold.
fn default_soft_min(kinds: usize) -> usize {
    (2 * kinds).div_ceil(3)
}

/// `min(n * 4, cpu_count * 4)`, but never below `n` so a single point can
/// always fan out fully.
fn default_pool_size(kinds: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    (kinds * 4).min(cpus * 4).max(kinds)
}
