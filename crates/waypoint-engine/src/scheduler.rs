//! Pipeline assembly and the pacing scheduler.
//!
//! [`Pipeline`] owns the whole run: it validates configuration up front,
//! drives points into the orchestrator at the configured cadence, owns the
//! cancellation root, and returns the ordered playlist when the route is
//! exhausted or shut down.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use waypoint_judge::{Judge, Scorer};
use waypoint_types::{CoreConfig, Playlist, Point, Profile, SchedulerConfig, SchedulerMode};

use crate::collector::Collector;
use crate::error::EngineError;
use crate::orchestrator::Orchestrator;
use crate::worker::{ContentWorker, DefaultClassifier, ErrorClassifier};

/// Cancels a running pipeline from outside `run`.
///
/// Cloning is cheap; every clone aborts the same run. Shutting down stops
/// future emissions, cancels in-flight workers, and forces open queues to
/// terminate as if their hard deadline had just elapsed. Every already
/// emitted point still yields a decision.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

/// Assembles a [`Pipeline`], validating everything before the first point.
pub struct PipelineBuilder {
    config: CoreConfig,
    profile: Profile,
    workers: Vec<Arc<dyn ContentWorker>>,
    scorer: Option<Arc<dyn Scorer>>,
    classifier: Option<Arc<dyn ErrorClassifier>>,
}

impl PipelineBuilder {
    /// Register a worker. Each configured kind needs exactly one.
    pub fn worker(mut self, worker: Arc<dyn ContentWorker>) -> Self {
        self.workers.push(worker);
        self
    }

    /// Replace the default heuristic scorer.
    pub fn scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Replace the default transient-error policy.
    pub fn classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Validate configuration and registration; a violation here is fatal
    /// before any point is processed.
    pub fn build(self) -> Result<Pipeline, EngineError> {
        self.config.validate()?;

        let mut workers: BTreeMap<_, Arc<dyn ContentWorker>> = BTreeMap::new();
        for worker in self.workers {
            let kind = worker.kind();
            if workers.insert(kind, worker).is_some() {
                return Err(EngineError::DuplicateWorker { kind });
            }
        }
        for kind in &self.config.kinds {
            if !workers.contains_key(kind) {
                return Err(EngineError::MissingWorker { kind: *kind });
            }
        }

        let judge = match self.scorer {
            Some(scorer) => Judge::with_scorer(self.profile, self.config.weights, scorer),
            None => Judge::new(self.profile, self.config.weights),
        };
        let scheduler = self.config.scheduler;
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(DefaultClassifier));
        let orchestrator = Arc::new(Orchestrator::new(self.config, workers, judge, classifier));

        Ok(Pipeline {
            orchestrator,
            scheduler,
            cancel: CancellationToken::new(),
        })
    }
}

/// One configured run over one route.
pub struct Pipeline {
    orchestrator: Arc<Orchestrator>,
    scheduler: SchedulerConfig,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn builder(config: CoreConfig, profile: Profile) -> PipelineBuilder {
        PipelineBuilder {
            config,
            profile,
            workers: Vec::new(),
            scorer: None,
            classifier: None,
        }
    }

    /// A handle that aborts this run from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            token: self.cancel.clone(),
        }
    }

    /// Drive `points` through the pipeline and return the ordered playlist.
    ///
    /// Consumes the pipeline: one pipeline, one route, one playlist. Every
    /// emitted point yields exactly one decision, shutdown included. Worker
    /// `close` hooks run once before this returns.
    pub async fn run<I>(self, points: I) -> Result<Playlist, EngineError>
    where
        I: IntoIterator<Item = Point>,
    {
        info!(mode = ?self.scheduler.mode, "pipeline run starting");
        let collector = Arc::new(Collector::new());
        let mut tasks: JoinSet<Result<(), EngineError>> = JoinSet::new();
        let mut emitted: u64 = 0;

        for point in points {
            if self.cancel.is_cancelled() {
                break;
            }
            if emitted > 0 && self.scheduler.mode == SchedulerMode::Streaming {
                let paced = tokio::select! {
                    _ = time::sleep(self.scheduler.interval) => true,
                    _ = self.cancel.cancelled() => false,
                };
                if !paced {
                    break;
                }
            }

            let sequence = emitted;
            emitted += 1;
            debug!(sequence, point = %point, "point emitted");

            let orchestrator = self.orchestrator.clone();
            let sink = collector.clone();
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                let decision = orchestrator.run_point(point, &cancel).await?;
                sink.commit(sequence, decision);
                Ok(())
            });
        }

        let mut failure: Option<EngineError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    failure.get_or_insert(error);
                }
                Err(join_error) if join_error.is_cancelled() => {}
                Err(join_error) => {
                    failure.get_or_insert(EngineError::PointTask(join_error.to_string()));
                }
            }
        }

        debug!(decisions = collector.committed(), "all point tasks joined");
        for worker in self.orchestrator.workers.values() {
            worker.close().await;
        }

        if let Some(error) = failure {
            return Err(error);
        }

        let collector = Arc::into_inner(collector).ok_or(EngineError::CollectorShared)?;
        let playlist = collector.into_playlist();
        info!(decisions = playlist.len(), "pipeline run finished");
        Ok(playlist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{KindScorer, ScriptStep, ScriptedWorker};
    use similar_asserts::assert_eq;
    use std::time::Duration;
    use tokio::time::Instant;
    use waypoint_types::{QueueStatus, RetryConfig, WorkerKind};

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    /// The three-kind deployment from the deployment defaults: 15s/30s
    /// deadlines, soft_min 2, hard_min 1, jitter disabled for exact timing.
    fn config() -> CoreConfig {
        let mut config = CoreConfig::default();
        config.retry = RetryConfig {
            jitter_fraction: 0.0,
            ..RetryConfig::default()
        };
        config
    }

    fn worker(kind: WorkerKind, steps: impl IntoIterator<Item = ScriptStep>) -> Arc<ScriptedWorker> {
        Arc::new(ScriptedWorker::new(kind, steps))
    }

    fn point(key: &str) -> Point {
        Point::new(key, key.to_uppercase())
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn complete_point_selects_the_top_scored_candidate() {
        // Totals under default weights: visual 6.4, audio 7.1, textual 8.0.
        let scorer = KindScorer(
            [
                (WorkerKind::Visual, [6.0, 6.0, 6.0, 8.0]),
                (WorkerKind::Audio, [7.0, 7.0, 7.0, 7.5]),
                (WorkerKind::Textual, [8.0, 10.0, 7.0, 6.75]),
            ]
            .into_iter()
            .collect(),
        );
        let pipeline = Pipeline::builder(config(), Profile::default())
            .worker(worker(WorkerKind::Visual, [ScriptStep::succeed(secs(2), "drone tour")]))
            .worker(worker(WorkerKind::Audio, [ScriptStep::succeed(secs(2), "narration")]))
            .worker(worker(WorkerKind::Textual, [ScriptStep::succeed(secs(2), "story")]))
            .scorer(Arc::new(scorer))
            .build()
            .unwrap();

        let started = Instant::now();
        let playlist = pipeline.run([point("p0")]).await.unwrap();

        assert_eq!(started.elapsed(), secs(2));
        assert_eq!(playlist.len(), 1);
        let decision = &playlist.entries[0];
        assert_eq!(decision.status, QueueStatus::Complete);
        assert_eq!(decision.winner.as_ref().unwrap().kind, WorkerKind::Textual);
        assert_eq!(decision.rationale, "profile-match");
        assert_eq!(decision.scores.len(), 3);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn hanging_worker_degrades_at_the_soft_deadline() {
        let pipeline = Pipeline::builder(config(), Profile::default())
            .worker(worker(WorkerKind::Visual, [ScriptStep::succeed(secs(3), "v")]))
            .worker(worker(WorkerKind::Audio, [ScriptStep::succeed(secs(5), "a")]))
            .worker(worker(WorkerKind::Textual, [ScriptStep::hang()]))
            .build()
            .unwrap();

        let started = Instant::now();
        let playlist = pipeline.run([point("p0")]).await.unwrap();

        assert_eq!(started.elapsed(), secs(15));
        let decision = &playlist.entries[0];
        assert_eq!(decision.status, QueueStatus::SoftDegraded);
        assert_eq!(decision.scores.len(), 2);
        assert!(decision.winner.is_some());
        assert!(
            decision
                .scores
                .iter()
                .all(|score| score.kind != WorkerKind::Textual)
        );
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn lone_straggler_survives_to_the_hard_deadline() {
        // Visual and audio stay in backoff past the hard deadline: transient
        // failures with a 10s base delay never exhaust before 30s.
        let mut config = config();
        config.retry.base_delay = secs(10);
        config.retry.max_delay = secs(60);

        let in_backoff = || {
            [
                ScriptStep::fail_transient(Duration::ZERO),
                ScriptStep::fail_transient(Duration::ZERO),
                ScriptStep::fail_transient(Duration::ZERO),
                ScriptStep::fail_transient(Duration::ZERO),
            ]
        };
        let pipeline = Pipeline::builder(config, Profile::default())
            .worker(worker(WorkerKind::Visual, in_backoff()))
            .worker(worker(WorkerKind::Audio, in_backoff()))
            .worker(worker(WorkerKind::Textual, [ScriptStep::succeed(secs(22), "story")]))
            .build()
            .unwrap();

        let started = Instant::now();
        let playlist = pipeline.run([point("p0")]).await.unwrap();

        assert_eq!(started.elapsed(), secs(30));
        let decision = &playlist.entries[0];
        assert_eq!(decision.status, QueueStatus::HardDegraded);
        assert_eq!(decision.winner.as_ref().unwrap().kind, WorkerKind::Textual);
        assert_eq!(decision.rationale, "only-eligible-candidate");
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn all_failures_terminate_early_with_an_empty_winner() {
        let pipeline = Pipeline::builder(config(), Profile::default())
            .worker(worker(WorkerKind::Visual, [ScriptStep::fail_terminal(secs(1))]))
            .worker(worker(WorkerKind::Audio, [ScriptStep::fail_terminal(secs(2))]))
            .worker(worker(WorkerKind::Textual, [ScriptStep::fail_terminal(secs(3))]))
            .build()
            .unwrap();

        let started = Instant::now();
        let playlist = pipeline.run([point("p0")]).await.unwrap();

        // Terminates on the third failure, well before any deadline.
        assert_eq!(started.elapsed(), secs(3));
        let decision = &playlist.entries[0];
        assert_eq!(decision.status, QueueStatus::Failed);
        assert_eq!(decision.winner, None);
        assert!(decision.scores.is_empty());
        assert_eq!(decision.rationale, "no-candidates");
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn forbidden_kind_never_wins_a_complete_point() {
        let profile = Profile::default().forbid_kind(WorkerKind::Visual);
        let pipeline = Pipeline::builder(config(), profile)
            .worker(worker(WorkerKind::Visual, [ScriptStep::succeed(secs(2), "v")]))
            .worker(worker(WorkerKind::Audio, [ScriptStep::succeed(secs(2), "a")]))
            .worker(worker(WorkerKind::Textual, [ScriptStep::succeed(secs(2), "t")]))
            .build()
            .unwrap();

        let playlist = pipeline.run([point("p0")]).await.unwrap();

        let decision = &playlist.entries[0];
        assert_eq!(decision.status, QueueStatus::Complete);
        let winner = decision.winner.as_ref().unwrap();
        assert_ne!(winner.kind, WorkerKind::Visual);
        assert!(
            decision
                .scores
                .iter()
                .all(|score| score.kind != WorkerKind::Visual)
        );
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn topic_filter_preserves_the_degraded_status() {
        let mut config = config();
        config.soft_min = 1;
        let profile = Profile::default().forbid_topic("graphic");
        let pipeline = Pipeline::builder(config, profile)
            .worker(worker(
                WorkerKind::Visual,
                [ScriptStep::succeed_with_topics(secs(3), "v", vec!["graphic"])],
            ))
            .worker(worker(WorkerKind::Audio, [ScriptStep::hang()]))
            .worker(worker(WorkerKind::Textual, [ScriptStep::hang()]))
            .build()
            .unwrap();

        let started = Instant::now();
        let playlist = pipeline.run([point("p0")]).await.unwrap();

        // The sole survivor cleared the queue but not the hard filter.
        assert_eq!(started.elapsed(), secs(15));
        let decision = &playlist.entries[0];
        assert_eq!(decision.status, QueueStatus::SoftDegraded);
        assert_eq!(decision.winner, None);
        assert_eq!(decision.rationale, "no-eligible-candidate");
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn playlist_preserves_emission_order_when_points_finish_out_of_order() {
        let mut config = CoreConfig::new(vec![WorkerKind::Textual], secs(15), secs(30));
        config.scheduler = SchedulerConfig {
            mode: SchedulerMode::Streaming,
            interval: secs(5),
        };
        // Emissions at t = 0, 5, 10; produce calls arrive in emission order,
        // so steps map to p0, p1, p2. Completions land at t = 9, 6, 11.
        let pipeline = Pipeline::builder(config, Profile::default())
            .worker(worker(
                WorkerKind::Textual,
                [
                    ScriptStep::succeed(secs(9), "slow first"),
                    ScriptStep::succeed(secs(1), "quick second"),
                    ScriptStep::succeed(secs(1), "quick third"),
                ],
            ))
            .build()
            .unwrap();

        let started = Instant::now();
        let playlist = pipeline
            .run([point("p0"), point("p1"), point("p2")])
            .await
            .unwrap();

        assert_eq!(started.elapsed(), secs(11));
        let keys: Vec<&str> = playlist
            .entries
            .iter()
            .map(|d| d.point.key.as_str())
            .collect();
        assert_eq!(keys, ["p0", "p1", "p2"]);
        assert!(playlist.entries.iter().all(|d| d.status == QueueStatus::Complete));
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn saturated_pool_delays_fan_out_but_keeps_order() {
        let mut config = CoreConfig::new(vec![WorkerKind::Textual], secs(15), secs(30));
        config.worker_pool_size = 1;
        let pipeline = Pipeline::builder(config, Profile::default())
            .worker(worker(
                WorkerKind::Textual,
                [
                    ScriptStep::succeed(secs(1), "first"),
                    ScriptStep::succeed(secs(1), "second"),
                ],
            ))
            .build()
            .unwrap();

        let started = Instant::now();
        let playlist = pipeline.run([point("p0"), point("p1")]).await.unwrap();

        // Batch mode emits both at once; the single permit serializes them.
        assert_eq!(started.elapsed(), secs(2));
        assert_eq!(playlist.len(), 2);
        assert!(playlist.entries.iter().all(|d| d.status == QueueStatus::Complete));
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn shutdown_flushes_a_decision_for_every_emitted_point() {
        let mut config = config();
        config.scheduler = SchedulerConfig {
            mode: SchedulerMode::Streaming,
            interval: secs(5),
        };
        let pipeline = Pipeline::builder(config, Profile::default())
            .worker(worker(WorkerKind::Visual, []))
            .worker(worker(WorkerKind::Audio, []))
            .worker(worker(WorkerKind::Textual, []))
            .build()
            .unwrap();
        let handle = pipeline.shutdown_handle();

        let started = Instant::now();
        let run = tokio::spawn(pipeline.run([
            point("p0"),
            point("p1"),
            point("p2"),
            point("p3"),
            point("p4"),
        ]));
        tokio::spawn(async move {
            time::sleep(secs(7)).await;
            handle.shutdown();
        });

        let playlist = run.await.unwrap().unwrap();

        // Points p0 and p1 were emitted before the shutdown at t = 7; both
        // flush immediately as failures, far inside the hard deadline.
        assert_eq!(started.elapsed(), secs(7));
        assert_eq!(playlist.len(), 2);
        assert!(playlist.entries.iter().all(|d| d.status == QueueStatus::Failed));
        assert!(playlist.entries.iter().all(|d| d.winner.is_none()));
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn close_runs_once_per_worker_after_the_run() {
        let visual = worker(WorkerKind::Visual, [ScriptStep::succeed(secs(1), "v")]);
        let audio = worker(WorkerKind::Audio, [ScriptStep::succeed(secs(1), "a")]);
        let textual = worker(WorkerKind::Textual, [ScriptStep::succeed(secs(1), "t")]);
        let pipeline = Pipeline::builder(config(), Profile::default())
            .worker(visual.clone())
            .worker(audio.clone())
            .worker(textual.clone())
            .build()
            .unwrap();

        let playlist = pipeline.run([point("p0")]).await.unwrap();

        assert_eq!(playlist.len(), 1);
        assert_eq!(visual.close_count(), 1);
        assert_eq!(audio.close_count(), 1);
        assert_eq!(textual.close_count(), 1);
    }

    #[test]
    fn duplicate_worker_registration_is_a_build_error() {
        let result = Pipeline::builder(
            CoreConfig::new(vec![WorkerKind::Textual], secs(15), secs(30)),
            Profile::default(),
        )
        .worker(worker(WorkerKind::Textual, []))
        .worker(worker(WorkerKind::Textual, []))
        .build();

        assert_eq!(
            result.err(),
            Some(EngineError::DuplicateWorker {
                kind: WorkerKind::Textual
            })
        );
    }

    #[test]
    fn unregistered_configured_kind_is_a_build_error() {
        let result = Pipeline::builder(config(), Profile::default())
            .worker(worker(WorkerKind::Textual, []))
            .build();

        assert_eq!(
            result.err(),
            Some(EngineError::MissingWorker {
                kind: WorkerKind::Audio
            })
        );
    }

    #[test]
    fn invalid_configuration_fails_before_any_point() {
        let mut config = config();
        config.soft_deadline = secs(30);
        config.hard_deadline = secs(15);
        let result = Pipeline::builder(config, Profile::default())
            .worker(worker(WorkerKind::Visual, []))
            .worker(worker(WorkerKind::Audio, []))
            .worker(worker(WorkerKind::Textual, []))
            .build();

        assert!(matches!(result.err(), Some(EngineError::Config(_))));
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn shutdown_before_run_yields_an_empty_playlist() {
        let pipeline = Pipeline::builder(config(), Profile::default())
            .worker(worker(WorkerKind::Visual, []))
            .worker(worker(WorkerKind::Audio, []))
            .worker(worker(WorkerKind::Textual, []))
            .build()
            .unwrap();
        pipeline.shutdown_handle().shutdown();

        let playlist = pipeline.run([point("p0"), point("p1")]).await.unwrap();

        assert!(playlist.is_empty());
    }
}
