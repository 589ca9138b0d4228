//! Scripted stubs shared by the engine's test modules.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time;
use waypoint_judge::Scorer;
use waypoint_types::{Candidate, Point, Profile, WorkerKind};

use crate::worker::{ContentWorker, TransientError};

enum ScriptAction {
    Succeed {
        title: &'static str,
        topics: Vec<&'static str>,
    },
    FailTransient,
    FailTerminal,
    Hang,
}

/// One scripted `produce` call: wait `delay`, then act.
pub(crate) struct ScriptStep {
    delay: Duration,
    action: ScriptAction,
}

impl ScriptStep {
    pub(crate) fn succeed(delay: Duration, title: &'static str) -> Self {
        Self {
            delay,
            action: ScriptAction::Succeed {
                title,
                topics: Vec::new(),
            },
        }
    }

    pub(crate) fn succeed_with_topics(
        delay: Duration,
        title: &'static str,
        topics: Vec<&'static str>,
    ) -> Self {
        Self {
            delay,
            action: ScriptAction::Succeed { title, topics },
        }
    }

    pub(crate) fn fail_transient(delay: Duration) -> Self {
        Self {
            delay,
            action: ScriptAction::FailTransient,
        }
    }

    pub(crate) fn fail_terminal(delay: Duration) -> Self {
        Self {
            delay,
            action: ScriptAction::FailTerminal,
        }
    }

    /// Never resolve. Used for workers that miss every deadline.
    pub(crate) fn hang() -> Self {
        Self {
            delay: Duration::ZERO,
            action: ScriptAction::Hang,
        }
    }
}

/// A worker that plays back a fixed script, one step per `produce` call.
///
/// An exhausted script hangs, which keeps accidental extra attempts visible
/// as deadline misses instead of silent successes.
pub(crate) struct ScriptedWorker {
    kind: WorkerKind,
    steps: Mutex<VecDeque<ScriptStep>>,
    closed: AtomicUsize,
}

impl ScriptedWorker {
    pub(crate) fn new(kind: WorkerKind, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            kind,
            steps: Mutex::new(steps.into_iter().collect()),
            closed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentWorker for ScriptedWorker {
    fn kind(&self) -> WorkerKind {
        self.kind
    }

    async fn produce(&self, _point: &Point) -> anyhow::Result<Candidate> {
        let step = self.steps.lock().pop_front();
        let Some(step) = step else {
            std::future::pending::<()>().await;
            unreachable!("pending resolved");
        };
        time::sleep(step.delay).await;
        match step.action {
            ScriptAction::Succeed { title, topics } => {
                Ok(Candidate::new(self.kind, title, "scripted body", "scripted")
                    .with_topics(topics))
            }
            ScriptAction::FailTransient => {
                Err(TransientError::new("upstream throttled").into())
            }
            ScriptAction::FailTerminal => Err(anyhow::anyhow!("upstream rejected the request")),
            ScriptAction::Hang => {
                std::future::pending::<()>().await;
                unreachable!("pending resolved");
            }
        }
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scorer returning fixed criterion values per kind, for pinning totals in
/// end-to-end tests.
pub(crate) struct KindScorer(pub(crate) BTreeMap<WorkerKind, [f64; 4]>);

impl KindScorer {
    fn value(&self, kind: WorkerKind, index: usize) -> f64 {
        self.0.get(&kind).map(|v| v[index]).unwrap_or(0.0)
    }
}

impl Scorer for KindScorer {
    fn location_relevance(&self, _: &Point, c: &Candidate, _: &Profile) -> f64 {
        self.value(c.kind, 0)
    }
    fn profile_match(&self, _: &Point, c: &Candidate, _: &Profile) -> f64 {
        self.value(c.kind, 1)
    }
    fn content_quality(&self, _: &Point, c: &Candidate, _: &Profile) -> f64 {
        self.value(c.kind, 2)
    }
    fn engagement(&self, _: &Point, c: &Candidate, _: &Profile) -> f64 {
        self.value(c.kind, 3)
    }
}
