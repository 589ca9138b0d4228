use crate::candidate::Candidate;
use crate::config::RubricWeights;
use crate::kind::WorkerKind;
use crate::point::Point;
use crate::status::QueueStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the four rubric criteria candidates are scored on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    LocationRelevance,
    ProfileMatch,
    ContentQuality,
    Engagement,
}

impl Criterion {
    /// All criteria, in rubric order.
    pub const ALL: [Criterion; 4] = [
        Criterion::LocationRelevance,
        Criterion::ProfileMatch,
        Criterion::ContentQuality,
        Criterion::Engagement,
    ];

    /// Returns the rationale-string form of the criterion.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocationRelevance => "location-relevance",
            Self::ProfileMatch => "profile-match",
            Self::ContentQuality => "content-quality",
            Self::Engagement => "engagement",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw per-criterion scores for one candidate, each in `[0, 10]`, plus the
/// kind weight applied on top of the weighted sum.
///
/// Kept on the decision so the rationale is auditable after the fact.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub location_relevance: f64,
    pub profile_match: f64,
    pub content_quality: f64,
    pub engagement: f64,
    /// The profile's soft multiplier for the candidate's kind.
    pub kind_weight: f64,
}

impl ScoreBreakdown {
    /// The raw value recorded for one criterion.
    pub fn value(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::LocationRelevance => self.location_relevance,
            Criterion::ProfileMatch => self.profile_match,
            Criterion::ContentQuality => self.content_quality,
            Criterion::Engagement => self.engagement,
        }
    }

    /// Final score: weighted linear combination times the kind weight.
    pub fn total(&self, weights: &RubricWeights) -> f64 {
        let raw = Criterion::ALL
            .iter()
            .map(|c| weights.weight(*c) * self.value(*c))
            .sum::<f64>();
        raw * self.kind_weight
    }

    /// The criterion contributing the most weighted score.
    ///
    /// Ties resolve to the earlier criterion in rubric order, so the result
    /// is deterministic.
    pub fn top_criterion(&self, weights: &RubricWeights) -> Criterion {
        let mut best = Criterion::LocationRelevance;
        let mut best_contribution = f64::NEG_INFINITY;
        for criterion in Criterion::ALL {
            let contribution = weights.weight(criterion) * self.value(criterion);
            if contribution > best_contribution {
                best = criterion;
                best_contribution = contribution;
            }
        }
        best
    }
}

/// Final score for one candidate, with its breakdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub kind: WorkerKind,
    /// `breakdown.total(weights)` at decision time.
    pub total: f64,
    pub breakdown: ScoreBreakdown,
}

/// Judge output for one point.
///
/// Exactly one decision exists per emitted point, even when collection
/// failed entirely (`winner` is then `None` and `status` explains why).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub point: Point,
    /// The selected candidate, absent under `Failed` status or when the
    /// hard safety filters rejected every survivor.
    pub winner: Option<Candidate>,
    /// Final scores for every candidate that survived the hard filters.
    pub scores: Vec<CandidateScore>,
    /// Collection status inherited from the point's queue.
    pub status: QueueStatus,
    /// Short tag naming the top contributing criterion, or why there is no
    /// winner.
    pub rationale: String,
    /// Wall-clock stamp for debugging only, never used in ordering.
    pub decided_at: DateTime<Utc>,
}

/// The ordered output of one pipeline run: one decision per emitted point,
/// in emission order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub entries: Vec<Decision>,
}

impl Playlist {
    pub fn new(entries: Vec<Decision>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decisions that selected a winner, in emission order.
    pub fn winners(&self) -> impl Iterator<Item = (&Point, &Candidate)> {
        self.entries
            .iter()
            .filter_map(|d| d.winner.as_ref().map(|w| (&d.point, w)))
    }

    /// How many decisions ended in each collection status.
    pub fn status_counts(&self) -> BTreeMap<QueueStatus, usize> {
        let mut counts = BTreeMap::new();
        for decision in &self.entries {
            *counts.entry(decision.status).or_insert(0) += 1;
        }
        counts
    }
}
