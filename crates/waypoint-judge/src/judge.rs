//! Selection: hard filter, score, pick one winner, explain.

use crate::filter;
use crate::rubric::{DefaultScorer, Scorer};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use waypoint_types::{
    Candidate, CandidateScore, Decision, Point, Profile, QueueStatus, RubricWeights,
    ScoreBreakdown, WorkerKind,
};

/// Rationale tag when exactly one candidate survived the hard filters.
pub const RATIONALE_ONLY_ELIGIBLE: &str = "only-eligible-candidate";
/// Rationale tag when the queue delivered candidates but the hard filters
/// rejected all of them.
pub const RATIONALE_NONE_ELIGIBLE: &str = "no-eligible-candidate";
/// Rationale tag when the queue delivered nothing at all.
pub const RATIONALE_NO_CANDIDATES: &str = "no-candidates";

/// Deterministic profile-aware ranker.
///
/// Holds the profile and rubric weights for the lifetime of a run; `decide`
/// is a pure function of its inputs apart from the debug-only timestamp on
/// the emitted decision.
pub struct Judge {
    profile: Profile,
    weights: RubricWeights,
    scorer: Arc<dyn Scorer>,
}

impl Judge {
    /// A judge with the default heuristic scorer.
    pub fn new(profile: Profile, weights: RubricWeights) -> Self {
        Self::with_scorer(profile, weights, Arc::new(DefaultScorer))
    }

    /// A judge with an injected scorer.
    pub fn with_scorer(profile: Profile, weights: RubricWeights, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            profile,
            weights,
            scorer,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Choose at most one winner among the successes collected for `point`.
    ///
    /// `status` is inherited from the point's queue and preserved on the
    /// decision untouched; degradation never influences scoring. The
    /// candidate map's key order (kind name order) is what makes
    /// tie-breaking reproducible across runs.
    pub fn decide(
        &self,
        point: &Point,
        candidates: &BTreeMap<WorkerKind, Candidate>,
        status: QueueStatus,
    ) -> Decision {
        let mut survivors: Vec<&Candidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates.values() {
            match filter::check(&self.profile, candidate) {
                Ok(()) => survivors.push(candidate),
                Err(reason) => {
                    debug!(point = %point.key, kind = %candidate.kind, %reason, "candidate rejected by hard filter");
                }
            }
        }

        let scores: Vec<CandidateScore> = survivors
            .iter()
            .map(|candidate| self.score(point, candidate))
            .collect();

        // Ascending kind-name iteration plus strictly-greater comparison:
        // on a full tie the lexicographically smallest kind wins.
        let mut best: Option<usize> = None;
        for (index, score) in scores.iter().enumerate() {
            let better = match best {
                None => true,
                Some(current) => is_better(score, &scores[current]),
            };
            if better {
                best = Some(index);
            }
        }

        let winner = best.map(|index| survivors[index].clone());
        let rationale = match best {
            Some(_) if survivors.len() == 1 => RATIONALE_ONLY_ELIGIBLE.to_string(),
            Some(index) => scores[index]
                .breakdown
                .top_criterion(&self.weights)
                .as_str()
                .to_string(),
            None if candidates.is_empty() => RATIONALE_NO_CANDIDATES.to_string(),
            None => RATIONALE_NONE_ELIGIBLE.to_string(),
        };

        Decision {
            point: point.clone(),
            winner,
            scores,
            status,
            rationale,
            decided_at: Utc::now(),
        }
    }

    fn score(&self, point: &Point, candidate: &Candidate) -> CandidateScore {
        let clamp = |value: f64| value.clamp(0.0, 10.0);
        let breakdown = ScoreBreakdown {
            location_relevance: clamp(self.scorer.location_relevance(
                point,
                candidate,
                &self.profile,
            )),
            profile_match: clamp(self.scorer.profile_match(point, candidate, &self.profile)),
            content_quality: clamp(self.scorer.content_quality(point, candidate, &self.profile)),
            engagement: clamp(self.scorer.engagement(point, candidate, &self.profile)),
            kind_weight: self.profile.kind_weight(candidate.kind),
        };
        CandidateScore {
            kind: candidate.kind,
            total: breakdown.total(&self.weights),
            breakdown,
        }
    }
}

/// Strict "candidate beats incumbent" order: final score, then kind weight.
///
/// Equality on both falls through to false, which keeps the earlier
/// (lexicographically smaller) kind as the winner.
fn is_better(candidate: &CandidateScore, incumbent: &CandidateScore) -> bool {
    if candidate.total != incumbent.total {
        return candidate.total > incumbent.total;
    }
    candidate.breakdown.kind_weight > incumbent.breakdown.kind_weight
}
