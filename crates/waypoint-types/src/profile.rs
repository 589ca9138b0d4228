use crate::kind::WorkerKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// User-facing configuration governing selection.
///
/// Hard predicates (`forbid_kinds`, `forbidden_topics`, `max_duration`,
/// `min_age`) remove candidates before scoring. Soft weights and advisory
/// fields only shift scores. Supplied once at pipeline construction and
/// never mutated while a point is being processed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Modalities never to select.
    pub forbid_kinds: BTreeSet<WorkerKind>,
    /// Topic tags that disqualify a candidate. Matching is
    /// case-insensitive against candidate topics.
    pub forbidden_topics: BTreeSet<String>,
    /// Upper bound on candidate duration. A candidate with unknown duration
    /// is never rejected by this predicate.
    pub max_duration: Option<Duration>,
    /// The listener's age. A candidate whose `age_minimum` exceeds this is
    /// rejected; either side missing disables the predicate.
    pub min_age: Option<u32>,
    /// Per-kind soft multiplier applied to final scores. Missing entries
    /// default to 1.0.
    pub kind_weights: BTreeMap<WorkerKind, f64>,
    /// Preferred content languages, in preference order.
    pub languages: Vec<String>,
    /// Interest tags used for relevance bonuses.
    pub interests: Vec<String>,
}

impl Profile {
    /// The soft multiplier for a kind, defaulting to 1.0 when unset.
    pub fn kind_weight(&self, kind: WorkerKind) -> f64 {
        self.kind_weights.get(&kind).copied().unwrap_or(1.0)
    }

    /// Whether `topic` is on the forbidden list (case-insensitive).
    pub fn forbids_topic(&self, topic: &str) -> bool {
        self.forbidden_topics
            .iter()
            .any(|forbidden| forbidden.eq_ignore_ascii_case(topic))
    }

    /// Whether `language` is one of the preferred languages
    /// (case-insensitive).
    pub fn prefers_language(&self, language: &str) -> bool {
        self.languages
            .iter()
            .any(|preferred| preferred.eq_ignore_ascii_case(language))
    }

    pub fn forbid_kind(mut self, kind: WorkerKind) -> Self {
        self.forbid_kinds.insert(kind);
        self
    }

    pub fn forbid_topic(mut self, topic: impl Into<String>) -> Self {
        self.forbidden_topics.insert(topic.into());
        self
    }

    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_duration = Some(max);
        self
    }

    pub fn with_min_age(mut self, age: u32) -> Self {
        self.min_age = Some(age);
        self
    }

    pub fn with_kind_weight(mut self, kind: WorkerKind, weight: f64) -> Self {
        self.kind_weights.insert(kind, weight);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into());
        self
    }

    pub fn with_interest(mut self, interest: impl Into<String>) -> Self {
        self.interests.push(interest.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_weight_defaults_to_one() {
        let profile = Profile::default().with_kind_weight(WorkerKind::Audio, 1.5);
        assert_eq!(profile.kind_weight(WorkerKind::Audio), 1.5);
        assert_eq!(profile.kind_weight(WorkerKind::Visual), 1.0);
    }

    #[test]
    fn topic_matching_is_case_insensitive() {
        let profile = Profile::default().forbid_topic("Graphic");
        assert!(profile.forbids_topic("graphic"));
        assert!(profile.forbids_topic("GRAPHIC"));
        assert!(!profile.forbids_topic("graphics"));
    }

    #[test]
    fn language_preference_is_case_insensitive() {
        let profile = Profile::default().with_language("en");
        assert!(profile.prefers_language("EN"));
        assert!(!profile.prefers_language("fr"));
    }
}
