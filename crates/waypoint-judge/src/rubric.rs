//! Rubric scoring.
//!
//! Each criterion is scored on `[0, 10]` by a function that must be total,
//! deterministic, and side-effect free. The trait is the injection seam:
//! deployments with better signals (click-through data, model-based
//! relevance) replace [`DefaultScorer`] without touching selection logic.

use std::time::Duration;
use waypoint_types::{Candidate, Point, Profile};

/// The four scoring functions of the rubric.
///
/// Implementations must be total and deterministic: same
/// `(point, candidate, profile)` in, same score out, no I/O. Values outside
/// `[0, 10]` are clamped by the judge.
pub trait Scorer: Send + Sync {
    fn location_relevance(&self, point: &Point, candidate: &Candidate, profile: &Profile) -> f64;
    fn profile_match(&self, point: &Point, candidate: &Candidate, profile: &Profile) -> f64;
    fn content_quality(&self, point: &Point, candidate: &Candidate, profile: &Profile) -> f64;
    fn engagement(&self, point: &Point, candidate: &Candidate, profile: &Profile) -> f64;
}

/// Heuristic scorer over candidate attributes. No external signals.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultScorer;

/// Fraction of `interests` that appear among `topics` (case-insensitive).
fn interest_overlap(topics: &[String], interests: &[String]) -> f64 {
    if interests.is_empty() {
        return 0.0;
    }
    let hits = interests
        .iter()
        .filter(|interest| topics.iter().any(|t| t.eq_ignore_ascii_case(interest)))
        .count();
    hits as f64 / interests.len() as f64
}

impl Scorer for DefaultScorer {
    /// Topical proximity to the point: category tag match and point-name
    /// mentions in the candidate's topics or title.
    fn location_relevance(&self, point: &Point, candidate: &Candidate, _profile: &Profile) -> f64 {
        let mut score = 5.0;
        if let Some(category) = point.category {
            let tag = category.as_str();
            if candidate
                .attrs
                .topics
                .iter()
                .any(|t| t.eq_ignore_ascii_case(tag))
            {
                score += 2.5;
            }
        }
        let name = point.name.to_ascii_lowercase();
        if candidate.title.to_ascii_lowercase().contains(&name)
            || candidate
                .attrs
                .topics
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&point.name))
        {
            score += 2.5;
        }
        score
    }

    /// Interest overlap plus language preference.
    fn profile_match(&self, _point: &Point, candidate: &Candidate, profile: &Profile) -> f64 {
        let mut score = 4.0;
        score += 4.0 * interest_overlap(&candidate.attrs.topics, &profile.interests);
        if let Some(ref language) = candidate.attrs.language {
            if profile.prefers_language(language) {
                score += 2.0;
            }
        }
        score
    }

    /// Surface signals only: a usable title, a substantive body, and a named
    /// source.
    fn content_quality(&self, _point: &Point, candidate: &Candidate, _profile: &Profile) -> f64 {
        let mut score = 4.0;
        if !candidate.title.trim().is_empty() && candidate.title.len() <= 80 {
            score += 2.0;
        }
        score += 3.0 * (candidate.body.len().min(600) as f64 / 600.0);
        if !candidate.source.trim().is_empty() {
            score += 1.0;
        }
        score
    }

    /// Duration fit for a tour stop: one to seven minutes holds attention,
    /// anything longer or shorter trails off. Unknown duration scores
    /// neutral.
    fn engagement(&self, _point: &Point, candidate: &Candidate, _profile: &Profile) -> f64 {
        const LOW: Duration = Duration::from_secs(60);
        const HIGH: Duration = Duration::from_secs(420);
        match candidate.duration {
            None => 5.0,
            Some(d) if d >= LOW && d <= HIGH => 8.0,
            Some(d) => {
                let gap_secs = if d < LOW {
                    LOW.as_secs_f64() - d.as_secs_f64()
                } else {
                    d.as_secs_f64() - HIGH.as_secs_f64()
                };
                (8.0 - gap_secs / 60.0).max(2.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_types::{PointCategory, WorkerKind};

    fn point() -> Point {
        Point::new("p1", "Basilica").with_category(PointCategory::Religious)
    }

    fn candidate() -> Candidate {
        Candidate::new(WorkerKind::Textual, "The Basilica story", "a".repeat(600), "wikipedia")
    }

    #[test]
    fn scores_are_deterministic() {
        let scorer = DefaultScorer;
        let (p, c, profile) = (point(), candidate(), Profile::default());
        for _ in 0..3 {
            assert_eq!(
                scorer.location_relevance(&p, &c, &profile),
                scorer.location_relevance(&p, &c, &profile)
            );
            assert_eq!(
                scorer.engagement(&p, &c, &profile),
                scorer.engagement(&p, &c, &profile)
            );
        }
    }

    #[test]
    fn category_tag_and_name_mention_raise_location_relevance() {
        let scorer = DefaultScorer;
        let profile = Profile::default();
        let p = point();

        let bare = Candidate::new(WorkerKind::Textual, "Elsewhere", "body", "src");
        let tagged = bare.clone().with_topics(["religious"]);

        let low = scorer.location_relevance(&p, &bare, &profile);
        let mid = scorer.location_relevance(&p, &tagged, &profile);
        let high = scorer.location_relevance(&p, &candidate(), &profile);

        assert!(low < mid);
        // Name mention in the title counts even without the category tag.
        assert!(low < high);
    }

    #[test]
    fn interest_overlap_is_proportional() {
        let scorer = DefaultScorer;
        let p = point();
        let profile = Profile::default()
            .with_interest("history")
            .with_interest("architecture");

        let none = candidate();
        let half = candidate().with_topics(["history"]);
        let full = candidate().with_topics(["History", "Architecture"]);

        let s_none = scorer.profile_match(&p, &none, &profile);
        let s_half = scorer.profile_match(&p, &half, &profile);
        let s_full = scorer.profile_match(&p, &full, &profile);

        assert_eq!(s_none, 4.0);
        assert_eq!(s_half, 6.0);
        assert_eq!(s_full, 8.0);
    }

    #[test]
    fn engagement_peaks_inside_the_attention_window() {
        let scorer = DefaultScorer;
        let (p, profile) = (point(), Profile::default());

        let unknown = candidate();
        let fit = candidate().with_duration(Duration::from_secs(180));
        let long = candidate().with_duration(Duration::from_secs(1200));

        assert_eq!(scorer.engagement(&p, &unknown, &profile), 5.0);
        assert_eq!(scorer.engagement(&p, &fit, &profile), 8.0);
        assert!(scorer.engagement(&p, &long, &profile) < 5.0);
    }
}
