//! Hard safety filters.
//!
//! These run before any scoring and are absolute: a rejected candidate is
//! invisible to the rubric no matter how well it would have scored. Checks
//! are ordered (kind, topic, duration, age) so a candidate violating several
//! predicates always reports the same reason.

use std::fmt;
use std::time::Duration;
use waypoint_types::{Candidate, Profile};

/// Why the hard filter removed a candidate.
///
/// Each variant maps 1:1 to one safety predicate of the profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The candidate's modality is on the profile's forbidden list.
    ForbiddenKind,
    /// A candidate topic matched a forbidden topic (case-insensitive).
    ForbiddenTopic { topic: String },
    /// The candidate runs longer than the profile allows.
    DurationExceeded { duration: Duration, max: Duration },
    /// The candidate's age floor exceeds the listener's age.
    AgeRestricted { age_minimum: u32, min_age: u32 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForbiddenKind => write!(f, "kind is forbidden by the profile"),
            Self::ForbiddenTopic { topic } => write!(f, "topic '{topic}' is forbidden"),
            Self::DurationExceeded { duration, max } => {
                write!(f, "duration {duration:?} exceeds the {max:?} limit")
            }
            Self::AgeRestricted {
                age_minimum,
                min_age,
            } => write!(
                f,
                "age floor {age_minimum} exceeds the listener age {min_age}"
            ),
        }
    }
}

/// Apply every hard predicate to one candidate.
///
/// Predicates whose inputs are missing on either side (unknown duration, no
/// age floor, no listener age) are disabled rather than failed.
pub fn check(profile: &Profile, candidate: &Candidate) -> Result<(), RejectReason> {
    if profile.forbid_kinds.contains(&candidate.kind) {
        return Err(RejectReason::ForbiddenKind);
    }

    for topic in &candidate.attrs.topics {
        if profile.forbids_topic(topic) {
            return Err(RejectReason::ForbiddenTopic {
                topic: topic.clone(),
            });
        }
    }

    if let (Some(duration), Some(max)) = (candidate.duration, profile.max_duration) {
        if duration > max {
            return Err(RejectReason::DurationExceeded { duration, max });
        }
    }

    if let (Some(age_minimum), Some(min_age)) = (candidate.attrs.age_minimum, profile.min_age) {
        if age_minimum > min_age {
            return Err(RejectReason::AgeRestricted {
                age_minimum,
                min_age,
            });
        }
    }

    Ok(())
}
