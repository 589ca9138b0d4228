use serde::{Deserialize, Serialize};
use std::fmt;

/// Content modality produced by exactly one worker per orchestration.
///
/// Closed set: adding a modality means adding a variant here, not an open
/// registry. Variants are declared in lexicographic order of their wire
/// name so the derived `Ord` matches name order; tie-breaking and map
/// iteration rely on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Audio narration or music.
    Audio,
    /// Written description or story.
    Textual,
    /// Video or imagery.
    Visual,
}

impl WorkerKind {
    /// Every modality, in `Ord` (wire-name) order.
    pub const ALL: [WorkerKind; 3] = [WorkerKind::Audio, WorkerKind::Textual, WorkerKind::Visual];

    /// Returns the wire name as a static string for logging and rationale text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Textual => "textual",
            Self::Visual => "visual",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ord_matches_wire_name_order() {
        let mut sorted = WorkerKind::ALL;
        sorted.sort_by_key(|k| k.as_str());
        assert_eq!(sorted, WorkerKind::ALL);
    }

    #[test]
    fn serde_round_trips_snake_case() {
        let json = serde_json::to_string(&WorkerKind::Visual).unwrap();
        assert_eq!(json, "\"visual\"");
        let back: WorkerKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WorkerKind::Visual);
    }
}
