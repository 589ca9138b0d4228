use crate::kind::WorkerKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attributes a candidate exposes to the hard safety filters and the
/// relevance heuristics.
///
/// This is a typed record, not an open map: every filter input the judge
/// understands has a named field. Workers leave fields empty when their
/// upstream source does not provide them; empty fields never cause a
/// candidate to be filtered out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterAttrs {
    /// Topic tags. Matched case-insensitively against forbidden topics and
    /// used for interest overlap.
    pub topics: Vec<String>,
    /// Minimum viewer/listener age, when the content is age-restricted.
    pub age_minimum: Option<u32>,
    /// BCP 47-ish language tag of the content body.
    pub language: Option<String>,
}

/// One piece of content produced by one worker for one point.
///
/// Never mutated after the producing worker returns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Modality of the producing worker.
    pub kind: WorkerKind,
    /// Short display title.
    pub title: String,
    /// The content itself: a URL, transcript, or generated text depending on
    /// the modality.
    pub body: String,
    /// Upstream source tag (for example `"youtube"` or `"wikipedia"`).
    pub source: String,
    /// Playback or reading duration, when known.
    pub duration: Option<Duration>,
    /// Inputs to safety filtering and relevance scoring.
    pub attrs: FilterAttrs,
}

impl Candidate {
    /// Create a candidate with required fields only.
    pub fn new(
        kind: WorkerKind,
        title: impl Into<String>,
        body: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            source: source.into(),
            duration: None,
            attrs: FilterAttrs::default(),
        }
    }

    /// Attaches a known duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Attaches topic tags.
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Attaches an age restriction.
    pub fn with_age_minimum(mut self, age: u32) -> Self {
        self.attrs.age_minimum = Some(age);
        self
    }

    /// Attaches a language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.attrs.language = Some(language.into());
        self
    }
}
