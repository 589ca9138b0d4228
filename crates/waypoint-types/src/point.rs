use serde::{Deserialize, Serialize};
use std::fmt;

/// WGS84 coordinates of a route point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Type tag for a route point. Closed set used by relevance heuristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCategory {
    Urban,
    Historical,
    Religious,
    Scenic,
}

impl PointCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urban => "urban",
            Self::Historical => "historical",
            Self::Religious => "religious",
            Self::Scenic => "scenic",
        }
    }
}

/// A single location on the route for which content is produced.
///
/// Immutable once emitted by the scheduler. The identity key is supplied by
/// the route source and is unique within one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Identity key within the route.
    pub key: String,
    /// Human-readable display name.
    pub name: String,
    /// Coordinates, when the route source provides them.
    pub location: Option<GeoLocation>,
    /// Type tag, when the route source provides one.
    pub category: Option<PointCategory>,
}

impl Point {
    /// Create a point with identity and display name only.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            location: None,
            category: None,
        }
    }

    /// Attaches coordinates.
    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(GeoLocation {
            latitude,
            longitude,
        });
        self
    }

    /// Attaches a category tag.
    pub fn with_category(mut self, category: PointCategory) -> Self {
        self.category = Some(category);
        self
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.key)
    }
}
