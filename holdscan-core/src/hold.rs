//! Hold data model shared by the pipeline, cache, and storage seams.

use holdscan_utils::Point;
use serde::{Deserialize, Serialize};

/// A hold outline produced by the detection pipeline, in percentage space.
///
/// Identity (id, photo, timestamps) is attached later by the persistence
/// collaborator; the pipeline only ever deals in shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldShape {
    /// Outline vertices, each axis in `[0, 100]` percent of the photo.
    pub polygon: Vec<Point>,
    /// Center in percentage space.
    pub center: Point,
    /// Model confidence rounded to 3 decimals; absent for hand-drawn holds.
    pub confidence: Option<f64>,
    /// Mean color sampled around the center, as `#rrggbb`.
    pub dominant_color: Option<String>,
    /// Model class label, e.g. `"hold"`.
    pub class: Option<String>,
}

impl HoldShape {
    /// A polygon needs at least 3 vertices to enclose anything; anything
    /// smaller must never reach persistence.
    pub fn has_valid_polygon(&self) -> bool {
        self.polygon.len() >= 3
    }
}

/// A persisted hold with identity, as stored by the relational collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedHold {
    pub id: String,
    pub photo_id: String,
    /// Outline vertices in percentage space; always 3 or more.
    pub polygon: Vec<Point>,
    /// Center in percentage space.
    pub center: Point,
    pub confidence: Option<f64>,
    pub dominant_color: Option<String>,
    pub class: Option<String>,
    /// Creation time as a unix epoch in milliseconds.
    pub created_at: i64,
}

impl DetectedHold {
    /// The hold's geometry and styling, detached from its identity.
    pub fn shape(&self) -> HoldShape {
        HoldShape {
            polygon: self.polygon.clone(),
            center: self.center,
            confidence: self.confidence,
            dominant_color: self.dominant_color.clone(),
            class: self.class.clone(),
        }
    }
}

/// Input for creating a hold; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHold {
    pub photo_id: String,
    pub shape: HoldShape,
}
