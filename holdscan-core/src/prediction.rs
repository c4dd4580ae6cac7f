//! Raw detections as returned by the scoring service for a single tile.

use holdscan_utils::{Point, polygon_centroid};
use serde::Deserialize;

/// Geometry reported for one detection, in tile-local pixel space.
///
/// Segmentation-capable models return a polygon outline; older models fall
/// back to a center-plus-size bounding box. Downstream stages match on this
/// exhaustively so a new shape kind cannot be silently mishandled.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionShape {
    Polygon(Vec<Point>),
    BoundingBox { x: f64, y: f64, width: f64, height: f64 },
}

/// A single scoring-service detection.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub shape: PredictionShape,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    /// Class label assigned by the model, when it reports one.
    pub class: Option<String>,
}

impl RawPrediction {
    /// Center of the detection in pixel space: the polygon's vertex centroid,
    /// or the bounding box's own center coordinate.
    pub fn center(&self) -> Point {
        match &self.shape {
            PredictionShape::Polygon(points) => polygon_centroid(points),
            PredictionShape::BoundingBox { x, y, .. } => Point::new(*x, *y),
        }
    }

    /// True for polygon predictions that carry no vertices at all.
    ///
    /// The service occasionally emits these for degenerate masks; they have
    /// no usable geometry and are dropped before deduplication.
    pub fn is_empty_polygon(&self) -> bool {
        matches!(&self.shape, PredictionShape::Polygon(points) if points.is_empty())
    }

    /// Translate the detection from tile-local into full-image pixel space.
    pub fn shift(&mut self, dx: f64, dy: f64) {
        match &mut self.shape {
            PredictionShape::Polygon(points) => {
                for point in points {
                    point.x += dx;
                    point.y += dy;
                }
            }
            PredictionShape::BoundingBox { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct WirePoint {
    x: f64,
    y: f64,
}

/// One prediction as it appears on the wire.
///
/// Segmentation responses carry `points` alongside the box fields; the box
/// fields alone appear for detection-only models. `points` wins when present,
/// and absent numeric fields default to zero.
#[derive(Debug, Deserialize)]
struct WirePrediction {
    points: Option<Vec<WirePoint>>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
    #[serde(default)]
    confidence: f64,
    class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    predictions: Vec<WirePrediction>,
}

impl From<WirePrediction> for RawPrediction {
    fn from(wire: WirePrediction) -> Self {
        let shape = match wire.points {
            Some(points) => PredictionShape::Polygon(
                points.into_iter().map(|p| Point::new(p.x, p.y)).collect(),
            ),
            None => PredictionShape::BoundingBox {
                x: wire.x,
                y: wire.y,
                width: wire.width,
                height: wire.height,
            },
        };
        RawPrediction {
            shape,
            confidence: wire.confidence,
            class: wire.class,
        }
    }
}

/// Decode a scoring-service response body.
///
/// A body without a `predictions` array decodes to an empty list.
pub fn parse_predictions(body: &str) -> serde_json::Result<Vec<RawPrediction>> {
    let response: WireResponse = serde_json::from_str(body)?;
    Ok(response.predictions.into_iter().map(Into::into).collect())
}
