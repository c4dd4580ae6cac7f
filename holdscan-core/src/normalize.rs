//! Conversion of deduplicated detections into percentage-space hold shapes.

use holdscan_utils::Point;

use crate::hold::HoldShape;
use crate::prediction::{PredictionShape, RawPrediction};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Convert surviving predictions into [`HoldShape`]s in percentage space.
///
/// Predictions below `confidence_threshold` are dropped. Polygon vertices are
/// converted independently (`value / dimension * 100`, rounded to 2 decimals)
/// and the center is the centroid of those already-rounded vertices. Bounding
/// boxes become a synthetic 4-corner rectangle with each corner rounded the
/// same way, but their center is the box's own coordinate converted and
/// rounded directly rather than re-derived from the corners. The two center
/// derivations intentionally stay separate; persisted geometry depends on
/// their exact values. Confidence is rounded to 3 decimals and unlabeled
/// predictions are classed as `"hold"`.
///
/// Dominant colors are not sampled here; the pipeline fills them in from the
/// photo afterwards.
pub fn normalize(
    predictions: &[RawPrediction],
    width: u32,
    height: u32,
    confidence_threshold: f64,
) -> Vec<HoldShape> {
    let width = f64::from(width);
    let height = f64::from(height);

    let mut holds = Vec::with_capacity(predictions.len());
    for prediction in predictions {
        if prediction.confidence < confidence_threshold {
            continue;
        }

        let (polygon, center) = match &prediction.shape {
            PredictionShape::Polygon(points) => {
                if points.is_empty() {
                    continue;
                }
                let polygon: Vec<Point> = points
                    .iter()
                    .map(|p| Point::new(round2(p.x / width * 100.0), round2(p.y / height * 100.0)))
                    .collect();
                let count = polygon.len() as f64;
                let center_x = polygon.iter().map(|p| p.x).sum::<f64>() / count;
                let center_y = polygon.iter().map(|p| p.y).sum::<f64>() / count;
                (polygon, Point::new(round2(center_x), round2(center_y)))
            }
            PredictionShape::BoundingBox {
                x,
                y,
                width: w,
                height: h,
            } => {
                let corner = |cx: f64, cy: f64| {
                    Point::new(round2(cx / width * 100.0), round2(cy / height * 100.0))
                };
                let polygon = vec![
                    corner(x - w / 2.0, y - h / 2.0),
                    corner(x + w / 2.0, y - h / 2.0),
                    corner(x + w / 2.0, y + h / 2.0),
                    corner(x - w / 2.0, y + h / 2.0),
                ];
                let center = Point::new(round2(x / width * 100.0), round2(y / height * 100.0));
                (polygon, center)
            }
        };

        holds.push(HoldShape {
            polygon,
            center,
            confidence: Some(round3(prediction.confidence)),
            dominant_color: None,
            class: Some(
                prediction
                    .class
                    .clone()
                    .unwrap_or_else(|| "hold".to_string()),
            ),
        });
    }
    holds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_vertex_converts_to_percent_with_two_decimals() {
        let prediction = RawPrediction {
            shape: PredictionShape::Polygon(vec![
                Point::new(90.0, 90.0),
                Point::new(270.0, 90.0),
                Point::new(90.0, 270.0),
            ]),
            confidence: 0.9,
            class: None,
        };

        let holds = normalize(&[prediction], 900, 900, 0.5);
        assert_eq!(holds.len(), 1);
        assert_eq!(holds[0].polygon[0], Point::new(10.0, 10.0));
        assert_eq!(holds[0].polygon[1], Point::new(30.0, 10.0));
        assert_eq!(holds[0].class.as_deref(), Some("hold"));
    }

    #[test]
    fn polygon_center_is_centroid_of_rounded_vertices() {
        // 1/3 px on 900 px: each vertex rounds before averaging.
        let prediction = RawPrediction {
            shape: PredictionShape::Polygon(vec![
                Point::new(100.0, 100.0),
                Point::new(200.0, 100.0),
                Point::new(150.0, 250.0),
            ]),
            confidence: 0.9,
            class: None,
        };

        let holds = normalize(&[prediction], 900, 900, 0.5);
        let polygon = &holds[0].polygon;
        // 100/900*100 = 11.111... -> 11.11, 200/900 -> 22.22, 150/900 -> 16.67
        assert_eq!(polygon[0], Point::new(11.11, 11.11));
        assert_eq!(polygon[1], Point::new(22.22, 11.11));
        assert_eq!(polygon[2], Point::new(16.67, 27.78));
        let expected_x = (11.11 + 22.22 + 16.67) / 3.0;
        assert!((holds[0].center.x - super::round2(expected_x)).abs() < 1e-12);
    }

    #[test]
    fn bbox_becomes_rounded_corner_rectangle_with_direct_center() {
        let prediction = RawPrediction {
            shape: PredictionShape::BoundingBox {
                x: 450.0,
                y: 450.0,
                width: 90.0,
                height: 90.0,
            },
            confidence: 0.8,
            class: Some("hold".to_string()),
        };

        let holds = normalize(&[prediction], 900, 900, 0.5);
        assert_eq!(holds.len(), 1);
        let hold = &holds[0];
        assert_eq!(hold.polygon.len(), 4);
        assert_eq!(hold.polygon[0], Point::new(45.0, 45.0));
        assert_eq!(hold.polygon[2], Point::new(55.0, 55.0));
        assert_eq!(hold.center, Point::new(50.0, 50.0));
        assert_eq!(hold.class.as_deref(), Some("hold"));
    }

    #[test]
    fn low_confidence_predictions_are_filtered() {
        let prediction = RawPrediction {
            shape: PredictionShape::BoundingBox {
                x: 100.0,
                y: 100.0,
                width: 50.0,
                height: 50.0,
            },
            confidence: 0.3,
            class: None,
        };
        assert!(normalize(&[prediction], 900, 900, 0.5).is_empty());
    }

    #[test]
    fn confidence_is_rounded_to_three_decimals() {
        let prediction = RawPrediction {
            shape: PredictionShape::BoundingBox {
                x: 100.0,
                y: 100.0,
                width: 50.0,
                height: 50.0,
            },
            confidence: 0.87654,
            class: None,
        };
        let holds = normalize(&[prediction], 900, 900, 0.5);
        assert_eq!(holds[0].confidence, Some(0.877));
    }

    #[test]
    fn empty_polygon_is_skipped_even_if_confident() {
        let prediction = RawPrediction {
            shape: PredictionShape::Polygon(Vec::new()),
            confidence: 0.99,
            class: None,
        };
        assert!(normalize(&[prediction], 900, 900, 0.5).is_empty());
    }
}
