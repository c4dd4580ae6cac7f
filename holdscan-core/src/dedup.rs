//! Duplicate suppression for detections merged from overlapping tiles.
//!
//! A hold sitting inside an overlap margin is detected by two (or four)
//! neighboring tiles. Duplicates are recognized by center proximity in
//! percentage space, which keeps the threshold meaningful across photo
//! resolutions, and the higher-confidence detection survives.

use holdscan_utils::Point;

use crate::prediction::RawPrediction;

/// Collapse near-duplicate detections, keeping the higher-confidence one.
///
/// Polygon predictions without any vertices are dropped first. Centers are
/// compared pairwise in input order; two detections closer than
/// `threshold_percent` count as the same hold. On equal confidence the
/// earlier detection wins, and a detection that loses a comparison is
/// excluded from all further pairs, so the result is deterministic for a
/// given input order.
pub fn deduplicate(
    predictions: Vec<RawPrediction>,
    width: u32,
    height: u32,
    threshold_percent: f64,
) -> Vec<RawPrediction> {
    if predictions.is_empty() {
        return Vec::new();
    }

    let predictions: Vec<RawPrediction> = predictions
        .into_iter()
        .filter(|pred| !pred.is_empty_polygon())
        .collect();

    let centers: Vec<Point> = predictions
        .iter()
        .map(|pred| {
            let center = pred.center();
            Point::new(
                center.x / f64::from(width) * 100.0,
                center.y / f64::from(height) * 100.0,
            )
        })
        .collect();

    let mut keep = vec![true; predictions.len()];
    for i in 0..predictions.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..predictions.len() {
            if !keep[j] {
                continue;
            }
            if centers[i].distance(centers[j]) < threshold_percent {
                if predictions[i].confidence >= predictions[j].confidence {
                    keep[j] = false;
                } else {
                    keep[i] = false;
                    break;
                }
            }
        }
    }

    predictions
        .into_iter()
        .zip(keep)
        .filter_map(|(pred, kept)| kept.then_some(pred))
        .collect()
}
