//! Core hold detection pipeline.
//!
//! This crate tiles wall photos, scores the tiles against a remote detection
//! service with `reqwest`, and merges, deduplicates, and normalizes the
//! results into percentage-space holds. It also provides the caching,
//! invalidation, and persistence seams hosts build on.

/// Invalidation fan-out between caches and host components.
pub mod bus;
/// Two-tier caching of detection results.
pub mod cache;
/// Scoring service client and retry policy.
pub mod client;
/// Cross-tile duplicate suppression.
pub mod dedup;
/// End-to-end detection pipeline.
pub mod detector;
/// Hold data model.
pub mod hold;
/// Percentage-space normalization of raw predictions.
pub mod normalize;
/// Wire-format prediction decoding.
pub mod prediction;
/// Persistence seam and write-side choreography.
pub mod store;
/// Tile grid construction.
pub mod tiling;

pub use bus::{CacheEventBus, Listener, Subscription, Topic};
pub use cache::{CacheEntry, DimensionCache, HoldCache, ImageDimensions, KeyValueStore};
pub use client::{
    DetectionApiError, HttpTransport, ScoringClient, ScoringResponse, ScoringTransport,
};
pub use dedup::deduplicate;
pub use detector::{CancelToken, DetectionOutput, HoldDetector};
pub use hold::{DetectedHold, HoldShape, NewHold};
pub use normalize::normalize;
pub use prediction::{parse_predictions, PredictionShape, RawPrediction};
pub use store::{HoldStore, HoldWriter, MemoryHoldStore};
pub use tiling::{Tile, TileGrid};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
