//! Common helpers shared across holdscan crates.

/// Application configuration and settings management.
pub mod config;
/// Freehand brush-stroke rasterization and outline extraction.
pub mod freehand;
/// Polygon math: containment, hulls, simplification, smoothing.
pub mod geometry;
/// Shared 2D point type.
pub mod point;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use anyhow::Result;
use log::LevelFilter;

pub use config::{AppSettings, CacheSettings, DetectionSettings, TelemetrySettings, TilingSettings};
pub use freehand::{BrushMask, GRID_SIZE, extract_polygon};
pub use geometry::{
    convex_hull, expand_polygon, perimeter_intersection, point_in_polygon, polygon_area,
    polygon_centroid, simplify_polygon, smallest_polygon_at_point, smooth_polygon,
    smooth_polygon_chaikin,
};
pub use point::Point;
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, configure_from as configure_telemetry_from,
    telemetry_allows, telemetry_enabled, telemetry_level, timing_guard, timing_guard_if,
};

/// Initialize logging once for any host embedding the pipeline.
///
/// This function respects the `RUST_LOG` environment variable if it is set.
/// Otherwise, it falls back to the provided default filter level.
///
/// # Arguments
///
/// * `default_filter` - The `LevelFilter` to use if `RUST_LOG` is not set.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module("holdscan::telemetry", LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}
