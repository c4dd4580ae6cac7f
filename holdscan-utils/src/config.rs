//! Shared configuration types consumed across the holdscan workspace.
//!
//! These structures provide a common representation for detection, tiling,
//! caching, and telemetry settings that can be serialized to disk and reused
//! by any host application embedding the pipeline.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Parameters controlling the remote scoring calls and result filtering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Scoring service endpoint, including the model segment.
    pub endpoint: String,
    /// Minimum confidence for a detection to be kept, in `[0, 1]`.
    pub confidence_threshold: f64,
    /// Center-to-center distance (percentage space) below which two
    /// detections collapse into one.
    pub dedup_threshold_percent: f64,
    /// Maximum attempts per tile when the service returns a server error.
    pub max_retries: u32,
    /// Images larger than this on either axis are downscaled before tiling.
    pub max_dimension: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://serverless.roboflow.com/hold-detector-rnvkl/2".to_string(),
            confidence_threshold: 0.5,
            dedup_threshold_percent: 0.5,
            max_retries: 3,
            max_dimension: 4096,
        }
    }
}

/// Grid layout used to split a photo into overlapping tiles.
///
/// The scoring service caps detections per request, so large walls are
/// scanned as a grid of tiles whose margins overlap enough to catch holds
/// straddling a boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TilingSettings {
    /// Number of tile columns.
    pub cols: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Overlap between neighboring tiles as a fraction of tile size.
    pub overlap: f64,
}

impl Default for TilingSettings {
    fn default() -> Self {
        Self {
            cols: 3,
            rows: 3,
            overlap: 0.3,
        }
    }
}

/// Sizing for the in-memory tier of the hold cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Number of photos whose holds stay resident in memory.
    pub memory_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { memory_entries: 64 }
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Debug,
        }
    }

    /// Update the level string from a `LevelFilter` value.
    pub fn set_level(&mut self, level: LevelFilter) {
        let label = match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        };
        self.level = label.to_string();
    }
}

/// Persistent application settings for hosts embedding the pipeline.
///
/// This struct aggregates all user-configurable parameters, allowing them to
/// be loaded from and saved to a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    /// Scoring and filtering parameters.
    pub detection: DetectionSettings,
    /// Tile grid layout.
    pub tiling: TilingSettings,
    /// In-memory cache sizing.
    pub cache: CacheSettings,
    /// Telemetry and diagnostics preferences.
    pub telemetry: TelemetrySettings,
}

impl AppSettings {
    /// Load settings from a JSON file.
    ///
    /// Missing fields fall back to their defaults; a missing or unparsable
    /// file is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;
        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON.
    ///
    /// This will overwrite the file if it already exists.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn default_settings_round_trip() {
        let file = NamedTempFile::new().expect("tempfile");
        let settings = AppSettings::default();
        settings.save_to_path(file.path()).expect("save");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded.detection, settings.detection);
        assert_eq!(loaded.tiling, settings.tiling);
        assert_eq!(loaded.cache, settings.cache);
        assert_eq!(loaded.telemetry.enabled, settings.telemetry.enabled);
        assert_eq!(loaded.telemetry.level, settings.telemetry.level);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let file = NamedTempFile::new().expect("tempfile");
        let json = r#"{
            "detection": { "confidence_threshold": 0.7, "max_retries": 5 },
            "tiling": { "cols": 4 }
        }"#;
        fs::write(file.path(), json).expect("write custom settings");

        let loaded = AppSettings::load_from_path(file.path()).expect("load");
        assert_eq!(loaded.detection.confidence_threshold, 0.7);
        assert_eq!(loaded.detection.max_retries, 5);
        assert_eq!(loaded.detection.max_dimension, 4096);
        assert_eq!(loaded.tiling.cols, 4);
        assert_eq!(loaded.tiling.rows, 3);
        assert!((loaded.tiling.overlap - 0.3).abs() < f64::EPSILON);
        assert!(!loaded.telemetry.enabled);
    }

    #[test]
    fn telemetry_level_parses_variants() {
        let telemetry = TelemetrySettings {
            level: "TRACE".into(),
            ..TelemetrySettings::default()
        };
        assert_eq!(telemetry.level_filter(), LevelFilter::Trace);

        let telemetry = TelemetrySettings {
            level: "Warn".into(),
            ..TelemetrySettings::default()
        };
        assert_eq!(telemetry.level_filter(), LevelFilter::Warn);

        let mut telemetry = TelemetrySettings::default();
        telemetry.set_level(LevelFilter::Info);
        assert_eq!(telemetry.level, "info");
    }
}
