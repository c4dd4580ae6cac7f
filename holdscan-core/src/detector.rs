//! End-to-end hold detection over a wall photo.
//!
//! The pipeline tiles the photo, submits each tile to the scoring service,
//! shifts predictions back into full-image space, deduplicates across overlap
//! zones, and converts the survivors to percentage-space hold shapes with a
//! sampled dominant color.

use std::borrow::Cow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder};
use log::{debug, warn};

use holdscan_utils::{timing_guard, DetectionSettings, Point, TilingSettings};

use crate::client::{ScoringClient, ScoringTransport};
use crate::dedup::deduplicate;
use crate::hold::HoldShape;
use crate::normalize::normalize;
use crate::tiling::{Tile, TileGrid};

const TILE_JPEG_QUALITY: u8 = 90;
const COLOR_WINDOW: i64 = 5;
const FALLBACK_COLOR: &str = "#888888";

/// Cooperative cancellation flag shared between a detection run and its host.
///
/// The flag is checked once per tile, before the tile's scoring call, so
/// cancellation takes effect at the next tile boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of scanning one photo.
#[derive(Debug)]
pub struct DetectionOutput {
    /// Final holds in percentage space.
    pub holds: Vec<HoldShape>,
    /// Dimensions detection actually ran at, after any downscale.
    pub processed_size: (u32, u32),
    /// Dimensions of the photo as loaded.
    pub original_size: (u32, u32),
}

/// Couples the scoring client with tiling and filtering settings.
///
/// This is the main entry point for scanning a photo.
pub struct HoldDetector<T> {
    client: ScoringClient<T>,
    detection: DetectionSettings,
    tiling: TilingSettings,
}

impl<T: ScoringTransport> HoldDetector<T> {
    /// Construct a detector from a transport and configuration.
    ///
    /// # Arguments
    ///
    /// * `transport` - The scoring service transport to submit tiles through.
    /// * `detection` - Confidence, retry, and downscale parameters.
    /// * `tiling` - The tile grid layout.
    pub fn new(transport: T, detection: DetectionSettings, tiling: TilingSettings) -> Self {
        let client = ScoringClient::new(transport, detection.max_retries);
        Self {
            client,
            detection,
            tiling,
        }
    }

    /// Run detection on an image file path.
    ///
    /// `on_progress` receives `(tile_index, total_tiles)` with `tile_index`
    /// counted from 1, before that tile's scoring call is made.
    pub fn detect_path<P: AsRef<Path>>(
        &self,
        path: P,
        on_progress: impl FnMut(usize, usize),
    ) -> Result<DetectionOutput> {
        let _guard = timing_guard("holdscan_core::detect_path", log::Level::Debug);
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("failed to open photo {}", path.display()))?;
        self.detect_image_with_cancel(&image, &CancelToken::new(), on_progress)
    }

    /// Run detection on an in-memory image.
    pub fn detect_image(
        &self,
        image: &DynamicImage,
        on_progress: impl FnMut(usize, usize),
    ) -> Result<DetectionOutput> {
        self.detect_image_with_cancel(image, &CancelToken::new(), on_progress)
    }

    /// Run detection on an in-memory image with cooperative cancellation.
    ///
    /// A tile whose scoring call fails with a terminal
    /// [`DetectionApiError`](crate::DetectionApiError) aborts the whole run;
    /// a tile that cannot be encoded is logged and skipped after its progress
    /// report.
    pub fn detect_image_with_cancel(
        &self,
        image: &DynamicImage,
        cancel: &CancelToken,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<DetectionOutput> {
        let _guard = timing_guard("holdscan_core::detect_image", log::Level::Debug);

        let original_size = (image.width(), image.height());
        let working = downscale_for_detection(image, self.detection.max_dimension);
        let (width, height) = (working.width(), working.height());

        let grid = TileGrid::new(width, height, &self.tiling);
        let total = grid.len();
        let confidence_percent = (self.detection.confidence_threshold * 100.0) as u32;

        let mut predictions = Vec::new();
        {
            let _guard = timing_guard("holdscan_core::score_tiles", log::Level::Debug);
            for (index, tile) in grid.iter().enumerate() {
                if cancel.is_cancelled() {
                    bail!("hold detection cancelled");
                }
                on_progress(index + 1, total);

                if tile.width() == 0 || tile.height() == 0 {
                    continue;
                }

                let jpeg = match encode_tile(&working, tile) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!("skipping tile ({}, {}): {err:#}", tile.col, tile.row);
                        continue;
                    }
                };

                let mut scored = self.client.detect(&jpeg, confidence_percent)?;
                for prediction in &mut scored {
                    prediction.shift(f64::from(tile.x1), f64::from(tile.y1));
                }
                predictions.append(&mut scored);
            }
        }

        let surviving = {
            let _guard = timing_guard("holdscan_core::deduplicate", log::Level::Debug);
            deduplicate(
                predictions,
                width,
                height,
                self.detection.dedup_threshold_percent,
            )
        };

        let mut holds = {
            let _guard = timing_guard("holdscan_core::normalize", log::Level::Debug);
            normalize(
                &surviving,
                width,
                height,
                self.detection.confidence_threshold,
            )
        };

        {
            let _guard = timing_guard("holdscan_core::sample_colors", log::Level::Trace);
            for hold in &mut holds {
                hold.dominant_color = Some(dominant_color(&working, hold.center, width, height));
            }
        }

        debug!("detected {} holds across {total} tiles", holds.len());

        Ok(DetectionOutput {
            holds,
            processed_size: (width, height),
            original_size,
        })
    }

    /// Access the detection settings.
    pub fn detection_settings(&self) -> &DetectionSettings {
        &self.detection
    }

    /// Access the tile grid settings.
    pub fn tiling_settings(&self) -> &TilingSettings {
        &self.tiling
    }
}

/// Shrink oversized photos so the longest axis fits `max_dimension`.
///
/// Scaled dimensions are truncated, matching the stored geometry of photos
/// scanned by earlier releases. Returns the input unchanged when it already
/// fits or when `max_dimension` is zero.
fn downscale_for_detection(image: &DynamicImage, max_dimension: u32) -> Cow<'_, DynamicImage> {
    let (width, height) = (image.width(), image.height());
    let largest = width.max(height);
    if max_dimension == 0 || largest <= max_dimension {
        return Cow::Borrowed(image);
    }

    let scale = f64::from(max_dimension) / f64::from(largest);
    let new_width = ((f64::from(width) * scale) as u32).max(1);
    let new_height = ((f64::from(height) * scale) as u32).max(1);
    debug!("downscaling {width}x{height} photo to {new_width}x{new_height} for detection");
    Cow::Owned(image.resize_exact(new_width, new_height, FilterType::Triangle))
}

/// Crop one tile out of the working image and encode it as JPEG.
fn encode_tile(image: &DynamicImage, tile: &Tile) -> Result<Vec<u8>> {
    let crop = image.crop_imm(tile.x1, tile.y1, tile.width(), tile.height());
    let rgb = crop.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, TILE_JPEG_QUALITY)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .context("failed to encode tile as JPEG")?;
    Ok(buffer)
}

/// Mean color of a 10x10 pixel window around the hold center, as `#rrggbb`.
///
/// `center` is in percentage space. The window spans `[c-5, c+5)` on each
/// axis, clamped to the photo; windows clipped entirely outside the photo
/// fall back to a neutral gray.
fn dominant_color(image: &DynamicImage, center: Point, width: u32, height: u32) -> String {
    let cx = (center.x / 100.0 * f64::from(width)) as i64;
    let cy = (center.y / 100.0 * f64::from(height)) as i64;

    let x0 = (cx - COLOR_WINDOW).max(0) as u32;
    let y0 = (cy - COLOR_WINDOW).max(0) as u32;
    let x1 = (((cx + COLOR_WINDOW).max(0)) as u32).min(width);
    let y1 = (((cy + COLOR_WINDOW).max(0)) as u32).min(height);

    if x0 >= x1 || y0 >= y1 {
        return FALLBACK_COLOR.to_string();
    }

    let (mut r, mut g, mut b, mut count) = (0u64, 0u64, 0u64, 0u64);
    for y in y0..y1 {
        for x in x0..x1 {
            let pixel = image.get_pixel(x, y);
            r += u64::from(pixel[0]);
            g += u64::from(pixel[1]);
            b += u64::from(pixel[2]);
            count += 1;
        }
    }
    if count == 0 {
        return FALLBACK_COLOR.to_string();
    }
    format!(
        "#{:02x}{:02x}{:02x}",
        (r / count) as u8,
        (g / count) as u8,
        (b / count) as u8
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid_image(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        let mut img = RgbaImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = Rgba(color);
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn small_photos_are_not_downscaled() {
        let image = solid_image(640, 480, [10, 20, 30, 255]);
        let working = downscale_for_detection(&image, 4096);
        assert!(matches!(working, Cow::Borrowed(_)));
        assert_eq!((working.width(), working.height()), (640, 480));
    }

    #[test]
    fn oversized_photos_scale_down_with_truncated_dimensions() {
        let image = solid_image(5000, 3000, [10, 20, 30, 255]);
        let working = downscale_for_detection(&image, 4096);
        // scale = 4096/5000, so 3000 * scale = 2457.6 truncates to 2457
        assert_eq!((working.width(), working.height()), (4096, 2457));
    }

    #[test]
    fn zero_max_dimension_disables_downscaling() {
        let image = solid_image(5000, 3000, [10, 20, 30, 255]);
        let working = downscale_for_detection(&image, 0);
        assert_eq!((working.width(), working.height()), (5000, 3000));
    }

    #[test]
    fn dominant_color_of_a_solid_image_is_that_color() {
        let image = solid_image(100, 100, [255, 128, 0, 255]);
        let color = dominant_color(&image, Point::new(50.0, 50.0), 100, 100);
        assert_eq!(color, "#ff8000");
    }

    #[test]
    fn dominant_color_window_clamps_at_the_photo_border() {
        let image = solid_image(100, 100, [0, 0, 255, 255]);
        let color = dominant_color(&image, Point::new(0.0, 0.0), 100, 100);
        assert_eq!(color, "#0000ff");
    }

    #[test]
    fn dominant_color_falls_back_outside_the_photo() {
        let image = solid_image(100, 100, [0, 255, 0, 255]);
        let color = dominant_color(&image, Point::new(250.0, 50.0), 100, 100);
        assert_eq!(color, FALLBACK_COLOR);
    }

    #[test]
    fn dominant_color_window_is_ten_pixels_wide() {
        // Red everywhere except row 55 and column 55, which sit just past the
        // half-open window around center (50, 50). If they leaked into the
        // mean, the green channel would pull the result away from pure red.
        let mut img = RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 255]));
        for i in 0..100 {
            img.put_pixel(55, i, Rgba([0, 255, 0, 255]));
            img.put_pixel(i, 55, Rgba([0, 255, 0, 255]));
        }
        let image = DynamicImage::ImageRgba8(img);
        let color = dominant_color(&image, Point::new(50.0, 50.0), 100, 100);
        assert_eq!(color, "#ff0000");
    }

    #[test]
    fn encoded_tiles_are_jpeg() {
        let image = solid_image(64, 64, [90, 90, 90, 255]);
        let tile = Tile {
            col: 0,
            row: 0,
            x1: 0,
            y1: 0,
            x2: 32,
            y2: 32,
        };
        let bytes = encode_tile(&image, &tile).expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn cancel_token_flips_once_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
