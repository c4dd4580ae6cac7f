//! Tile grid construction for scanning large wall photos.
//!
//! The scoring service caps how many detections a single request may return,
//! so a photo is scanned as a grid of overlapping tiles and the results are
//! merged afterwards. Overlap margins let holds that straddle a tile border
//! appear whole in at least one tile.

use holdscan_utils::TilingSettings;

/// One tile of the scan grid, in full-image pixel coordinates.
///
/// `x2`/`y2` are exclusive, so `x2 - x1` is the tile width in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub col: u32,
    pub row: u32,
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Tile {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// The full scan grid for one photo, in row-major order.
#[derive(Debug, Clone)]
pub struct TileGrid {
    tiles: Vec<Tile>,
    cols: u32,
    rows: u32,
}

impl TileGrid {
    /// Build the grid for a photo of `width` x `height` pixels.
    ///
    /// Tile size uses integer division, and the overlap margin is the floor
    /// of `tile_size * overlap`, clamped to the image bounds on both ends.
    /// Together the tiles always cover the photo exactly. Degenerate grid
    /// settings (zero rows or columns) are treated as a single tile.
    pub fn new(width: u32, height: u32, settings: &TilingSettings) -> Self {
        let cols = settings.cols.max(1);
        let rows = settings.rows.max(1);

        let tile_width = width / cols;
        let tile_height = height / rows;
        let overlap_x = (f64::from(tile_width) * settings.overlap) as u32;
        let overlap_y = (f64::from(tile_height) * settings.overlap) as u32;

        let mut tiles = Vec::with_capacity((cols * rows) as usize);
        for row in 0..rows {
            for col in 0..cols {
                let x1 = (col * tile_width).saturating_sub(overlap_x);
                let y1 = (row * tile_height).saturating_sub(overlap_y);
                let x2 = ((col + 1) * tile_width + overlap_x).min(width);
                let y2 = ((row + 1) * tile_height + overlap_y).min(height);
                tiles.push(Tile {
                    col,
                    row,
                    x1,
                    y1,
                    x2,
                    y2,
                });
            }
        }

        Self { tiles, cols, rows }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// Tiles in row-major order (all columns of row 0, then row 1, ...).
    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }
}

impl<'a> IntoIterator for &'a TileGrid {
    type Item = &'a Tile;
    type IntoIter = std::slice::Iter<'a, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
