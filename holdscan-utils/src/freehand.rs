//! Freehand brush strokes rasterized into hold outlines.
//!
//! Strokes are stamped onto a fixed 100x100 boolean grid in the caller's
//! local space. The outline is recovered from the marked region's edge cells,
//! hulled, and simplified; tight concavities narrower than the brush are
//! filled in by the hull step, which is an accepted approximation for
//! hand-drawn hold outlines.

use crate::geometry::{convex_hull, simplify_polygon};
use crate::point::Point;

/// Side length of the rasterization grid, in cells.
pub const GRID_SIZE: usize = 100;

/// Tolerance (in grid units) for simplifying the traced outline.
const OUTLINE_TOLERANCE: f64 = 1.5;

/// Boolean occupancy grid a brush stroke is stamped onto.
#[derive(Debug, Clone)]
pub struct BrushMask {
    cells: Vec<bool>,
}

impl Default for BrushMask {
    fn default() -> Self {
        Self::new()
    }
}

impl BrushMask {
    pub fn new() -> Self {
        Self {
            cells: vec![false; GRID_SIZE * GRID_SIZE],
        }
    }

    /// Mark every cell within `radius` of `point`.
    ///
    /// The search window is `radius` rounded up, but a cell is only marked
    /// when its exact Euclidean distance to the stamp point is within the
    /// radius, so stamps stay circular. Cells outside the grid are ignored.
    pub fn stamp(&mut self, point: Point, radius: f64) {
        let bound = radius.ceil() as i64;
        let center_x = point.x.round() as i64;
        let center_y = point.y.round() as i64;

        for dy in -bound..=bound {
            for dx in -bound..=bound {
                let cx = center_x + dx;
                let cy = center_y + dy;
                if cx < 0 || cy < 0 || cx >= GRID_SIZE as i64 || cy >= GRID_SIZE as i64 {
                    continue;
                }
                let dist = Point::new(cx as f64, cy as f64).distance(point);
                if dist <= radius {
                    self.cells[cy as usize * GRID_SIZE + cx as usize] = true;
                }
            }
        }
    }

    pub fn is_marked(&self, x: usize, y: usize) -> bool {
        x < GRID_SIZE && y < GRID_SIZE && self.cells[y * GRID_SIZE + x]
    }

    /// Marked cells that sit on the region's boundary.
    ///
    /// A marked cell is an edge cell when it lies on the grid border or has
    /// at least one unmarked 4-neighbor. Cells are returned in row-major
    /// order so the result is deterministic.
    pub fn edge_cells(&self) -> Vec<Point> {
        let mut edges = Vec::new();
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                if !self.is_marked(x, y) {
                    continue;
                }
                let on_border = x == 0 || y == 0 || x == GRID_SIZE - 1 || y == GRID_SIZE - 1;
                let exposed = on_border
                    || !self.is_marked(x - 1, y)
                    || !self.is_marked(x + 1, y)
                    || !self.is_marked(x, y - 1)
                    || !self.is_marked(x, y + 1);
                if exposed {
                    edges.push(Point::new(x as f64, y as f64));
                }
            }
        }
        edges
    }
}

/// Turn a brush stroke into a polygon outline.
///
/// `stroke` is the sequence of brush positions in grid-local space (0–100 on
/// both axes) and `radius` the brush radius in grid units. When the stamped
/// region is too small to trace (fewer than 3 edge cells), the convex hull of
/// the raw stroke points is returned instead, so the function always yields
/// something drawable. Mapping the result back to image space is the
/// caller's job.
pub fn extract_polygon(stroke: &[Point], radius: f64) -> Vec<Point> {
    let mut mask = BrushMask::new();
    for &point in stroke {
        mask.stamp(point, radius);
    }

    let edges = mask.edge_cells();
    if edges.len() < 3 {
        return convex_hull(stroke);
    }

    let hull = convex_hull(&edges);
    simplify_polygon(&hull, OUTLINE_TOLERANCE)
}
