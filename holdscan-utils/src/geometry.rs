//! Polygon math shared by the detection pipeline and interactive editing.
//!
//! All functions are total: degenerate inputs (empty or near-empty polygons,
//! zero-length edges) produce a defined value instead of an error. Inputs are
//! treated as vertex lists in either winding; functions that walk edges close
//! the loop from the last vertex back to the first.

use crate::point::Point;

/// Signed cross product of the vectors `o -> a` and `o -> b`.
///
/// Positive for a counter-clockwise turn, negative for clockwise, zero for
/// collinear points.
fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Vertex average of a polygon.
///
/// Returns the origin for an empty vertex list.
pub fn polygon_centroid(polygon: &[Point]) -> Point {
    if polygon.is_empty() {
        return Point::new(0.0, 0.0);
    }
    let sum_x: f64 = polygon.iter().map(|p| p.x).sum();
    let sum_y: f64 = polygon.iter().map(|p| p.y).sum();
    let count = polygon.len() as f64;
    Point::new(sum_x / count, sum_y / count)
}

/// Test whether `(x, y)` lies inside a polygon using ray casting.
///
/// An odd number of edge crossings along the horizontal ray means the point
/// is inside. Points exactly on an edge may report either side; callers that
/// care about boundaries should not rely on a specific answer there.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = polygon.len();
    let mut j = n - 1;
    for i in 0..n {
        let vi = polygon[i];
        let vj = polygon[j];
        if ((vi.y > y) != (vj.y > y))
            && (x < (vj.x - vi.x) * (y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Polygon area via the shoelace formula.
///
/// Winding-insensitive (the absolute value is returned). Fewer than 3
/// vertices yield an area of 0.
pub fn polygon_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = polygon.len();
    for i in 0..n {
        let j = (i + 1) % n;
        area += polygon[i].x * polygon[j].y;
        area -= polygon[j].x * polygon[i].y;
    }
    area.abs() / 2.0
}

/// Find the item whose polygon contains `(x, y)` with the smallest area.
///
/// When several containing polygons tie on area, the earliest item in the
/// slice wins, so selection stays stable for overlapping holds.
///
/// # Arguments
///
/// * `x`, `y` - Query point, in the same space as the polygons.
/// * `items` - Candidate items in priority order.
/// * `polygon_of` - Accessor yielding each item's vertex list.
pub fn smallest_polygon_at_point<'a, T, F>(
    x: f64,
    y: f64,
    items: &'a [T],
    polygon_of: F,
) -> Option<&'a T>
where
    F: Fn(&T) -> &[Point],
{
    let mut best: Option<(&T, f64)> = None;
    for item in items {
        let polygon = polygon_of(item);
        if !point_in_polygon(x, y, polygon) {
            continue;
        }
        let area = polygon_area(polygon);
        match best {
            Some((_, best_area)) if area >= best_area => {}
            _ => best = Some((item, area)),
        }
    }
    best.map(|(item, _)| item)
}

/// Push every vertex away from the centroid by `expand_by`, then scale the
/// result about the centroid.
///
/// Polygons with fewer than 3 vertices are returned unchanged, and a vertex
/// sitting exactly on the centroid stays where it is (there is no direction
/// to push it along).
pub fn expand_polygon(polygon: &[Point], expand_by: f64, scale: f64) -> Vec<Point> {
    if polygon.len() < 3 {
        return polygon.to_vec();
    }

    let centroid = polygon_centroid(polygon);
    polygon
        .iter()
        .map(|&vertex| {
            let offset = vertex - centroid;
            let dist = offset.hypot();
            if dist == 0.0 {
                return vertex;
            }
            let pushed = offset + offset / dist * expand_by;
            centroid + pushed * scale
        })
        .collect()
}

/// Convex hull via Graham's scan.
///
/// The pivot is the lowest-y vertex (leftmost on ties); remaining vertices
/// are sorted by polar angle around it (collinear ties by distance), and the
/// scan pops while the turn is clockwise or straight, so collinear edge
/// points are dropped from the hull. Inputs with fewer than 3 vertices come
/// back unchanged.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut points = points.to_vec();

    let mut start_idx = 0;
    for i in 1..points.len() {
        if points[i].y < points[start_idx].y
            || (points[i].y == points[start_idx].y && points[i].x < points[start_idx].x)
        {
            start_idx = i;
        }
    }
    points.swap(0, start_idx);
    let start = points[0];

    points[1..].sort_by(|&a, &b| {
        let turn = cross(start, a, b);
        if turn == 0.0 {
            let dist_a = (a - start).hypot();
            let dist_b = (b - start).hypot();
            dist_a.partial_cmp(&dist_b).unwrap_or(std::cmp::Ordering::Equal)
        } else if turn > 0.0 {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    });

    let mut hull: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        while hull.len() > 1 && cross(hull[hull.len() - 2], hull[hull.len() - 1], point) <= 0.0 {
            hull.pop();
        }
        hull.push(point);
    }
    hull
}

/// Perpendicular distance from `point` to the infinite line through
/// `line_start` and `line_end`. Coincident line endpoints give 0.
fn point_to_line_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let a = line_end.y - line_start.y;
    let b = line_start.x - line_end.x;
    let c = line_end.x * line_start.y - line_start.x * line_end.y;

    let denominator = (a * a + b * b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    (a * point.x + b * point.y + c).abs() / denominator
}

/// Simplify an open vertex chain with Douglas-Peucker.
///
/// The first and last vertices always survive. The chain is not treated as a
/// closed loop; callers smoothing a polygon accept that the closing edge is
/// not considered when picking split points.
pub fn simplify_polygon(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end - start <= 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_index = start;
        for i in (start + 1)..end {
            let dist = point_to_line_distance(points[i], points[start], points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }

        if max_dist > tolerance {
            keep[max_index] = true;
            if max_index - start > 1 {
                stack.push((start, max_index));
            }
            if end - max_index > 1 {
                stack.push((max_index, end));
            }
        }
    }

    points
        .iter()
        .zip(&keep)
        .filter_map(|(&point, &kept)| kept.then_some(point))
        .collect()
}

/// Chaikin corner cutting over a closed loop.
///
/// Each pass replaces every edge with its 1/4 and 3/4 points, doubling the
/// vertex count. Polygons with fewer than 3 vertices are returned unchanged.
pub fn smooth_polygon_chaikin(polygon: &[Point], iterations: usize) -> Vec<Point> {
    let mut current = polygon.to_vec();
    for _ in 0..iterations {
        if current.len() < 3 {
            break;
        }
        let mut smoothed = Vec::with_capacity(current.len() * 2);
        for i in 0..current.len() {
            let p0 = current[i];
            let p1 = current[(i + 1) % current.len()];
            smoothed.push(p0.mul_add(0.75, p1 * 0.25));
            smoothed.push(p0.mul_add(0.25, p1 * 0.75));
        }
        current = smoothed;
    }
    current
}

/// Simplify, then smooth with Chaikin corner cutting.
///
/// `tolerance` and `iterations` come from the caller: interactive surfaces
/// pick them per zoom level so on-screen smoothing stays roughly constant.
pub fn smooth_polygon(polygon: &[Point], tolerance: f64, iterations: usize) -> Vec<Point> {
    let simplified = simplify_polygon(polygon, tolerance);
    smooth_polygon_chaikin(&simplified, iterations)
}

/// Nearest intersection of the segment `start -> end` with a polygon's
/// perimeter.
///
/// The perimeter is walked as a closed loop; among all crossings the one
/// closest to `start` (smallest parameter along the segment) wins. If the
/// segment never crosses the perimeter, `end` is returned so callers always
/// get a usable endpoint.
pub fn perimeter_intersection(start: Point, end: Point, polygon: &[Point]) -> Point {
    let n = polygon.len();
    if n < 2 {
        return end;
    }

    let dir = end - start;
    let mut best: Option<(f64, Point)> = None;

    for i in 0..n {
        let edge_start = polygon[i];
        let edge_end = polygon[(i + 1) % n];
        let edge = edge_end - edge_start;

        let denom = dir.x * edge.y - dir.y * edge.x;
        if denom == 0.0 {
            continue;
        }

        let offset = edge_start - start;
        let t = (offset.x * edge.y - offset.y * edge.x) / denom;
        let u = (offset.x * dir.y - offset.y * dir.x) / denom;
        if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
            continue;
        }

        let hit = start + dir * t;
        match best {
            Some((best_t, _)) if t >= best_t => {}
            _ => best = Some((t, hit)),
        }
    }

    best.map(|(_, hit)| hit).unwrap_or(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn area_of_unit_square_is_one_either_winding() {
        let ccw = unit_square();
        let cw: Vec<Point> = ccw.iter().rev().copied().collect();
        assert!((polygon_area(&ccw) - 1.0).abs() < 1e-12);
        assert!((polygon_area(&cw) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn area_of_degenerate_polygon_is_zero() {
        assert_eq!(polygon_area(&[]), 0.0);
        assert_eq!(polygon_area(&[Point::new(1.0, 1.0)]), 0.0);
        assert_eq!(
            polygon_area(&[Point::new(0.0, 0.0), Point::new(5.0, 5.0)]),
            0.0
        );
    }

    #[test]
    fn point_in_polygon_classifies_interior_and_exterior() {
        let square = unit_square();
        assert!(point_in_polygon(0.5, 0.5, &square));
        assert!(!point_in_polygon(1.5, 0.5, &square));
        assert!(!point_in_polygon(0.5, -0.5, &square));
    }

    #[test]
    fn point_in_polygon_rejects_degenerate_input() {
        assert!(!point_in_polygon(0.0, 0.0, &[]));
        assert!(!point_in_polygon(
            0.0,
            0.0,
            &[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]
        ));
    }

    #[test]
    fn smallest_polygon_wins_over_larger_container() {
        let big = unit_square()
            .iter()
            .map(|p| *p * 10.0)
            .collect::<Vec<_>>();
        let small = unit_square()
            .iter()
            .map(|p| *p * 2.0 + Point::new(1.0, 1.0))
            .collect::<Vec<_>>();
        let items = vec![big, small];

        let found = smallest_polygon_at_point(2.0, 2.0, &items, |poly| poly.as_slice())
            .expect("point is inside both polygons");
        assert_eq!(found.len(), 4);
        assert!((polygon_area(found) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn smallest_polygon_tie_keeps_first_item() {
        let a = unit_square();
        let b = unit_square();
        let items = vec![a, b];
        let found = smallest_polygon_at_point(0.5, 0.5, &items, |poly| poly.as_slice())
            .expect("point is inside both");
        assert!(std::ptr::eq(found, &items[0]));
    }

    #[test]
    fn smallest_polygon_none_when_outside_all() {
        let items = vec![unit_square()];
        assert!(smallest_polygon_at_point(5.0, 5.0, &items, |poly| poly.as_slice()).is_none());
    }

    #[test]
    fn expand_polygon_moves_vertices_outward() {
        let square = unit_square();
        let expanded = expand_polygon(&square, 1.0, 1.0);
        let centroid = polygon_centroid(&square);
        for (original, moved) in square.iter().zip(&expanded) {
            let before = (*original - centroid).hypot();
            let after = (*moved - centroid).hypot();
            assert!((after - (before + 1.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn expand_polygon_is_identity_for_degenerate_input() {
        let line = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        assert_eq!(expand_polygon(&line, 5.0, 2.0), line);
    }

    #[test]
    fn expand_polygon_leaves_centroid_vertex_in_place() {
        // Four outer vertices plus one exactly at their shared centroid.
        let polygon = vec![
            Point::new(-1.0, -1.0),
            Point::new(1.0, -1.0),
            Point::new(1.0, 1.0),
            Point::new(-1.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        let expanded = expand_polygon(&polygon, 2.0, 1.0);
        assert_eq!(expanded[4], Point::new(0.0, 0.0));
    }

    #[test]
    fn convex_hull_excludes_interior_points() {
        let mut points = unit_square();
        points.push(Point::new(0.5, 0.5));
        points.push(Point::new(0.25, 0.75));

        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        for p in &hull {
            assert!(p.x == 0.0 || p.x == 1.0);
            assert!(p.y == 0.0 || p.y == 1.0);
        }
    }

    #[test]
    fn convex_hull_drops_collinear_edge_points() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point::new(1.0, 0.0)));
    }

    #[test]
    fn convex_hull_passes_small_inputs_through() {
        let two = vec![Point::new(3.0, 4.0), Point::new(5.0, 6.0)];
        assert_eq!(convex_hull(&two), two);
    }

    #[test]
    fn simplify_keeps_endpoints_and_drops_collinear_middle() {
        let chain = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.001),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.001),
            Point::new(4.0, 0.0),
        ];
        let simplified = simplify_polygon(&chain, 0.01);
        assert_eq!(simplified.first(), chain.first());
        assert_eq!(simplified.last(), chain.last());
        assert_eq!(simplified.len(), 2);
    }

    #[test]
    fn simplify_retains_significant_corner() {
        let chain = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(4.0, 0.0),
        ];
        let simplified = simplify_polygon(&chain, 0.5);
        assert_eq!(simplified.len(), 3);
    }

    #[test]
    fn chaikin_doubles_vertex_count_per_iteration() {
        let triangle = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ];
        assert_eq!(smooth_polygon_chaikin(&triangle, 1).len(), 6);
        assert_eq!(smooth_polygon_chaikin(&triangle, 2).len(), 12);
    }

    #[test]
    fn chaikin_cuts_each_edge_at_quarter_points() {
        let triangle = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ];
        let smoothed = smooth_polygon_chaikin(&triangle, 1);
        assert_eq!(smoothed[0], Point::new(1.0, 0.0));
        assert_eq!(smoothed[1], Point::new(3.0, 0.0));
    }

    #[test]
    fn smooth_polygon_composes_simplify_and_chaikin() {
        let noisy = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.001),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let smoothed = smooth_polygon(&noisy, 0.01, 1);
        let expected = smooth_polygon_chaikin(&simplify_polygon(&noisy, 0.01), 1);
        assert_eq!(smoothed, expected);
    }

    #[test]
    fn perimeter_intersection_finds_nearest_crossing() {
        let square = unit_square();
        let start = Point::new(0.5, 0.5);
        let end = Point::new(2.5, 0.5);
        let hit = perimeter_intersection(start, end, &square);
        assert!((hit.x - 1.0).abs() < 1e-12);
        assert!((hit.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn perimeter_intersection_falls_back_to_end() {
        let square = unit_square();
        let start = Point::new(0.25, 0.25);
        let end = Point::new(0.75, 0.75);
        assert_eq!(perimeter_intersection(start, end, &square), end);
    }
}
