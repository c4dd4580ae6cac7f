use holdscan_utils::{
    extract_polygon, perimeter_intersection, point_in_polygon, polygon_area, simplify_polygon,
    smallest_polygon_at_point, smooth_polygon, Point,
};

fn circle_stroke(center: Point, radius: f64, samples: usize) -> Vec<Point> {
    (0..samples)
        .map(|i| {
            let angle = i as f64 / samples as f64 * std::f64::consts::TAU;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

#[test]
fn freehand_outline_workflow_produces_a_selectable_hold() {
    // A climber traces a rough circle around a hold with a fat brush.
    let stroke = circle_stroke(Point::new(50.0, 50.0), 12.0, 40);
    let outline = extract_polygon(&stroke, 3.0);

    assert!(outline.len() >= 3, "outline must be a polygon");
    let area = polygon_area(&outline);
    assert!(
        area > std::f64::consts::PI * 12.0 * 12.0,
        "brush radius inflates the outline beyond the traced circle"
    );

    // Clicking inside selects it; clicking well away does not.
    assert!(
        point_in_polygon(50.0, 50.0, &outline),
        "traced center is inside the outline"
    );
    assert!(
        !point_in_polygon(90.0, 90.0, &outline),
        "far corner is outside the outline"
    );

    // With a second, smaller hold drawn inside the first, a click on the
    // shared center picks the smaller one.
    let inner = extract_polygon(&circle_stroke(Point::new(50.0, 50.0), 4.0, 24), 2.0);
    assert!(polygon_area(&inner) < area);
    let outlines = vec![outline.clone(), inner.clone()];
    let chosen = smallest_polygon_at_point(50.0, 50.0, &outlines, |poly| poly.as_slice())
        .expect("both outlines cover the click");
    assert_eq!(chosen, &inner, "the smaller hold wins the click");

    // Dragging from the center towards a point far outside snaps to the
    // border: the intersection stays on the drag segment.
    let border = perimeter_intersection(Point::new(50.0, 50.0), Point::new(120.0, 50.0), &outline);
    assert!(
        border.x > 55.0 && border.x < 70.0,
        "border crossing sits between center and target, got {}",
        border.x
    );
    assert!(
        (border.y - 50.0).abs() < 1e-9,
        "a horizontal drag crosses the border at the same height"
    );

    // Smoothing for display: corner cutting quadruples the simplified
    // vertex count over two rounds and keeps the shape selectable.
    let smooth = smooth_polygon(&outline, 1.5, 2);
    assert_eq!(smooth.len(), simplify_polygon(&outline, 1.5).len() * 4);
    assert!(point_in_polygon(50.0, 50.0, &smooth));
    for vertex in &smooth {
        assert!(
            (30.0..=70.0).contains(&vertex.x) && (30.0..=70.0).contains(&vertex.y),
            "smoothed vertices stay near the traced ring, got {vertex:?}"
        );
    }
}

#[test]
fn a_stroke_confined_to_one_cell_outlines_its_own_points() {
    // All samples land in the same raster cell, so the mask cannot describe
    // the shape and the outline falls back to the stroke's own hull.
    let stroke = vec![
        Point::new(50.1, 50.1),
        Point::new(50.2, 50.3),
        Point::new(50.4, 50.2),
        Point::new(49.9, 49.8),
        Point::new(50.0, 50.4),
    ];
    let outline = extract_polygon(&stroke, 0.3);

    assert!(outline.len() >= 3, "fallback hull still encloses the stroke");
    for vertex in &outline {
        assert!(
            stroke.contains(vertex),
            "fallback vertices come from the stroke itself"
        );
    }
}
