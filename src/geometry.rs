//! Planar geometry for slot membership tests.
//!
//! Region vertices are integer pixel coordinates; detected-object centers are
//! derived from floating-point boxes, so the membership test mixes the two.

use serde::{Deserialize, Serialize};

/// A polygon vertex in image pixel space.
///
/// Serialized as a 2-element array `[x, y]`, matching the persisted region
/// file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(point: Point) -> Self {
        (point.x, point.y)
    }
}

/// Even-odd ray-casting membership test.
///
/// Boundary rule: **inclusive**. A point exactly on a polygon edge or vertex
/// is inside. The boundary case is decided by an explicit on-segment test
/// before the parity scan, so the crossing loop itself never has to break
/// ties; vertical edges take a dedicated branch and no division by zero (or
/// stale intersection value) can occur.
///
/// Polygons with fewer than 3 vertices contain nothing.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    if on_boundary(x, y, polygon) {
        return true;
    }

    let mut inside = false;
    let mut prev = polygon[polygon.len() - 1];
    for &vertex in polygon {
        let (x1, y1) = (prev.x as f64, prev.y as f64);
        let (x2, y2) = (vertex.x as f64, vertex.y as f64);

        // An edge is crossed when y lies in (min, max]; the half-open rule
        // keeps a ray through a shared vertex from counting both edges.
        if y > y1.min(y2) && y <= y1.max(y2) && x <= x1.max(x2) {
            if prev.x == vertex.x {
                // Vertical edge: the crossing is at x1, and x <= x1 holds here.
                inside = !inside;
            } else if prev.y != vertex.y {
                let x_cross = (y - y1) * (x2 - x1) / (y2 - y1) + x1;
                if x <= x_cross {
                    inside = !inside;
                }
            }
        }
        prev = vertex;
    }
    inside
}

fn on_boundary(x: f64, y: f64, polygon: &[Point]) -> bool {
    let mut prev = polygon[polygon.len() - 1];
    for &vertex in polygon {
        if on_segment(x, y, prev, vertex) {
            return true;
        }
        prev = vertex;
    }
    false
}

fn on_segment(x: f64, y: f64, a: Point, b: Point) -> bool {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let cross = (bx - ax) * (y - ay) - (by - ay) * (x - ax);
    if cross != 0.0 {
        return false;
    }
    x >= ax.min(bx) && x <= ax.max(bx) && y >= ay.min(by) && y <= ay.max(by)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ]
    }

    #[test]
    fn center_of_square_is_inside() {
        assert!(point_in_polygon(5.0, 5.0, &square()));
    }

    #[test]
    fn point_far_outside_bounding_box_is_outside() {
        assert!(!point_in_polygon(50.0, 50.0, &square()));
        assert!(!point_in_polygon(-50.0, 5.0, &square()));
    }

    #[test]
    fn boundary_is_inclusive() {
        // Edge midpoints on all four sides, plus a vertex.
        assert!(point_in_polygon(5.0, 0.0, &square()));
        assert!(point_in_polygon(5.0, 10.0, &square()));
        assert!(point_in_polygon(0.0, 5.0, &square()));
        assert!(point_in_polygon(10.0, 5.0, &square()));
        assert!(point_in_polygon(0.0, 0.0, &square()));
    }

    #[test]
    fn just_outside_each_edge_is_outside() {
        assert!(!point_in_polygon(5.0, -0.5, &square()));
        assert!(!point_in_polygon(5.0, 10.5, &square()));
        assert!(!point_in_polygon(-0.5, 5.0, &square()));
        assert!(!point_in_polygon(10.5, 5.0, &square()));
    }

    #[test]
    fn vertical_edges_do_not_divide_by_zero() {
        // Tall thin slot; every non-horizontal edge is vertical.
        let slot = vec![
            Point::new(100, 20),
            Point::new(104, 20),
            Point::new(104, 80),
            Point::new(100, 80),
        ];
        assert!(point_in_polygon(102.0, 50.0, &slot));
        assert!(!point_in_polygon(99.0, 50.0, &slot));
        assert!(!point_in_polygon(105.0, 50.0, &slot));
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        // A "C" shape: the notch at the right-center must be outside.
        let shape = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 3),
            Point::new(4, 3),
            Point::new(4, 7),
            Point::new(10, 7),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert!(point_in_polygon(2.0, 5.0, &shape));
        assert!(!point_in_polygon(8.0, 5.0, &shape));
        assert!(point_in_polygon(8.0, 1.5, &shape));
    }

    #[test]
    fn non_integer_centers_are_handled() {
        assert!(point_in_polygon(5.5, 4.5, &square()));
        assert!(!point_in_polygon(10.001, 5.0, &square()));
    }

    #[test]
    fn degenerate_polygons_contain_nothing() {
        assert!(!point_in_polygon(0.0, 0.0, &[]));
        assert!(!point_in_polygon(
            0.0,
            0.0,
            &[Point::new(0, 0), Point::new(10, 10)]
        ));
    }
}
