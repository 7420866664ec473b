//! Small geometric utility types.
//!
//! This module provides the axis-aligned rectangle used for bounds
//! tracking and Voronoi clipping, and the circumcircle computation
//! shared by the Delaunay diagnostics and the Voronoi builder.

use nalgebra::{Point2, Vector2};

/// An axis-aligned rectangle.
///
/// Used for tracking the bounds of inserted samples and as the
/// clipping domain of the bounded Voronoi diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Minimum x coordinate.
    pub x_min: f64,
    /// Maximum x coordinate.
    pub x_max: f64,
    /// Minimum y coordinate.
    pub y_min: f64,
    /// Maximum y coordinate.
    pub y_max: f64,
}

impl Rect {
    /// Create a rectangle from its corner coordinates.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Create a degenerate rectangle covering a single point.
    pub fn from_point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Create an empty rectangle suitable for accumulation via
    /// [`Rect::add_point`].
    pub fn empty() -> Self {
        Self {
            x_min: f64::INFINITY,
            x_max: f64::NEG_INFINITY,
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
        }
    }

    /// True if no point has been added yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max
    }

    /// Grow the rectangle to include the point.
    pub fn add_point(&mut self, x: f64, y: f64) {
        if x < self.x_min {
            self.x_min = x;
        }
        if x > self.x_max {
            self.x_max = x;
        }
        if y < self.y_min {
            self.y_min = y;
        }
        if y > self.y_max {
            self.y_max = y;
        }
    }

    /// Width of the rectangle.
    #[inline]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height of the rectangle.
    #[inline]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Area of the rectangle.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True if the point lies inside or on the boundary.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x_min <= x && x <= self.x_max && self.y_min <= y && y <= self.y_max
    }

    /// True if the other rectangle lies entirely inside this one.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x_min <= other.x_min
            && other.x_max <= self.x_max
            && self.y_min <= other.y_min
            && other.y_max <= self.y_max
    }

    /// Return a copy expanded by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Rect {
        Rect {
            x_min: self.x_min - margin,
            x_max: self.x_max + margin,
            y_min: self.y_min - margin,
            y_max: self.y_max + margin,
        }
    }
}

/// The circumscribed circle of a triangle.
#[derive(Debug, Clone, Copy)]
pub struct Circumcircle {
    /// Center of the circle.
    pub center: Point2<f64>,
    /// Radius of the circle.
    pub radius: f64,
}

impl Circumcircle {
    /// Compute the circumcircle of the triangle `(a, b, c)`.
    ///
    /// Returns `None` when the three points are collinear (or nearly
    /// so) and no finite circumcircle exists.
    pub fn from_points(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> Option<Circumcircle> {
        let d: Vector2<f64> = b - a;
        let e: Vector2<f64> = c - a;

        let bl = d.dot(&d);
        let cl = e.dot(&e);
        let det = d.x * e.y - d.y * e.x;
        if det == 0.0 {
            return None;
        }

        let half_inv = 0.5 / det;
        let ux = (e.y * bl - d.y * cl) * half_inv;
        let uy = (d.x * cl - e.x * bl) * half_inv;
        if !ux.is_finite() || !uy.is_finite() {
            return None;
        }

        Some(Circumcircle {
            center: Point2::new(a.x + ux, a.y + uy),
            radius: (ux * ux + uy * uy).sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_accumulation() {
        let mut r = Rect::empty();
        assert!(r.is_empty());
        r.add_point(1.0, 2.0);
        r.add_point(-1.0, 5.0);
        assert!(!r.is_empty());
        assert_eq!(r.x_min, -1.0);
        assert_eq!(r.x_max, 1.0);
        assert_eq!(r.width(), 2.0);
        assert_eq!(r.height(), 3.0);
        assert!(r.contains(0.0, 3.0));
        assert!(!r.contains(2.0, 3.0));
    }

    #[test]
    fn test_rect_containment() {
        let outer = Rect::new(0.0, 0.0, 10.0, 10.0);
        let inner = Rect::new(1.0, 1.0, 9.0, 9.0);
        assert!(outer.contains_rect(&inner));
        assert!(!inner.contains_rect(&outer));
        assert!(outer.contains_rect(&outer));
    }

    #[test]
    fn test_circumcircle_right_triangle() {
        // The circumcenter of a right triangle is the midpoint of its
        // hypotenuse.
        let c = Circumcircle::from_points(
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        )
        .unwrap();
        assert!((c.center.x - 1.0).abs() < 1e-12);
        assert!((c.center.y - 1.0).abs() < 1e-12);
        assert!((c.radius - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_circumcircle_collinear() {
        let c = Circumcircle::from_points(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        );
        assert!(c.is_none());
    }
}
