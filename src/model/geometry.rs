//! Core geometry types shared by the box model, viewport and codec.
//!
//! All coordinates here are plain `f64` values. Whether a [`Point`] lives in
//! image space or screen space is decided by the caller; only the
//! [`Viewport`](crate::viewport::Viewport) converts between the two.

use serde::{Deserialize, Serialize};

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Rotate about the origin by `degrees` (positive is clockwise on a
    /// y-down screen).
    pub fn rotated(&self, degrees: f64) -> Point {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Clamp both coordinates into `[0, width] x [0, height]`.
    pub fn clamped_to(&self, size: Size) -> Point {
        Point::new(
            self.x.clamp(0.0, size.width.max(0.0)),
            self.y.clamp(0.0, size.height.max(0.0)),
        )
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are strictly positive and finite.
    ///
    /// Every viewport and export operation guards on this so a missing
    /// image or an unmeasured viewport never divides by zero.
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(f64::from(width), f64::from(height))
    }
}

/// Render-ready rectangle for a box.
///
/// `x`/`y` is the top-left corner in the box's *unrotated* frame. The
/// rotation must be applied about [`ImageRect::pivot`], the box center; a
/// renderer that rotates about `(x, y)` instead swings the box around the
/// wrong point and disagrees with the OBB export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl ImageRect {
    /// The rotation pivot (box center).
    pub fn pivot(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Offset from the top-left to the pivot, for renderers that take an
    /// explicit origin offset alongside a center position.
    pub fn pivot_offset(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// The four corners after rotation, in top-left, top-right,
    /// bottom-right, bottom-left order of the unrotated frame.
    pub fn corners(&self) -> [Point; 4] {
        let center = self.pivot();
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        [
            Point::new(-hw, -hh),
            Point::new(hw, -hh),
            Point::new(hw, hh),
            Point::new(-hw, hh),
        ]
        .map(|p| {
            let r = p.rotated(self.rotation);
            center.offset(r.x, r.y)
        })
    }

    /// Check if a point lies inside the rotated rectangle.
    pub fn contains(&self, point: &Point) -> bool {
        let center = self.pivot();
        let local = Point::new(point.x - center.x, point.y - center.y).rotated(-self.rotation);
        local.x.abs() <= self.width / 2.0 && local.y.abs() <= self.height / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_point(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
    }

    #[test]
    fn test_point_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert!((p1.distance_to(&p2) - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        // 90 degrees clockwise on a y-down screen maps +x onto +y
        let p = Point::new(10.0, 0.0).rotated(90.0);
        assert!(approx_point(p, Point::new(0.0, 10.0)));
    }

    #[test]
    fn test_clamp_to_size() {
        let size = Size::new(100.0, 50.0);
        assert_eq!(Point::new(-5.0, 60.0).clamped_to(size), Point::new(0.0, 50.0));
        assert_eq!(Point::new(20.0, 10.0).clamped_to(size), Point::new(20.0, 10.0));
    }

    #[test]
    fn test_size_usable() {
        assert!(Size::new(1.0, 1.0).is_usable());
        assert!(!Size::new(0.0, 10.0).is_usable());
        assert!(!Size::new(10.0, f64::NAN).is_usable());
        assert!(!Size::new(f64::INFINITY, 10.0).is_usable());
    }

    #[test]
    fn test_pivot_is_center() {
        let rect = ImageRect {
            x: 10.0,
            y: 20.0,
            width: 40.0,
            height: 10.0,
            rotation: 33.0,
        };
        assert_eq!(rect.pivot(), Point::new(30.0, 25.0));
        assert_eq!(rect.pivot_offset(), Point::new(20.0, 5.0));
    }

    #[test]
    fn test_rotation_keeps_center_fixed() {
        let rect = ImageRect {
            x: 0.0,
            y: 0.0,
            width: 20.0,
            height: 10.0,
            rotation: 90.0,
        };
        let corners = rect.corners();
        let cx = corners.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy = corners.iter().map(|p| p.y).sum::<f64>() / 4.0;
        assert!(approx_point(Point::new(cx, cy), rect.pivot()));
        // First corner is the pre-rotation top-left, now at the top-right
        assert!(approx_point(corners[0], Point::new(15.0, -5.0)));
    }

    #[test]
    fn test_contains_rotated() {
        let rect = ImageRect {
            x: 40.0,
            y: 45.0,
            width: 20.0,
            height: 10.0,
            rotation: 90.0,
        };
        // Rotated box spans x in [45, 55], y in [40, 60]
        assert!(rect.contains(&Point::new(50.0, 58.0)));
        assert!(!rect.contains(&Point::new(58.0, 50.0)));
    }
}
