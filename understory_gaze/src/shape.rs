// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local-space hit geometry for targets.
//!
//! Gaze samples are noisy, so every shape accepts an inclusive tolerance in
//! local units that widens its hit region:
//!
//! - [`Rect`] is inflated on all sides.
//! - [`Circle`] and [`Ellipse`] grow their radii.
//! - [`RoundedRect`] is exact without tolerance and falls back to its
//!   inflated bounding box with one.
//! - [`BezPath`] is fill-only and ignores tolerance.

use kurbo::{BezPath, Circle, Ellipse, Point, Rect, RoundedRect, Shape};

/// Geometry of a target in its own local coordinate space.
#[derive(Clone, Debug, PartialEq)]
pub enum TargetShape {
    /// Axis-aligned rectangle.
    Rect(Rect),
    /// Rectangle with rounded corners.
    RoundedRect(RoundedRect),
    /// Filled disk.
    Circle(Circle),
    /// Filled, possibly rotated ellipse.
    Ellipse(Ellipse),
    /// Arbitrary closed path, hit by its fill.
    Path(BezPath),
}

impl Default for TargetShape {
    fn default() -> Self {
        Self::Rect(Rect::ZERO)
    }
}

impl TargetShape {
    /// Whether `pt` (in local space) hits this shape, widened by `tolerance`.
    pub fn hit_local(&self, pt: Point, tolerance: f64) -> bool {
        let tol = tolerance.max(0.0);
        match self {
            Self::Rect(r) => {
                let r = if tol > 0.0 { r.inflate(tol, tol) } else { *r };
                r.contains(pt)
            }
            Self::RoundedRect(rr) => {
                if tol > 0.0 {
                    rr.rect().inflate(tol, tol).contains(pt)
                } else {
                    rr.contains(pt)
                }
            }
            Self::Circle(c) => c.center.distance(pt) <= c.radius + tol,
            Self::Ellipse(e) => {
                let radii = e.radii();
                Ellipse::new(
                    e.center(),
                    (radii.x + tol, radii.y + tol),
                    e.rotation(),
                )
                .contains(pt)
            }
            Self::Path(p) => p.contains(pt),
        }
    }

    /// Local-space bounding box.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Self::Rect(r) => *r,
            Self::RoundedRect(rr) => rr.bounding_box(),
            Self::Circle(c) => c.bounding_box(),
            Self::Ellipse(e) => e.bounding_box(),
            Self::Path(p) => p.bounding_box(),
        }
    }
}

impl From<Rect> for TargetShape {
    fn from(r: Rect) -> Self {
        Self::Rect(r)
    }
}

impl From<Circle> for TargetShape {
    fn from(c: Circle) -> Self {
        Self::Circle(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_with_and_without_tolerance() {
        let s = TargetShape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(s.hit_local(Point::new(5.0, 5.0), 0.0));
        assert!(!s.hit_local(Point::new(12.0, 5.0), 0.0));
        assert!(s.hit_local(Point::new(12.0, 5.0), 3.0));
        // Negative tolerance is clamped, not a shrink.
        assert!(s.hit_local(Point::new(0.5, 0.5), -5.0));
    }

    #[test]
    fn circle_radius_plus_tolerance() {
        let s = TargetShape::Circle(Circle::new((0.0, 0.0), 5.0));
        assert!(s.hit_local(Point::new(3.0, 4.0), 0.0));
        assert!(!s.hit_local(Point::new(6.0, 0.0), 0.0));
        assert!(s.hit_local(Point::new(6.0, 0.0), 1.0));
    }

    #[test]
    fn rounded_rect_corner_is_exact_without_tolerance() {
        let s = TargetShape::RoundedRect(RoundedRect::new(0.0, 0.0, 20.0, 20.0, 8.0));
        assert!(s.hit_local(Point::new(10.0, 10.0), 0.0));
        assert!(!s.hit_local(Point::new(0.5, 0.5), 0.0), "outside the rounded corner");
        assert!(s.hit_local(Point::new(0.5, 0.5), 1.0), "tolerant hit uses bounds");
    }

    #[test]
    fn ellipse_grows_with_tolerance() {
        let s = TargetShape::Ellipse(Ellipse::new((0.0, 0.0), (10.0, 4.0), 0.0));
        assert!(s.hit_local(Point::new(9.0, 0.0), 0.0));
        assert!(!s.hit_local(Point::new(0.0, 5.0), 0.0));
        assert!(s.hit_local(Point::new(0.0, 5.0), 2.0));
    }

    #[test]
    fn path_fill_hit() {
        let mut p = BezPath::new();
        p.move_to((0.0, 0.0));
        p.line_to((10.0, 0.0));
        p.line_to((0.0, 10.0));
        p.close_path();
        let s = TargetShape::Path(p);
        assert!(s.hit_local(Point::new(2.0, 2.0), 0.0));
        assert!(!s.hit_local(Point::new(8.0, 8.0), 5.0), "paths ignore tolerance");
        assert_eq!(s.bounding_box(), Rect::new(0.0, 0.0, 10.0, 10.0));
    }
}
