//! Plane geometry shared by block solving, composition and isopleth solving.
//!
//! # Overview
//!
//! Every block is solved in its own local frame. Composition then moves each
//! block with an [`Affine`] map, and the global transformation list appends
//! more affine maps on top. Nothing here knows about scales: these are the
//! plain points, rectangles and maps the rest of the crate is built on.
//!
//! # Key Types
//!
//! - [`Point`] - A point (or vector) in the page plane
//! - [`Rect`] - An axis-aligned bounding rectangle
//! - [`Affine`] - A 2x3 affine map, composed with [`Affine::then`]
//!
//! # Coordinate System
//!
//! - X increases to the right
//! - Y increases upward
//! - Units are page units; [`ScalePaper`](crate::GlobalTransform::ScalePaper)
//!   fits the finished drawing to the page size
//!
//! # Examples
//!
//! ## Composing Maps
//!
//! ```rust
//! use nomograph::{Affine, Point};
//!
//! // Scale first, then move.
//! let map = Affine::scale(2.0, 2.0).then(Affine::translate(1.0, 0.0));
//! assert_eq!(map.apply(Point::new(3.0, 4.0)), Point::new(7.0, 8.0));
//! ```
//!
//! ## Bounding Boxes
//!
//! ```rust
//! use nomograph::{Point, Rect};
//!
//! let mut rect = Rect::from_points(Point::new(4.0, 1.0), Point::new(0.0, 3.0));
//! rect.include_point(Point::new(-1.0, 5.0));
//! assert_eq!(rect.min_x(), -1.0);
//! assert_eq!(rect.max_y(), 5.0);
//! assert_eq!(rect.width, 5.0);
//! ```

use std::ops::{Add, Mul, Sub};

use serde::Serialize;

use crate::scale::util::sorted_pair;

/// A point in the page plane. Also used for direction vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self - other).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Unit vector rotated a quarter turn counter-clockwise.
    pub fn normal(self) -> Point {
        let len = self.length();
        if len == 0.0 {
            Point::ZERO
        } else {
            Point::new(-self.y / len, self.x / len)
        }
    }

    pub fn lerp(self, other: Point, s: f64) -> Point {
        self + (other - self) * s
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// An axis-aligned rectangle.
///
/// # Fields
///
/// - `x`: minimum X
/// - `y`: minimum Y
/// - `width`: extent along X (never negative once built from points)
/// - `height`: extent along Y
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Creates a `Rect` from two opposite corner points.
    ///
    /// The resulting rectangle has positive width and height regardless of
    /// the order of the points.
    pub fn from_points(p1: Point, p2: Point) -> Self {
        let (x_min, x_max) = sorted_pair(p1.x, p2.x);
        let (y_min, y_max) = sorted_pair(p1.y, p2.y);
        Self {
            x: x_min,
            y: y_min,
            width: x_max - x_min,
            height: y_max - y_min,
        }
    }

    /// Smallest rectangle holding every point, or `None` for no points.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut points = points.into_iter().filter(|p| p.is_finite());
        let first = points.next()?;
        let mut rect = Rect::from_points(first, first);
        for point in points {
            rect.include_point(point);
        }
        Some(rect)
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }

    /// Grows the rectangle to cover `point`.
    pub fn include_point(&mut self, point: Point) {
        let min_x = self.min_x().min(point.x);
        let min_y = self.min_y().min(point.y);
        let max_x = self.max_x().max(point.x);
        let max_y = self.max_y().max(point.y);
        *self = Rect::from_points(Point::new(min_x, min_y), Point::new(max_x, max_y));
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let mut rect = *self;
        rect.include_point(Point::new(other.min_x(), other.min_y()));
        rect.include_point(Point::new(other.max_x(), other.max_y()));
        rect
    }
}

/// A 2x3 affine map: `x' = a*x + b*y + e`, `y' = c*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Affine([f64; 6]);

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self([a, b, c, d, e, f])
    }

    pub fn translate(dx: f64, dy: f64) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, dx, dy])
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self([sx, 0.0, 0.0, sy, 0.0, 0.0])
    }

    /// Counter-clockwise rotation about the origin, in radians.
    pub fn rotate(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self([cos, -sin, sin, cos, 0.0, 0.0])
    }

    /// Reflection across the vertical line `x = axis_x` and/or the horizontal
    /// line `y = axis_y`.
    pub fn mirror(flip_x: bool, axis_x: f64, flip_y: bool, axis_y: f64) -> Self {
        let (a, e) = if flip_x { (-1.0, 2.0 * axis_x) } else { (1.0, 0.0) };
        let (d, f) = if flip_y { (-1.0, 2.0 * axis_y) } else { (1.0, 0.0) };
        Self([a, 0.0, 0.0, d, e, f])
    }

    /// Similarity `z -> a*z + b` on the complex plane, or `a*conj(z) + b`
    /// when `mirrored`.
    pub fn similarity(a: Point, b: Point, mirrored: bool) -> Self {
        if mirrored {
            Self([a.x, a.y, a.y, -a.x, b.x, b.y])
        } else {
            Self([a.x, -a.y, a.y, a.x, b.x, b.y])
        }
    }

    /// Apply `self` first, then `other`.
    pub fn then(self, other: Affine) -> Affine {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Affine([
            a2 * a1 + b2 * c1,
            a2 * b1 + b2 * d1,
            c2 * a1 + d2 * c1,
            c2 * b1 + d2 * d1,
            a2 * e1 + b2 * f1 + e2,
            c2 * e1 + d2 * f1 + f2,
        ])
    }

    pub fn apply(self, p: Point) -> Point {
        let [a, b, c, d, e, f] = self.0;
        Point::new(a * p.x + b * p.y + e, c * p.x + d * p.y + f)
    }

    pub fn determinant(&self) -> f64 {
        let [a, b, c, d, _, _] = self.0;
        a * d - b * c
    }

    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det.is_finite() && det.abs() > 1e-12 && self.0.iter().all(|v| v.is_finite())
    }

    pub fn as_array(&self) -> &[f64; 6] {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Parameter `s` where the line `p + s*r` meets the infinite line through
/// `q0` and `q1`, or `None` when they are parallel.
pub fn line_intersection(p: Point, r: Point, q0: Point, q1: Point) -> Option<f64> {
    let d = q1 - q0;
    let denom = r.cross(d);
    let scale = r.length() * d.length();
    if scale == 0.0 || denom.abs() <= 1e-12 * scale {
        return None;
    }
    Some((q0 - p).cross(d) / denom)
}

/// Signed distance-like measure of `point` from the line through `a` and `b`.
pub fn side_of_line(a: Point, b: Point, point: Point) -> f64 {
    (b - a).cross(point - a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-12
    }

    #[test]
    fn translate_and_scale() {
        assert_eq!(
            Affine::translate(5.0, 10.0).apply(Point::new(1.0, 2.0)),
            Point::new(6.0, 12.0)
        );
        assert_eq!(
            Affine::scale(2.0, 3.0).apply(Point::new(10.0, 10.0)),
            Point::new(20.0, 30.0)
        );
    }

    #[test]
    fn compose_applies_left_first() {
        let composed = Affine::translate(10.0, 0.0).then(Affine::scale(2.0, 2.0));
        // First translate: (15, 5), then scale: (30, 10)
        assert_eq!(composed.apply(Point::new(5.0, 5.0)), Point::new(30.0, 10.0));
    }

    #[test]
    fn rotation_is_counter_clockwise() {
        let p = Affine::rotate(std::f64::consts::FRAC_PI_2).apply(Point::new(1.0, 0.0));
        assert!(close(p, Point::new(0.0, 1.0)));
    }

    #[test]
    fn mirror_reflects_across_lines() {
        let m = Affine::mirror(true, 5.0, true, 1.0);
        assert_eq!(m.apply(Point::new(2.0, 0.0)), Point::new(8.0, 2.0));
        assert!(m.is_invertible());
    }

    #[test]
    fn similarity_matches_complex_multiplication() {
        // a = i (quarter turn), b = 1
        let s = Affine::similarity(Point::new(0.0, 1.0), Point::new(1.0, 0.0), false);
        assert!(close(s.apply(Point::new(2.0, 0.0)), Point::new(1.0, 2.0)));
        let m = Affine::similarity(Point::new(1.0, 0.0), Point::ZERO, true);
        assert!(close(m.apply(Point::new(2.0, 3.0)), Point::new(2.0, -3.0)));
    }

    #[test]
    fn singular_maps_are_not_invertible() {
        assert!(!Affine::scale(1.0, 0.0).is_invertible());
        assert!(Affine::IDENTITY.is_identity());
    }

    #[test]
    fn intersection_of_crossing_lines() {
        let s = line_intersection(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 4.0),
            Point::new(4.0, 0.0),
        )
        .unwrap();
        assert!((s - 2.0).abs() < 1e-12);
        let parallel = line_intersection(
            Point::ZERO,
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(3.0, 1.0),
        );
        assert!(parallel.is_none());
    }

    #[test]
    fn rect_union_and_bounds() {
        let a = Rect::from_points(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let b = Rect::from_points(Point::new(2.0, -1.0), Point::new(3.0, 0.5));
        let u = a.union(&b);
        assert_eq!((u.min_x(), u.min_y(), u.max_x(), u.max_y()), (0.0, -1.0, 3.0, 1.0));
        assert!(u.contains(Point::new(2.5, 0.0)));
        assert!(Rect::bounding(Vec::new()).is_none());
    }
}
