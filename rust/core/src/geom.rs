// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D geometry primitives: points, affine transforms, bounding boxes
//!
//! All operations are pure. The affine type uses the SVG coefficient
//! layout `[a b c d e f]`, i.e. the matrix
//!
//! ```text
//! | a c e |
//! | b d f |
//! | 0 0 1 |
//! ```

use crate::error::{Error, Result};

/// A 2D point in document units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl std::ops::Add for Point2 {
    type Output = Point2;
    #[inline]
    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point2 {
    type Output = Point2;
    #[inline]
    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Point2 {
    type Output = Point2;
    #[inline]
    fn mul(self, s: f64) -> Point2 {
        Point2::new(self.x * s, self.y * s)
    }
}

/// 2D affine transform, six coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    #[inline]
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    #[inline]
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    #[inline]
    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    #[inline]
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `angle` radians, counter-clockwise in a y-down frame
    #[inline]
    pub fn rotate(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    #[inline]
    pub fn skew_x(angle: f64) -> Self {
        Self::new(1.0, 0.0, angle.tan(), 1.0, 0.0, 0.0)
    }

    #[inline]
    pub fn skew_y(angle: f64) -> Self {
        Self::new(1.0, angle.tan(), 0.0, 1.0, 0.0, 0.0)
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Compose with a child transform: `self * child`
    ///
    /// Points mapped by the result are first transformed by `child`,
    /// then by `self` (right-multiply, child-into-parent order).
    #[inline]
    pub fn compose(&self, child: &Affine) -> Affine {
        Affine::new(
            self.a * child.a + self.c * child.b,
            self.b * child.a + self.d * child.b,
            self.a * child.c + self.c * child.d,
            self.b * child.c + self.d * child.d,
            self.a * child.e + self.c * child.f + self.e,
            self.b * child.e + self.d * child.f + self.f,
        )
    }

    /// Apply the transform to a point
    #[inline]
    pub fn apply(&self, p: Point2) -> Point2 {
        Point2::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Invert the transform
    ///
    /// Fails with `Error::SingularTransform` when the determinant is
    /// (numerically) zero, e.g. a zero scale. The caller decides whether
    /// to skip the shape or substitute identity.
    pub fn invert(&self) -> Result<Affine> {
        let det = self.determinant();
        if det.abs() < 1e-12 {
            return Err(Error::SingularTransform(format!(
                "determinant {det:e} too close to zero"
            )));
        }
        let inv = 1.0 / det;
        Ok(Affine::new(
            self.d * inv,
            -self.b * inv,
            -self.c * inv,
            self.a * inv,
            (self.c * self.f - self.d * self.e) * inv,
            (self.b * self.e - self.a * self.f) * inv,
        ))
    }

    /// Average absolute scale factor, used to scale tolerances
    #[inline]
    pub fn mean_scale(&self) -> f64 {
        let sx = (self.a * self.a + self.b * self.b).sqrt();
        let sy = (self.c * self.c + self.d * self.d).sqrt();
        (sx + sy) * 0.5
    }
}

/// Axis-aligned bounding box with inclusive boundaries
///
/// A point exactly on an edge counts as contained; region assignment
/// depends on this being deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    pub min: Point2,
    pub max: Point2,
}

impl BBox {
    #[inline]
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// Empty box ready for `expand`
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::MAX, f64::MAX),
            max: Point2::new(f64::MIN, f64::MIN),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Grow to include a point
    #[inline]
    pub fn expand(&mut self, p: Point2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand(*p);
        }
        bbox
    }

    /// Union of two boxes
    pub fn union(&self, other: &BBox) -> BBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BBox::new(
            Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    /// Inclusive point containment
    #[inline]
    pub fn contains_point(&self, p: Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Inclusive box containment (`other` fully inside `self`)
    #[inline]
    pub fn contains_box(&self, other: &BBox) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    #[inline]
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    #[inline]
    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    /// Transformed bounding box (box of the four transformed corners)
    pub fn transformed(&self, trans: &Affine) -> BBox {
        let corners = [
            trans.apply(self.min),
            trans.apply(Point2::new(self.max.x, self.min.y)),
            trans.apply(Point2::new(self.min.x, self.max.y)),
            trans.apply(self.max),
        ];
        BBox::from_points(corners.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn affine_close(a: &Affine, b: &Affine) -> bool {
        close(a.a, b.a)
            && close(a.b, b.b)
            && close(a.c, b.c)
            && close(a.d, b.d)
            && close(a.e, b.e)
            && close(a.f, b.f)
    }

    #[test]
    fn test_apply_translate_scale() {
        let t = Affine::translate(10.0, 20.0).compose(&Affine::scale(2.0, 3.0));
        let p = t.apply(Point2::new(1.0, 1.0));
        assert!(close(p.x, 12.0));
        assert!(close(p.y, 23.0));
    }

    #[test]
    fn test_compose_is_associative() {
        // Pseudo-random affines, no external RNG needed
        let transforms = [
            Affine::new(1.3, 0.2, -0.4, 0.9, 5.0, -2.0),
            Affine::rotate(0.7).compose(&Affine::translate(-3.0, 11.0)),
            Affine::scale(0.25, 4.0).compose(&Affine::skew_x(0.3)),
            Affine::new(-2.0, 1.1, 0.6, -0.8, 100.0, 0.01),
        ];
        for a in &transforms {
            for b in &transforms {
                for c in &transforms {
                    let left = a.compose(b).compose(c);
                    let right = a.compose(&b.compose(c));
                    assert!(affine_close(&left, &right), "{left:?} != {right:?}");
                }
            }
        }
    }

    #[test]
    fn test_invert_roundtrip() {
        let t = Affine::rotate(1.1)
            .compose(&Affine::scale(2.0, 0.5))
            .compose(&Affine::translate(7.0, -3.0));
        let inv = t.invert().unwrap();
        let round = t.compose(&inv);
        assert!(affine_close(&round, &Affine::identity()));
    }

    #[test]
    fn test_invert_singular() {
        let t = Affine::scale(0.0, 1.0);
        assert!(matches!(t.invert(), Err(Error::SingularTransform(_))));
    }

    #[test]
    fn test_bbox_inclusive_boundary() {
        let bbox = BBox::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        // A point exactly on an edge counts as contained
        assert!(bbox.contains_point(Point2::new(10.0, 5.0)));
        assert!(bbox.contains_point(Point2::new(0.0, 0.0)));
        assert!(!bbox.contains_point(Point2::new(10.0001, 5.0)));

        let inner = BBox::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        assert!(bbox.contains_box(&inner));
    }

    #[test]
    fn test_bbox_union_and_area() {
        let a = BBox::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = BBox::new(Point2::new(2.0, 2.0), Point2::new(3.0, 4.0));
        let u = a.union(&b);
        assert_eq!(u.min, Point2::new(0.0, 0.0));
        assert_eq!(u.max, Point2::new(3.0, 4.0));
        assert!(close(b.area(), 2.0));
    }
}
