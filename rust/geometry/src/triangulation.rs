// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprint triangulation
//!
//! earcutr handles the general case; triangles, quads and small convex
//! rings are resolved inline since floors are overwhelmingly rectangles.

use cartomesh_core::Point2;

use crate::error::{Error, Result};

/// True when every consecutive turn bends the same way
fn is_convex(points: &[Point2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut sign = 0i8;
    for i in 0..n {
        let p0 = points[i];
        let p1 = points[(i + 1) % n];
        let p2 = points[(i + 2) % n];

        let turn = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);
        if turn.abs() <= 1e-10 {
            // collinear, no vote
            continue;
        }
        let t = if turn > 0.0 { 1i8 } else { -1i8 };
        if sign == 0 {
            sign = t;
        } else if sign != t {
            return false;
        }
    }
    true
}

/// Fan a convex ring out from its first vertex
fn fan_triangulate(n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity((n - 2) * 3);
    for i in 1..n - 1 {
        indices.push(0);
        indices.push(i);
        indices.push(i + 1);
    }
    indices
}

/// Triangulate a simple polygon without holes
///
/// Returned indices point into `points`.
pub fn triangulate_polygon(points: &[Point2]) -> Result<Vec<usize>> {
    let n = points.len();

    if n < 3 {
        return Err(Error::TriangulationError(format!(
            "ring has {n} points, need at least 3"
        )));
    }
    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }
    if n == 4 {
        return Ok(vec![0, 1, 2, 0, 2, 3]);
    }
    if n <= 8 && is_convex(points) {
        return Ok(fan_triangulate(n));
    }

    let mut vertices = Vec::with_capacity(n * 2);
    for p in points {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    let indices = earcutr::earcut(&vertices, &[], 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(indices)
}

/// Triangulate a polygon with holes
///
/// Returned indices point into the concatenation of `outer` followed by
/// every hole ring in order, matching how the cap generator lays out
/// its vertices.
pub fn triangulate_polygon_with_holes(
    outer: &[Point2],
    holes: &[Vec<Point2>],
) -> Result<Vec<usize>> {
    if holes.is_empty() {
        return triangulate_polygon(outer);
    }
    if outer.len() < 3 {
        return Err(Error::TriangulationError(format!(
            "ring has {} points, need at least 3",
            outer.len()
        )));
    }

    let total: usize = outer.len() + holes.iter().map(Vec::len).sum::<usize>();
    let mut vertices = Vec::with_capacity(total * 2);
    let mut hole_indices = Vec::with_capacity(holes.len());

    for p in outer {
        vertices.push(p.x);
        vertices.push(p.y);
    }
    for hole in holes {
        hole_indices.push(vertices.len() / 2);
        for p in hole {
            vertices.push(p.x);
            vertices.push(p.y);
        }
    }

    let indices = earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(indices)
}

/// Signed area of a ring, positive when counter-clockwise
pub fn signed_area(points: &[Point2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        area += a.x * b.y - b.x * a.y;
    }
    area / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_quad_fast_path() {
        let indices = triangulate_polygon(&square()).unwrap();
        assert_eq!(indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_concave_polygon() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(5.0, 3.0),
            Point2::new(0.0, 10.0),
        ];
        let indices = triangulate_polygon(&points).unwrap();
        assert_eq!(indices.len() % 3, 0);
        assert_eq!(indices.len() / 3, points.len() - 2);
    }

    #[test]
    fn test_polygon_with_hole() {
        let outer = square();
        let hole = vec![
            Point2::new(4.0, 4.0),
            Point2::new(6.0, 4.0),
            Point2::new(6.0, 6.0),
            Point2::new(4.0, 6.0),
        ];
        let indices = triangulate_polygon_with_holes(&outer, &[hole]).unwrap();
        // 8 vertices with one hole triangulate to 8 triangles
        assert_eq!(indices.len() / 3, 8);
    }

    #[test]
    fn test_too_few_points() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(triangulate_polygon(&points).is_err());
    }

    #[test]
    fn test_signed_area_orientation() {
        assert!(signed_area(&square()) > 0.0);
        let mut cw = square();
        cw.reverse();
        assert!(signed_area(&cw) < 0.0);
    }
}
