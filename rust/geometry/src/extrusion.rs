// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - converting flattened footprints to 3D meshes
//!
//! Walls are vertical ribbons that follow the footprint polyline, with a
//! per-point base elevation so they drape over terrain. Floors and
//! ceilings are horizontal caps at one elevation. The extruded XY
//! coordinates are exactly the input footprint; only Z is synthesized.

use cartomesh_core::Point2;
use nalgebra::{Point3, Vector3};

use crate::altitude::AltitudeModel;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::triangulation::{signed_area, triangulate_polygon_with_holes};

/// Per-point ground elevations for a footprint polyline
///
/// Points off the elevation model fall back to `default_ground`.
pub fn ground_profile(
    points: &[Point2],
    model: Option<&AltitudeModel>,
    default_ground: f64,
) -> Vec<f64> {
    points
        .iter()
        .map(|p| {
            model
                .and_then(|m| m.elevation_at(p.x, p.y))
                .unwrap_or(default_ground)
        })
        .collect()
}

/// Neighbor-averaging smoothing of a base profile
///
/// Each pass replaces every value with the mean of itself and its two
/// neighbors. Open profiles keep their endpoints pinned.
pub fn smooth_profile(base: &mut [f64], closed: bool, passes: usize) {
    let n = base.len();
    if n < 3 {
        return;
    }
    let mut scratch = base.to_vec();
    for _ in 0..passes {
        for i in 0..n {
            if !closed && (i == 0 || i == n - 1) {
                scratch[i] = base[i];
                continue;
            }
            let prev = base[(i + n - 1) % n];
            let next = base[(i + 1) % n];
            scratch[i] = (prev + base[i] + next) / 3.0;
        }
        base.copy_from_slice(&scratch);
    }
}

/// Build a vertical wall ribbon along a polyline
///
/// `base` gives the bottom elevation per point; the top sits `height`
/// above the bottom at every point. Closed footprints get a closing
/// segment, open ones do not.
pub fn wall_ribbon(points: &[Point2], closed: bool, base: &[f64], height: f64) -> Result<Mesh> {
    if points.len() < 2 {
        return Err(Error::InvalidExtrusion(
            "wall needs at least 2 points".to_string(),
        ));
    }
    if base.len() != points.len() {
        return Err(Error::InvalidExtrusion(format!(
            "base profile length {} does not match {} points",
            base.len(),
            points.len()
        )));
    }
    if height <= 0.0 {
        return Err(Error::InvalidExtrusion("height must be positive".to_string()));
    }

    let segment_count = if closed {
        points.len()
    } else {
        points.len() - 1
    };
    let mut mesh = Mesh::with_capacity(segment_count * 4, segment_count * 6);

    for s in 0..segment_count {
        let i = s;
        let j = (s + 1) % points.len();
        let a = points[i];
        let b = points[j];

        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len < 1e-12 {
            continue;
        }
        // outward-facing quad normal, flat per segment
        let normal = Vector3::new(dy / len, -dx / len, 0.0);

        let i0 = mesh.vertex_count() as u32;
        mesh.add_vertex(Point3::new(a.x, a.y, base[i]), normal);
        mesh.add_vertex(Point3::new(b.x, b.y, base[j]), normal);
        mesh.add_vertex(Point3::new(b.x, b.y, base[j] + height), normal);
        mesh.add_vertex(Point3::new(a.x, a.y, base[i] + height), normal);
        mesh.add_triangle(i0, i0 + 1, i0 + 2);
        mesh.add_triangle(i0, i0 + 2, i0 + 3);
    }

    if mesh.is_empty() {
        return Err(Error::EmptyMesh("degenerate wall footprint".to_string()));
    }
    Ok(mesh)
}

/// Horizontal cap over a footprint at a fixed elevation
///
/// `upward` selects the +Z facing (floors) versus -Z (ceilings seen
/// from below). Winding follows the facing so backface culling works.
pub fn horizontal_cap(
    outer: &[Point2],
    holes: &[Vec<Point2>],
    z: f64,
    upward: bool,
) -> Result<Mesh> {
    if outer.len() < 3 {
        return Err(Error::InvalidFootprint(
            "cap needs at least 3 points".to_string(),
        ));
    }

    let indices = triangulate_polygon_with_holes(outer, holes)?;
    let normal = if upward { Vector3::z() } else { -Vector3::z() };

    let vertex_count = outer.len() + holes.iter().map(Vec::len).sum::<usize>();
    let mut mesh = Mesh::with_capacity(vertex_count, indices.len());
    for p in outer.iter().chain(holes.iter().flatten()) {
        mesh.add_vertex(Point3::new(p.x, p.y, z), normal);
    }

    // earcutr yields CCW triangles for CCW outers; flip for -Z facing
    let ccw = signed_area(outer) >= 0.0;
    let flip = upward != ccw;
    for tri in indices.chunks_exact(3) {
        if flip {
            mesh.add_triangle(tri[0] as u32, tri[2] as u32, tri[1] as u32);
        } else {
            mesh.add_triangle(tri[0] as u32, tri[1] as u32, tri[2] as u32);
        }
    }
    Ok(mesh)
}

/// Closed prism: bottom cap, top cap and side walls
pub fn extrude_prism(
    outer: &[Point2],
    holes: &[Vec<Point2>],
    base_z: f64,
    height: f64,
) -> Result<Mesh> {
    if height <= 0.0 {
        return Err(Error::InvalidExtrusion("height must be positive".to_string()));
    }

    let mut mesh = horizontal_cap(outer, holes, base_z, false)?;
    mesh.merge(&horizontal_cap(outer, holes, base_z + height, true)?);

    let base = vec![base_z; outer.len()];
    mesh.merge(&wall_ribbon(outer, true, &base, height)?);
    for hole in holes {
        let base = vec![base_z; hole.len()];
        mesh.merge(&wall_ribbon(hole, true, &base, height)?);
    }
    Ok(mesh)
}

/// Drape a footprint's wall over terrain
///
/// Samples the elevation model per point, smooths the profile, then
/// builds the ribbon. This keeps wall bottoms on the ground without
/// stair-stepping between neighboring elevation cells.
pub fn draped_wall(
    points: &[Point2],
    closed: bool,
    height: f64,
    model: Option<&AltitudeModel>,
    default_ground: f64,
    smooth_passes: usize,
) -> Result<Mesh> {
    let mut base = ground_profile(points, model, default_ground);
    smooth_profile(&mut base, closed, smooth_passes);
    wall_ribbon(points, closed, &base, height)
}
