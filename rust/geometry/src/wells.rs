// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Well and shaft mesh builders
//!
//! A well marker on the drawing becomes a vertical shaft between the
//! surface and the corridor level. Each [`WellKind`] has its own
//! silhouette: round and square casings, a tapered casing, a ladder
//! with rungs, or a spiral staircase.

use cartomesh_core::{Point2, WellKind};
use nalgebra::{Point3, Vector3};

use crate::error::{Error, Result};
use crate::extrusion::extrude_prism;
use crate::mesh::Mesh;

/// Vertical gap between ladder rungs
const RUNG_SPACING: f64 = 0.3;
/// Rise per spiral staircase step
const STEP_RISE: f64 = 0.2;
/// Angular sweep per spiral staircase step
const STEP_SWEEP: f64 = std::f64::consts::FRAC_PI_6;

/// Build the mesh for one well shaft
///
/// The shaft spans `base_z .. base_z + depth` and is centered on
/// `center` with the given casing radius.
pub fn build_well(
    kind: WellKind,
    center: Point2,
    radius: f64,
    base_z: f64,
    depth: f64,
) -> Result<Mesh> {
    if depth <= 0.0 {
        return Err(Error::InvalidExtrusion("well depth must be positive".to_string()));
    }
    if radius <= 0.0 {
        return Err(Error::InvalidExtrusion("well radius must be positive".to_string()));
    }

    match kind {
        WellKind::Round => shaft(center, radius, radius, 8, 0.0, base_z, depth),
        // a square casing is a 4-facet shaft turned 45 degrees
        WellKind::Square => shaft(
            center,
            radius,
            radius,
            4,
            std::f64::consts::FRAC_PI_4,
            base_z,
            depth,
        ),
        WellKind::Tapered => shaft(center, radius * 0.5, radius, 8, 0.0, base_z, depth),
        WellKind::Ladder => ladder(center, radius, base_z, depth),
        WellKind::SpiralStair => spiral_stair(center, radius, base_z, depth),
    }
}

/// Open tube lofted between a bottom and top radius
fn shaft(
    center: Point2,
    bottom_radius: f64,
    top_radius: f64,
    facets: usize,
    rotation: f64,
    base_z: f64,
    depth: f64,
) -> Result<Mesh> {
    let mut mesh = Mesh::with_capacity(facets * 4, facets * 6);
    let top_z = base_z + depth;

    for f in 0..facets {
        let a0 = rotation + std::f64::consts::TAU * (f as f64) / (facets as f64);
        let a1 = rotation + std::f64::consts::TAU * ((f + 1) as f64) / (facets as f64);

        let b0 = Point3::new(
            center.x + bottom_radius * a0.cos(),
            center.y + bottom_radius * a0.sin(),
            base_z,
        );
        let b1 = Point3::new(
            center.x + bottom_radius * a1.cos(),
            center.y + bottom_radius * a1.sin(),
            base_z,
        );
        let t1 = Point3::new(
            center.x + top_radius * a1.cos(),
            center.y + top_radius * a1.sin(),
            top_z,
        );
        let t0 = Point3::new(
            center.x + top_radius * a0.cos(),
            center.y + top_radius * a0.sin(),
            top_z,
        );

        let mid = (a0 + a1) / 2.0;
        let normal = Vector3::new(mid.cos(), mid.sin(), 0.0);

        let i0 = mesh.vertex_count() as u32;
        mesh.add_vertex(b0, normal);
        mesh.add_vertex(b1, normal);
        mesh.add_vertex(t1, normal);
        mesh.add_vertex(t0, normal);
        mesh.add_triangle(i0, i0 + 1, i0 + 2);
        mesh.add_triangle(i0, i0 + 2, i0 + 3);
    }

    Ok(mesh)
}

/// Axis-aligned box helper for poles and rungs
fn boxed(min: Point3<f64>, max: Point3<f64>) -> Result<Mesh> {
    let outer = vec![
        Point2::new(min.x, min.y),
        Point2::new(max.x, min.y),
        Point2::new(max.x, max.y),
        Point2::new(min.x, max.y),
    ];
    extrude_prism(&outer, &[], min.z, max.z - min.z)
}

/// Two poles with rungs every [`RUNG_SPACING`]
fn ladder(center: Point2, radius: f64, base_z: f64, depth: f64) -> Result<Mesh> {
    let pole_r = (radius * 0.1).max(0.02);
    let half = radius;
    let top_z = base_z + depth;

    let mut mesh = Mesh::new();
    for side in [-1.0, 1.0] {
        let x = center.x + side * half;
        mesh.merge(&boxed(
            Point3::new(x - pole_r, center.y - pole_r, base_z),
            Point3::new(x + pole_r, center.y + pole_r, top_z),
        )?);
    }

    let rung_count = (depth / RUNG_SPACING).floor() as usize;
    for r in 1..=rung_count {
        let z = base_z + r as f64 * RUNG_SPACING;
        if z >= top_z {
            break;
        }
        mesh.merge(&boxed(
            Point3::new(center.x - half, center.y - pole_r * 0.5, z - pole_r * 0.5),
            Point3::new(center.x + half, center.y + pole_r * 0.5, z + pole_r * 0.5),
        )?);
    }

    Ok(mesh)
}

/// Central column with steps rising [`STEP_RISE`] per [`STEP_SWEEP`]
fn spiral_stair(center: Point2, radius: f64, base_z: f64, depth: f64) -> Result<Mesh> {
    let column_r = (radius * 0.15).max(0.05);
    let mut mesh = shaft(center, column_r, column_r, 8, 0.0, base_z, depth)?;

    let step_count = (depth / STEP_RISE).ceil() as usize;
    for s in 0..step_count {
        let z = base_z + s as f64 * STEP_RISE;
        let a0 = s as f64 * STEP_SWEEP;
        let a1 = a0 + STEP_SWEEP;

        // one step is a flat sector quad from the column to the casing
        let quad = [
            Point3::new(center.x + column_r * a0.cos(), center.y + column_r * a0.sin(), z),
            Point3::new(center.x + radius * a0.cos(), center.y + radius * a0.sin(), z),
            Point3::new(center.x + radius * a1.cos(), center.y + radius * a1.sin(), z),
            Point3::new(center.x + column_r * a1.cos(), center.y + column_r * a1.sin(), z),
        ];

        for (normal, flip) in [(Vector3::z(), false), (-Vector3::z(), true)] {
            let i0 = mesh.vertex_count() as u32;
            for p in quad {
                mesh.add_vertex(p, normal);
            }
            if flip {
                mesh.add_triangle(i0, i0 + 2, i0 + 1);
                mesh.add_triangle(i0, i0 + 3, i0 + 2);
            } else {
                mesh.add_triangle(i0, i0 + 1, i0 + 2);
                mesh.add_triangle(i0, i0 + 2, i0 + 3);
            }
        }
    }

    Ok(mesh)
}
