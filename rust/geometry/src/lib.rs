// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Cartomesh Geometry
//!
//! Mesh generation for layered map drawings: extrusion of flattened
//! footprints, well shaft construction and terrain draping against an
//! elevation model.
//!
//! ## Pipeline position
//!
//! `cartomesh-core` flattens the drawing to [`FlatShape`]s; this crate
//! turns them into named triangle meshes:
//!
//! ```rust,ignore
//! use cartomesh_geometry::{BuildOptions, MeshBuilder};
//!
//! let builder = MeshBuilder::new(BuildOptions::default());
//! let output = builder.build(&flattened.shapes);
//! for object in &output.objects {
//!     println!("{}: {} triangles", object.name, object.mesh.triangle_count());
//! }
//! ```
//!
//! Groups of shapes are meshed in parallel with rayon; per-shape
//! failures degrade to diagnostics instead of aborting the build.

pub mod altitude;
pub mod builder;
pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod triangulation;
pub mod wells;

pub use altitude::{AltitudeModel, ElevationGrid, ElevationTile};
pub use builder::{parse_hex_color, BuildOptions, BuildOutput, MeshBuilder};
pub use error::{Error, Result};
pub use extrusion::{
    draped_wall, extrude_prism, ground_profile, horizontal_cap, smooth_profile, wall_ribbon,
};
pub use mesh::{Mesh, MeshObject};
pub use triangulation::{signed_area, triangulate_polygon, triangulate_polygon_with_holes};
pub use wells::build_well;

// convenience re-exports for downstream crates
pub use cartomesh_core::FlatShape;
pub use nalgebra::{Point3, Vector3};
