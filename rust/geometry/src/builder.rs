// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shape to mesh routing
//!
//! Takes the flattened shapes of a drawing and routes each category to
//! its mesh generator: walls become draped ribbons, floors and ceilings
//! become caps, well markers become shafts. Shapes of one object are
//! merged into a single named [`MeshObject`] so a room's floor pieces
//! arrive as one mesh.

use cartomesh_core::{object_name, BBox, Category, Diagnostics, DiagnosticKind, FlatShape, Subpath};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::altitude::AltitudeModel;
use crate::error::Result;
use crate::extrusion::{draped_wall, horizontal_cap};
use crate::mesh::{Mesh, MeshObject};
use crate::triangulation::signed_area;
use crate::wells::build_well;

/// Mesh generation parameters
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Wall height when a shape carries no explicit height
    pub corridor_height: f64,
    /// Ground elevation used off the elevation model
    pub default_ground: f64,
    /// Smoothing passes for draped wall bases
    pub smooth_passes: usize,
    /// Base elevation per level label, relative to the ground
    pub level_offsets: FxHashMap<String, f64>,
    /// Levels whose meshes go to the private output set
    pub private_levels: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            corridor_height: 2.0,
            default_ground: 0.0,
            smooth_passes: 2,
            level_offsets: FxHashMap::default(),
            private_levels: Vec::new(),
        }
    }
}

/// Result of one mesh build pass
#[derive(Debug)]
pub struct BuildOutput {
    pub objects: Vec<MeshObject>,
    pub diagnostics: Diagnostics,
}

/// Routes flattened shapes to mesh generators
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    options: BuildOptions,
    model: Option<AltitudeModel>,
}

impl MeshBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            model: None,
        }
    }

    pub fn with_altitude_model(mut self, model: AltitudeModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Build one named mesh per drawing object
    pub fn build(&self, shapes: &[FlatShape]) -> BuildOutput {
        let depths = depth_annotations(shapes);

        // group shapes by output name, keeping first-seen order
        let mut order: Vec<String> = Vec::new();
        let mut groups: FxHashMap<String, Vec<&FlatShape>> = FxHashMap::default();
        for shape in shapes {
            if !is_meshable(&shape.category) {
                continue;
            }
            let name = mesh_name(shape);
            if !groups.contains_key(&name) {
                order.push(name.clone());
            }
            groups.entry(name).or_default().push(shape);
        }

        let built: Vec<(Option<MeshObject>, Diagnostics)> = order
            .par_iter()
            .map(|name| self.build_group(name, &groups[name], &depths))
            .collect();

        let mut objects = Vec::with_capacity(built.len());
        let mut diagnostics = Diagnostics::new();
        for (object, diags) in built {
            if let Some(object) = object {
                objects.push(object);
            }
            diagnostics.extend(diags);
        }

        BuildOutput {
            objects,
            diagnostics,
        }
    }

    fn build_group(
        &self,
        name: &str,
        shapes: &[&FlatShape],
        depths: &[(BBox, f64)],
    ) -> (Option<MeshObject>, Diagnostics) {
        let mut mesh = Mesh::new();
        let mut diagnostics = Diagnostics::new();
        let mut material = None;
        let mut private = false;

        for shape in shapes {
            match self.build_shape(shape, depths) {
                Ok(part) => mesh.merge(&part),
                Err(e) => {
                    diagnostics.record(
                        DiagnosticKind::DegenerateShape,
                        &shape.source_id,
                        e.to_string(),
                    );
                    continue;
                }
            }
            if material.is_none() {
                material = shape_color(shape);
            }
            if let Some(level) = &shape.level {
                if self.options.private_levels.iter().any(|l| l == level) {
                    private = true;
                }
            }
        }

        if mesh.is_empty() {
            return (None, diagnostics);
        }
        let mut object = MeshObject::new(name, mesh);
        object.material = material;
        object.private = private;
        (Some(object), diagnostics)
    }

    fn build_shape(&self, shape: &FlatShape, depths: &[(BBox, f64)]) -> Result<Mesh> {
        let base_z = self.base_elevation(shape);
        let height = shape
            .style
            .float_property("height")
            .unwrap_or(self.options.corridor_height);

        match &shape.category {
            Category::Wall => {
                let mut mesh = Mesh::new();
                for sub in &shape.subpaths {
                    let wall = draped_wall(
                        &sub.points,
                        sub.closed,
                        height,
                        self.terrain(),
                        base_z,
                        self.options.smooth_passes,
                    )?;
                    mesh.merge(&wall);
                }
                Ok(mesh)
            }
            Category::Floor => {
                let (outer, holes) = split_footprint(&shape.subpaths);
                horizontal_cap(outer, &holes, self.floor_elevation(shape, base_z), true)
            }
            Category::Ceiling => {
                let (outer, holes) = split_footprint(&shape.subpaths);
                horizontal_cap(
                    outer,
                    &holes,
                    self.floor_elevation(shape, base_z) + height,
                    false,
                )
            }
            Category::Well(kind) => {
                let center = shape.bbox.center();
                let radius = (shape.bbox.width().max(shape.bbox.height()) / 2.0).max(0.1);
                // a surveyed depth annotation covering the shaft wins
                // over the terrain-derived depth
                let annotated = depths
                    .iter()
                    .find(|(area, _)| area.contains_point(center))
                    .map(|(_, depth)| *depth);
                let depth = match annotated {
                    Some(depth) => depth,
                    None => {
                        let surface = self
                            .model
                            .as_ref()
                            .and_then(|m| m.elevation_for_area(&shape.bbox))
                            .unwrap_or(base_z + height);
                        (surface - base_z).max(height)
                    }
                };
                build_well(*kind, center, radius, base_z, depth)
            }
            _ => Ok(Mesh::new()),
        }
    }

    fn terrain(&self) -> Option<&AltitudeModel> {
        self.model.as_ref()
    }

    /// Base elevation for a shape's level
    fn base_elevation(&self, shape: &FlatShape) -> f64 {
        let offset = shape
            .level
            .as_ref()
            .and_then(|l| self.options.level_offsets.get(l))
            .copied()
            .unwrap_or(0.0);
        self.options.default_ground + offset
    }

    /// Floors ride the terrain when a model is loaded
    fn floor_elevation(&self, shape: &FlatShape, base_z: f64) -> f64 {
        match self
            .model
            .as_ref()
            .and_then(|m| m.elevation_for_area(&shape.bbox))
        {
            Some(ground) => {
                ground
                    + shape
                        .level
                        .as_ref()
                        .and_then(|l| self.options.level_offsets.get(l))
                        .copied()
                        .unwrap_or(0.0)
            }
            None => base_z,
        }
    }
}

/// Collect surveyed depths from `depth_` annotation shapes
///
/// Each annotation marks an area with a known depth, carried either in
/// a `depth` style property or as the shape's text content. Wells whose
/// center falls inside the footprint use the annotated depth instead of
/// the terrain-derived one.
fn depth_annotations(shapes: &[FlatShape]) -> Vec<(BBox, f64)> {
    shapes
        .iter()
        .filter(|s| s.category == Category::DepthMap)
        .filter_map(|s| {
            let value = s.style.float_property("depth").or_else(|| {
                s.text.as_deref().and_then(|t| t.trim().parse::<f64>().ok())
            })?;
            Some((s.bbox, value.abs()))
        })
        .collect()
}

/// Categories with a 3D counterpart
fn is_meshable(category: &Category) -> bool {
    matches!(
        category,
        Category::Wall | Category::Floor | Category::Ceiling | Category::Well(_)
    )
}

/// Output mesh name: `<category>_<object>`
fn mesh_name(shape: &FlatShape) -> String {
    let object = object_name(&shape.source_id);
    if object.is_empty() {
        shape.category.slug().to_string()
    } else {
        format!("{}_{}", shape.category.slug(), object)
    }
}

/// Largest closed ring is the outer footprint, the rest are holes
fn split_footprint(subpaths: &[Subpath]) -> (&[cartomesh_core::Point2], Vec<Vec<cartomesh_core::Point2>>) {
    let mut outer_idx = 0;
    let mut outer_area = -1.0;
    for (i, sub) in subpaths.iter().enumerate() {
        let area = signed_area(&sub.points).abs();
        if area > outer_area {
            outer_area = area;
            outer_idx = i;
        }
    }
    let holes = subpaths
        .iter()
        .enumerate()
        .filter(|(i, sub)| *i != outer_idx && sub.points.len() >= 3)
        .map(|(_, sub)| sub.points.clone())
        .collect();
    (&subpaths[outer_idx].points, holes)
}

/// Fill color as linear RGBA, honoring fill-opacity
fn shape_color(shape: &FlatShape) -> Option<[f32; 4]> {
    let fill = shape.style.get("fill")?;
    let rgb = parse_hex_color(fill)?;
    let alpha = shape
        .style
        .float_property("fill-opacity")
        .or_else(|| shape.style.float_property("opacity"))
        .unwrap_or(1.0)
        .clamp(0.0, 1.0) as f32;
    Some([rgb[0], rgb[1], rgb[2], alpha])
}

/// Parse `#rgb` and `#rrggbb` colors
pub fn parse_hex_color(text: &str) -> Option<[f32; 3]> {
    let hex = text.trim().strip_prefix('#')?;
    let (r, g, b) = match hex.len() {
        3 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            let r = (v >> 8) & 0xf;
            let g = (v >> 4) & 0xf;
            let b = v & 0xf;
            (r * 17, g * 17, b * 17)
        }
        6 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            ((v >> 16) & 0xff, (v >> 8) & 0xff, v & 0xff)
        }
        _ => return None,
    };
    Some([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartomesh_core::Style;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0000"), Some([1.0, 0.0, 0.0]));
        assert_eq!(parse_hex_color("#fff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(parse_hex_color("red"), None);
    }

    fn flat_rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> FlatShape {
        let classified = cartomesh_core::classify(id);
        let points = vec![
            cartomesh_core::Point2::new(x, y),
            cartomesh_core::Point2::new(x + w, y),
            cartomesh_core::Point2::new(x + w, y + h),
            cartomesh_core::Point2::new(x, y + h),
        ];
        let mut shape = FlatShape {
            source_id: id.to_string(),
            category: classified.category,
            level: classified.level,
            style: Style::new(),
            subpaths: vec![Subpath::new(points, true)],
            text: None,
            bbox: cartomesh_core::BBox::empty(),
        };
        shape.recompute_bbox();
        shape
    }

    #[test]
    fn test_floor_becomes_flat_cap() {
        let builder = MeshBuilder::new(BuildOptions::default());
        let output = builder.build(&[flat_rect("floor_room1", 0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(output.objects.len(), 1);
        let object = &output.objects[0];
        assert_eq!(object.name, "floor_room1");
        assert_eq!(object.mesh.vertex_count(), 4);
        assert_eq!(object.mesh.triangle_count(), 2);
        for chunk in object.mesh.positions.chunks_exact(3) {
            assert_eq!(chunk[2], 0.0);
        }
    }

    #[test]
    fn test_wall_uses_corridor_height() {
        let builder = MeshBuilder::new(BuildOptions::default());
        let output = builder.build(&[flat_rect("wall_a", 0.0, 0.0, 4.0, 4.0)]);
        let (min, max) = output.objects[0].mesh.bounds();
        assert_eq!(max.z - min.z, 2.0);
    }

    #[test]
    fn test_explicit_height_overrides_default() {
        let mut shape = flat_rect("wall_b", 0.0, 0.0, 4.0, 4.0);
        shape.style.set("height", "3.5");
        let builder = MeshBuilder::new(BuildOptions::default());
        let output = builder.build(&[shape]);
        let (min, max) = output.objects[0].mesh.bounds();
        assert!((max.z - min.z - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_same_object_shapes_merge() {
        let a = flat_rect("wall_corridor", 0.0, 0.0, 4.0, 4.0);
        let b = flat_rect("wall_corridor", 10.0, 0.0, 4.0, 4.0);
        let builder = MeshBuilder::new(BuildOptions::default());
        let output = builder.build(&[a, b]);
        assert_eq!(output.objects.len(), 1);
        assert_eq!(output.objects[0].mesh.triangle_count(), 16);
    }

    #[test]
    fn test_level_offset_shifts_base() {
        let mut options = BuildOptions::default();
        options.level_offsets.insert("inf".to_string(), -10.0);
        let builder = MeshBuilder::new(options);
        let output = builder.build(&[flat_rect("floor_deep_inf", 0.0, 0.0, 4.0, 4.0)]);
        for chunk in output.objects[0].mesh.positions.chunks_exact(3) {
            assert_eq!(chunk[2], -10.0);
        }
    }

    #[test]
    fn test_private_level_flag() {
        let mut options = BuildOptions::default();
        options.private_levels.push("tech".to_string());
        let builder = MeshBuilder::new(options);
        let output = builder.build(&[flat_rect("wall_pump_tech", 0.0, 0.0, 2.0, 2.0)]);
        assert!(output.objects[0].private);
    }

    #[test]
    fn test_text_and_symbols_not_meshed() {
        let builder = MeshBuilder::new(BuildOptions::default());
        let output = builder.build(&[flat_rect("text_label", 0.0, 0.0, 2.0, 2.0)]);
        assert!(output.objects.is_empty());
    }

    #[test]
    fn test_depth_annotation_overrides_well_depth() {
        let mut annotation = flat_rect("depth_p3", -5.0, -5.0, 10.0, 10.0);
        annotation.text = Some("-12".to_string());
        let well = flat_rect("well:round_p3", -1.0, -1.0, 2.0, 2.0);

        let builder = MeshBuilder::new(BuildOptions::default());
        let output = builder.build(&[annotation, well]);
        // the annotation itself produces no mesh
        assert_eq!(output.objects.len(), 1);
        let (min, max) = output.objects[0].mesh.bounds();
        assert!((max.z - min.z - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_depth_annotation_elsewhere_is_ignored() {
        let mut annotation = flat_rect("depth_far", 100.0, 100.0, 4.0, 4.0);
        annotation.style.set("depth", "40");
        let well = flat_rect("well:round_p3", 0.0, 0.0, 1.0, 1.0);

        let builder = MeshBuilder::new(BuildOptions::default());
        let output = builder.build(&[annotation, well]);
        let (min, max) = output.objects[0].mesh.bounds();
        // not covered by the annotation: corridor-height fallback
        assert_eq!(max.z - min.z, 2.0);
    }

    #[test]
    fn test_well_reaches_surface_height() {
        let builder = MeshBuilder::new(BuildOptions::default());
        let output = builder.build(&[flat_rect("well:round_p3", 0.0, 0.0, 1.0, 1.0)]);
        assert_eq!(output.objects.len(), 1);
        let (min, max) = output.objects[0].mesh.bounds();
        // no terrain loaded: depth falls back to the corridor height
        assert_eq!(min.z, 0.0);
        assert_eq!(max.z, 2.0);
    }
}
