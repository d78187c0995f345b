// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Cartomesh Processing
//!
//! The conversion pipeline: renders 2D map variants (layer policies,
//! level shifts, zoom insets, symbol replacement, palettes) and exports
//! 3D meshes with their viewer manifest.
//!
//! ```rust,ignore
//! use cartomesh_core::parse_document;
//! use cartomesh_processing::{Pipeline, PipelineConfig};
//!
//! let parsed = parse_document(&svg_text)?;
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//!
//! for variant in pipeline.run_2d(&parsed.document) {
//!     std::fs::write(format!("{}.svg", variant.name), &variant.svg)?;
//! }
//!
//! let export = pipeline.run_3d(&parsed.document, None);
//! pipeline.write_3d(&export, std::path::Path::new("out"))?;
//! ```
//!
//! Configuration is validated up front; a bad config aborts before any
//! output exists. Everything recoverable is returned as diagnostics
//! next to the primary output.

pub mod config;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod regions;
pub mod writer;

use cartomesh_core::{Category, Diagnostics, Document, Flattener};
use cartomesh_geometry::{AltitudeModel, MeshBuilder, MeshObject};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

pub use config::{
    LayerPolicy, PaletteEntry, PipelineConfig, RegionOverlapPolicy, Shift, VariantConfig,
};
pub use error::{Error, Result};
pub use layout::{build_variant, VariantOutput};
pub use manifest::{mesh_file_name, text_file_name, MapManifest, MeshManifest, MANIFEST_VERSION};
pub use regions::{assign_regions, box_in_region, collect_regions, RegionDescriptor};
pub use writer::write_document;

/// One rendered 2D variant, serialized and ready to hand off
#[derive(Debug)]
pub struct Variant2D {
    pub name: String,
    pub svg: String,
    pub diagnostics: Diagnostics,
}

/// A text label exported beside the meshes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLabel {
    pub name: String,
    pub position: [f64; 2],
    pub content: String,
    #[serde(skip)]
    pub private: bool,
}

/// Result of one 3D export run
#[derive(Debug)]
pub struct MeshExport {
    pub objects: Vec<MeshObject>,
    pub texts: Vec<TextLabel>,
    pub manifest: MeshManifest,
    pub diagnostics: Diagnostics,
}

/// The conversion pipeline for one validated configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline; configuration problems are fatal here
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Render all configured 2D variants
    ///
    /// Variants are independent and render in parallel.
    pub fn run_2d(&self, document: &Document) -> Vec<Variant2D> {
        self.config
            .variants
            .par_iter()
            .map(|variant| {
                let span = info_span!("variant_2d", name = %variant.name);
                let _guard = span.enter();

                let output = build_variant(document, variant, self.config.region_overlap);
                debug!(
                    layers = output.document.layers().count(),
                    skipped = output.diagnostics.len(),
                    "variant rendered"
                );
                Variant2D {
                    name: output.name,
                    svg: write_document(&output.document),
                    diagnostics: output.diagnostics,
                }
            })
            .collect()
    }

    /// Manifest of the produced 2D variant names
    pub fn map_manifest(&self, variants: &[Variant2D]) -> MapManifest {
        MapManifest::new(variants.iter().map(|v| v.name.clone()).collect())
    }

    /// Flatten the document and build the 3D export
    pub fn run_3d(&self, document: &Document, altitude: Option<AltitudeModel>) -> MeshExport {
        let span = info_span!("run_3d");
        let _guard = span.enter();

        let flattened = Flattener::new().flatten(document);
        let mut diagnostics = flattened.diagnostics;

        let mut builder = MeshBuilder::new(self.config.build_options());
        if let Some(altitude) = altitude {
            builder = builder.with_altitude_model(altitude);
        }
        let build = builder.build(&flattened.shapes);
        diagnostics.extend(build.diagnostics);

        // text labels ride along as positioned JSON files
        let mut texts = Vec::new();
        for shape in &flattened.shapes {
            if shape.category != Category::Text {
                continue;
            }
            let Some(content) = shape.text.clone() else {
                continue;
            };
            let anchor = shape
                .subpaths
                .first()
                .and_then(|s| s.points.first())
                .copied()
                .unwrap_or_else(|| shape.bbox.center());
            let private = shape
                .level
                .as_ref()
                .is_some_and(|level| self.config.private_levels.iter().any(|l| l == level));
            texts.push(TextLabel {
                name: cartomesh_core::object_name(&shape.source_id),
                position: [anchor.x, anchor.y],
                content,
                private,
            });
        }

        let text_fnames = texts
            .iter()
            .filter(|t| !t.private)
            .map(|t| text_file_name(&t.name))
            .collect();
        let text_fnames_private = texts
            .iter()
            .filter(|t| t.private)
            .map(|t| text_file_name(&t.name))
            .collect();

        let manifest = MeshManifest::new(&build.objects, text_fnames, text_fnames_private);
        info!(
            meshes = build.objects.len(),
            texts = texts.len(),
            skipped = diagnostics.len(),
            "3d export built"
        );

        MeshExport {
            objects: build.objects,
            texts,
            manifest,
            diagnostics,
        }
    }

    /// Write meshes, text labels and the manifest under `dir`
    pub fn write_3d(&self, export: &MeshExport, dir: &std::path::Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        for object in &export.objects {
            let value = manifest::mesh_to_json(&object.mesh, object.material);
            let path = dir.join(mesh_file_name(&object.name));
            std::fs::write(path, serde_json::to_vec(&value)?)?;
        }
        for text in &export.texts {
            let path = dir.join(text_file_name(&text.name));
            std::fs::write(path, serde_json::to_vec(text)?)?;
        }
        let manifest_path = dir.join("manifest.json");
        std::fs::write(manifest_path, serde_json::to_vec_pretty(&export.manifest)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartomesh_core::parse_document;

    const DOC: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
  <g id="layer1">
    <rect id="zoom:A" x="0" y="0" width="10" height="10" style="fill:none"/>
    <rect id="zoom-target:A" x="100" y="0" width="20" height="20" style="fill:none"/>
    <rect id="floor_room1" x="2" y="2" width="4" height="4"/>
    <text id="text_entrance" x="1" y="1">Entrance</text>
  </g>
  <g id="annotations_private">
    <rect id="wall_hidden_tech" x="50" y="50" width="5" height="5"/>
  </g>
</svg>"##;

    fn pipeline() -> Pipeline {
        let mut config = PipelineConfig::default();
        config.private_levels.push("tech".to_string());
        for variant in &mut config.variants {
            variant
                .layer_policies
                .insert("annotations_private".to_string(), LayerPolicy::DropIfPrivate);
        }
        Pipeline::new(config).unwrap()
    }

    #[test]
    fn test_run_2d_produces_all_variants() {
        let parsed = parse_document(DOC).unwrap();
        let variants = pipeline().run_2d(&parsed.document);
        assert_eq!(variants.len(), 4);

        let names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
        assert!(names.contains(&"public"));
        assert!(names.contains(&"private"));

        // public drops the private layer, private keeps it
        let public = variants.iter().find(|v| v.name == "public").unwrap();
        let private = variants.iter().find(|v| v.name == "private").unwrap();
        assert!(!public.svg.contains("wall_hidden_tech"));
        assert!(private.svg.contains("wall_hidden_tech"));
    }

    #[test]
    fn test_zoom_inset_lands_in_output() {
        let parsed = parse_document(DOC).unwrap();
        let variants = pipeline().run_2d(&parsed.document);
        let public = variants.iter().find(|v| v.name == "public").unwrap();
        // floor_room1 sits inside zoom:A, so the public map carries the inset
        assert!(public.svg.contains("zoomed_A"));
        assert!(public.svg.contains("zoom_frame_A"));
    }

    #[test]
    fn test_map_manifest_names() {
        let parsed = parse_document(DOC).unwrap();
        let p = pipeline();
        let variants = p.run_2d(&parsed.document);
        let manifest = p.map_manifest(&variants);
        assert_eq!(manifest.maps, vec!["igc", "poster", "private", "public"]);
        assert_eq!(manifest.version, MANIFEST_VERSION);
    }

    #[test]
    fn test_run_3d_export() {
        let parsed = parse_document(DOC).unwrap();
        let export = pipeline().run_3d(&parsed.document, None);

        assert!(export
            .manifest
            .meshes
            .iter()
            .any(|m| m == "floor_room1.json"));
        // the tech-level wall goes to the private set
        assert!(export
            .manifest
            .meshes_private
            .iter()
            .any(|m| m == "wall_hidden.json"));
        assert_eq!(export.manifest.text_fnames, vec!["entrance_text.json"]);
        assert!(export.manifest.text_fnames_private.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected_before_output() {
        let mut config = PipelineConfig::default();
        config.variants.clear();
        assert!(Pipeline::new(config).is_err());
    }
}
