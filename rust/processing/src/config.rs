// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration
//!
//! One [`PipelineConfig`] drives a whole conversion run: the set of map
//! variants to render, per-layer visibility policies, level shifts,
//! palettes and the mesh build parameters. Validation runs eagerly and
//! completely before any output is produced.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do with a source layer in one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerPolicy {
    /// Layer stays in the output
    Keep,
    /// Layer is removed
    Drop,
    /// Layer is removed unless the variant is a private one
    DropIfPrivate,
}

/// How to resolve a shape contained in several nested zoom regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionOverlapPolicy {
    /// Smallest containing region wins, ties by document order
    #[default]
    Innermost,
    /// First region in document order wins
    FirstMatch,
}

/// Fill/stroke override for one semantic category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
}

/// A 2D rigid shift, in document units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub dx: f64,
    pub dy: f64,
}

/// One named output profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    /// Private variants keep layers marked drop-if-private
    #[serde(default)]
    pub private: bool,
    /// Layer name to visibility policy; unlisted layers are kept
    #[serde(default)]
    pub layer_policies: FxHashMap<String, LayerPolicy>,
    /// Rigid shift per level tag, for vertical-level separation
    #[serde(default)]
    pub level_shifts: FxHashMap<String, Shift>,
    /// Category slug to color override
    #[serde(default)]
    pub palette: FxHashMap<String, PaletteEntry>,
    /// Render zoom regions in this variant
    #[serde(default = "default_true")]
    pub zoom_regions: bool,
    /// Replace `symbol:` shapes with enlarged canonical glyphs
    #[serde(default = "default_true")]
    pub replace_symbols: bool,
    /// Glyph enlargement factor for symbol replacement
    #[serde(default = "default_symbol_scale")]
    pub symbol_scale: f64,
}

fn default_true() -> bool {
    true
}

fn default_symbol_scale() -> f64 {
    2.0
}

/// Full configuration for one conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub variants: Vec<VariantConfig>,
    #[serde(default)]
    pub region_overlap: RegionOverlapPolicy,
    /// Wall height when a shape carries no explicit height
    #[serde(default = "default_corridor_height")]
    pub corridor_height: f64,
    /// Ground elevation used off the elevation model
    #[serde(default)]
    pub default_ground: f64,
    /// Smoothing passes for draped wall bases
    #[serde(default = "default_smooth_passes")]
    pub smooth_passes: usize,
    /// Base elevation offset per level tag
    #[serde(default)]
    pub level_offsets: FxHashMap<String, f64>,
    /// Levels routed to the private mesh set
    #[serde(default)]
    pub private_levels: Vec<String>,
}

fn default_corridor_height() -> f64 {
    2.0
}

fn default_smooth_passes() -> usize {
    2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            variants: default_variants(),
            region_overlap: RegionOverlapPolicy::default(),
            corridor_height: default_corridor_height(),
            default_ground: 0.0,
            smooth_passes: default_smooth_passes(),
            level_offsets: FxHashMap::default(),
            private_levels: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Parse from JSON and validate
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the whole configuration before processing begins
    ///
    /// Partial output after a half-validated config would be misleading,
    /// so every problem here is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(Error::Configuration("no variants configured".to_string()));
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for variant in &self.variants {
            if variant.name.is_empty() {
                return Err(Error::Configuration("variant with empty name".to_string()));
            }
            if !seen.insert(variant.name.as_str()) {
                return Err(Error::Configuration(format!(
                    "duplicate variant name '{}'",
                    variant.name
                )));
            }
            if variant.symbol_scale <= 0.0 {
                return Err(Error::Configuration(format!(
                    "variant '{}': symbol scale must be positive",
                    variant.name
                )));
            }
            for (category, entry) in &variant.palette {
                for color in [&entry.fill, &entry.stroke].into_iter().flatten() {
                    if color != "none" && cartomesh_geometry::parse_hex_color(color).is_none() {
                        return Err(Error::Configuration(format!(
                            "variant '{}': bad color '{color}' for category '{category}'",
                            variant.name
                        )));
                    }
                }
            }
        }

        if self.corridor_height <= 0.0 {
            return Err(Error::Configuration(
                "corridor height must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Mesh build options derived from this config
    pub fn build_options(&self) -> cartomesh_geometry::BuildOptions {
        cartomesh_geometry::BuildOptions {
            corridor_height: self.corridor_height,
            default_ground: self.default_ground,
            smooth_passes: self.smooth_passes,
            level_offsets: self.level_offsets.clone(),
            private_levels: self.private_levels.clone(),
        }
    }
}

/// The standard output profiles
fn default_variants() -> Vec<VariantConfig> {
    let mut private_policies = FxHashMap::default();
    private_policies.insert("annotations_private".to_string(), LayerPolicy::DropIfPrivate);

    let mut poster_palette = FxHashMap::default();
    poster_palette.insert(
        "wall".to_string(),
        PaletteEntry {
            fill: None,
            stroke: Some("#402000".to_string()),
        },
    );
    poster_palette.insert(
        "floor".to_string(),
        PaletteEntry {
            fill: Some("#d0c8b0".to_string()),
            stroke: None,
        },
    );

    vec![
        VariantConfig {
            name: "public".to_string(),
            private: false,
            layer_policies: private_policies.clone(),
            level_shifts: FxHashMap::default(),
            palette: FxHashMap::default(),
            zoom_regions: true,
            replace_symbols: true,
            symbol_scale: 2.0,
        },
        VariantConfig {
            name: "private".to_string(),
            private: true,
            layer_policies: private_policies,
            level_shifts: FxHashMap::default(),
            palette: FxHashMap::default(),
            zoom_regions: true,
            replace_symbols: true,
            symbol_scale: 2.0,
        },
        VariantConfig {
            name: "poster".to_string(),
            private: false,
            layer_policies: FxHashMap::default(),
            level_shifts: FxHashMap::default(),
            palette: poster_palette,
            zoom_regions: false,
            replace_symbols: true,
            symbol_scale: 3.0,
        },
        VariantConfig {
            name: "igc".to_string(),
            private: false,
            layer_policies: FxHashMap::default(),
            level_shifts: FxHashMap::default(),
            palette: FxHashMap::default(),
            zoom_regions: false,
            replace_symbols: false,
            symbol_scale: 1.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.variants.len(), 4);
    }

    #[test]
    fn test_duplicate_variant_rejected() {
        let mut config = PipelineConfig::default();
        let dup = config.variants[0].clone();
        config.variants.push(dup);
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_bad_palette_color_rejected() {
        let mut config = PipelineConfig::default();
        config.variants[0].palette.insert(
            "wall".to_string(),
            PaletteEntry {
                fill: Some("chartreuse".to_string()),
                stroke: None,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_none_is_a_valid_color() {
        let mut config = PipelineConfig::default();
        config.variants[0].palette.insert(
            "wall".to_string(),
            PaletteEntry {
                fill: Some("none".to_string()),
                stroke: None,
            },
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PipelineConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let back = PipelineConfig::from_json(&text).unwrap();
        assert_eq!(back.variants.len(), config.variants.len());
        assert_eq!(back.region_overlap, RegionOverlapPolicy::Innermost);
    }

    #[test]
    fn test_minimal_json() {
        let config = PipelineConfig::from_json(
            r#"{"variants":[{"name":"only"}]}"#,
        )
        .unwrap();
        assert_eq!(config.variants[0].name, "only");
        assert!(config.variants[0].zoom_regions);
        assert_eq!(config.variants[0].symbol_scale, 2.0);
        assert_eq!(config.corridor_height, 2.0);
    }
}
