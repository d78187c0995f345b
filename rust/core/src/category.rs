// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Semantic classification of map elements
//!
//! Element ids carry a naming convention (`wall_`, `floor_`, `symbol:`,
//! `zoom:` prefixes, level suffixes). Classification runs exactly once
//! per element at parse time; all downstream behavior keys off the
//! resulting [`Category`] instead of re-matching strings.

/// Shaft construction profile, dispatched in the mesh builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKind {
    /// Smooth cylindrical shaft
    Round,
    /// Four-facet shaft rotated 45 degrees
    Square,
    /// Lofted shaft whose radius narrows with depth
    Tapered,
    /// Two poles with rungs
    Ladder,
    /// Central pole with rotating steps
    SpiralStair,
}

/// Behavioral class of a shape, inferred from its source id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// Vertical ribbon between base and top elevation
    Wall,
    /// Flat tessellated polygon at floor elevation
    Floor,
    /// Flat tessellated polygon at ceiling elevation
    Ceiling,
    /// Vertical shaft with a dedicated revolved/lofted topology
    Well(WellKind),
    /// Replaceable map glyph, e.g. `symbol:well`
    Symbol(String),
    /// Source rectangle of a zoom region, e.g. `zoom:A`
    ZoomSource(String),
    /// Target placement rectangle of a zoom region, e.g. `zoom-target:A`
    ZoomTarget(String),
    /// Depth annotation geometry
    DepthMap,
    /// Text label
    Text,
    /// Unknown naming pattern; passes through all stages inert
    Unclassified,
}

impl Category {
    /// Stable slug used for grouping and output file names
    pub fn slug(&self) -> String {
        match self {
            Category::Wall => "wall".to_string(),
            Category::Floor => "floor".to_string(),
            Category::Ceiling => "ceiling".to_string(),
            Category::Well(kind) => format!("well_{}", well_slug(*kind)),
            Category::Symbol(name) => format!("symbol_{name}"),
            Category::ZoomSource(id) => format!("zoom_{id}"),
            Category::ZoomTarget(id) => format!("zoom_target_{id}"),
            Category::DepthMap => "depth".to_string(),
            Category::Text => "text".to_string(),
            Category::Unclassified => "other".to_string(),
        }
    }
}

fn well_slug(kind: WellKind) -> &'static str {
    match kind {
        WellKind::Round => "round",
        WellKind::Square => "square",
        WellKind::Tapered => "tapered",
        WellKind::Ladder => "ladder",
        WellKind::SpiralStair => "spiral",
    }
}

/// Classification result: category plus optional vertical level tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub category: Category,
    /// Level tag from a recognized suffix (`_inf`, `_sup`, `_tech`, `_lvl<n>`)
    pub level: Option<String>,
}

/// Recognized level suffixes
const LEVEL_SUFFIXES: &[&str] = &["inf", "sup", "tech", "surf"];

/// Split a recognized level suffix off an id, returning (stem, level)
fn split_level(id: &str) -> (&str, Option<String>) {
    if let Some(pos) = id.rfind('_') {
        let suffix = &id[pos + 1..];
        if LEVEL_SUFFIXES.contains(&suffix) {
            return (&id[..pos], Some(suffix.to_string()));
        }
        if let Some(n) = suffix.strip_prefix("lvl") {
            if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) {
                return (&id[..pos], Some(suffix.to_string()));
            }
        }
    }
    (id, None)
}

fn well_kind(profile: &str) -> WellKind {
    // The part after `well:` names the profile; anything unrecognized
    // falls back to the plain cylinder.
    let kind = profile.split(['_', ':']).next().unwrap_or("");
    match kind {
        "square" | "sq" => WellKind::Square,
        "tapered" | "taper" => WellKind::Tapered,
        "ladder" => WellKind::Ladder,
        "spiral" | "stair" => WellKind::SpiralStair,
        _ => WellKind::Round,
    }
}

/// Resolve an element id (or layer label) to its semantic category
///
/// Unknown patterns map to `Unclassified`; classification never fails.
pub fn classify(id: &str) -> Classified {
    let (stem, level) = split_level(id);

    let category = if let Some(rest) = stem.strip_prefix("symbol:") {
        Category::Symbol(rest.to_string())
    } else if let Some(rest) = stem.strip_prefix("zoom-target:") {
        Category::ZoomTarget(rest.to_string())
    } else if let Some(rest) = stem.strip_prefix("zoom:") {
        Category::ZoomSource(rest.to_string())
    } else if let Some(rest) = stem.strip_prefix("well:") {
        Category::Well(well_kind(rest))
    } else if stem.starts_with("wall_") || stem == "wall" {
        Category::Wall
    } else if stem.starts_with("floor_") || stem == "floor" {
        Category::Floor
    } else if stem.starts_with("ceiling_") || stem == "ceiling" {
        Category::Ceiling
    } else if stem.starts_with("depth_") || stem == "depth" {
        Category::DepthMap
    } else if stem.starts_with("text_") || stem == "text" {
        Category::Text
    } else {
        Category::Unclassified
    };

    Classified { category, level }
}

/// Object name for grouping meshes: the id stem without its category prefix
pub fn object_name(id: &str) -> String {
    let (stem, _) = split_level(id);
    for prefix in ["wall_", "floor_", "ceiling_", "depth_", "text_"] {
        if let Some(rest) = stem.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    if let Some(pos) = stem.find(':') {
        return stem[pos + 1..].replace(':', "_");
    }
    stem.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_prefixes() {
        assert_eq!(classify("wall_n12").category, Category::Wall);
        assert_eq!(classify("floor_room1").category, Category::Floor);
        assert_eq!(classify("ceiling_hall").category, Category::Ceiling);
        assert_eq!(
            classify("symbol:well").category,
            Category::Symbol("well".to_string())
        );
        assert_eq!(
            classify("zoom:A").category,
            Category::ZoomSource("A".to_string())
        );
        assert_eq!(
            classify("zoom-target:A").category,
            Category::ZoomTarget("A".to_string())
        );
    }

    #[test]
    fn test_well_kinds() {
        assert_eq!(classify("well:round_p3").category, Category::Well(WellKind::Round));
        assert_eq!(classify("well:square_p4").category, Category::Well(WellKind::Square));
        assert_eq!(classify("well:tapered_p5").category, Category::Well(WellKind::Tapered));
        assert_eq!(classify("well:ladder_p6").category, Category::Well(WellKind::Ladder));
        assert_eq!(classify("well:spiral_p7").category, Category::Well(WellKind::SpiralStair));
        // unknown profile falls back to cylinder
        assert_eq!(classify("well:xyz").category, Category::Well(WellKind::Round));
    }

    #[test]
    fn test_level_suffix() {
        let c = classify("wall_n12_inf");
        assert_eq!(c.category, Category::Wall);
        assert_eq!(c.level.as_deref(), Some("inf"));

        let c = classify("floor_hall_lvl3");
        assert_eq!(c.category, Category::Floor);
        assert_eq!(c.level.as_deref(), Some("lvl3"));

        // unrecognized suffix is part of the name, not a level
        let c = classify("wall_n12_xx");
        assert_eq!(c.level, None);
    }

    #[test]
    fn test_unknown_passes_through() {
        assert_eq!(classify("decoration_17").category, Category::Unclassified);
        assert_eq!(classify("").category, Category::Unclassified);
    }

    #[test]
    fn test_object_name() {
        assert_eq!(object_name("wall_n12_inf"), "n12");
        assert_eq!(object_name("floor_room1"), "room1");
        assert_eq!(object_name("well:round_p3"), "round_p3");
    }
}
