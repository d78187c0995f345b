// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D layout transform engine
//!
//! Renders one map variant from the source document in fixed phases:
//! layer selection, level shifts, symbol replacement, zoom regions,
//! palette recolor. Every phase edits a cloned document; the source is
//! never touched. Unrecognized semantic tags pass through unchanged.

use cartomesh_core::{
    clip_subpaths, Affine, BBox, Category, Diagnostics, Document, FlatShape, Flattener, Node,
    NodeId, NodeKind, PathSegment, Point2, Style, Subpath,
};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::{LayerPolicy, RegionOverlapPolicy, VariantConfig};
use crate::regions::{assign_regions, box_in_region, collect_regions, RegionDescriptor};

/// One rendered 2D variant
#[derive(Debug)]
pub struct VariantOutput {
    pub name: String,
    pub document: Document,
    pub diagnostics: Diagnostics,
}

/// Render a variant from the source document
pub fn build_variant(
    source: &Document,
    variant: &VariantConfig,
    overlap: RegionOverlapPolicy,
) -> VariantOutput {
    let mut document = source.clone();
    let mut diagnostics = Diagnostics::new();

    select_layers(&mut document, variant);
    apply_level_shifts(&mut document, variant);
    if variant.replace_symbols {
        replace_symbols(&mut document, variant.symbol_scale);
    }
    if variant.zoom_regions {
        apply_zoom_regions(&mut document, overlap, &mut diagnostics);
    }
    apply_palette(&mut document, variant);

    VariantOutput {
        name: variant.name.clone(),
        document,
        diagnostics,
    }
}

/// Drop layers per the variant's policy table; unlisted layers stay
fn select_layers(document: &mut Document, variant: &VariantConfig) {
    let layers: Vec<NodeId> = document.layers().collect();
    for layer in layers {
        let name = document.node(layer).semantic_id().to_string();
        let drop = match variant.layer_policies.get(&name) {
            Some(LayerPolicy::Drop) => true,
            Some(LayerPolicy::DropIfPrivate) => !variant.private,
            Some(LayerPolicy::Keep) | None => false,
        };
        if drop {
            debug!(layer = %name, variant = %variant.name, "dropping layer");
            let root = document.root;
            document.remove_child(root, layer);
        }
    }
}

/// Prepend a rigid translation to nodes tagged with a shifted level
///
/// A shifted node covers its whole subtree, so the walk does not
/// descend into it again.
fn apply_level_shifts(document: &mut Document, variant: &VariantConfig) {
    if variant.level_shifts.is_empty() {
        return;
    }
    let mut stack = vec![document.root];
    while let Some(id) = stack.pop() {
        let node = document.node(id);
        let shift = node
            .classified
            .level
            .as_ref()
            .and_then(|level| variant.level_shifts.get(level))
            .copied();
        match shift {
            Some(shift) => {
                let node = document.node_mut(id);
                node.transform = Affine::translate(shift.dx, shift.dy).compose(&node.transform);
            }
            None => stack.extend(document.node(id).children.iter().copied()),
        }
    }
}

/// Replace `symbol:` shapes with an enlarged canonical glyph
///
/// The glyph is a circle centered on the original's local footprint so
/// placement and ancestor transforms keep working unchanged.
fn replace_symbols(document: &mut Document, scale: f64) {
    for id in document.descendants(document.root) {
        let node = document.node(id);
        if !matches!(node.classified.category, Category::Symbol(_)) {
            continue;
        }
        let Some(bbox) = local_bbox(&node.kind) else {
            continue;
        };
        let center = bbox.center();
        let radius = (bbox.width().max(bbox.height()) / 2.0).max(0.5) * scale;
        document.node_mut(id).kind = NodeKind::Circle {
            cx: center.x,
            cy: center.y,
            r: radius,
        };
    }
}

/// Bounding box of a node's geometry in its own local frame
fn local_bbox(kind: &NodeKind) -> Option<BBox> {
    let mut bbox = BBox::empty();
    match kind {
        NodeKind::Rect {
            x,
            y,
            width,
            height,
        } => {
            bbox.expand(Point2::new(*x, *y));
            bbox.expand(Point2::new(x + width, y + height));
        }
        NodeKind::Circle { cx, cy, r } => {
            bbox.expand(Point2::new(cx - r, cy - r));
            bbox.expand(Point2::new(cx + r, cy + r));
        }
        NodeKind::Ellipse { cx, cy, rx, ry } => {
            bbox.expand(Point2::new(cx - rx, cy - ry));
            bbox.expand(Point2::new(cx + rx, cy + ry));
        }
        NodeKind::Polygon { points } | NodeKind::Polyline { points } => {
            for p in points {
                bbox.expand(*p);
            }
        }
        NodeKind::Path { segments } => {
            for seg in segments {
                match seg {
                    PathSegment::MoveTo(p) | PathSegment::LineTo(p) => bbox.expand(*p),
                    PathSegment::CubicTo(c1, c2, p) => {
                        bbox.expand(*c1);
                        bbox.expand(*c2);
                        bbox.expand(*p);
                    }
                    PathSegment::QuadTo(c1, p) => {
                        bbox.expand(*c1);
                        bbox.expand(*p);
                    }
                    PathSegment::ArcTo { to, .. } => bbox.expand(*to),
                    PathSegment::Close => {}
                }
            }
        }
        NodeKind::Text { x, y, .. } => bbox.expand(Point2::new(*x, *y)),
        NodeKind::Group | NodeKind::Other { .. } => return None,
    }
    if bbox.is_empty() {
        None
    } else {
        Some(bbox)
    }
}

/// Re-render zoom region members at their target scale and placement
///
/// Members are rebuilt from their flattened global geometry under a new
/// top-level `zoom_<id>` group with an identity transform, so the baked
/// coordinates are final. Shapes crossing the source boundary are
/// clipped to it before mapping; content wholly outside never appears
/// in the inset.
fn apply_zoom_regions(
    document: &mut Document,
    overlap: RegionOverlapPolicy,
    diagnostics: &mut Diagnostics,
) {
    let flattened = Flattener::new().flatten(document);
    diagnostics.extend(flattened.diagnostics);

    let regions = collect_regions(&flattened.shapes);
    if regions.is_empty() {
        return;
    }
    let assignment = assign_regions(&flattened.shapes, &regions, overlap);

    // resolve flattened shapes back to their tree nodes
    let mut by_id: FxHashMap<String, NodeId> = FxHashMap::default();
    for id in document.descendants(document.root) {
        let sid = document.node(id).semantic_id();
        if !sid.is_empty() {
            by_id.entry(sid.to_string()).or_insert(id);
        }
    }

    let mut parents: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    for id in document.descendants(document.root) {
        for &child in &document.node(id).children {
            parents.insert(child, id);
        }
    }

    for (region_idx, region) in regions.iter().enumerate() {
        let group = document.add_node(
            Node::new(NodeKind::Group).with_id(format!("zoomed_{}", region.id)),
            document.root,
        );

        // fully contained members move into the inset
        let mut members = 0usize;
        for (shape_idx, shape) in flattened.shapes.iter().enumerate() {
            if assignment.get(&shape_idx) != Some(&region_idx) {
                continue;
            }
            let Some(&node_id) = by_id.get(shape.source_id.as_str()) else {
                continue;
            };
            if let Some(&parent) = parents.get(&node_id) {
                document.remove_child(parent, node_id);
            }
            let baked = bake_shape(shape, region, false);
            document.add_node(baked, group);
            members += 1;
        }

        // boundary crossers contribute a clipped copy and stay in place
        for (shape_idx, shape) in flattened.shapes.iter().enumerate() {
            if assignment.contains_key(&shape_idx) {
                continue;
            }
            if matches!(
                shape.category,
                Category::ZoomSource(_) | Category::ZoomTarget(_)
            ) {
                continue;
            }
            if box_in_region(&shape.bbox, &region.source) != 0 {
                continue;
            }
            let baked = bake_shape(shape, region, true);
            if !matches!(&baked.kind, NodeKind::Path { segments } if segments.is_empty()) {
                document.add_node(baked, group);
                members += 1;
            }
        }

        if members == 0 {
            debug!(region = %region.id, "zoom region has no members");
        }

        // inset frame at the target boundary
        let frame = region.target_box();
        let mut frame_node = Node::new(NodeKind::Rect {
            x: frame.min.x,
            y: frame.min.y,
            width: frame.width(),
            height: frame.height(),
        })
        .with_id(format!("zoom_frame_{}", region.id));
        frame_node.style = Style::parse("fill:none;stroke:#000000;stroke-width:0.5");
        document.add_node(frame_node, group);
    }

    // the marker rectangles have served their purpose
    let marker_ids: Vec<NodeId> = document
        .descendants(document.root)
        .into_iter()
        .filter(|&id| {
            matches!(
                document.node(id).classified.category,
                Category::ZoomSource(_) | Category::ZoomTarget(_)
            )
        })
        .collect();
    for id in marker_ids {
        if let Some(&parent) = parents.get(&id) {
            document.remove_child(parent, id);
        }
    }
}

/// Build a path node from a flattened shape mapped into a region
fn bake_shape(shape: &FlatShape, region: &RegionDescriptor, clip: bool) -> Node {
    let subpaths: Vec<Subpath> = if clip {
        clip_subpaths(&shape.subpaths, &region.source)
    } else {
        shape.subpaths.clone()
    };

    let mut segments = Vec::new();
    for sub in &subpaths {
        let mut points = sub.points.iter().map(|&p| region.map_point(p));
        if let Some(first) = points.next() {
            segments.push(PathSegment::MoveTo(first));
        }
        for p in points {
            segments.push(PathSegment::LineTo(p));
        }
        if sub.closed {
            segments.push(PathSegment::Close);
        }
    }

    let mut node = Node::new(NodeKind::Path { segments }).with_id(shape.source_id.clone());
    node.style = shape.style.clone();
    node
}

/// Rewrite fill/stroke through the variant's palette
fn apply_palette(document: &mut Document, variant: &VariantConfig) {
    if variant.palette.is_empty() {
        return;
    }
    for id in document.descendants(document.root) {
        let slug = document.node(id).classified.category.slug();
        // exact slug first, then its leading segment (well_round -> well)
        let entry = variant.palette.get(&slug).or_else(|| {
            slug.split('_')
                .next()
                .and_then(|base| variant.palette.get(base))
        });
        let Some(entry) = entry else { continue };
        let node = document.node_mut(id);
        if let Some(fill) = &entry.fill {
            node.style.set("fill", fill);
        }
        if let Some(stroke) = &entry.stroke {
            node.style.set("stroke", stroke);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PaletteEntry, Shift};

    fn variant(name: &str) -> VariantConfig {
        VariantConfig {
            name: name.to_string(),
            private: false,
            layer_policies: FxHashMap::default(),
            level_shifts: FxHashMap::default(),
            palette: FxHashMap::default(),
            zoom_regions: true,
            replace_symbols: true,
            symbol_scale: 2.0,
        }
    }

    fn rect_node(id: &str, x: f64, y: f64, w: f64, h: f64) -> Node {
        Node::new(NodeKind::Rect {
            x,
            y,
            width: w,
            height: h,
        })
        .with_id(id)
    }

    #[test]
    fn test_layer_policies() {
        let mut doc = Document::new();
        doc.add_node(Node::new(NodeKind::Group).with_id("walls"), doc.root);
        doc.add_node(Node::new(NodeKind::Group).with_id("secrets"), doc.root);

        let mut v = variant("public");
        v.layer_policies
            .insert("secrets".to_string(), LayerPolicy::DropIfPrivate);

        let output = build_variant(&doc, &v, RegionOverlapPolicy::Innermost);
        let names: Vec<String> = output
            .document
            .layers()
            .map(|l| output.document.node(l).semantic_id().to_string())
            .collect();
        assert_eq!(names, vec!["walls"]);

        // the private rendering keeps it
        let mut vp = v.clone();
        vp.private = true;
        let output = build_variant(&doc, &vp, RegionOverlapPolicy::Innermost);
        assert_eq!(output.document.layers().count(), 2);
    }

    #[test]
    fn test_level_shift_prepends_translation() {
        let mut doc = Document::new();
        let layer = doc.add_node(Node::new(NodeKind::Group).with_id("level_inf"), doc.root);
        doc.add_node(rect_node("wall_a_inf", 0.0, 0.0, 5.0, 5.0), layer);

        let mut v = variant("shifted");
        v.level_shifts
            .insert("inf".to_string(), Shift { dx: 0.0, dy: 300.0 });

        let output = build_variant(&doc, &v, RegionOverlapPolicy::Innermost);
        let flat = Flattener::new().flatten(&output.document);
        let wall = flat
            .shapes
            .iter()
            .find(|s| s.source_id == "wall_a_inf")
            .unwrap();
        // layer carries the level tag, shift applied once
        assert_eq!(wall.bbox.min, Point2::new(0.0, 300.0));
    }

    #[test]
    fn test_zoom_region_bakes_target_coordinates() {
        let mut doc = Document::new();
        let layer = doc.add_node(Node::new(NodeKind::Group).with_id("layer1"), doc.root);
        doc.add_node(rect_node("zoom:A", 0.0, 0.0, 10.0, 10.0), layer);
        doc.add_node(rect_node("zoom-target:A", 100.0, 0.0, 20.0, 20.0), layer);
        doc.add_node(rect_node("wall_inner", 2.0, 3.0, 4.0, 4.0), layer);

        let output = build_variant(&doc, &variant("zoomed"), RegionOverlapPolicy::Innermost);
        let flat = Flattener::new().flatten(&output.document);
        let wall = flat
            .shapes
            .iter()
            .find(|s| s.source_id == "wall_inner")
            .unwrap();
        // offset (100,0), scale 2: min corner (2,3) lands at (104,6)
        assert_eq!(wall.bbox.min, Point2::new(104.0, 6.0));
        assert_eq!(wall.bbox.max, Point2::new(112.0, 14.0));
    }

    #[test]
    fn test_zoom_markers_removed_and_frame_added() {
        let mut doc = Document::new();
        let layer = doc.add_node(Node::new(NodeKind::Group).with_id("layer1"), doc.root);
        doc.add_node(rect_node("zoom:A", 0.0, 0.0, 10.0, 10.0), layer);
        doc.add_node(rect_node("zoom-target:A", 100.0, 0.0, 20.0, 20.0), layer);

        let output = build_variant(&doc, &variant("zoomed"), RegionOverlapPolicy::Innermost);
        assert!(output.document.find_by_id("zoom_frame_A").is_some());
        let flat = Flattener::new().flatten(&output.document);
        assert!(!flat
            .shapes
            .iter()
            .any(|s| matches!(s.category, Category::ZoomSource(_) | Category::ZoomTarget(_))));
    }

    #[test]
    fn test_boundary_crosser_is_clipped_into_inset() {
        let mut doc = Document::new();
        let layer = doc.add_node(Node::new(NodeKind::Group).with_id("layer1"), doc.root);
        doc.add_node(rect_node("zoom:A", 0.0, 0.0, 10.0, 10.0), layer);
        doc.add_node(rect_node("zoom-target:A", 100.0, 0.0, 20.0, 20.0), layer);
        doc.add_node(rect_node("wall_crossing", 8.0, 2.0, 6.0, 2.0), layer);

        let output = build_variant(&doc, &variant("zoomed"), RegionOverlapPolicy::Innermost);
        let flat = Flattener::new().flatten(&output.document);
        let copies: Vec<&FlatShape> = flat
            .shapes
            .iter()
            .filter(|s| s.source_id == "wall_crossing")
            .collect();
        // original in place plus one clipped copy in the inset
        assert_eq!(copies.len(), 2);
        let inset = copies
            .iter()
            .find(|s| s.bbox.min.x >= 100.0)
            .expect("clipped inset copy");
        // x in [8,10] maps to [116,120]; nothing beyond the target edge
        assert_eq!(inset.bbox.max.x, 120.0);
        assert_eq!(inset.bbox.min.x, 116.0);
    }

    #[test]
    fn test_symbol_replacement_enlarges() {
        let mut doc = Document::new();
        let layer = doc.add_node(Node::new(NodeKind::Group).with_id("layer1"), doc.root);
        doc.add_node(rect_node("symbol:spring", 4.0, 4.0, 2.0, 2.0), layer);

        let output = build_variant(&doc, &variant("v"), RegionOverlapPolicy::Innermost);
        let node_id = output.document.find_by_id("symbol:spring").unwrap();
        match output.document.node(node_id).kind {
            NodeKind::Circle { cx, cy, r } => {
                assert_eq!((cx, cy), (5.0, 5.0));
                assert_eq!(r, 2.0);
            }
            ref other => panic!("expected circle glyph, got {other:?}"),
        }
    }

    #[test]
    fn test_palette_recolor() {
        let mut doc = Document::new();
        let layer = doc.add_node(Node::new(NodeKind::Group).with_id("layer1"), doc.root);
        doc.add_node(rect_node("wall_a", 0.0, 0.0, 5.0, 5.0), layer);
        doc.add_node(rect_node("decoration_x", 0.0, 0.0, 5.0, 5.0), layer);

        let mut v = variant("poster");
        v.palette.insert(
            "wall".to_string(),
            PaletteEntry {
                fill: Some("#402000".to_string()),
                stroke: Some("none".to_string()),
            },
        );

        let output = build_variant(&doc, &v, RegionOverlapPolicy::Innermost);
        let wall = output.document.find_by_id("wall_a").unwrap();
        assert_eq!(output.document.node(wall).style.get("fill"), Some("#402000"));
        // unclassified shapes pass through untouched
        let other = output.document.find_by_id("decoration_x").unwrap();
        assert_eq!(output.document.node(other).style.get("fill"), None);
    }
}
