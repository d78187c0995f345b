// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Zoom region membership
//!
//! A zoom region pairs a `zoom:<id>` source rectangle with a
//! `zoom-target:<id>` placement rectangle. Member shapes are found by
//! bounding-box containment against the source box; the mapping of a
//! member point is `p' = offset + scale * p`.

use cartomesh_core::{BBox, Category, FlatShape, Point2};
use rustc_hash::FxHashMap;

use crate::config::RegionOverlapPolicy;

/// One resolved zoom region
#[derive(Debug, Clone)]
pub struct RegionDescriptor {
    pub id: String,
    /// Source area in global coordinates
    pub source: BBox,
    /// Uniform scale applied to member shapes
    pub scale: f64,
    /// Translation applied after scaling
    pub offset: Point2,
    /// Document order of the source rectangle, used for tie-breaks
    pub order: usize,
}

impl RegionDescriptor {
    /// Derive scale and offset from a target placement rectangle
    ///
    /// The scale is the larger uniform factor that still fits the source
    /// area into the target box on both axes; the source center lands on
    /// the target center.
    pub fn from_target(id: impl Into<String>, source: BBox, target: BBox, order: usize) -> Self {
        let sw = source.width().max(1e-12);
        let sh = source.height().max(1e-12);
        let scale = (target.width() / sw).min(target.height() / sh);
        let sc = source.center();
        let tc = target.center();
        let offset = Point2::new(tc.x - scale * sc.x, tc.y - scale * sc.y);
        Self {
            id: id.into(),
            source,
            scale,
            offset,
            order,
        }
    }

    /// Map a global point into the region's target placement
    #[inline]
    pub fn map_point(&self, p: Point2) -> Point2 {
        Point2::new(
            self.offset.x + self.scale * p.x,
            self.offset.y + self.scale * p.y,
        )
    }

    /// Target boundary of the region
    pub fn target_box(&self) -> BBox {
        BBox::new(self.map_point(self.source.min), self.map_point(self.source.max))
    }
}

/// Containment class of a box against a region's source box
///
/// Counts corners inside (boundary inclusive): all four means inside
/// (1), none means outside (-1), anything else intersects the boundary
/// (0).
pub fn box_in_region(bbox: &BBox, region: &BBox) -> i8 {
    let corners = [
        Point2::new(bbox.min.x, bbox.min.y),
        Point2::new(bbox.max.x, bbox.min.y),
        Point2::new(bbox.max.x, bbox.max.y),
        Point2::new(bbox.min.x, bbox.max.y),
    ];
    let inside = corners.iter().filter(|p| region.contains_point(**p)).count();
    match inside {
        4 => 1,
        0 => -1,
        _ => 0,
    }
}

/// Extract zoom regions from a flattened document
///
/// `zoom:` rectangles without a matching `zoom-target:` are dropped; a
/// region is only actionable once both ends exist.
pub fn collect_regions(shapes: &[FlatShape]) -> Vec<RegionDescriptor> {
    let mut sources: Vec<(String, BBox, usize)> = Vec::new();
    let mut targets: FxHashMap<String, BBox> = FxHashMap::default();

    for (order, shape) in shapes.iter().enumerate() {
        match &shape.category {
            Category::ZoomSource(id) => sources.push((id.clone(), shape.bbox, order)),
            Category::ZoomTarget(id) => {
                targets.insert(id.clone(), shape.bbox);
            }
            _ => {}
        }
    }

    sources
        .into_iter()
        .filter_map(|(id, source, order)| {
            targets
                .get(&id)
                .map(|target| RegionDescriptor::from_target(id, source, *target, order))
        })
        .collect()
}

/// Assign each shape to at most one region
///
/// Returns shape index to region index. Only shapes fully inside a
/// region's source box are members; the overlap policy resolves nested
/// candidates. Region marker shapes themselves are never members.
pub fn assign_regions(
    shapes: &[FlatShape],
    regions: &[RegionDescriptor],
    policy: RegionOverlapPolicy,
) -> FxHashMap<usize, usize> {
    let mut assignment = FxHashMap::default();

    for (shape_idx, shape) in shapes.iter().enumerate() {
        if matches!(
            shape.category,
            Category::ZoomSource(_) | Category::ZoomTarget(_)
        ) {
            continue;
        }

        let mut best: Option<usize> = None;
        for (region_idx, region) in regions.iter().enumerate() {
            if box_in_region(&shape.bbox, &region.source) != 1 {
                continue;
            }
            best = match (best, policy) {
                (None, _) => Some(region_idx),
                (Some(prev), RegionOverlapPolicy::FirstMatch) => {
                    let keep = regions[prev].order <= region.order;
                    Some(if keep { prev } else { region_idx })
                }
                (Some(prev), RegionOverlapPolicy::Innermost) => {
                    let prev_area = regions[prev].source.area();
                    let area = region.source.area();
                    let keep = prev_area < area
                        || (prev_area == area && regions[prev].order <= region.order);
                    Some(if keep { prev } else { region_idx })
                }
            };
        }
        if let Some(region_idx) = best {
            assignment.insert(shape_idx, region_idx);
        }
    }

    assignment
}
