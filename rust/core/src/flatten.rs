// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shape flattener
//!
//! Walks the styled, transformed document tree and reduces every shape
//! to point sequences in the global document frame. Curves are
//! subdivided to a configurable chordal tolerance. The traversal is an
//! explicit stack carrying an immutable inherited context per frame, so
//! the transform stack is pushed on entry and dropped on every exit
//! path, including skips.

use crate::category::{Category, Classified};
use crate::diag::{DiagnosticKind, Diagnostics};
use crate::document::{Document, NodeId, NodeKind};
use crate::geom::{Affine, BBox, Point2};
use crate::path_data::PathSegment;
use crate::style::Style;

/// Flattening parameters
#[derive(Debug, Clone, Copy)]
pub struct FlattenOptions {
    /// Maximum chordal deviation, in document units
    pub tolerance: f64,
    /// Traversal depth guard against pathological nesting
    pub max_depth: usize,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.25,
            max_depth: 64,
        }
    }
}

/// One polyline of a flattened shape
#[derive(Debug, Clone, PartialEq)]
pub struct Subpath {
    pub points: Vec<Point2>,
    pub closed: bool,
}

impl Subpath {
    pub fn new(points: Vec<Point2>, closed: bool) -> Self {
        Self { points, closed }
    }
}

/// A shape reduced to global-frame polylines
///
/// Produced once per flattening pass and immutable afterward.
#[derive(Debug, Clone)]
pub struct FlatShape {
    pub source_id: String,
    pub category: Category,
    pub level: Option<String>,
    pub style: Style,
    pub subpaths: Vec<Subpath>,
    /// Label content for text shapes
    pub text: Option<String>,
    pub bbox: BBox,
}

impl FlatShape {
    pub fn recompute_bbox(&mut self) {
        let mut bbox = BBox::empty();
        for sub in &self.subpaths {
            for p in &sub.points {
                bbox.expand(*p);
            }
        }
        self.bbox = bbox;
    }
}

/// Flattening result: shapes plus recoverable incidents
#[derive(Debug)]
pub struct FlattenOutput {
    pub shapes: Vec<FlatShape>,
    pub diagnostics: Diagnostics,
}

/// Inherited traversal context, one immutable value per stack frame
#[derive(Clone)]
struct Frame {
    node: NodeId,
    transform: Affine,
    style: Style,
    depth: usize,
}

/// The path/shape flattener
#[derive(Debug, Default, Clone)]
pub struct Flattener {
    options: FlattenOptions,
}

impl Flattener {
    pub fn new() -> Self {
        Self {
            options: FlattenOptions::default(),
        }
    }

    pub fn with_options(options: FlattenOptions) -> Self {
        Self { options }
    }

    /// Flatten the whole document from the root
    pub fn flatten(&self, doc: &Document) -> FlattenOutput {
        self.flatten_subtree(doc, doc.root, &Affine::identity())
    }

    /// Flatten a subtree under an inherited transform
    pub fn flatten_subtree(
        &self,
        doc: &Document,
        start: NodeId,
        inherited: &Affine,
    ) -> FlattenOutput {
        let mut shapes = Vec::new();
        let mut diagnostics = Diagnostics::new();

        let mut stack = vec![Frame {
            node: start,
            transform: *inherited,
            style: Style::new(),
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            let node = doc.node(frame.node);
            if node.style.display_none() {
                continue;
            }

            let transform = frame.transform.compose(&node.transform);
            let style = node.style.resolved(&frame.style);
            let source_id = node.semantic_id().to_string();

            if node.is_group() {
                if frame.depth + 1 > self.options.max_depth {
                    diagnostics.record(
                        DiagnosticKind::DepthExceeded,
                        &source_id,
                        format!("nesting deeper than {}", self.options.max_depth),
                    );
                    continue;
                }
                for &child in node.children.iter().rev() {
                    stack.push(Frame {
                        node: child,
                        transform,
                        style: style.clone(),
                        depth: frame.depth + 1,
                    });
                }
                continue;
            }

            if transform.determinant().abs() < 1e-12 {
                diagnostics.record(
                    DiagnosticKind::SingularTransform,
                    &source_id,
                    "effective transform is singular, shape skipped",
                );
                continue;
            }

            // local tolerance so chordal deviation holds in global units
            let scale = transform.mean_scale().max(1e-9);
            let tolerance = self.options.tolerance / scale;

            let mut subpaths = outline(&node.kind, tolerance);
            if subpaths.is_empty() {
                if !matches!(node.kind, NodeKind::Group | NodeKind::Other { .. }) {
                    diagnostics.record(
                        DiagnosticKind::DegenerateShape,
                        &source_id,
                        "no usable geometry",
                    );
                }
                continue;
            }

            // into the global frame
            for sub in &mut subpaths {
                for p in &mut sub.points {
                    *p = transform.apply(*p);
                }
            }

            // drop degenerate results
            let before = subpaths.len();
            subpaths.retain(|sub| sub.points.iter().all(Point2::is_finite) && !sub.points.is_empty());
            if subpaths.len() != before {
                diagnostics.record(
                    DiagnosticKind::DegenerateShape,
                    &source_id,
                    "dropped subpaths with non-finite coordinates",
                );
            }
            if subpaths.is_empty() {
                continue;
            }

            // clip-path resolution degrades to pass-through on a miss
            if let Some(clip_ref) = &node.clip_ref {
                match doc.resolve_clip(clip_ref) {
                    Some(clip_node) => {
                        if let Some(clip_box) = self.subtree_bbox(doc, clip_node, &frame.transform)
                        {
                            subpaths = clip_subpaths(&subpaths, &clip_box);
                            if subpaths.is_empty() {
                                continue;
                            }
                        }
                    }
                    None => {
                        diagnostics.record(
                            DiagnosticKind::UnresolvedClip,
                            &source_id,
                            format!("clip-path '{clip_ref}' not found, emitted unclipped"),
                        );
                    }
                }
            }

            let text = match &node.kind {
                NodeKind::Text { content, .. } => Some(content.clone()),
                _ => None,
            };

            let Classified { category, level } = node.classified.clone();
            let mut shape = FlatShape {
                source_id,
                category,
                level,
                style,
                subpaths,
                text,
                bbox: BBox::empty(),
            };
            shape.recompute_bbox();
            shapes.push(shape);
        }

        FlattenOutput {
            shapes,
            diagnostics,
        }
    }

    /// Bounding box of a subtree in the frame given by `inherited`
    pub fn subtree_bbox(&self, doc: &Document, start: NodeId, inherited: &Affine) -> Option<BBox> {
        let output = self.flatten_subtree(doc, start, inherited);
        let mut bbox = BBox::empty();
        for shape in &output.shapes {
            bbox = bbox.union(&shape.bbox);
        }
        if bbox.is_empty() {
            None
        } else {
            Some(bbox)
        }
    }
}

/// Resolve a node's geometry to local-frame subpaths
fn outline(kind: &NodeKind, tolerance: f64) -> Vec<Subpath> {
    match kind {
        NodeKind::Group | NodeKind::Other { .. } => Vec::new(),
        NodeKind::Path { segments } => flatten_segments(segments, tolerance),
        NodeKind::Rect {
            x,
            y,
            width,
            height,
        } => {
            if *width <= 0.0 || *height <= 0.0 {
                return Vec::new();
            }
            vec![Subpath::new(
                vec![
                    Point2::new(*x, *y),
                    Point2::new(x + width, *y),
                    Point2::new(x + width, y + height),
                    Point2::new(*x, y + height),
                ],
                true,
            )]
        }
        NodeKind::Circle { cx, cy, r } => ellipse_outline(*cx, *cy, *r, *r, tolerance),
        NodeKind::Ellipse { cx, cy, rx, ry } => ellipse_outline(*cx, *cy, *rx, *ry, tolerance),
        NodeKind::Polygon { points } => {
            if points.len() < 3 {
                return Vec::new();
            }
            vec![Subpath::new(points.clone(), true)]
        }
        NodeKind::Polyline { points } => {
            if points.len() < 2 {
                return Vec::new();
            }
            vec![Subpath::new(points.clone(), false)]
        }
        NodeKind::Text { x, y, .. } => {
            vec![Subpath::new(vec![Point2::new(*x, *y)], false)]
        }
    }
}

fn ellipse_outline(cx: f64, cy: f64, rx: f64, ry: f64, tolerance: f64) -> Vec<Subpath> {
    if rx <= 0.0 || ry <= 0.0 {
        return Vec::new();
    }
    let n = circle_steps(rx.max(ry), std::f64::consts::TAU, tolerance);
    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let angle = std::f64::consts::TAU * (i as f64) / (n as f64);
        points.push(Point2::new(cx + rx * angle.cos(), cy + ry * angle.sin()));
    }
    vec![Subpath::new(points, true)]
}

/// Number of chord steps so the sagitta stays below `tolerance`
fn circle_steps(radius: f64, sweep: f64, tolerance: f64) -> usize {
    if radius <= tolerance {
        return 8;
    }
    let max_step = 2.0 * (1.0 - tolerance / radius).clamp(-1.0, 1.0).acos();
    if max_step <= 0.0 {
        return 8;
    }
    ((sweep.abs() / max_step).ceil() as usize).clamp(8, 256)
}

fn flatten_segments(segments: &[PathSegment], tolerance: f64) -> Vec<Subpath> {
    let mut subpaths = Vec::new();
    let mut current: Vec<Point2> = Vec::new();
    let mut closed = false;
    let mut cur = Point2::default();

    let mut finish = |points: &mut Vec<Point2>, closed: bool, out: &mut Vec<Subpath>| {
        if points.len() >= 2 || (points.len() == 1 && closed) {
            out.push(Subpath::new(std::mem::take(points), closed));
        } else {
            points.clear();
        }
    };

    for seg in segments {
        match seg {
            PathSegment::MoveTo(p) => {
                finish(&mut current, closed, &mut subpaths);
                closed = false;
                current.push(*p);
                cur = *p;
            }
            PathSegment::LineTo(p) => {
                current.push(*p);
                cur = *p;
            }
            PathSegment::CubicTo(c1, c2, p) => {
                append_cubic(&mut current, cur, *c1, *c2, *p, tolerance);
                cur = *p;
            }
            PathSegment::QuadTo(c1, p) => {
                append_quad(&mut current, cur, *c1, *p, tolerance);
                cur = *p;
            }
            PathSegment::ArcTo {
                rx,
                ry,
                x_rotation,
                large_arc,
                sweep,
                to,
            } => {
                append_arc(
                    &mut current,
                    cur,
                    *rx,
                    *ry,
                    *x_rotation,
                    *large_arc,
                    *sweep,
                    *to,
                    tolerance,
                );
                cur = *to;
            }
            PathSegment::Close => {
                closed = true;
                finish(&mut current, closed, &mut subpaths);
                closed = false;
            }
        }
    }
    finish(&mut current, closed, &mut subpaths);
    subpaths
}

/// Subdivision count from control-net length and tolerance
fn curve_steps(net_length: f64, tolerance: f64) -> usize {
    if net_length <= tolerance {
        return 1;
    }
    ((net_length / tolerance).sqrt().ceil() as usize).clamp(1, 64)
}

fn append_cubic(
    out: &mut Vec<Point2>,
    p0: Point2,
    c1: Point2,
    c2: Point2,
    p1: Point2,
    tolerance: f64,
) {
    let net = p0.distance(&c1) + c1.distance(&c2) + c2.distance(&p1);
    let n = curve_steps(net, tolerance);
    for i in 1..=n {
        let t = i as f64 / n as f64;
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        out.push(Point2::new(
            a * p0.x + b * c1.x + c * c2.x + d * p1.x,
            a * p0.y + b * c1.y + c * c2.y + d * p1.y,
        ));
    }
}

fn append_quad(out: &mut Vec<Point2>, p0: Point2, c1: Point2, p1: Point2, tolerance: f64) {
    let net = p0.distance(&c1) + c1.distance(&p1);
    let n = curve_steps(net, tolerance);
    for i in 1..=n {
        let t = i as f64 / n as f64;
        let mt = 1.0 - t;
        let a = mt * mt;
        let b = 2.0 * mt * t;
        let c = t * t;
        out.push(Point2::new(
            a * p0.x + b * c1.x + c * p1.x,
            a * p0.y + b * c1.y + c * p1.y,
        ));
    }
}

/// Endpoint-parameterized elliptical arc, subdivided by sagitta bound
#[allow(clippy::too_many_arguments)]
fn append_arc(
    out: &mut Vec<Point2>,
    from: Point2,
    rx: f64,
    ry: f64,
    x_rotation_deg: f64,
    large_arc: bool,
    sweep: bool,
    to: Point2,
    tolerance: f64,
) {
    let mut rx = rx.abs();
    let mut ry = ry.abs();
    if rx < 1e-12 || ry < 1e-12 || from.distance(&to) < 1e-12 {
        out.push(to);
        return;
    }

    let phi = x_rotation_deg.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();

    // SVG implementation notes F.6.5: endpoint to center conversion
    let dx2 = (from.x - to.x) / 2.0;
    let dy2 = (from.y - to.y) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    // scale radii up when they cannot span the endpoints
    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
    let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
    let mut coef = if den.abs() < 1e-12 {
        0.0
    } else {
        (num / den).max(0.0).sqrt()
    };
    if large_arc == sweep {
        coef = -coef;
    }
    let cxp = coef * rx * y1p / ry;
    let cyp = -coef * ry * x1p / rx;

    let cx = cos_phi * cxp - sin_phi * cyp + (from.x + to.x) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (from.y + to.y) / 2.0;

    let angle = |ux: f64, uy: f64, vx: f64, vy: f64| -> f64 {
        let dot = ux * vx + uy * vy;
        let len = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
        let mut a = (dot / len).clamp(-1.0, 1.0).acos();
        if ux * vy - uy * vx < 0.0 {
            a = -a;
        }
        a
    };

    let theta1 = angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
    let mut dtheta = angle(
        (x1p - cxp) / rx,
        (y1p - cyp) / ry,
        (-x1p - cxp) / rx,
        (-y1p - cyp) / ry,
    );
    if !sweep && dtheta > 0.0 {
        dtheta -= std::f64::consts::TAU;
    } else if sweep && dtheta < 0.0 {
        dtheta += std::f64::consts::TAU;
    }

    let n = circle_steps(rx.max(ry), dtheta, tolerance).max(2);
    for i in 1..=n {
        let t = theta1 + dtheta * (i as f64) / (n as f64);
        let (sin_t, cos_t) = t.sin_cos();
        out.push(Point2::new(
            cx + rx * cos_t * cos_phi - ry * sin_t * sin_phi,
            cy + rx * cos_t * sin_phi + ry * sin_t * cos_phi,
        ));
    }
    // land exactly on the endpoint
    if let Some(last) = out.last_mut() {
        *last = to;
    }
}

/// Clip closed/open subpaths to an axis-aligned box
pub fn clip_subpaths(subpaths: &[Subpath], clip: &BBox) -> Vec<Subpath> {
    let mut out = Vec::new();
    for sub in subpaths {
        if sub.closed {
            let clipped = clip_polygon_to_box(&sub.points, clip);
            if clipped.len() >= 3 {
                out.push(Subpath::new(clipped, true));
            }
        } else {
            for run in clip_polyline_to_box(&sub.points, clip) {
                if run.len() >= 2 {
                    out.push(Subpath::new(run, false));
                }
            }
        }
    }
    out
}

/// Sutherland–Hodgman clip of a polygon against an axis-aligned box
pub fn clip_polygon_to_box(points: &[Point2], clip: &BBox) -> Vec<Point2> {
    #[derive(Clone, Copy)]
    enum Edge {
        Left(f64),
        Right(f64),
        Top(f64),
        Bottom(f64),
    }

    let inside = |e: Edge, p: Point2| -> bool {
        match e {
            Edge::Left(x) => p.x >= x,
            Edge::Right(x) => p.x <= x,
            Edge::Top(y) => p.y >= y,
            Edge::Bottom(y) => p.y <= y,
        }
    };
    let intersect = |e: Edge, a: Point2, b: Point2| -> Point2 {
        match e {
            Edge::Left(x) | Edge::Right(x) => {
                let t = (x - a.x) / (b.x - a.x);
                Point2::new(x, a.y + t * (b.y - a.y))
            }
            Edge::Top(y) | Edge::Bottom(y) => {
                let t = (y - a.y) / (b.y - a.y);
                Point2::new(a.x + t * (b.x - a.x), y)
            }
        }
    };

    let mut current = points.to_vec();
    for edge in [
        Edge::Left(clip.min.x),
        Edge::Right(clip.max.x),
        Edge::Top(clip.min.y),
        Edge::Bottom(clip.max.y),
    ] {
        if current.is_empty() {
            break;
        }
        let mut next = Vec::with_capacity(current.len() + 4);
        for i in 0..current.len() {
            let a = current[i];
            let b = current[(i + 1) % current.len()];
            let a_in = inside(edge, a);
            let b_in = inside(edge, b);
            if a_in {
                next.push(a);
                if !b_in {
                    next.push(intersect(edge, a, b));
                }
            } else if b_in {
                next.push(intersect(edge, a, b));
            }
        }
        current = next;
    }
    current
}

/// Clip an open polyline to a box, splitting into runs at the boundary
pub fn clip_polyline_to_box(points: &[Point2], clip: &BBox) -> Vec<Vec<Point2>> {
    let mut runs = Vec::new();
    let mut run: Vec<Point2> = Vec::new();

    let clamp_segment = |a: Point2, b: Point2| -> Option<(Point2, Point2)> {
        // Liang–Barsky parametric clip of segment a->b
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let mut t0 = 0.0f64;
        let mut t1 = 1.0f64;
        let checks = [
            (-dx, a.x - clip.min.x),
            (dx, clip.max.x - a.x),
            (-dy, a.y - clip.min.y),
            (dy, clip.max.y - a.y),
        ];
        for (p, q) in checks {
            if p.abs() < 1e-15 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    t0 = t0.max(r);
                } else {
                    t1 = t1.min(r);
                }
                if t0 > t1 {
                    return None;
                }
            }
        }
        Some((
            Point2::new(a.x + t0 * dx, a.y + t0 * dy),
            Point2::new(a.x + t1 * dx, a.y + t1 * dy),
        ))
    };

    for pair in points.windows(2) {
        match clamp_segment(pair[0], pair[1]) {
            Some((a, b)) => {
                if run.is_empty() {
                    run.push(a);
                } else if run.last().map(|l| l.distance(&a) > 1e-9).unwrap_or(true) {
                    runs.push(std::mem::take(&mut run));
                    run.push(a);
                }
                run.push(b);
            }
            None => {
                if !run.is_empty() {
                    runs.push(std::mem::take(&mut run));
                }
            }
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
    runs
}
