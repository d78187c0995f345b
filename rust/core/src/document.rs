// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory document tree
//!
//! Nodes live in one arena vector and reference children by index, so a
//! rewritten variant is a plain `clone` plus targeted edits. Element ids
//! and unrecognized attributes are preserved bit-exactly; the semantic
//! naming convention rides on them.

use rustc_hash::FxHashMap;

use crate::category::{classify, Classified};
use crate::geom::{Affine, Point2};
use crate::path_data::PathSegment;
use crate::style::Style;

/// Index of a node in the document arena
pub type NodeId = usize;

/// Geometry payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Path { segments: Vec<PathSegment> },
    Rect { x: f64, y: f64, width: f64, height: f64 },
    Circle { cx: f64, cy: f64, r: f64 },
    Ellipse { cx: f64, cy: f64, rx: f64, ry: f64 },
    Polygon { points: Vec<Point2> },
    Polyline { points: Vec<Point2> },
    Text { x: f64, y: f64, content: String },
    /// Unhandled element kept for round-tripping
    Other { tag: String },
}

impl NodeKind {
    /// SVG tag name for serialization
    pub fn tag_name(&self) -> &str {
        match self {
            NodeKind::Group => "g",
            NodeKind::Path { .. } => "path",
            NodeKind::Rect { .. } => "rect",
            NodeKind::Circle { .. } => "circle",
            NodeKind::Ellipse { .. } => "ellipse",
            NodeKind::Polygon { .. } => "polygon",
            NodeKind::Polyline { .. } => "polyline",
            NodeKind::Text { .. } => "text",
            NodeKind::Other { tag } => tag,
        }
    }
}

/// One element of the document tree
#[derive(Debug, Clone)]
pub struct Node {
    pub id: Option<String>,
    /// Layer label (e.g. Inkscape's `inkscape:label`)
    pub label: Option<String>,
    pub kind: NodeKind,
    /// Local transform; identity when the attribute was absent
    pub transform: Affine,
    pub style: Style,
    /// Weak clip-path reference: id lookup into the clip registry
    pub clip_ref: Option<String>,
    /// Unrecognized attributes, preserved verbatim and in order
    pub attrs: Vec<(String, String)>,
    pub children: Vec<NodeId>,
    /// Semantic classification, resolved once at parse time
    pub classified: Classified,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: None,
            label: None,
            kind,
            transform: Affine::identity(),
            style: Style::new(),
            clip_ref: None,
            attrs: Vec::new(),
            children: Vec::new(),
            classified: classify(""),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.classified = classify(&id);
        self.id = Some(id);
        self
    }

    /// The identifier driving semantics: id first, layer label second
    pub fn semantic_id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.label.as_deref())
            .unwrap_or("")
    }

    /// Re-classify after the id or label changed
    pub fn reclassify(&mut self) {
        self.classified = classify(self.semantic_id());
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group)
    }
}

/// Arena document with a clip-path registry
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    pub root: NodeId,
    clip_paths: FxHashMap<String, NodeId>,
}

impl Document {
    /// Create a document with an empty root group
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Group)],
            root: 0,
            clip_paths: FxHashMap::default(),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node under `parent`, returning its id
    pub fn add_node(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    /// Add a node without attaching it to a parent (clip definitions)
    pub fn add_detached(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// Unlink a child from a parent; the node stays in the arena
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.retain(|&c| c != child);
    }

    pub fn register_clip_path(&mut self, id: impl Into<String>, node: NodeId) {
        self.clip_paths.insert(id.into(), node);
    }

    /// Resolve a clip-path id; `None` degrades to pass-through upstream
    pub fn resolve_clip(&self, id: &str) -> Option<NodeId> {
        self.clip_paths.get(id).copied()
    }

    pub fn clip_ids(&self) -> impl Iterator<Item = &str> {
        self.clip_paths.keys().map(|s| s.as_str())
    }

    /// Find a node by element id (linear scan; documents are small)
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.id.as_deref() == Some(id))
    }

    /// Top-level groups, i.e. map layers
    pub fn layers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[self.root]
            .children
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].is_group())
    }

    /// Depth-first iteration over a subtree (preorder)
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    #[test]
    fn test_build_and_walk() {
        let mut doc = Document::new();
        let layer = doc.add_node(Node::new(NodeKind::Group).with_id("layer1"), doc.root);
        let wall = doc.add_node(
            Node::new(NodeKind::Rect {
                x: 0.0,
                y: 0.0,
                width: 5.0,
                height: 5.0,
            })
            .with_id("wall_a"),
            layer,
        );

        assert_eq!(doc.node(wall).classified.category, Category::Wall);
        assert_eq!(doc.layers().collect::<Vec<_>>(), vec![layer]);

        let order = doc.descendants(doc.root);
        assert_eq!(order, vec![doc.root, layer, wall]);
    }

    #[test]
    fn test_clip_registry() {
        let mut doc = Document::new();
        let clip = doc.add_detached(Node::new(NodeKind::Rect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }));
        doc.register_clip_path("clipA", clip);
        assert_eq!(doc.resolve_clip("clipA"), Some(clip));
        assert_eq!(doc.resolve_clip("missing"), None);
    }

    #[test]
    fn test_remove_child() {
        let mut doc = Document::new();
        let a = doc.add_node(Node::new(NodeKind::Group), doc.root);
        let b = doc.add_node(Node::new(NodeKind::Group), doc.root);
        doc.remove_child(doc.root, a);
        assert_eq!(doc.node(doc.root).children, vec![b]);
    }
}
