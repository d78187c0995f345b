// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SVG ingestion built on roxmltree
//!
//! Builds the [`Document`] arena from XML text. Malformed elements are
//! skipped with a diagnostic, never fatal; only unparseable XML aborts.
//! Unknown attributes and id prefixes pass through inert so a rewritten
//! document round-trips.

use crate::diag::{DiagnosticKind, Diagnostics};
use crate::document::{Document, Node, NodeId, NodeKind};
use crate::error::Result;
use crate::geom::Point2;
use crate::path_data::{parse_path, parse_transform};
use crate::style::Style;

/// Attributes interpreted structurally; everything else is preserved raw
const HANDLED_ATTRS: &[&str] = &[
    "id", "label", "transform", "style", "clip-path", "d", "x", "y", "width", "height", "cx",
    "cy", "r", "rx", "ry", "points",
];

/// Presentation attributes folded into the style map when the `style`
/// attribute does not already set them (the style attribute wins)
const PRESENTATION_ATTRS: &[&str] = &[
    "fill",
    "stroke",
    "stroke-width",
    "opacity",
    "fill-opacity",
    "stroke-opacity",
    "display",
    "font-size",
    "font-family",
];

/// Result of parsing one source document
#[derive(Debug)]
pub struct ParsedDocument {
    pub document: Document,
    pub diagnostics: Diagnostics,
}

/// Parse SVG text into a document tree
pub fn parse_document(text: &str) -> Result<ParsedDocument> {
    let xml = roxmltree::Document::parse(text)?;
    let mut document = Document::new();
    let mut diagnostics = Diagnostics::new();

    let root = document.root;
    for child in xml.root_element().children() {
        if child.is_element() {
            convert_element(&child, &mut document, root, &mut diagnostics, false);
        }
    }

    Ok(ParsedDocument {
        document,
        diagnostics,
    })
}

fn convert_element(
    elem: &roxmltree::Node,
    document: &mut Document,
    parent: NodeId,
    diagnostics: &mut Diagnostics,
    detached: bool,
) -> Option<NodeId> {
    let tag = elem.tag_name().name();
    let elem_id = elem.attribute("id").unwrap_or("");

    // clip definitions register their first shape child and stay out of
    // the rendered tree
    if tag == "clipPath" {
        let node_id = convert_container(elem, document, diagnostics, NodeKind::Group);
        if !elem_id.is_empty() {
            document.register_clip_path(elem_id, node_id);
        }
        return None;
    }
    if tag == "defs" {
        for child in elem.children() {
            if child.is_element() {
                convert_element(&child, document, parent, diagnostics, true);
            }
        }
        return None;
    }

    let kind = match shape_kind(elem, tag) {
        Ok(kind) => kind,
        Err(message) => {
            diagnostics.record(DiagnosticKind::MalformedNode, elem_id, message);
            return None;
        }
    };

    let mut node = Node::new(kind);
    fill_common_attrs(elem, &mut node, diagnostics);

    let node_id = if detached {
        document.add_detached(node)
    } else {
        document.add_node(node, parent)
    };
    if detached && !elem_id.is_empty() {
        // defs content is addressable as a clip source too
        document.register_clip_path(elem_id, node_id);
    }

    for child in elem.children() {
        if child.is_element() {
            convert_element(&child, document, node_id, diagnostics, false);
        }
    }
    Some(node_id)
}

/// Build a detached group from a container element's shape children
fn convert_container(
    elem: &roxmltree::Node,
    document: &mut Document,
    diagnostics: &mut Diagnostics,
    kind: NodeKind,
) -> NodeId {
    let mut node = Node::new(kind);
    fill_common_attrs(elem, &mut node, diagnostics);
    let node_id = document.add_detached(node);
    for child in elem.children() {
        if child.is_element() {
            if let Some(child_id) = convert_element(&child, document, node_id, diagnostics, true) {
                // re-parent under the container
                if !document.node(node_id).children.contains(&child_id) {
                    document.node_mut(node_id).children.push(child_id);
                }
            }
        }
    }
    node_id
}

fn shape_kind(elem: &roxmltree::Node, tag: &str) -> std::result::Result<NodeKind, String> {
    match tag {
        "g" | "svg" => Ok(NodeKind::Group),
        "path" => {
            let d = elem.attribute("d").unwrap_or("");
            let segments = parse_path(d).map_err(|e| format!("bad path data: {e}"))?;
            Ok(NodeKind::Path { segments })
        }
        "rect" => Ok(NodeKind::Rect {
            x: float_attr(elem, "x")?,
            y: float_attr(elem, "y")?,
            width: float_attr(elem, "width")?,
            height: float_attr(elem, "height")?,
        }),
        "circle" => Ok(NodeKind::Circle {
            cx: float_attr(elem, "cx")?,
            cy: float_attr(elem, "cy")?,
            r: float_attr(elem, "r")?,
        }),
        "ellipse" => Ok(NodeKind::Ellipse {
            cx: float_attr(elem, "cx")?,
            cy: float_attr(elem, "cy")?,
            rx: float_attr(elem, "rx")?,
            ry: float_attr(elem, "ry")?,
        }),
        "polygon" => Ok(NodeKind::Polygon {
            points: parse_points(elem.attribute("points").unwrap_or(""))?,
        }),
        "polyline" => Ok(NodeKind::Polyline {
            points: parse_points(elem.attribute("points").unwrap_or(""))?,
        }),
        "text" => Ok(NodeKind::Text {
            x: float_attr(elem, "x").unwrap_or(0.0),
            y: float_attr(elem, "y").unwrap_or(0.0),
            content: text_content(elem),
        }),
        other => Ok(NodeKind::Other {
            tag: other.to_string(),
        }),
    }
}

fn fill_common_attrs(elem: &roxmltree::Node, node: &mut Node, diagnostics: &mut Diagnostics) {
    let elem_id = elem.attribute("id").unwrap_or("");

    for attr in elem.attributes() {
        let name = attr.name();
        match name {
            "id" => node.id = Some(attr.value().to_string()),
            // namespaced labels (inkscape:label) resolve to local "label"
            // for layer semantics; the source spelling is kept in attrs
            // so the written document matches the input
            "label" => {
                node.label = Some(attr.value().to_string());
                push_raw_attr(elem, &attr, &mut node.attrs);
            }
            "transform" => match parse_transform(attr.value()) {
                Ok(trans) => node.transform = trans,
                Err(e) => {
                    diagnostics.record(
                        DiagnosticKind::MalformedNode,
                        elem_id,
                        format!("bad transform: {e}"),
                    );
                }
            },
            "style" => node.style = Style::parse(attr.value()),
            "clip-path" => node.clip_ref = parse_clip_ref(attr.value()),
            _ if HANDLED_ATTRS.contains(&name) => {
                // geometry attrs are consumed by the tags that parse
                // them; unrecognized elements keep theirs verbatim
                if matches!(node.kind, NodeKind::Other { .. }) {
                    node.attrs.push((name.to_string(), attr.value().to_string()));
                }
            }
            _ if PRESENTATION_ATTRS.contains(&name) => {
                // stash raw; merged after the style attribute below
                node.attrs.push((name.to_string(), attr.value().to_string()));
            }
            _ => push_raw_attr(elem, &attr, &mut node.attrs),
        }
    }

    // presentation attributes lose to the style attribute
    let mut kept = Vec::new();
    for (name, value) in node.attrs.drain(..) {
        if PRESENTATION_ATTRS.contains(&name.as_str()) {
            if node.style.get(&name).is_none() {
                node.style.set(&name, &value);
            }
        } else {
            kept.push((name, value));
        }
    }
    node.attrs = kept;

    node.reclassify();
}

/// Preserve an attribute under its source spelling
///
/// Namespaced attributes keep their `prefix:name` form, and the
/// namespace is re-declared on this node so the written document
/// parses standalone even when the declaration sat on an ancestor.
fn push_raw_attr(
    elem: &roxmltree::Node,
    attr: &roxmltree::Attribute,
    attrs: &mut Vec<(String, String)>,
) {
    let name = attr.name();
    let qualified = match attr.namespace() {
        Some(ns) => match elem.lookup_prefix(ns) {
            Some(prefix) => {
                let decl = format!("xmlns:{prefix}");
                if !attrs.iter().any(|(existing, _)| *existing == decl) {
                    attrs.push((decl, ns.to_string()));
                }
                format!("{prefix}:{name}")
            }
            None => name.to_string(),
        },
        None => name.to_string(),
    };
    attrs.push((qualified, attr.value().to_string()));
}

fn parse_clip_ref(value: &str) -> Option<String> {
    let value = value.trim();
    let inner = value.strip_prefix("url(")?.strip_suffix(')')?;
    Some(inner.trim().trim_start_matches('#').to_string())
}

fn float_attr(elem: &roxmltree::Node, name: &str) -> std::result::Result<f64, String> {
    match elem.attribute(name) {
        Some(raw) => {
            let digits = raw.trim().trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
            fast_float::parse(digits).map_err(|_| format!("bad float in '{name}': '{raw}'"))
        }
        None => Err(format!("missing attribute '{name}'")),
    }
}

fn parse_points(value: &str) -> std::result::Result<Vec<Point2>, String> {
    let mut coords = Vec::new();
    for item in value.split(|c: char| c.is_whitespace() || c == ',') {
        if item.is_empty() {
            continue;
        }
        let v: f64 = fast_float::parse(item).map_err(|_| format!("bad coordinate '{item}'"))?;
        coords.push(v);
    }
    if coords.len() % 2 != 0 {
        return Err("odd number of point coordinates".to_string());
    }
    Ok(coords
        .chunks_exact(2)
        .map(|c| Point2::new(c[0], c[1]))
        .collect())
}

fn text_content(elem: &roxmltree::Node) -> String {
    let mut out = String::new();
    for child in elem.descendants() {
        if let Some(text) = child.text() {
            out.push_str(text);
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    const DOC: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
  <defs>
    <clipPath id="clip1"><rect x="0" y="0" width="50" height="50"/></clipPath>
  </defs>
  <g id="layer1" transform="translate(10,0)" custom:tag="kept" xmlns:custom="urn:x">
    <rect id="floor_room1" x="0" y="0" width="10" height="10" style="fill:#808080"/>
    <path id="wall_a" d="M 0 0 L 10 0" stroke="#000000"/>
    <text id="text_label" x="3" y="4">Room 1</text>
  </g>
</svg>"##;

    #[test]
    fn test_parse_structure() {
        let parsed = parse_document(DOC).unwrap();
        let doc = &parsed.document;
        assert!(parsed.diagnostics.is_empty());

        let layers: Vec<_> = doc.layers().collect();
        assert_eq!(layers.len(), 1);
        let layer = doc.node(layers[0]);
        assert_eq!(layer.id.as_deref(), Some("layer1"));
        assert_eq!(layer.transform.e, 10.0);
        assert_eq!(layer.children.len(), 3);
        // unknown attribute preserved verbatim
        assert!(layer.attrs.iter().any(|(_, v)| v == "kept"));
    }

    #[test]
    fn test_semantic_classification_happens_at_parse() {
        let parsed = parse_document(DOC).unwrap();
        let doc = &parsed.document;
        let floor = doc.find_by_id("floor_room1").unwrap();
        assert_eq!(doc.node(floor).classified.category, Category::Floor);
        let wall = doc.find_by_id("wall_a").unwrap();
        assert_eq!(doc.node(wall).classified.category, Category::Wall);
    }

    #[test]
    fn test_presentation_attr_folds_into_style() {
        let parsed = parse_document(DOC).unwrap();
        let doc = &parsed.document;
        let wall = doc.find_by_id("wall_a").unwrap();
        assert_eq!(doc.node(wall).style.get("stroke"), Some("#000000"));
    }

    #[test]
    fn test_clip_registry_populated() {
        let parsed = parse_document(DOC).unwrap();
        assert!(parsed.document.resolve_clip("clip1").is_some());
    }

    #[test]
    fn test_text_content() {
        let parsed = parse_document(DOC).unwrap();
        let doc = &parsed.document;
        let text = doc.find_by_id("text_label").unwrap();
        match &doc.node(text).kind {
            NodeKind::Text { content, .. } => assert_eq!(content, "Room 1"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_element_keeps_geometry_attrs() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><image id="bg" x="5" y="6" width="7" height="8" href="map.png"/></svg>"#;
        let parsed = parse_document(svg).unwrap();
        let node = parsed.document.node(parsed.document.find_by_id("bg").unwrap());
        for (name, value) in [("x", "5"), ("y", "6"), ("width", "7"), ("height", "8"), ("href", "map.png")] {
            assert!(
                node.attrs.iter().any(|(n, v)| n == name && v == value),
                "missing {name}={value}"
            );
        }
    }

    #[test]
    fn test_namespaced_label_keeps_source_spelling() {
        let parsed = parse_document(DOC2).unwrap();
        let doc = &parsed.document;
        let layer = doc.node(doc.find_by_id("layer1").unwrap());
        assert_eq!(layer.label.as_deref(), Some("walls_inf"));
        assert!(layer
            .attrs
            .iter()
            .any(|(n, v)| n == "inkscape:label" && v == "walls_inf"));
        // the namespace comes along so the output parses standalone
        assert!(layer.attrs.iter().any(|(n, _)| n == "xmlns:inkscape"));
    }

    const DOC2: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">
  <g id="layer1" inkscape:label="walls_inf"/>
</svg>"##;

    #[test]
    fn test_malformed_shape_is_skipped_not_fatal() {
        let bad = r#"<svg><rect id="floor_x" x="a" y="0" width="1" height="1"/></svg>"#;
        let parsed = parse_document(bad).unwrap();
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(
            parsed.diagnostics.entries()[0].kind,
            DiagnosticKind::MalformedNode
        );
    }
}
