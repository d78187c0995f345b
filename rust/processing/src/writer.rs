// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SVG serialization
//!
//! Writes a document tree back to SVG text for the external rasterizer.
//! Ids, styles and unrecognized attributes come out exactly as parsed;
//! geometry is written from the typed node kinds.

use cartomesh_core::{write_path, write_transform, Document, Node, NodeId, NodeKind};

/// Serialize a document to SVG text
pub fn write_document(document: &Document) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\">\n");
    for &child in &document.node(document.root).children {
        write_node(document, child, 1, &mut out);
    }
    out.push_str("</svg>\n");
    out
}

fn write_node(document: &Document, id: NodeId, depth: usize, out: &mut String) {
    let node = document.node(id);
    let tag = node.kind.tag_name();

    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push('<');
    out.push_str(tag);
    write_attrs(node, out);

    match &node.kind {
        NodeKind::Text { content, .. } => {
            out.push('>');
            out.push_str(&escape(content));
            out.push_str("</");
            out.push_str(tag);
            out.push_str(">\n");
        }
        _ if node.children.is_empty() => {
            out.push_str("/>\n");
        }
        _ => {
            out.push_str(">\n");
            for &child in &node.children {
                write_node(document, child, depth + 1, out);
            }
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str("</");
            out.push_str(tag);
            out.push_str(">\n");
        }
    }
}

fn write_attrs(node: &Node, out: &mut String) {
    if let Some(id) = &node.id {
        push_attr(out, "id", id);
    }
    // labels re-serialize from attrs under their source spelling

    match &node.kind {
        NodeKind::Path { segments } => push_attr(out, "d", &write_path(segments)),
        NodeKind::Rect {
            x,
            y,
            width,
            height,
        } => {
            push_attr(out, "x", &fmt(*x));
            push_attr(out, "y", &fmt(*y));
            push_attr(out, "width", &fmt(*width));
            push_attr(out, "height", &fmt(*height));
        }
        NodeKind::Circle { cx, cy, r } => {
            push_attr(out, "cx", &fmt(*cx));
            push_attr(out, "cy", &fmt(*cy));
            push_attr(out, "r", &fmt(*r));
        }
        NodeKind::Ellipse { cx, cy, rx, ry } => {
            push_attr(out, "cx", &fmt(*cx));
            push_attr(out, "cy", &fmt(*cy));
            push_attr(out, "rx", &fmt(*rx));
            push_attr(out, "ry", &fmt(*ry));
        }
        NodeKind::Polygon { points } | NodeKind::Polyline { points } => {
            let value = points
                .iter()
                .map(|p| format!("{},{}", fmt(p.x), fmt(p.y)))
                .collect::<Vec<_>>()
                .join(" ");
            push_attr(out, "points", &value);
        }
        NodeKind::Text { x, y, .. } => {
            push_attr(out, "x", &fmt(*x));
            push_attr(out, "y", &fmt(*y));
        }
        NodeKind::Group | NodeKind::Other { .. } => {}
    }

    if !node.transform.is_identity() {
        push_attr(out, "transform", &write_transform(&node.transform));
    }
    if !node.style.is_empty() {
        push_attr(out, "style", &node.style.to_attr());
    }
    if let Some(clip) = &node.clip_ref {
        push_attr(out, "clip-path", &format!("url(#{clip})"));
    }
    for (name, value) in &node.attrs {
        push_attr(out, name, value);
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

/// Trim trailing zeros off a formatted coordinate
fn fmt(v: f64) -> String {
    let mut s = format!("{v:.6}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
