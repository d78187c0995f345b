// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Cartomesh Core
//!
//! Parsing and flattening for layered SVG map drawings, built with
//! [nom](https://docs.rs/nom) and [roxmltree](https://docs.rs/roxmltree).
//!
//! ## Overview
//!
//! This crate provides the document layer for cartomesh:
//!
//! - **SVG Ingestion**: XML parsing into an arena document tree
//! - **Path Grammar**: nom-based `d` attribute and `transform` parsers
//! - **Semantic Classification**: map categories derived from element ids
//! - **Flattening**: curve subdivision to global-frame polylines
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cartomesh_core::{parse_document, Flattener};
//!
//! let svg = std::fs::read_to_string("map.svg")?;
//! let parsed = parse_document(&svg)?;
//!
//! let output = Flattener::new().flatten(&parsed.document);
//! for shape in &output.shapes {
//!     println!("{} -> {:?}", shape.source_id, shape.category);
//! }
//! ```
//!
//! Recoverable problems (malformed shapes, unresolved clip references)
//! surface as [`Diagnostic`] entries instead of errors; only unparseable
//! XML aborts a run.

pub mod category;
pub mod diag;
pub mod document;
pub mod error;
pub mod flatten;
pub mod geom;
pub mod path_data;
pub mod style;
pub mod xml;

pub use category::{classify, object_name, Category, Classified, WellKind};
pub use diag::{Diagnostic, DiagnosticKind, Diagnostics};
pub use document::{Document, Node, NodeId, NodeKind};
pub use error::{Error, Result};
pub use flatten::{
    clip_polygon_to_box, clip_polyline_to_box, clip_subpaths, FlatShape, FlattenOptions,
    FlattenOutput, Flattener, Subpath,
};
pub use geom::{Affine, BBox, Point2};
pub use path_data::{parse_path, parse_transform, write_path, write_transform, PathSegment};
pub use style::Style;
pub use xml::{parse_document, ParsedDocument};
