// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diagnostics collected during a conversion run
//!
//! Non-fatal skips (degenerate shapes, singular transforms, missing clip
//! references) are recorded here and returned beside the primary output,
//! so callers can assert on "N shapes skipped, 0 fatal errors".

/// What went wrong on a single element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Shape had zero-length or NaN geometry and was dropped
    DegenerateShape,
    /// Element transform was not invertible, shape skipped
    SingularTransform,
    /// A clip-path reference did not resolve; shape emitted unclipped
    UnresolvedClip,
    /// A node could not be interpreted and was skipped
    MalformedNode,
    /// Nesting exceeded the traversal depth guard
    DepthExceeded,
}

/// One recorded, recoverable incident
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Source element id (or "<anonymous>" when the element had none)
    pub source_id: String,
    pub message: String,
}

/// Ordered list of diagnostics for one run
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: DiagnosticKind, source_id: &str, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            kind,
            source_id: if source_id.is_empty() {
                "<anonymous>".to_string()
            } else {
                source_id.to_string()
            },
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count entries of one kind
    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Absorb diagnostics from a sub-stage
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let mut diags = Diagnostics::new();
        diags.record(DiagnosticKind::DegenerateShape, "p1", "zero-length");
        diags.record(DiagnosticKind::UnresolvedClip, "", "clip 'c9' missing");

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.count_of(DiagnosticKind::DegenerateShape), 1);
        assert_eq!(diags.entries()[1].source_id, "<anonymous>");
    }
}
