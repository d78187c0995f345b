// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Style maps and CSS-like inheritance
//!
//! A style is an ordered `property -> value` map parsed from the SVG
//! `style` attribute. Insertion order is preserved so a rewritten
//! document round-trips with minimal churn.

/// Properties that flow from ancestors to children when unset
const INHERITABLE: &[&str] = &[
    "fill",
    "stroke",
    "stroke-width",
    "opacity",
    "fill-opacity",
    "stroke-opacity",
    "font-size",
    "font-family",
    "color",
];

use smallvec::SmallVec;

/// Ordered style property map
///
/// Real-world style attributes rarely carry more than a handful of
/// declarations, so entries live inline up to that point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    entries: SmallVec<[(String, String); 8]>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `fill:#fff;stroke:none` declarations; malformed items are skipped
    pub fn parse(text: &str) -> Self {
        let mut style = Style::new();
        for item in text.split(';') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            if let Some((key, value)) = item.split_once(':') {
                style.set(key.trim(), value.trim());
            }
        }
        style
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.to_string();
        } else {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize back to a `style` attribute value
    pub fn to_attr(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Resolve against an already-resolved parent style
    ///
    /// Unset inheritable properties take the parent's value; an explicit
    /// `inherit` token resolves up; any other explicit value (including
    /// `none`) is honored as-is.
    pub fn resolved(&self, parent: &Style) -> Style {
        let mut out = Style::new();
        for key in INHERITABLE {
            match self.get(key) {
                Some("inherit") | None => {
                    if let Some(value) = parent.get(key) {
                        out.set(key, value);
                    }
                }
                Some(value) => out.set(key, value),
            }
        }
        // non-inheritable own properties are kept verbatim
        for (key, value) in self.iter() {
            if !INHERITABLE.contains(&key) {
                out.set(key, value);
            }
        }
        out
    }

    /// Stroke width in document units, when present and parseable
    pub fn stroke_width(&self) -> Option<f64> {
        let raw = self.get("stroke-width")?;
        let digits = raw.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
        fast_float::parse(digits).ok()
    }

    /// A parseable float property, used for per-item extrusion heights
    pub fn float_property(&self, key: &str) -> Option<f64> {
        fast_float::parse(self.get(key)?).ok()
    }

    pub fn display_none(&self) -> bool {
        self.get("display") == Some("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_roundtrip() {
        let style = Style::parse("fill:#ff0000; stroke:none;stroke-width:0.5");
        assert_eq!(style.get("fill"), Some("#ff0000"));
        assert_eq!(style.get("stroke"), Some("none"));
        assert_eq!(style.stroke_width(), Some(0.5));
        assert_eq!(style.to_attr(), "fill:#ff0000;stroke:none;stroke-width:0.5");
    }

    #[test]
    fn test_inheritance() {
        let parent = Style::parse("fill:#123456;stroke:#000000;opacity:0.8");
        let child = Style::parse("stroke:none;d-custom:1");
        let resolved = child.resolved(&parent);

        // unset inherits
        assert_eq!(resolved.get("fill"), Some("#123456"));
        assert_eq!(resolved.get("opacity"), Some("0.8"));
        // explicit none is honored
        assert_eq!(resolved.get("stroke"), Some("none"));
        // non-inheritable own property kept
        assert_eq!(resolved.get("d-custom"), Some("1"));
    }

    #[test]
    fn test_explicit_inherit_token() {
        let parent = Style::parse("fill:#aabbcc");
        let child = Style::parse("fill:inherit");
        assert_eq!(child.resolved(&parent).get("fill"), Some("#aabbcc"));
    }

    #[test]
    fn test_stroke_width_units() {
        let style = Style::parse("stroke-width:2.5px");
        assert_eq!(style.stroke_width(), Some(2.5));
    }
}
