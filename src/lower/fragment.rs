//! Synthetic text builder.

use crate::base::{TextRange, TextSize};
use crate::source_map::{Capabilities, Mapping, MappingMode, MappingTag};

/// A piece of synthetic text together with the mappings that point into it.
///
/// Synthetic ranges are relative to the fragment; [`Fragment::append`] shifts
/// them when fragments are composed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fragment {
    text: String,
    mappings: Vec<Mapping>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn into_parts(self) -> (String, Vec<Mapping>) {
        (self.text, self.mappings)
    }

    fn end(&self) -> TextSize {
        TextSize::of(self.text.as_str())
    }

    /// Append unmapped text.
    pub fn write(&mut self, code: &str) {
        self.text.push_str(code);
    }

    /// Record mappings for `len` bytes starting at the current end, without
    /// writing anything. The text is expected to be written next.
    ///
    /// An `Offset` request whose original range differs in length is
    /// recorded as `Gate`.
    pub fn map_ahead(
        &mut self,
        len: TextSize,
        originals: &[TextRange],
        mode: MappingMode,
        capabilities: Capabilities,
        tag: Option<MappingTag>,
    ) {
        let synthetic = TextRange::at(self.end(), len);
        for &original in originals {
            let mode = match mode {
                MappingMode::Offset if original.len() != len => MappingMode::Gate,
                mode => mode,
            };
            self.mappings.push(Mapping {
                original,
                synthetic,
                mode,
                capabilities,
                tag,
            });
        }
    }

    /// Write `code` mapped to each of `originals`.
    pub fn mapped(
        &mut self,
        code: &str,
        originals: &[TextRange],
        mode: MappingMode,
        capabilities: Capabilities,
        tag: Option<MappingTag>,
    ) {
        self.map_ahead(TextSize::of(code), originals, mode, capabilities, tag);
        self.write(code);
    }

    /// Write `'code'`: the quoted text is gated to `originals`, the inner
    /// text offset-mapped to them.
    pub fn quoted(
        &mut self,
        code: &str,
        originals: &[TextRange],
        capabilities: Capabilities,
        tag: Option<MappingTag>,
    ) {
        let quoted_len = TextSize::of(code) + TextSize::of("''");
        self.map_ahead(quoted_len, originals, MappingMode::Gate, capabilities, tag);
        self.write("'");
        self.mapped(code, originals, MappingMode::Offset, capabilities, tag);
        self.write("'");
    }

    /// Append `other`, shifting its mappings past the current end.
    pub fn append(&mut self, other: Fragment) {
        let shift = self.end();
        self.mappings
            .extend(other.mappings.into_iter().map(|mapping| Mapping {
                synthetic: mapping.synthetic + shift,
                ..mapping
            }));
        self.text.push_str(&other.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(start.into(), end.into())
    }

    #[test]
    fn test_quoted_records_gate_and_offset() {
        let mut fragment = Fragment::new();
        fragment.write("x[");
        fragment.quoted("id", &[range(5, 7)], Capabilities::HTML_TAG_OR_ATTR, None);
        fragment.write("]");

        assert_eq!(fragment.text(), "x['id']");
        let mappings = fragment.mappings();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].mode, MappingMode::Gate);
        assert_eq!(mappings[0].synthetic, range(2, 6));
        assert_eq!(mappings[1].mode, MappingMode::Offset);
        assert_eq!(mappings[1].synthetic, range(3, 5));
        assert_eq!(mappings[1].original, range(5, 7));
    }

    #[test]
    fn test_length_mismatch_becomes_gate() {
        let mut fragment = Fragment::new();
        fragment.mapped(
            "userName",
            &[range(0, 9)],
            MappingMode::Offset,
            Capabilities::ALL,
            None,
        );
        assert_eq!(fragment.mappings()[0].mode, MappingMode::Gate);
    }

    #[test]
    fn test_append_shifts_mappings() {
        let mut child = Fragment::new();
        child.mapped("a", &[range(0, 1)], MappingMode::Offset, Capabilities::ALL, None);

        let mut parent = Fragment::new();
        parent.write("{\n");
        parent.append(child);

        assert_eq!(parent.text(), "{\na");
        assert_eq!(parent.mappings()[0].synthetic, range(2, 3));
    }

    #[test]
    fn test_no_originals_no_mappings() {
        let mut fragment = Fragment::new();
        fragment.quoted("tag", &[], Capabilities::ALL, None);
        assert_eq!(fragment.text(), "'tag'");
        assert!(fragment.mappings().is_empty());
    }
}
