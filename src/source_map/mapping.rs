//! A single original ⇄ synthetic range correspondence.

use crate::base::{TextRange, TextSize};

use super::Capabilities;

/// How sub-ranges of a mapping correspond.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MappingMode {
    /// Both ranges have the same length; offsets inside transfer linearly.
    Offset,
    /// Opaque ranges; only the whole range maps to the whole other range.
    Gate,
}

/// What a synthetic fragment represents, for post-filtering by consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MappingTag {
    /// A component or element tag name.
    ElementTag,
    /// A prop or attribute name.
    Prop,
}

/// A link between a range of the original document and a range of the
/// synthetic document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mapping {
    pub original: TextRange,
    pub synthetic: TextRange,
    pub mode: MappingMode,
    pub capabilities: Capabilities,
    pub tag: Option<MappingTag>,
}

impl Mapping {
    /// Transfer `range` from `from` to `to` according to `mode`.
    ///
    /// Offset mode accepts any range contained in `from` (bounds inclusive);
    /// gate mode only the exact range.
    pub(crate) fn transfer(
        mode: MappingMode,
        from: TextRange,
        to: TextRange,
        range: TextRange,
    ) -> Option<TextRange> {
        match mode {
            MappingMode::Offset => {
                if !from.contains_range(range) {
                    return None;
                }
                let start = to.start() + (range.start() - from.start());
                Some(TextRange::at(start, range.len()))
            }
            MappingMode::Gate => (range == from).then_some(to),
        }
    }

    /// Map a synthetic offset into the original document.
    pub fn original_offset(&self, synthetic: TextSize) -> Option<TextSize> {
        Self::transfer(
            self.mode,
            self.synthetic,
            self.original,
            TextRange::empty(synthetic),
        )
        .map(|r| r.start())
    }
}
