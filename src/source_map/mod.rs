//! Source maps between an original document and its synthetic document.
//!
//! A [`SourceMap`] is built once per lowering pass from the pass's complete
//! mapping list and never mutated afterwards; a newer pass produces a new map.
//! Both query directions may return several results because mappings overlap
//! (a quoted name has a gate mapping around an offset mapping) and a region may
//! be reached from more than one place in the synthetic text.

mod capabilities;
mod mapping;

pub use capabilities::{Capabilities, Capability};
pub use mapping::{Mapping, MappingMode, MappingTag};

use crate::base::TextRange;

/// A range produced by a source map query, with the mapping that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappedRange<'a> {
    pub range: TextRange,
    pub mapping: &'a Mapping,
}

/// The ordered mappings of one (original, synthetic) document pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceMap {
    mappings: Vec<Mapping>,
}

impl SourceMap {
    /// Create a source map from the mappings of one complete lowering pass.
    pub fn new(mappings: Vec<Mapping>) -> Self {
        debug_assert!(
            mappings
                .iter()
                .filter(|m| m.mode == MappingMode::Offset)
                .all(|m| m.original.len() == m.synthetic.len()),
            "offset mappings must have equal lengths"
        );
        Self { mappings }
    }

    /// All mappings in emission order.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Get the number of mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Check if the map has no mappings.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Map an original range to every synthetic range it corresponds to,
    /// considering only mappings that allow `capability`.
    pub fn to_synthetic(&self, range: TextRange, capability: Capability) -> Vec<MappedRange<'_>> {
        self.mappings
            .iter()
            .filter(|m| m.capabilities.allows(capability))
            .filter_map(|m| {
                Mapping::transfer(m.mode, m.original, m.synthetic, range)
                    .map(|range| MappedRange { range, mapping: m })
            })
            .collect()
    }

    /// Map a synthetic range to every original range it corresponds to,
    /// considering only mappings that allow `capability`.
    pub fn to_original(&self, range: TextRange, capability: Capability) -> Vec<MappedRange<'_>> {
        self.mappings
            .iter()
            .filter(|m| m.capabilities.allows(capability))
            .filter_map(|m| {
                Mapping::transfer(m.mode, m.synthetic, m.original, range)
                    .map(|range| MappedRange { range, mapping: m })
            })
            .collect()
    }

    /// The first original range a synthetic range maps to.
    pub fn first_original(&self, range: TextRange, capability: Capability) -> Option<MappedRange<'_>> {
        self.mappings
            .iter()
            .filter(|m| m.capabilities.allows(capability))
            .find_map(|m| {
                Mapping::transfer(m.mode, m.synthetic, m.original, range)
                    .map(|range| MappedRange { range, mapping: m })
            })
    }
}
