//! Occurrence-counting offset mapper between dialect text and its markup.
//!
//! The markup generated from a dialect document is a reformatted document
//! with no parse-tree correspondence to its source; only literal text
//! survives the round trip. The mapper therefore answers "where in the
//! dialect text did the text at this markup offset come from?" by counting
//! occurrences: the i-th occurrence of a needle in the markup corresponds to
//! the i-th occurrence in the dialect text.
//!
//! This is a heuristic. A needle that occurs a different number of times in
//! the two texts is ambiguous and never maps, and in templates where many
//! elements share an attribute name or a boilerplate expression that is the
//! common case, not the exception. Callers must treat `None` as an ordinary
//! answer and fall back (keep the existing indentation, drop the mapping).

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use crate::base::TextSize;
use crate::markup::blank_end_tags;

/// Maps markup offsets of literal needles back to dialect offsets.
pub struct OffsetMapper {
    original: Box<str>,
    /// The generated markup with every end tag blanked out.
    generated: Box<str>,
    occurrences: Mutex<FxHashMap<SmolStr, Arc<Occurrences>>>,
}

/// Start offsets of one needle in both texts, ascending.
#[derive(Debug)]
struct Occurrences {
    generated: Vec<TextSize>,
    original: Vec<TextSize>,
}

impl OffsetMapper {
    /// Build a mapper for `generated`, which was produced from `original`.
    ///
    /// End tags in `generated` have no counterpart in the dialect text and
    /// are blanked before any lookup.
    pub fn new(original: &str, generated: &str) -> Self {
        Self {
            original: original.into(),
            generated: blank_end_tags(generated).into_boxed_str(),
            occurrences: Mutex::new(FxHashMap::default()),
        }
    }

    /// The dialect offset of the occurrence of `needle` that starts exactly at
    /// `generated_offset` in the markup.
    ///
    /// Returns `None` when the needle is empty, when its occurrence counts in
    /// the two texts differ, or when no occurrence starts at the offset.
    pub fn map(&self, needle: &str, generated_offset: TextSize) -> Option<TextSize> {
        if needle.is_empty() {
            return None;
        }

        let occurrences = self.occurrences(needle);
        if occurrences.generated.len() != occurrences.original.len() {
            trace!(
                needle,
                generated = occurrences.generated.len(),
                original = occurrences.original.len(),
                "ambiguous needle"
            );
            return None;
        }

        let index = occurrences.generated.binary_search(&generated_offset).ok()?;
        occurrences.original.get(index).copied()
    }

    fn occurrences(&self, needle: &str) -> Arc<Occurrences> {
        let mut cache = self.occurrences.lock();
        if let Some(found) = cache.get(needle) {
            return Arc::clone(found);
        }
        let found = Arc::new(Occurrences {
            generated: match_offsets(&self.generated, needle),
            original: match_offsets(&self.original, needle),
        });
        cache.insert(SmolStr::new(needle), Arc::clone(&found));
        found
    }
}

impl std::fmt::Debug for OffsetMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetMapper")
            .field("original_len", &self.original.len())
            .field("generated_len", &self.generated.len())
            .field("cached_needles", &self.occurrences.lock().len())
            .finish()
    }
}

/// Start offsets of the non-overlapping literal occurrences of `needle`.
///
/// The needle is matched as an exact character sequence, never as a pattern.
fn match_offsets(haystack: &str, needle: &str) -> Vec<TextSize> {
    haystack
        .match_indices(needle)
        .map(|(offset, _)| TextSize::from(offset as u32))
        .collect()
}
