//! The external analyzer seam.
//!
//! The session never type-checks anything itself. It hands synthetic
//! documents to an [`ExternalAnalyzer`] (a language service running in
//! another process, or a test double) and translates the answers back.

use std::sync::Arc;

use crate::base::{DocumentId, TextRange, TextSize};

use super::diagnostics::Diagnostic;

/// A range in some document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: DocumentId,
    pub range: TextRange,
}

impl Location {
    pub fn new(file: DocumentId, range: TextRange) -> Self {
        Self { file, range }
    }
}

/// One classified span in synthetic coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifiedSpan {
    pub range: TextRange,
    /// Either an encoded `(type + 1) << offset | modifiers` value or, for
    /// values that fit below the offset, a plain classification kind.
    pub classification: u32,
}

/// Bit layout of encoded classifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenEncoding {
    pub type_offset: u32,
    pub modifier_mask: u32,
}

impl Default for TokenEncoding {
    fn default() -> Self {
        Self {
            type_offset: 8,
            modifier_mask: (1 << 8) - 1,
        }
    }
}

/// Requests the session issues against synthetic documents.
///
/// Offsets in arguments and results are synthetic-document offsets, except
/// for results located in documents that are not virtual.
pub trait ExternalAnalyzer: Send + Sync {
    fn encoded_classifications(&self, file: DocumentId, span: TextRange) -> Vec<ClassifiedSpan>;

    fn find_references(&self, file: DocumentId, offset: TextSize) -> Vec<Location>;

    fn rename_locations(&self, file: DocumentId, offset: TextSize) -> Vec<Location>;

    fn diagnostics(&self, file: DocumentId) -> Vec<Diagnostic>;

    /// The text the analyzer currently has loaded for `file`.
    fn document_text(&self, file: DocumentId) -> Option<Arc<str>>;

    fn token_encoding(&self) -> TokenEncoding {
        TokenEncoding::default()
    }
}
