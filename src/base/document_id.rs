//! Document identifiers for original and synthetic documents.

use std::fmt;

/// Bit set on the identifier of every synthetic document.
const VIRTUAL_BIT: u32 = 1 << 31;

/// An identifier for a document known to the session.
///
/// `DocumentId` is a lightweight handle (just a u32). Every original document
/// has exactly one synthetic counterpart whose id is the original id with the
/// high bit set, so the two can be converted into each other without a lookup
/// table:
/// - [`DocumentId::virtual_of`] goes from original to synthetic
/// - [`DocumentId::original`] goes back
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DocumentId(u32);

impl DocumentId {
    /// Create a new DocumentId from a raw index.
    ///
    /// The high bit is reserved for synthetic documents and is cleared.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id & !VIRTUAL_BIT)
    }

    /// Get the raw index, without the synthetic marker.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0 & !VIRTUAL_BIT
    }

    /// The id of the synthetic document generated from this one.
    #[inline]
    pub const fn virtual_of(self) -> Self {
        Self(self.0 | VIRTUAL_BIT)
    }

    /// The id of the original document this one was generated from.
    ///
    /// Identity for original documents.
    #[inline]
    pub const fn original(self) -> Self {
        Self(self.0 & !VIRTUAL_BIT)
    }

    /// Whether this identifies a synthetic document.
    #[inline]
    pub const fn is_virtual(self) -> bool {
        self.0 & VIRTUAL_BIT != 0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_virtual() {
            write!(f, "DocumentId(virtual {})", self.index())
        } else {
            write!(f, "DocumentId({})", self.index())
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_virtual() {
            write!(f, "virtual#{}", self.index())
        } else {
            write!(f, "doc#{}", self.index())
        }
    }
}

impl From<u32> for DocumentId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}
