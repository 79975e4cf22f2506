//! Foundation types for the stencil projection core.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`DocumentId`] - Original and synthetic document identifiers
//! - [`TextRange`], [`TextSize`] - Source positions
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//!
//! This module has NO dependencies on other stencil modules.

mod document_id;
mod span;

pub use document_id::DocumentId;
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
