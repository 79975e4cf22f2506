//! IDE features: high-level APIs for LSP handlers.
//!
//! This module sits between editor-facing handlers and an
//! [`ExternalAnalyzer`] that only understands synthetic documents. The
//! [`Session`] keeps one virtual document per template document; each feature
//! function translates a request into synthetic coordinates, asks the
//! analyzer under the session's version guard, and translates the answer back.
//!
//! ## Design Principles
//!
//! 1. **No LSP types**: Uses our own types, converted at the LSP boundary
//! 2. **Busy is not empty**: A request that raced with an edit fails with
//!    [`AnalysisError::Busy`](crate::error::AnalysisError::Busy)
//! 3. **Capability gated**: Every translation names the capability it needs
//!
//! ## Usage
//!
//! ```ignore
//! use stencil::ide::{Session, SessionConfig, TemplateLanguage, find_references};
//!
//! let session = Session::new(SessionConfig::default());
//! let file = session.open("<p>{{ count }}</p>", TemplateLanguage::Markup);
//! let refs = find_references(&session, &analyzer, file, 7.into(), &cancel)?;
//! ```

mod analyzer;
mod diagnostics;
mod references;
mod semantic_tokens;
mod session;

pub use analyzer::{ClassifiedSpan, ExternalAnalyzer, Location, TokenEncoding};
pub use diagnostics::{Diagnostic, Severity, diagnostics};
pub use references::{find_references, rename_locations};
pub use semantic_tokens::{
    SemanticToken, SemanticTokensLegend, TokenModifier, TokenType, decode_classification,
    semantic_tokens, semantic_tokens_range,
};
pub use session::{
    RebuildOutcome, Session, SessionConfig, TemplateLanguage, VirtualDocument,
};
