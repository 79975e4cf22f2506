//! # stencil-base
//!
//! Virtual-document projection core for component templates.
//!
//! A template (written as markup or in the indentation dialect) is lowered to
//! synthetic typed source that an external analyzer can check. Source maps
//! carry positions and per-feature capabilities between the two, and the IDE
//! layer translates analyzer answers back to the template.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide        → Session, versioned analyzer requests, feature translation
//!   ↓
//! lower      → Template tree → synthetic text + mappings
//! source_map → Capability-gated range queries
//!   ↓
//! template   → Template node tree (elements, directives, if/for)
//! dialect    → Indentation dialect ⇄ markup, offset mapper
//! markup     → Lenient markup lexer, tree, pretty printer
//!   ↓
//! base       → Primitives (DocumentId, TextRange, LineIndex)
//! ```

/// Foundation types: DocumentId, TextRange, LineIndex
pub mod base;

/// Error types for versioned requests and legend validation
pub mod error;

/// Markup lexing, parsing and pretty printing
pub mod markup;

/// Indentation dialect conversion and the offset mapper
pub mod dialect;

/// Template node tree
pub mod template;

/// Source maps and mapping capabilities
pub mod source_map;

/// Template lowering
pub mod lower;

/// IDE features: session, semantic tokens, references, diagnostics
pub mod ide;

// Re-export foundation types
pub use base::{DocumentId, LineCol, LineIndex, TextRange, TextSize};
pub use dialect::{DialectOptions, OffsetMapper, dialect_to_markup, markup_to_dialect};
pub use error::{AnalysisError, LegendError};
pub use lower::{DialectPair, LoweredTemplate, lower_template};
pub use source_map::{Capabilities, Capability, Mapping, MappingMode, SourceMap};
pub use template::parse_template;
