//! Diagnostics reported by the analyzer, translated to original positions.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::base::{DocumentId, TextRange};
use crate::error::AnalysisError;
use crate::source_map::Capability;

use super::analyzer::ExternalAnalyzer;
use super::session::Session;

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: TextRange,
    pub severity: Severity,
    /// Analyzer-specific code (e.g., "2304").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            code: None,
            message: message.into(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(range, message)
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Analyzer diagnostics for an original document.
///
/// Diagnostics in generated scaffolding, or over mappings that do not allow
/// [`Capability::Diagnostic`], are dropped.
pub fn diagnostics(
    session: &Session,
    analyzer: &dyn ExternalAnalyzer,
    file: DocumentId,
    cancel: &CancellationToken,
) -> Result<Vec<Diagnostic>, AnalysisError> {
    session.request(file, cancel, |doc| {
        analyzer
            .diagnostics(doc.id)
            .into_iter()
            .filter_map(|diagnostic| {
                match doc.source_map.first_original(diagnostic.range, Capability::Diagnostic) {
                    Some(mapped) => Some(Diagnostic {
                        range: mapped.range,
                        ..diagnostic
                    }),
                    None => {
                        trace!(file = %doc.id, range = ?diagnostic.range, "dropping unmapped diagnostic");
                        None
                    }
                }
            })
            .collect()
    })
}
