//! Semantic tokens: analyzer classifications translated to original positions.
//!
//! The analyzer classifies the synthetic document. Each classified span is
//! decoded into a token type and modifier set, mapped back through mappings
//! that allow [`Capability::Basic`], and split per line of the original
//! document.

use tokio_util::sync::CancellationToken;

use crate::base::{DocumentId, LineIndex, TextRange, TextSize};
use crate::error::{AnalysisError, LegendError};
use crate::source_map::Capability;

use super::analyzer::{ExternalAnalyzer, TokenEncoding};
use super::session::Session;

/// Token type for semantic highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Class,
    Enum,
    Interface,
    Namespace,
    TypeParameter,
    Type,
    Parameter,
    Variable,
    EnumMember,
    Property,
    Function,
    Member,
}

impl TokenType {
    pub const COUNT: usize = 12;

    pub const ALL: [TokenType; Self::COUNT] = [
        TokenType::Class,
        TokenType::Enum,
        TokenType::Interface,
        TokenType::Namespace,
        TokenType::TypeParameter,
        TokenType::Type,
        TokenType::Parameter,
        TokenType::Variable,
        TokenType::EnumMember,
        TokenType::Property,
        TokenType::Function,
        TokenType::Member,
    ];

    /// Convert to LSP token type index.
    pub fn to_lsp_index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenType::Class => "class",
            TokenType::Enum => "enum",
            TokenType::Interface => "interface",
            TokenType::Namespace => "namespace",
            TokenType::TypeParameter => "typeParameter",
            TokenType::Type => "type",
            TokenType::Parameter => "parameter",
            TokenType::Variable => "variable",
            TokenType::EnumMember => "enumMember",
            TokenType::Property => "property",
            TokenType::Function => "function",
            TokenType::Member => "member",
        }
    }

    /// Plain classification kinds reported when the analyzer does not encode
    /// token types.
    fn from_plain_classification(kind: u32) -> Option<Self> {
        match kind {
            11 => Some(TokenType::Class),
            12 => Some(TokenType::Enum),
            13 => Some(TokenType::Interface),
            14 => Some(TokenType::Namespace),
            15 => Some(TokenType::TypeParameter),
            16 => Some(TokenType::Type),
            17 => Some(TokenType::Parameter),
            _ => None,
        }
    }
}

/// Token modifier bit positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenModifier {
    Declaration,
    Static,
    Async,
    Readonly,
    DefaultLibrary,
    Local,
}

impl TokenModifier {
    pub const COUNT: usize = 6;

    pub const ALL: [TokenModifier; Self::COUNT] = [
        TokenModifier::Declaration,
        TokenModifier::Static,
        TokenModifier::Async,
        TokenModifier::Readonly,
        TokenModifier::DefaultLibrary,
        TokenModifier::Local,
    ];

    pub fn bit(self) -> u32 {
        1 << self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenModifier::Declaration => "declaration",
            TokenModifier::Static => "static",
            TokenModifier::Async => "async",
            TokenModifier::Readonly => "readonly",
            TokenModifier::DefaultLibrary => "defaultLibrary",
            TokenModifier::Local => "local",
        }
    }
}

/// Names advertised to the editor, indexed like [`TokenType`] and
/// [`TokenModifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticTokensLegend {
    pub token_types: Vec<&'static str>,
    pub token_modifiers: Vec<&'static str>,
}

impl SemanticTokensLegend {
    /// The legend for the built-in tables.
    pub fn new() -> Result<Self, LegendError> {
        let types = TokenType::ALL.map(|t| Some(t.name()));
        let modifiers = TokenModifier::ALL.map(|m| Some(m.name()));
        Self::try_from_tables(&types, &modifiers)
    }

    /// Build a legend from index-addressed tables, rejecting tables with holes
    /// or with a different number of entries than the enums declare.
    pub fn try_from_tables(
        types: &[Option<&'static str>],
        modifiers: &[Option<&'static str>],
    ) -> Result<Self, LegendError> {
        let token_types: Vec<_> = types.iter().flatten().copied().collect();
        if token_types.len() != TokenType::COUNT || types.len() != TokenType::COUNT {
            return Err(LegendError::TokenTypes {
                populated: token_types.len(),
                declared: TokenType::COUNT,
            });
        }
        let token_modifiers: Vec<_> = modifiers.iter().flatten().copied().collect();
        if token_modifiers.len() != TokenModifier::COUNT || modifiers.len() != TokenModifier::COUNT {
            return Err(LegendError::TokenModifiers {
                populated: token_modifiers.len(),
                declared: TokenModifier::COUNT,
            });
        }
        Ok(Self {
            token_types,
            token_modifiers,
        })
    }
}

/// Decode an analyzer classification into a token type and modifier bits.
///
/// Values above the modifier mask carry `(type + 1) << type_offset | modifiers`;
/// smaller values are plain classification kinds, of which only the named
/// type kinds produce a token.
pub fn decode_classification(classification: u32, encoding: TokenEncoding) -> Option<(TokenType, u32)> {
    if classification > encoding.modifier_mask {
        let index = (classification >> encoding.type_offset).checked_sub(1)?;
        let token_type = TokenType::from_index(index)?;
        Some((token_type, classification & encoding.modifier_mask))
    } else {
        TokenType::from_plain_classification(classification).map(|t| (t, 0))
    }
}

/// A semantic token for syntax highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticToken {
    /// Line number (0-indexed)
    pub line: u32,
    /// Column number (0-indexed)
    pub col: u32,
    /// Length of the token in bytes
    pub length: u32,
    /// The token type
    pub token_type: TokenType,
    /// Bit set of [`TokenModifier::bit`]
    pub modifiers: u32,
}

/// Get semantic tokens for an original document.
///
/// Returns `Ok(None)` for documents longer than the configured limit and
/// [`AnalysisError::Busy`] when the document changes during the request.
/// Tokens are sorted by position.
pub fn semantic_tokens(
    session: &Session,
    analyzer: &dyn ExternalAnalyzer,
    file: DocumentId,
    cancel: &CancellationToken,
) -> Result<Option<Vec<SemanticToken>>, AnalysisError> {
    let source = session
        .source_text(file)
        .ok_or(AnalysisError::UnknownDocument(file))?;
    if source.len() > session.config().semantic_tokens_limit {
        return Ok(None);
    }
    tokens_in(session, analyzer, file, None, cancel)
}

/// Get semantic tokens overlapping `range` of an original document.
///
/// The limit applies to the length of the range.
pub fn semantic_tokens_range(
    session: &Session,
    analyzer: &dyn ExternalAnalyzer,
    file: DocumentId,
    range: TextRange,
    cancel: &CancellationToken,
) -> Result<Option<Vec<SemanticToken>>, AnalysisError> {
    if usize::from(range.len()) > session.config().semantic_tokens_limit {
        return Ok(None);
    }
    tokens_in(session, analyzer, file, Some(range), cancel)
}

fn tokens_in(
    session: &Session,
    analyzer: &dyn ExternalAnalyzer,
    file: DocumentId,
    filter: Option<TextRange>,
    cancel: &CancellationToken,
) -> Result<Option<Vec<SemanticToken>>, AnalysisError> {
    let encoding = analyzer.token_encoding();
    let mut tokens = session.request(file, cancel, |doc| {
        let whole = TextRange::up_to(TextSize::of(&*doc.text));
        let mut tokens = Vec::new();
        for span in analyzer.encoded_classifications(doc.id, whole) {
            let Some((token_type, modifiers)) = decode_classification(span.classification, encoding)
            else {
                continue;
            };
            let Some(original) = doc.source_map.first_original(span.range, Capability::Basic) else {
                continue;
            };
            if filter.is_some_and(|f| f.intersect(original.range).is_none()) {
                continue;
            }
            split_lines(&doc.source_lines, original.range, token_type, modifiers, &mut tokens);
        }
        tokens
    })?;

    // Sort tokens by position (line, then column)
    tokens.sort_by_key(|t| (t.line, t.col));
    Ok(Some(tokens))
}

/// Push one token per line covered by `range`; empty pieces are skipped.
fn split_lines(
    lines: &LineIndex,
    range: TextRange,
    token_type: TokenType,
    modifiers: u32,
    out: &mut Vec<SemanticToken>,
) {
    let start = lines.line_col(range.start());
    let end = lines.line_col(range.end());
    for line in start.line..=end.line {
        let from = if line == start.line { start.col } else { 0 };
        let to = if line == end.line {
            end.col
        } else {
            lines.line_range(line).map_or(from, |r| u32::from(r.len()))
        };
        if to > from {
            out.push(SemanticToken {
                line,
                col: from,
                length: to - from,
                token_type,
                modifiers,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::ide::analyzer::{ClassifiedSpan, Location};
    use crate::ide::diagnostics::Diagnostic;
    use crate::ide::session::{SessionConfig, TemplateLanguage};

    /// Classifies `inner` at its first occurrence inside `context` in the
    /// synthetic text.
    struct Classifier<'a> {
        session: &'a Session,
        spans: Vec<(&'static str, &'static str, u32)>,
    }

    impl ExternalAnalyzer for Classifier<'_> {
        fn encoded_classifications(&self, file: DocumentId, _span: TextRange) -> Vec<ClassifiedSpan> {
            let Some(doc) = self.session.installed(file.original()) else {
                return Vec::new();
            };
            self.spans
                .iter()
                .filter_map(|&(context, inner, classification)| {
                    let start = doc.text.find(context)? + context.find(inner)?;
                    Some(ClassifiedSpan {
                        range: TextRange::at(TextSize::from(start as u32), TextSize::of(inner)),
                        classification,
                    })
                })
                .collect()
        }
        fn find_references(&self, _: DocumentId, _: TextSize) -> Vec<Location> {
            Vec::new()
        }
        fn rename_locations(&self, _: DocumentId, _: TextSize) -> Vec<Location> {
            Vec::new()
        }
        fn diagnostics(&self, _: DocumentId) -> Vec<Diagnostic> {
            Vec::new()
        }
        fn document_text(&self, _: DocumentId) -> Option<Arc<str>> {
            None
        }
    }

    fn encoded(token_type: TokenType, modifiers: u32) -> u32 {
        (token_type as u32 + 1) << 8 | modifiers
    }

    #[rstest]
    #[case(encoded(TokenType::Variable, 1), Some((TokenType::Variable, 1)))]
    #[case(encoded(TokenType::Class, 0), Some((TokenType::Class, 0)))]
    #[case(encoded(TokenType::Member, 0b100001), Some((TokenType::Member, 0b100001)))]
    #[case(11, Some((TokenType::Class, 0)))]
    #[case(17, Some((TokenType::Parameter, 0)))]
    #[case(5, None)]
    #[case(18, None)]
    #[case(40 << 8, None)]
    fn test_decode_classification(#[case] classification: u32, #[case] expected: Option<(TokenType, u32)>) {
        assert_eq!(
            decode_classification(classification, TokenEncoding::default()),
            expected
        );
    }

    #[test]
    fn test_builtin_legend_is_complete() {
        let legend = SemanticTokensLegend::new().unwrap();
        assert_eq!(legend.token_types.len(), TokenType::COUNT);
        assert_eq!(
            legend.token_types[TokenType::TypeParameter.to_lsp_index() as usize],
            "typeParameter"
        );
        assert_eq!(legend.token_modifiers[5], "local");
    }

    #[test]
    fn test_legend_with_hole_is_rejected() {
        let mut types = TokenType::ALL.map(|t| Some(t.name())).to_vec();
        types[3] = None;
        let modifiers = TokenModifier::ALL.map(|m| Some(m.name()));
        assert_eq!(
            SemanticTokensLegend::try_from_tables(&types, &modifiers),
            Err(LegendError::TokenTypes {
                populated: 11,
                declared: 12
            })
        );

        let types = TokenType::ALL.map(|t| Some(t.name()));
        assert_eq!(
            SemanticTokensLegend::try_from_tables(&types, &modifiers[..4]),
            Err(LegendError::TokenModifiers {
                populated: 4,
                declared: 6
            })
        );
    }

    #[test]
    fn test_tokens_are_mapped_to_original_positions() {
        let session = Session::new(SessionConfig::default());
        let id = session.open("<p>{{ count }}</p>", TemplateLanguage::Markup);
        let analyzer = Classifier {
            session: &session,
            spans: vec![
                ("{count}", "count", encoded(TokenType::Variable, TokenModifier::Readonly.bit())),
                // generated scaffolding has no original position
                ("__VDS_components", "__VDS_components", encoded(TokenType::Variable, 0)),
            ],
        };

        let tokens = semantic_tokens(&session, &analyzer, id, &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(
            tokens,
            vec![SemanticToken {
                line: 0,
                col: 6,
                length: 5,
                token_type: TokenType::Variable,
                modifiers: TokenModifier::Readonly.bit(),
            }]
        );
    }

    #[test]
    fn test_multi_line_token_is_split() {
        let session = Session::new(SessionConfig::default());
        let id = session.open("<p>{{ a +\n b }}</p>", TemplateLanguage::Markup);
        let analyzer = Classifier {
            session: &session,
            spans: vec![("{a +\n b}", "a +\n b", 11)],
        };

        let tokens = semantic_tokens(&session, &analyzer, id, &CancellationToken::new())
            .unwrap()
            .unwrap();
        let pieces: Vec<_> = tokens.iter().map(|t| (t.line, t.col, t.length)).collect();
        assert_eq!(pieces, [(0, 6, 3), (1, 0, 2)]);
        assert!(tokens.iter().all(|t| t.token_type == TokenType::Class));
    }

    #[test]
    fn test_large_documents_are_skipped() {
        let session = Session::new(SessionConfig {
            semantic_tokens_limit: 8,
            ..SessionConfig::default()
        });
        let id = session.open("<p>{{ count }}</p>", TemplateLanguage::Markup);
        let analyzer = Classifier {
            session: &session,
            spans: vec![("{count}", "count", 11)],
        };
        assert_eq!(
            semantic_tokens(&session, &analyzer, id, &CancellationToken::new()),
            Ok(None)
        );
    }

    #[test]
    fn test_range_keeps_overlapping_tokens() {
        let session = Session::new(SessionConfig::default());
        let id = session.open("<p>{{ a }}{{ b }}</p>", TemplateLanguage::Markup);
        let analyzer = Classifier {
            session: &session,
            spans: vec![
                ("{a}", "a", encoded(TokenType::Variable, 0)),
                ("{b}", "b", encoded(TokenType::Variable, 0)),
            ],
        };

        let range = TextRange::new(10.into(), 17.into());
        let tokens = semantic_tokens_range(&session, &analyzer, id, range, &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(tokens.iter().map(|t| t.col).collect::<Vec<_>>(), [13]);
    }
}
