//! Markup tokens.
//!
//! The lexer is lenient: anything that does not form a tag, comment or
//! declaration is text, so every input tokenizes completely.
use logos::{Lexer, Logos};

use crate::base::{TextRange, TextSize};

/// Tokens of a markup document.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupToken {
    /// `<!-- ... -->`, or everything to the end of input when unterminated.
    #[token("<!--", lex_comment)]
    Comment,

    /// `</name>`
    #[regex(r"</[^>]*>")]
    EndTag,

    /// `<name attr="value" ...>` or `<name ... />`
    #[regex(r"<[A-Za-z][^\s/>]*", lex_open_tag)]
    OpenTag,

    /// `<!DOCTYPE ...>` and `<? ... ?>`
    #[regex(r"<![A-Za-z][^>]*>")]
    #[regex(r"<\?[^>]*>")]
    Declaration,

    #[regex(r"[^<]+")]
    Text,

    /// A `<` that starts nothing, e.g. `a < b` inside an interpolation.
    #[token("<")]
    StrayLt,
}

fn lex_comment(lex: &mut Lexer<MarkupToken>) -> bool {
    let remainder = lex.remainder();
    let len = remainder
        .find("-->")
        .map_or(remainder.len(), |end| end + "-->".len());
    lex.bump(len);
    true
}

/// Consume attributes up to and including the closing `>`, skipping `>`
/// inside quoted values.
fn lex_open_tag(lex: &mut Lexer<MarkupToken>) -> bool {
    let mut quote = None;
    let mut len = lex.remainder().len();
    for (i, b) in lex.remainder().bytes().enumerate() {
        match (quote, b) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => {
                len = i + 1;
                break;
            }
            (None, _) => {}
        }
    }
    lex.bump(len);
    true
}

/// Tokenize markup into tokens with their ranges.
///
/// Unrecognized input is reported as [`MarkupToken::Text`].
pub fn lex(text: &str) -> Vec<(MarkupToken, TextRange)> {
    let mut lexer = MarkupToken::lexer(text);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let range = TextRange::new(
            TextSize::from(span.start as u32),
            TextSize::from(span.end as u32),
        );
        tokens.push((result.unwrap_or(MarkupToken::Text), range));
    }
    tokens
}

/// Replace every end tag with the same number of spaces.
///
/// Offsets are preserved, so positions in the result are positions in `text`.
pub fn blank_end_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (token, range) in lex(text) {
        let slice = &text[range];
        if token == MarkupToken::EndTag {
            out.extend(std::iter::repeat_n(' ', slice.len()));
        } else {
            out.push_str(slice);
        }
    }
    out
}
