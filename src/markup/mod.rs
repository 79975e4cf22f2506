//! Markup documents: the HTML-like intermediate form.
//!
//! Everything here is deliberately lenient: markup handed to the projection
//! core comes either from the dialect compiler or straight from an editor
//! buffer that may be mid-edit, and neither path may fail.
//!
//! - [`lex`] / [`MarkupToken`] - logos tokenizer with byte ranges
//! - [`parse_markup`] - tree of elements, text, comments and declarations
//! - [`pretty_print`] - one construct per line
//! - [`normalize_entities`] - undo the escaping of `&gt; &lt; &amp; &quot;`

mod lexer;
mod pretty;
mod tree;

use std::borrow::Cow;

pub use lexer::{MarkupToken, blank_end_tags, lex};
pub use pretty::pretty_print;
pub use tree::{
    Attribute, AttributeValue, Comment, Declaration, Element, MarkupNode, Text, VOID_ELEMENTS,
    is_void_element, parse_markup,
};

/// Replace `&gt;`, `&lt;`, `&amp;` and `&quot;` with the characters they escape.
///
/// The replacements run one after another in that order, so `&amp;gt;`
/// becomes `&gt;`, not `>`.
pub fn normalize_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace("&gt;", ">")
            .replace("&lt;", "<")
            .replace("&amp;", "&")
            .replace("&quot;", "\""),
    )
}

/// Apply [`normalize_entities`] to every text, comment and attribute value.
pub fn normalize_tree(nodes: &mut [MarkupNode]) {
    for node in nodes {
        match node {
            MarkupNode::Element(element) => {
                for attribute in &mut element.attributes {
                    if let Some(value) = &mut attribute.value {
                        if let Cow::Owned(text) = normalize_entities(&value.text) {
                            value.text = text;
                        }
                    }
                }
                normalize_tree(&mut element.children);
            }
            MarkupNode::Text(text) => {
                if let Cow::Owned(normalized) = normalize_entities(&text.text) {
                    text.text = normalized;
                }
            }
            MarkupNode::Comment(comment) => {
                if let Cow::Owned(data) = normalize_entities(&comment.data) {
                    comment.data = data;
                }
            }
            MarkupNode::Declaration(_) => {}
        }
    }
}
