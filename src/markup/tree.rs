//! Lenient markup tree with source ranges.

use smol_str::SmolStr;

use crate::base::{TextRange, TextSize};

use super::lexer::{MarkupToken, lex};

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Whether `name` is a void element.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// A node of a parsed markup document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkupNode {
    Element(Element),
    Text(Text),
    Comment(Comment),
    Declaration(Declaration),
}

impl MarkupNode {
    pub fn range(&self) -> TextRange {
        match self {
            MarkupNode::Element(e) => e.range,
            MarkupNode::Text(t) => t.range,
            MarkupNode::Comment(c) => c.range,
            MarkupNode::Declaration(d) => d.range,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub name: SmolStr,
    pub attributes: Vec<Attribute>,
    pub children: Vec<MarkupNode>,
    /// From `<` to the end of the end tag (or of the last content when the
    /// element was closed implicitly).
    pub range: TextRange,
    pub open_tag: TextRange,
    /// The name inside `</name>`, when the element has an explicit end tag.
    pub end_tag_name: Option<TextRange>,
    pub self_closing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub value: Option<AttributeValue>,
    /// From the start of the name to the end of the value, quotes included.
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeValue {
    pub text: String,
    /// The value without its quotes.
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    pub text: String,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    /// Content between `<!--` and `-->`.
    pub data: String,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub text: String,
    pub range: TextRange,
}

/// Parse markup into a tree.
///
/// Never fails: void elements and `/>` close immediately, an end tag closes
/// the nearest open element with the same name together with everything
/// opened after it, unmatched end tags are ignored, and elements still open
/// at the end of input are closed there.
pub fn parse_markup(text: &str) -> Vec<MarkupNode> {
    let mut builder = TreeBuilder::default();

    for (token, range) in lex(text) {
        let slice = &text[range];
        match token {
            MarkupToken::Text | MarkupToken::StrayLt => builder.text(slice, range),
            MarkupToken::Comment => {
                let data = slice.strip_prefix("<!--").unwrap_or(slice);
                let data = data.strip_suffix("-->").unwrap_or(data);
                builder.push(MarkupNode::Comment(Comment {
                    data: data.to_string(),
                    range,
                }));
            }
            MarkupToken::Declaration => builder.push(MarkupNode::Declaration(Declaration {
                text: slice.to_string(),
                range,
            })),
            MarkupToken::OpenTag => {
                let element = parse_open_tag(slice, range);
                if element.self_closing || is_void_element(&element.name) {
                    builder.push(MarkupNode::Element(element));
                } else {
                    builder.open.push(element);
                }
            }
            MarkupToken::EndTag => builder.close(slice, range),
        }
    }

    builder.finish(TextSize::of(text))
}

#[derive(Default)]
struct TreeBuilder {
    roots: Vec<MarkupNode>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn push(&mut self, node: MarkupNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    /// Append text, merging with a directly preceding text sibling so that a
    /// stray `<` does not split one text run into several nodes.
    fn text(&mut self, slice: &str, range: TextRange) {
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        if let Some(MarkupNode::Text(prev)) = siblings.last_mut() {
            if prev.range.end() == range.start() {
                prev.text.push_str(slice);
                prev.range = prev.range.cover(range);
                return;
            }
        }
        siblings.push(MarkupNode::Text(Text {
            text: slice.to_string(),
            range,
        }));
    }

    fn close(&mut self, slice: &str, range: TextRange) {
        let name = slice
            .trim_start_matches("</")
            .trim_end_matches('>')
            .trim_end();
        let Some(index) = self
            .open
            .iter()
            .rposition(|e| e.name.eq_ignore_ascii_case(name))
        else {
            return;
        };

        while self.open.len() > index {
            let Some(mut element) = self.open.pop() else {
                break;
            };
            if self.open.len() == index {
                let name_start = range.start() + TextSize::from(2);
                element.end_tag_name = Some(TextRange::at(name_start, TextSize::of(name)));
                element.range = TextRange::new(element.range.start(), range.end());
            } else {
                element.range = TextRange::new(element.range.start(), range.start());
            }
            self.push(MarkupNode::Element(element));
        }
    }

    fn finish(mut self, end: TextSize) -> Vec<MarkupNode> {
        while let Some(mut element) = self.open.pop() {
            element.range = TextRange::new(element.range.start(), end);
            self.push(MarkupNode::Element(element));
        }
        self.roots
    }
}

/// Parse `<name attr="v" flag ...>` into an element without children.
fn parse_open_tag(slice: &str, range: TextRange) -> Element {
    let bytes = slice.as_bytes();
    let base = range.start();
    let at = |i: usize| base + TextSize::from(i as u32);

    let mut i = 1;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/' {
        i += 1;
    }
    let name = SmolStr::new(&slice[1..i]);

    let mut attributes = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' {
            break;
        }
        if bytes[i] == b'/' {
            if bytes.get(i + 1).is_none_or(|&b| b == b'>') {
                self_closing = true;
                break;
            }
            i += 1;
            continue;
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && bytes[i] != b'='
            && bytes[i] != b'>'
            && !(bytes[i] == b'/' && bytes.get(i + 1).is_none_or(|&b| b == b'>'))
        {
            i += 1;
        }
        let name_end = i;

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let mut value = None;
        let mut attr_end = name_end;
        if bytes.get(j) == Some(&b'=') {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match bytes.get(j) {
                Some(&q) if q == b'"' || q == b'\'' => {
                    let value_start = j + 1;
                    let value_end = slice[value_start..]
                        .find(q as char)
                        .map_or(bytes.len(), |e| value_start + e);
                    value = Some(AttributeValue {
                        text: slice[value_start..value_end].to_string(),
                        range: TextRange::new(at(value_start), at(value_end)),
                    });
                    attr_end = (value_end + 1).min(bytes.len());
                }
                _ => {
                    let value_start = j;
                    while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                        j += 1;
                    }
                    value = Some(AttributeValue {
                        text: slice[value_start..j].to_string(),
                        range: TextRange::new(at(value_start), at(j)),
                    });
                    attr_end = j;
                }
            }
            i = attr_end;
        }

        if name_end > name_start {
            attributes.push(Attribute {
                name: SmolStr::new(&slice[name_start..name_end]),
                name_range: TextRange::new(at(name_start), at(name_end)),
                value,
                range: TextRange::new(at(name_start), at(attr_end)),
            });
        } else {
            // a lone `=` or similar junk; skip it
            i = i.max(name_start + 1);
        }
    }

    Element {
        name,
        attributes,
        children: Vec::new(),
        range,
        open_tag: range,
        end_tag_name: None,
        self_closing,
    }
}
