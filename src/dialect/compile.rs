//! Compiler from the indentation dialect to compact markup.
//!
//! Supported line forms, nesting by indentation:
//!
//! ```text
//! tag                      element
//! tag(a="1", b='2' flag)   attributes, comma or space separated, may span lines
//! .cls#id                  shorthands, implicit `div`
//! tag text                 inline text
//! tag.                     the indented block below is text
//! .                        standalone text block
//! | text                   piped text
//! tag/                     self-closing
//! tag: child               block expansion
//! // text                  comment (an indented block below joins it)
//! //- text                 silent comment, block included
//! <raw markup>             passed through
//! ```
//!
//! Attribute values are entity-escaped in the output, text is emitted as is.

use crate::markup::is_void_element;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Element(ElementNode),
    Text(String),
    Comment(String),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ElementNode {
    name: String,
    attributes: Vec<Attr>,
    children: Vec<Node>,
    self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attr {
    name: String,
    value: Option<String>,
    /// `name!=value`: emitted without escaping.
    raw: bool,
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    indent: usize,
    /// The line without its indentation or trailing whitespace.
    content: &'a str,
    /// The line without trailing whitespace.
    raw: &'a str,
}

/// Compile dialect text to markup without line breaks between tags.
pub fn compile_dialect(text: &str) -> String {
    let lines: Vec<Line<'_>> = text
        .lines()
        .map(|raw| {
            let raw = raw.trim_end();
            let content = raw.trim_start();
            Line {
                indent: raw.len() - content.len(),
                content,
                raw,
            }
        })
        .collect();

    let mut cursor = 0;
    let nodes = parse_block(&lines, &mut cursor, None);
    let mut out = String::with_capacity(text.len() * 2);
    render(&nodes, &mut out);
    out
}

/// Parse sibling lines indented deeper than `parent_indent`.
fn parse_block(lines: &[Line<'_>], cursor: &mut usize, parent_indent: Option<usize>) -> Vec<Node> {
    let mut nodes = Vec::new();
    while *cursor < lines.len() {
        let line = lines[*cursor];
        if line.content.is_empty() {
            *cursor += 1;
            continue;
        }
        if parent_indent.is_some_and(|parent| line.indent <= parent) {
            break;
        }
        *cursor += 1;
        if let Some(node) = parse_line(lines, cursor, line) {
            nodes.push(node);
        }
    }
    nodes
}

fn parse_line(lines: &[Line<'_>], cursor: &mut usize, line: Line<'_>) -> Option<Node> {
    let content = line.content;

    if content.starts_with("//-") {
        text_block(lines, cursor, line.indent);
        return None;
    }
    if let Some(rest) = content.strip_prefix("//") {
        let block = text_block(lines, cursor, line.indent);
        let data = match (rest.trim().is_empty(), block.is_empty()) {
            (_, true) => rest.to_string(),
            (true, false) => block,
            (false, false) => format!("{rest}\n{block}"),
        };
        return Some(Node::Comment(data));
    }
    if let Some(rest) = content.strip_prefix('|') {
        return Some(Node::Text(rest.strip_prefix(' ').unwrap_or(rest).to_string()));
    }
    if content == "." {
        return Some(Node::Text(text_block(lines, cursor, line.indent)));
    }
    if content.starts_with('<') {
        return Some(Node::Raw(content.to_string()));
    }

    let mut element = parse_tag(lines, cursor, content);
    if element.text_block {
        let block = text_block(lines, cursor, line.indent);
        if !block.is_empty() {
            element.node.children.push(Node::Text(block));
        }
    } else {
        let children = parse_block(lines, cursor, Some(line.indent));
        element.node.children.extend(children);
    }
    Some(Node::Element(element.node))
}

struct ParsedTag {
    node: ElementNode,
    text_block: bool,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'$')
}

fn take_name(s: &str) -> (&str, &str) {
    let end = s.bytes().position(|b| !is_name_byte(b)).unwrap_or(s.len());
    s.split_at(end)
}

/// Parse a tag line; may consume following lines of a multi-line attribute list.
fn parse_tag(lines: &[Line<'_>], cursor: &mut usize, content: &str) -> ParsedTag {
    let (name, mut rest) = take_name(content);
    let node = ElementNode {
        name: if name.is_empty() { "div".to_string() } else { name.to_string() },
        ..ElementNode::default()
    };

    let mut classes: Vec<String> = Vec::new();
    let mut attributes = Vec::new();
    loop {
        if let Some(after) = rest.strip_prefix('.') {
            let (class, after) = take_name(after);
            if class.is_empty() {
                break;
            }
            classes.push(class.to_string());
            rest = after;
        } else if let Some(after) = rest.strip_prefix('#') {
            let (id, after) = take_name(after);
            if id.is_empty() {
                break;
            }
            attributes.push(Attr {
                name: "id".to_string(),
                value: Some(id.to_string()),
                raw: false,
            });
            rest = after;
        } else if rest.starts_with('(') {
            let mut joined = rest.to_string();
            while find_closing_paren(&joined).is_none() && *cursor < lines.len() {
                joined.push('\n');
                joined.push_str(lines[*cursor].raw);
                *cursor += 1;
            }
            let close = find_closing_paren(&joined).unwrap_or(joined.len());
            attributes.extend(parse_attributes(&joined[1..close.max(1)]));
            let after = joined.get(close + 1..).unwrap_or("").to_string();
            return finish_tag(node, classes, attributes, after, lines, cursor);
        } else {
            break;
        }
    }

    let rest = rest.to_string();
    finish_tag(node, classes, attributes, rest, lines, cursor)
}

fn finish_tag(
    mut node: ElementNode,
    classes: Vec<String>,
    mut attributes: Vec<Attr>,
    rest: String,
    lines: &[Line<'_>],
    cursor: &mut usize,
) -> ParsedTag {
    // classes after an attribute list, e.g. `a(href="x").btn`
    let mut rest = rest.as_str();
    let mut classes = classes;
    while let Some(after) = rest.strip_prefix('.') {
        let (class, after) = take_name(after);
        if class.is_empty() {
            break;
        }
        classes.push(class.to_string());
        rest = after;
    }

    if !classes.is_empty() {
        let shorthand = classes.join(" ");
        match attributes.iter().position(|a| a.name == "class") {
            Some(index) => {
                let value = attributes[index].value.take().unwrap_or_default();
                attributes[index].value = Some(format!("{shorthand} {value}").trim_end().to_string());
            }
            None => attributes.insert(
                0,
                Attr {
                    name: "class".to_string(),
                    value: Some(shorthand),
                    raw: false,
                },
            ),
        }
    }
    node.attributes = attributes;

    let mut text_block = false;
    if rest == "." {
        text_block = true;
    } else if let Some(after) = rest.strip_prefix('/') {
        node.self_closing = true;
        rest = after;
    } else if let Some(after) = rest.strip_prefix(':') {
        let child = parse_tag(lines, cursor, after.trim_start());
        node.children.push(Node::Element(child.node));
        return ParsedTag { node, text_block: false };
    }

    if !text_block {
        if let Some(text) = rest.strip_prefix(' ') {
            if !text.is_empty() {
                node.children.push(Node::Text(text.to_string()));
            }
        }
    }
    ParsedTag { node, text_block }
}

/// Index of the `)` closing the `(` at index 0, skipping quoted text.
fn find_closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_attributes(src: &str) -> Vec<Attr> {
    let bytes = src.as_bytes();
    let mut attributes = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let attribute_start = i;

        let name = if matches!(bytes[i], b'"' | b'\'') {
            let (quoted, end) = read_quoted(src, i);
            i = end;
            quoted.to_string()
        } else {
            let start = i;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b',')
                && !(bytes[i] == b'!' && bytes.get(i + 1) == Some(&b'='))
            {
                i += 1;
            }
            src[start..i].to_string()
        };

        let mut j = i;
        while j < bytes.len() && bytes[j] == b' ' {
            j += 1;
        }
        let raw = bytes.get(j) == Some(&b'!') && bytes.get(j + 1) == Some(&b'=');
        let mut value = None;
        if raw || bytes.get(j) == Some(&b'=') {
            j += if raw { 2 } else { 1 };
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j < bytes.len() && matches!(bytes[j], b'"' | b'\'' | b'`') {
                let (quoted, end) = read_quoted(src, j);
                value = Some(quoted.to_string());
                j = end;
            } else {
                let start = j;
                j = scan_expression(bytes, j);
                value = Some(src[start..j].to_string());
            }
            i = j;
        }

        if name.is_empty() {
            if i == attribute_start {
                i += src[i..].chars().next().map_or(1, char::len_utf8);
            }
            continue;
        }
        attributes.push(Attr { name, value, raw });
    }
    attributes
}

/// Read a quoted string starting at `start`; returns its content and the
/// index after the closing quote.
fn read_quoted(src: &str, start: usize) -> (&str, usize) {
    let bytes = src.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    let mut escaped = false;
    while i < bytes.len() {
        if escaped {
            escaped = false;
        } else if bytes[i] == b'\\' {
            escaped = true;
        } else if bytes[i] == quote {
            return (&src[start + 1..i], i + 1);
        }
        i += 1;
    }
    (&src[start + 1..], bytes.len())
}

/// End of an unquoted value: the next top-level comma or whitespace.
fn scan_expression(bytes: &[u8], mut i: usize) -> usize {
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => break,
            b if b.is_ascii_whitespace() && depth == 0 => break,
            _ => {}
        }
        i += 1;
    }
    i
}

/// Collect the lines indented deeper than `indent` as one text block, with
/// the block's common indentation removed. Trailing blank lines are dropped.
fn text_block(lines: &[Line<'_>], cursor: &mut usize, indent: usize) -> String {
    let start = *cursor;
    let mut end = start;
    let mut last_content = start;
    while end < lines.len() {
        let line = lines[end];
        if !line.content.is_empty() {
            if line.indent <= indent {
                break;
            }
            last_content = end + 1;
        }
        end += 1;
    }
    *cursor = last_content.max(start);

    let block = &lines[start..*cursor];
    let common = block
        .iter()
        .filter(|l| !l.content.is_empty())
        .map(|l| l.indent)
        .min()
        .unwrap_or(0);
    block
        .iter()
        .map(|l| l.raw.get(common..).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

fn render(nodes: &[Node], out: &mut String) {
    let mut previous_text = false;
    for node in nodes {
        match node {
            Node::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for attribute in &element.attributes {
                    out.push(' ');
                    out.push_str(&attribute.name);
                    if let Some(value) = &attribute.value {
                        out.push_str("=\"");
                        if attribute.raw {
                            out.push_str(value);
                        } else {
                            out.push_str(&escape_attribute(value));
                        }
                        out.push('"');
                    }
                }
                if element.self_closing {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    if !is_void_element(&element.name) {
                        render(&element.children, out);
                        out.push_str("</");
                        out.push_str(&element.name);
                        out.push('>');
                    }
                }
            }
            Node::Text(text) => {
                if previous_text {
                    out.push('\n');
                }
                out.push_str(text);
            }
            Node::Comment(data) => {
                out.push_str("<!--");
                out.push_str(data);
                out.push_str(" -->");
            }
            Node::Raw(raw) => out.push_str(raw),
        }
        previous_text = matches!(node, Node::Text(_));
    }
}
