//! Markup pretty-printer.
//!
//! Emits one construct per line: every open tag, end tag, text line and
//! comment starts its own line, indented two spaces per nesting level.
//! Empty elements stay on one line (`<div></div>`). Comment data is emitted
//! verbatim, so a multi-line comment keeps its inner line breaks.

use super::tree::{Attribute, Element, MarkupNode, is_void_element};

const INDENT: &str = "  ";

/// Pretty-print a markup tree.
pub fn pretty_print(nodes: &[MarkupNode]) -> String {
    let mut lines = Vec::new();
    for node in nodes {
        print_node(node, 0, &mut lines);
    }
    lines.join("\n")
}

fn print_node(node: &MarkupNode, depth: usize, lines: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    match node {
        MarkupNode::Element(element) => print_element(element, depth, lines),
        MarkupNode::Text(text) => {
            for line in text.text.lines() {
                let line = line.trim();
                if !line.is_empty() {
                    lines.push(format!("{indent}{line}"));
                }
            }
        }
        MarkupNode::Comment(comment) => lines.push(format!("{indent}<!--{}-->", comment.data)),
        MarkupNode::Declaration(decl) => lines.push(format!("{indent}{}", decl.text)),
    }
}

fn print_element(element: &Element, depth: usize, lines: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    let open = open_tag(element);

    if element.self_closing {
        lines.push(format!("{indent}{}/>", &open[..open.len() - 1]));
        return;
    }
    if is_void_element(&element.name) {
        lines.push(format!("{indent}{open}"));
        return;
    }

    let has_content = element.children.iter().any(|child| match child {
        MarkupNode::Text(t) => !t.text.trim().is_empty(),
        _ => true,
    });
    if !has_content {
        lines.push(format!("{indent}{open}</{}>", element.name));
        return;
    }

    lines.push(format!("{indent}{open}"));
    for child in &element.children {
        print_node(child, depth + 1, lines);
    }
    lines.push(format!("{indent}</{}>", element.name));
}

fn open_tag(element: &Element) -> String {
    let mut tag = format!("<{}", element.name);
    for attribute in &element.attributes {
        tag.push(' ');
        tag.push_str(&format_attribute(attribute));
    }
    tag.push('>');
    tag
}

/// `name`, `name="value"`, or `name='value'` when the value holds a `"`.
fn format_attribute(attribute: &Attribute) -> String {
    match &attribute.value {
        None => attribute.name.to_string(),
        Some(value) if value.text.contains('"') => format!("{}='{}'", attribute.name, value.text),
        Some(value) => format!("{}=\"{}\"", attribute.name, value.text),
    }
}
