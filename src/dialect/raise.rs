//! Markup → dialect conversion.

use crate::markup::{Element, MarkupNode};

use super::DialectOptions;

/// A node that survives whitespace filtering; text is already trimmed.
enum Significant<'a> {
    Text(&'a str),
    Element(&'a Element),
    Comment(&'a str),
}

/// Drop whitespace-only text and declarations, trim the remaining text.
fn significant(nodes: &[MarkupNode]) -> Vec<Significant<'_>> {
    nodes
        .iter()
        .filter_map(|node| match node {
            MarkupNode::Text(text) => {
                let trimmed = text.text.trim();
                (!trimmed.is_empty()).then_some(Significant::Text(trimmed))
            }
            MarkupNode::Element(element) => Some(Significant::Element(element)),
            MarkupNode::Comment(comment) => Some(Significant::Comment(&comment.data)),
            MarkupNode::Declaration(_) => None,
        })
        .collect()
}

/// Convert a parsed markup tree into dialect text.
pub fn markup_to_dialect(nodes: &[MarkupNode], options: &DialectOptions) -> String {
    let mut writer = DialectWriter {
        options,
        out: String::new(),
    };
    for node in significant(nodes) {
        writer.node(&node, false, 0);
    }
    writer.out
}

struct DialectWriter<'a> {
    options: &'a DialectOptions,
    out: String,
}

impl DialectWriter<'_> {
    fn indent(&self, depth: usize) -> String {
        if self.options.use_tabs {
            "\t".repeat(depth)
        } else {
            " ".repeat(depth * self.options.indent_width)
        }
    }

    fn line(&mut self, depth: usize, content: &str) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        let indent = self.indent(depth);
        self.out.push_str(&indent);
        self.out.push_str(content);
    }

    fn node(&mut self, node: &Significant<'_>, inline: bool, depth: usize) {
        match node {
            Significant::Text(text) => self.text(text, inline, depth),
            Significant::Element(element) => self.element(element, depth),
            Significant::Comment(data) => self.comment(data, depth),
        }
    }

    fn text(&mut self, text: &str, inline: bool, depth: usize) {
        if !text.contains('\n') {
            if inline {
                self.out.push(' ');
                self.out.push_str(text);
            } else {
                self.line(depth, &format!("| {text}"));
            }
            return;
        }

        self.line(depth, ".");
        for line in text.split('\n') {
            self.line(depth + 1, line.trim());
        }
    }

    fn element(&mut self, element: &Element, depth: usize) {
        let attributes: Vec<String> = element
            .attributes
            .iter()
            .map(|attribute| {
                let value = attribute
                    .value
                    .as_ref()
                    .map(|v| {
                        v.text
                            .split('\n')
                            .map(str::trim)
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .unwrap_or_default();
                if value.contains('"') {
                    format!("{}='{value}'", attribute.name)
                } else {
                    format!("{}=\"{value}\"", attribute.name)
                }
            })
            .collect();

        let mut code = element.name.to_string();
        if !attributes.is_empty() {
            code.push('(');
            code.push_str(&attributes.join(", "));
            code.push(')');
        }
        self.line(depth, &code);

        for (i, child) in significant(&element.children).iter().enumerate() {
            let inline = i == 0 && attributes.is_empty();
            self.node(child, inline, depth + 1);
        }
    }

    fn comment(&mut self, data: &str, depth: usize) {
        let lines: Vec<&str> = data.split('\n').map(str::trim).collect();
        if lines.len() >= 2 {
            self.line(depth, "//");
            for line in lines {
                self.line(depth + 1, line);
            }
        } else {
            for line in lines {
                self.line(depth, &format!("// {line}"));
            }
        }
    }
}
