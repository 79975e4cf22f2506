//! Markup → template node tree.

use smol_str::SmolStr;

use crate::base::{TextRange, TextSize};
use crate::markup::{Attribute, Element, MarkupNode, Text, normalize_entities, parse_markup};

use super::ast::*;

/// Parse markup text into a template tree.
///
/// Never fails; constructs the template language does not know become
/// [`TemplateNode::Other`], and a malformed `v-for` yields a loop without a
/// value binding.
pub fn parse_template(markup: &str) -> RootNode {
    let nodes = parse_markup(markup);
    let converter = Converter { text: markup };
    RootNode {
        children: converter.children(&nodes),
    }
}

enum BranchKind {
    If(Expression),
    ElseIf(Expression),
    Else,
}

struct Converter<'a> {
    text: &'a str,
}

impl Converter<'_> {
    fn loc(&self, range: TextRange) -> SourceLocation {
        SourceLocation {
            range,
            source: self.text[range].to_string(),
        }
    }

    fn children(&self, nodes: &[MarkupNode]) -> Vec<TemplateNode> {
        let mut out = Vec::new();
        for node in nodes {
            match node {
                MarkupNode::Element(element) => self.element(element, &mut out),
                MarkupNode::Text(text) => self.text(text, &mut out),
                MarkupNode::Comment(comment) => out.push(TemplateNode::Comment(CommentNode {
                    content: comment.data.clone(),
                    range: comment.range,
                })),
                MarkupNode::Declaration(declaration) => out.push(TemplateNode::Other(OtherNode {
                    kind: SmolStr::new_static("declaration"),
                    loc: self.loc(declaration.range),
                })),
            }
        }
        out
    }

    /// Split text into plain runs and `{{ }}` interpolations.
    fn text(&self, text: &Text, out: &mut Vec<TemplateNode>) {
        let raw = text.text.as_str();
        let base = text.range.start();
        let mut rest = 0;

        while let Some(open) = raw[rest..].find("{{").map(|i| rest + i) {
            let Some(close) = raw[open + 2..].find("}}").map(|i| open + 2 + i) else {
                break;
            };
            self.plain(raw, rest, open, base, out);
            let (start, end) = trim_span(raw, open + 2, close);
            out.push(TemplateNode::Interpolation(InterpolationNode {
                content: expression(raw, start, end, base),
                loc: self.loc(span(base, open, close + 2)),
            }));
            rest = close + 2;
        }
        self.plain(raw, rest, raw.len(), base, out);
    }

    fn plain(&self, raw: &str, start: usize, end: usize, base: TextSize, out: &mut Vec<TemplateNode>) {
        let slice = &raw[start..end];
        if slice.trim().is_empty() {
            return;
        }
        out.push(TemplateNode::Text(TextNode {
            content: normalize_entities(slice).into_owned(),
            range: span(base, start, end),
        }));
    }

    fn element(&self, element: &Element, out: &mut Vec<TemplateNode>) {
        let mut branch = None;
        let mut v_for = None;
        let mut props = Vec::new();

        for attribute in &element.attributes {
            match attribute.name.as_str() {
                "v-if" => branch = Some(BranchKind::If(condition(attribute))),
                "v-else-if" => branch = Some(BranchKind::ElseIf(condition(attribute))),
                "v-else" => branch = Some(BranchKind::Else),
                "v-for" => v_for = Some(attribute),
                _ => props.push(self.prop(attribute)),
            }
        }

        let node = ElementNode {
            tag: element.name.clone(),
            props,
            children: self.children(&element.children),
            loc: self.loc(element.range),
            end_tag_name: element.end_tag_name,
            self_closing: element.self_closing,
        };
        let loc = node.loc.clone();

        let unwrap = node.is_template() && (branch.is_some() || v_for.is_some());
        let mut body = if unwrap {
            node.children
        } else {
            vec![TemplateNode::Element(node)]
        };
        if let Some(attribute) = v_for {
            body = vec![TemplateNode::For(for_node(attribute, loc.clone(), body))];
        }

        let (condition, is_continuation) = match branch {
            None => {
                out.extend(body);
                return;
            }
            Some(BranchKind::If(exp)) => (Some(exp), false),
            Some(BranchKind::ElseIf(exp)) => (Some(exp), true),
            Some(BranchKind::Else) => (None, true),
        };
        let branch = IfBranch {
            condition,
            children: body,
            loc: loc.clone(),
        };

        if is_continuation {
            // comments between branches belong to no branch
            let chain_at = out
                .iter()
                .rposition(|n| !matches!(n, TemplateNode::Comment(_)));
            if let Some(index) = chain_at {
                if let TemplateNode::If(_) = out[index] {
                    out.truncate(index + 1);
                    if let Some(TemplateNode::If(chain)) = out.last_mut() {
                        let range = chain.loc.range.cover(loc.range);
                        chain.loc = self.loc(range);
                        chain.branches.push(branch);
                    }
                    return;
                }
            }
        }
        out.push(TemplateNode::If(IfNode {
            branches: vec![branch],
            loc,
        }));
    }

    fn prop(&self, attribute: &Attribute) -> Prop {
        let loc = self.loc(attribute.range);
        let Some(parts) = directive_parts(&attribute.name) else {
            return Prop::Attribute(AttributeProp {
                name: attribute.name.clone(),
                value: attribute
                    .value
                    .as_ref()
                    .map(|v| normalize_entities(&v.text).into_owned()),
                loc,
            });
        };

        let name_start = attribute.name_range.start();
        let arg = parts.arg.map(|(start, end)| {
            let raw = &attribute.name[start..end];
            let dynamic = raw.starts_with('[');
            let content = if dynamic {
                raw.trim_start_matches('[').trim_end_matches(']')
            } else {
                raw
            };
            Expression {
                content: content.to_string(),
                range: span(name_start, start, end),
                is_static: !dynamic,
                is_constant: !dynamic,
            }
        });
        let exp = attribute.value.as_ref().map(|value| {
            let content = normalize_entities(&value.text).into_owned();
            Expression {
                is_constant: is_literal(&content),
                content,
                range: value.range,
                is_static: false,
            }
        });

        Prop::Directive(DirectiveProp {
            name: parts.name,
            arg,
            exp,
            modifiers: parts.modifiers,
            loc,
        })
    }
}

struct DirectiveParts {
    name: SmolStr,
    /// Byte span of the argument inside the attribute name.
    arg: Option<(usize, usize)>,
    modifiers: Vec<SmolStr>,
}

/// Split `v-name:arg.mod`, `:arg`, `@arg` and `#arg`; `None` for plain attributes.
fn directive_parts(name: &str) -> Option<DirectiveParts> {
    let (directive, arg_start, rest_start) = if let Some(rest) = name.strip_prefix("v-") {
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        let after = 2 + end;
        if name[after..].starts_with(':') {
            (&rest[..end], Some(after + 1), after + 1)
        } else {
            (&rest[..end], None, after)
        }
    } else {
        let directive = match name.as_bytes().first() {
            Some(b':') => "bind",
            Some(b'@') => "on",
            Some(b'#') => "slot",
            _ => return None,
        };
        (directive, Some(1), 1)
    };

    let mut rest_start = rest_start;
    let arg = arg_start.and_then(|start| {
        let tail = &name[start..];
        let len = if tail.starts_with('[') {
            tail.find(']').map_or(tail.len(), |i| i + 1)
        } else {
            tail.find('.').unwrap_or(tail.len())
        };
        rest_start = start + len;
        (len > 0).then_some((start, start + len))
    });

    let modifiers = name[rest_start..]
        .split('.')
        .filter(|m| !m.is_empty())
        .map(SmolStr::new)
        .collect();

    Some(DirectiveParts {
        name: SmolStr::new(directive),
        arg,
        modifiers,
    })
}

fn condition(attribute: &Attribute) -> Expression {
    match &attribute.value {
        Some(value) => {
            let content = normalize_entities(&value.text).into_owned();
            Expression {
                is_constant: is_literal(&content),
                content,
                range: value.range,
                is_static: false,
            }
        }
        None => Expression {
            content: "true".to_string(),
            range: TextRange::empty(attribute.range.end()),
            is_static: false,
            is_constant: true,
        },
    }
}

/// `value in source`, `(value, key, index) of source`.
fn for_node(attribute: &Attribute, loc: SourceLocation, children: Vec<TemplateNode>) -> ForNode {
    let (raw, base) = match &attribute.value {
        Some(value) => (value.text.as_str(), value.range.start()),
        None => ("", attribute.range.end()),
    };

    let Some((lhs_end, rhs_start)) = find_alias_separator(raw) else {
        let (start, end) = trim_span(raw, 0, raw.len());
        return ForNode {
            source: expression(raw, start, end, base),
            value: None,
            key: None,
            index: None,
            children,
            loc,
        };
    };

    let (source_start, source_end) = trim_span(raw, rhs_start, raw.len());
    let (mut start, mut end) = trim_span(raw, 0, lhs_end);
    if raw[start..end].starts_with('(') {
        start += 1;
    }
    if end > start && raw[start..end].ends_with(')') {
        end -= 1;
    }

    let mut value_end = end;
    let mut key = None;
    let mut index = None;
    if let Some((comma, second)) = find_iterator(raw, start, end) {
        value_end = comma;
        let key_end = second.unwrap_or(end);
        key = non_empty(raw, comma + 1, key_end, base);
        index = second.and_then(|second| non_empty(raw, second + 1, end, base));
    }

    ForNode {
        source: expression(raw, source_start, source_end, base),
        value: non_empty(raw, start, value_end, base),
        key,
        index,
        children,
        loc,
    }
}

/// End of the alias part and start of the source part: the first run of
/// whitespace followed by `in` or `of` and more whitespace.
fn find_alias_separator(raw: &str) -> Option<(usize, usize)> {
    let bytes = raw.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if !b.is_ascii_whitespace() {
            continue;
        }
        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let keyword = raw.get(j..j + 2);
        if matches!(keyword, Some("in" | "of"))
            && bytes.get(j + 2).is_some_and(|b| b.is_ascii_whitespace())
        {
            return Some((i, j + 2));
        }
    }
    None
}

/// Commas introducing `, key` or `, key, index` at the end of the alias.
///
/// Neither part may contain `,`, `}` or `]`, so destructuring patterns are
/// never split.
fn find_iterator(raw: &str, start: usize, end: usize) -> Option<(usize, Option<usize>)> {
    let alias = &raw[start..end];
    for (i, _) in alias.match_indices(',') {
        let rest = &alias[i + 1..];
        let parts: Vec<&str> = rest.split(',').collect();
        let clean = parts.iter().all(|p| !p.contains(['}', ']']));
        match parts.as_slice() {
            [_] if clean => return Some((start + i, None)),
            [first, _] if clean => return Some((start + i, Some(start + i + 1 + first.len()))),
            _ => {}
        }
    }
    None
}

fn non_empty(raw: &str, start: usize, end: usize, base: TextSize) -> Option<Expression> {
    let (start, end) = trim_span(raw, start, end);
    (start < end).then(|| expression(raw, start, end, base))
}

fn expression(raw: &str, start: usize, end: usize, base: TextSize) -> Expression {
    let content = normalize_entities(&raw[start..end]).into_owned();
    Expression {
        is_constant: is_literal(&content),
        content,
        range: span(base, start, end),
        is_static: false,
    }
}

/// Shrink `start..end` of `text` to exclude surrounding whitespace.
fn trim_span(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    if lead == slice.len() {
        return (end, end);
    }
    (start + lead, end - trail)
}

fn span(base: TextSize, start: usize, end: usize) -> TextRange {
    TextRange::new(
        base + TextSize::from(start as u32),
        base + TextSize::from(end as u32),
    )
}

/// Keyword, number or plain string literal.
fn is_literal(exp: &str) -> bool {
    let exp = exp.trim();
    if matches!(exp, "true" | "false" | "null" | "undefined") {
        return true;
    }
    let Some(first) = exp.chars().next() else {
        return false;
    };
    if (first.is_ascii_digit() || first == '.' || first == '-') && exp.parse::<f64>().is_ok() {
        return true;
    }
    match first {
        '\'' | '"' => exp.len() >= 2 && exp.ends_with(first) && !exp[1..exp.len() - 1].contains(first),
        '`' => exp.len() >= 2 && exp.ends_with('`') && !exp[1..exp.len() - 1].contains(['`', '$']),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn only_element(root: &RootNode) -> &ElementNode {
        match root.children.as_slice() {
            [TemplateNode::Element(element)] => element,
            other => panic!("expected one element, got {other:?}"),
        }
    }

    fn directive(prop: &Prop) -> &DirectiveProp {
        match prop {
            Prop::Directive(directive) => directive,
            Prop::Attribute(attribute) => panic!("expected directive, got {attribute:?}"),
        }
    }

    #[rstest]
    #[case(":title", "bind", Some("title"), &[])]
    #[case("v-bind:title.sync", "bind", Some("title"), &["sync"])]
    #[case("@click.stop.prevent", "on", Some("click"), &["stop", "prevent"])]
    #[case("@update:modelValue", "on", Some("update:modelValue"), &[])]
    #[case("#header", "slot", Some("header"), &[])]
    #[case("v-show", "show", None, &[])]
    #[case("v-model.trim", "model", None, &["trim"])]
    #[case(":[key]", "bind", Some("key"), &[])]
    fn test_directive_names(
        #[case] name: &str,
        #[case] expected: &str,
        #[case] arg: Option<&str>,
        #[case] modifiers: &[&str],
    ) {
        let markup = format!("<a {name}=\"x\"></a>");
        let root = parse_template(&markup);
        let element = only_element(&root);
        let prop = directive(&element.props[0]);
        assert_eq!(prop.name, expected);
        assert_eq!(prop.arg.as_ref().map(|a| a.content.as_str()), arg);
        assert_eq!(prop.modifiers, modifiers);
    }

    #[test]
    fn test_argument_and_expression_ranges() {
        let markup = r#"<comp :[key]="value" @click="go(1)"/>"#;
        let root = parse_template(markup);
        let element = only_element(&root);

        let bind = directive(&element.props[0]);
        let arg = bind.arg.as_ref().unwrap();
        assert_eq!(&markup[arg.range], "[key]");
        assert!(!arg.is_static);
        assert_eq!(&markup[bind.exp.as_ref().unwrap().range], "value");

        let on = directive(&element.props[1]);
        assert_eq!(&markup[on.arg.as_ref().unwrap().range], "click");
        assert_eq!(&markup[on.exp.as_ref().unwrap().range], "go(1)");
        assert_eq!(&markup[element.tag_range()], "comp");
    }

    #[test]
    fn test_plain_attribute() {
        let root = parse_template(r#"<div id="x" hidden></div>"#);
        let element = only_element(&root);
        assert_eq!(
            element.props,
            vec![
                Prop::Attribute(AttributeProp {
                    name: "id".into(),
                    value: Some("x".to_string()),
                    loc: SourceLocation {
                        range: TextRange::new(5.into(), 11.into()),
                        source: r#"id="x""#.to_string(),
                    },
                }),
                Prop::Attribute(AttributeProp {
                    name: "hidden".into(),
                    value: None,
                    loc: SourceLocation {
                        range: TextRange::new(12.into(), 18.into()),
                        source: "hidden".to_string(),
                    },
                }),
            ]
        );
    }

    #[test]
    fn test_interpolation_is_trimmed() {
        let markup = "<p>a {{ count }} b</p>";
        let root = parse_template(markup);
        let element = only_element(&root);
        let [
            TemplateNode::Text(before),
            TemplateNode::Interpolation(interpolation),
            TemplateNode::Text(after),
        ] = element.children.as_slice()
        else {
            panic!("unexpected children {:?}", element.children);
        };
        assert_eq!(before.content, "a ");
        assert_eq!(after.content, " b");
        assert_eq!(interpolation.content.content, "count");
        assert_eq!(&markup[interpolation.content.range], "count");
        assert_eq!(interpolation.loc.source, "{{ count }}");
    }

    #[test]
    fn test_if_chain() {
        let markup = "<a v-if=\"x\"></a>\n<!-- c -->\n<b v-else-if=\"y\"></b>\n<template v-else><i></i></template>";
        let root = parse_template(markup);
        let [TemplateNode::If(chain)] = root.children.as_slice() else {
            panic!("expected one chain, got {:?}", root.children);
        };
        assert_eq!(chain.branches.len(), 3);
        assert_eq!(chain.branches[0].condition.as_ref().unwrap().content, "x");
        assert_eq!(chain.branches[1].condition.as_ref().unwrap().content, "y");
        assert!(chain.branches[2].condition.is_none());

        // the directive is consumed, the element stays
        let [TemplateNode::Element(a)] = chain.branches[0].children.as_slice() else {
            panic!()
        };
        assert!(a.props.is_empty());
        // a <template> wrapper is unwrapped
        let [TemplateNode::Element(i)] = chain.branches[2].children.as_slice() else {
            panic!()
        };
        assert_eq!(i.tag, "i");
        assert!(chain.branches[2].loc.source.starts_with("<template"));
    }

    #[test]
    fn test_else_without_if_starts_a_chain() {
        let root = parse_template("<p></p><a v-else></a>");
        assert!(matches!(root.children.as_slice(), [TemplateNode::Element(_), TemplateNode::If(_)]));
    }

    #[rstest]
    #[case("item in list", "list", Some("item"), None, None)]
    #[case("item of list", "list", Some("item"), None, None)]
    #[case("(item, key, i) in items", "items", Some("item"), Some("key"), Some("i"))]
    #[case("({ a, b }, i) in items", "items", Some("{ a, b }"), Some("i"), None)]
    #[case("n in 10", "10", Some("n"), None, None)]
    #[case("garbage", "garbage", None, None, None)]
    fn test_for_expression(
        #[case] exp: &str,
        #[case] source: &str,
        #[case] value: Option<&str>,
        #[case] key: Option<&str>,
        #[case] index: Option<&str>,
    ) {
        let markup = format!("<li v-for=\"{exp}\"></li>");
        let root = parse_template(&markup);
        let [TemplateNode::For(node)] = root.children.as_slice() else {
            panic!("expected loop, got {:?}", root.children);
        };
        assert_eq!(node.source.content, source);
        assert_eq!(&markup[node.source.range], source);
        let text = |e: &Option<Expression>| e.as_ref().map(|e| markup[e.range].to_string());
        assert_eq!(text(&node.value).as_deref(), value);
        assert_eq!(text(&node.key).as_deref(), key);
        assert_eq!(text(&node.index).as_deref(), index);
    }

    #[test]
    fn test_if_wraps_for() {
        let root = parse_template(r#"<li v-for="x in xs" v-if="ok"></li>"#);
        let [TemplateNode::If(chain)] = root.children.as_slice() else {
            panic!()
        };
        assert!(matches!(
            chain.branches[0].children.as_slice(),
            [TemplateNode::For(_)]
        ));
    }

    #[test]
    fn test_declaration_is_other() {
        let root = parse_template("<!DOCTYPE html><p></p>");
        assert!(matches!(&root.children[0], TemplateNode::Other(o) if o.kind == "declaration"));
    }

    #[rstest]
    #[case("1", true)]
    #[case("'a'", true)]
    #[case("true", true)]
    #[case("-2.5", true)]
    #[case("count", false)]
    #[case("`a${b}`", false)]
    #[case("'a' + b", false)]
    #[case("inf", false)]
    fn test_is_literal(#[case] exp: &str, #[case] expected: bool) {
        assert_eq!(is_literal(exp), expected);
    }
}
