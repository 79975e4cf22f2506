//! Template node tree.
//!
//! Structural directives are already applied: an element carrying `v-if`
//! becomes a branch of an [`IfNode`], one carrying `v-for` becomes a
//! [`ForNode`], and those directives no longer appear in the element's props.

use smol_str::SmolStr;

use crate::base::{TextRange, TextSize};

/// Where a node came from in the markup text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub range: TextRange,
    /// The markup text covered by `range`.
    pub source: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootNode {
    pub children: Vec<TemplateNode>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateNode {
    Element(ElementNode),
    Text(TextNode),
    Comment(CommentNode),
    Interpolation(InterpolationNode),
    If(IfNode),
    For(ForNode),
    /// A construct the template language does not model (e.g. `<!DOCTYPE>`).
    Other(OtherNode),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementNode {
    pub tag: SmolStr,
    pub props: Vec<Prop>,
    pub children: Vec<TemplateNode>,
    /// From `<` to the end of the end tag.
    pub loc: SourceLocation,
    /// The tag name inside the end tag, when there is one.
    pub end_tag_name: Option<TextRange>,
    pub self_closing: bool,
}

impl ElementNode {
    /// The tag name in the open tag.
    pub fn tag_range(&self) -> TextRange {
        let start = self.loc.range.start() + TextSize::from(1);
        TextRange::at(start, TextSize::of(self.tag.as_str()))
    }

    pub fn is_template(&self) -> bool {
        self.tag == "template"
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prop {
    Attribute(AttributeProp),
    Directive(DirectiveProp),
}

impl Prop {
    pub fn loc(&self) -> &SourceLocation {
        match self {
            Prop::Attribute(attribute) => &attribute.loc,
            Prop::Directive(directive) => &directive.loc,
        }
    }
}

/// A plain attribute such as `id="x"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeProp {
    pub name: SmolStr,
    /// The unquoted value.
    pub value: Option<String>,
    pub loc: SourceLocation,
}

/// `v-name:arg.modifier="exp"` and its `:`, `@` and `#` shorthands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectiveProp {
    /// Without the `v-` prefix: `bind`, `on`, `slot`, `model`, `show`, ...
    pub name: SmolStr,
    pub arg: Option<Expression>,
    pub exp: Option<Expression>,
    pub modifiers: Vec<SmolStr>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    pub content: String,
    /// For a dynamic argument `[name]` this covers the brackets too.
    pub range: TextRange,
    /// `false` for dynamic arguments.
    pub is_static: bool,
    /// A literal value with no reference to template scope.
    pub is_constant: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextNode {
    pub content: String,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentNode {
    pub content: String,
    pub range: TextRange,
}

/// `{{ expression }}`; `content` is trimmed and `range` covers exactly it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterpolationNode {
    pub content: Expression,
    pub loc: SourceLocation,
}

/// A `v-if` / `v-else-if` / `v-else` chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IfNode {
    pub branches: Vec<IfBranch>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IfBranch {
    /// `None` for `v-else`.
    pub condition: Option<Expression>,
    /// The element itself, or the children of a `<template>` wrapper.
    pub children: Vec<TemplateNode>,
    /// Source of the element that carried the directive.
    pub loc: SourceLocation,
}

/// `v-for="(value, key, index) in source"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForNode {
    pub source: Expression,
    pub value: Option<Expression>,
    pub key: Option<Expression>,
    pub index: Option<Expression>,
    pub children: Vec<TemplateNode>,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtherNode {
    pub kind: SmolStr,
    pub loc: SourceLocation,
}
