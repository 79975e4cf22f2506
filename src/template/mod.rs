//! Template node tree and its parser.
//!
//! The lowering engine consumes this tree structurally. [`parse_template`]
//! builds it from markup text; ranges are byte ranges into that text.

mod ast;
mod parse;

pub use ast::{
    AttributeProp, CommentNode, DirectiveProp, ElementNode, Expression, ForNode, IfBranch, IfNode,
    InterpolationNode, OtherNode, Prop, RootNode, SourceLocation, TemplateNode, TextNode,
};
pub use parse::parse_template;
