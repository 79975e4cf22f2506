//! Template lowering: template tree → synthetic typed source + mappings.
//!
//! Every construct is emitted inside its own `{ }` block so names declared for
//! one element never collide with another's. Each emitter returns a
//! [`Fragment`]; the caller appends it, so no pass shares an accumulator.
//!
//! ```text
//! <comp :a="x" @go="run">        {
//!                                 __VDS_componentProps['comp'] = {
//!                                 'a': (x),
//!                                 };
//!                                 let __VDS_1!: { 'go': ... };
//!                                 ...
//!                                 __VDS_components['comp']['__VDS_options'];
//!                                 }
//! ```
//!
//! The generated code expects a preamble (supplied by whoever assembles the
//! virtual document) declaring `__VDS_components`, `__VDS_componentProps`,
//! `__VDS_componentEmits`, `__VDS_getVforSourceType`, `__VDS_FirstFunction`,
//! `__VDS_PickFunc` and `__VDS_for_key`.

mod control;
mod element;
mod fragment;
mod names;

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use tracing::trace;

use crate::base::TextRange;
use crate::dialect::OffsetMapper;
use crate::source_map::{Mapping, SourceMap};
use crate::template::{RootNode, TemplateNode};

pub use fragment::Fragment;
pub use names::{camelize, hyphenate, prop_key};

/// A markup document together with the dialect text it was generated from.
///
/// When passed to [`lower_template`], mappings point into `dialect`.
#[derive(Clone, Copy, Debug)]
pub struct DialectPair<'a> {
    pub markup: &'a str,
    pub dialect: &'a str,
}

/// Output of one lowering pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoweredTemplate {
    pub text: String,
    pub mappings: Vec<Mapping>,
    /// Every element tag, in order of first appearance.
    pub referenced_tags: IndexSet<SmolStr>,
    /// Slot name → synthetic variable holding its binding type.
    pub slots: IndexMap<SmolStr, String>,
}

impl LoweredTemplate {
    pub fn source_map(&self) -> SourceMap {
        SourceMap::new(self.mappings.clone())
    }
}

/// Lower a template tree.
///
/// With a dialect pair, every source range is re-resolved through an
/// [`OffsetMapper`] using the mapped literal as the needle; ranges that do
/// not resolve are dropped.
pub fn lower_template(root: &RootNode, dialect: Option<DialectPair<'_>>) -> LoweredTemplate {
    let mut cx = LoweringContext {
        mapper: dialect.map(|pair| OffsetMapper::new(pair.dialect, pair.markup)),
        ..LoweringContext::default()
    };

    let mut out = Fragment::new();
    for child in &root.children {
        out.write("{\n");
        out.append(cx.node(child, &[], false));
        out.write("}\n");
    }

    out.write("export default {\n");
    for (name, bind) in &cx.slots {
        out.write(&format!("'{name}': {bind},\n"));
    }
    out.write("};\n");

    let (text, mappings) = out.into_parts();
    LoweredTemplate {
        text,
        mappings,
        referenced_tags: cx.tags,
        slots: cx.slots,
    }
}

/// State of one lowering pass.
#[derive(Default)]
pub(crate) struct LoweringContext {
    mapper: Option<OffsetMapper>,
    counter: usize,
    tags: IndexSet<SmolStr>,
    slots: IndexMap<SmolStr, String>,
}

impl LoweringContext {
    /// A fresh synthetic identifier.
    pub(crate) fn next_var(&mut self) -> String {
        let name = format!("__VDS_{}", self.counter);
        self.counter += 1;
        name
    }

    /// Resolve source ranges against the dialect text, if there is one.
    pub(crate) fn origin<I>(&self, needle: &str, ranges: I) -> Vec<TextRange>
    where
        I: IntoIterator<Item = TextRange>,
    {
        let Some(mapper) = &self.mapper else {
            return ranges.into_iter().collect();
        };
        ranges
            .into_iter()
            .filter_map(|range| match mapper.map(needle, range.start()) {
                Some(start) => Some(TextRange::at(start, range.len())),
                None => {
                    trace!(needle, ?range, "dropping unresolved mapping");
                    None
                }
            })
            .collect()
    }

    pub(crate) fn node(
        &mut self,
        node: &TemplateNode,
        ancestors: &[&str],
        dont_create_block: bool,
    ) -> Fragment {
        match node {
            TemplateNode::Element(element) => self.element(element, ancestors, dont_create_block),
            TemplateNode::Interpolation(interpolation) => self.interpolation(interpolation),
            TemplateNode::If(node) => self.if_chain(node, ancestors),
            TemplateNode::For(node) => self.for_loop(node, ancestors),
            TemplateNode::Text(_) | TemplateNode::Comment(_) => Fragment::new(),
            TemplateNode::Other(other) => {
                let mut out = Fragment::new();
                out.write(&format!(
                    "// Unprocessed node kind: {} at {}..{}\n",
                    other.kind,
                    u32::from(other.loc.range.start()),
                    u32::from(other.loc.range.end()),
                ));
                out
            }
        }
    }
}
