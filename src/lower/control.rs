//! Interpolations, conditional chains and loops.

use crate::source_map::{Capabilities, MappingMode};
use crate::template::{ForNode, IfNode, InterpolationNode, SourceLocation, TemplateNode};

use super::LoweringContext;
use super::fragment::Fragment;

/// Whether the construct was written on a `<template>` wrapper, whose
/// children then need blocks of their own.
fn is_template_wrapper(loc: &SourceLocation) -> bool {
    loc.source.get(1..9) == Some("template")
}

impl LoweringContext {
    pub(crate) fn interpolation(&mut self, node: &InterpolationNode) -> Fragment {
        let mut out = Fragment::new();
        let exp = &node.content;
        out.write("{");
        let origin = self.origin(&exp.content, [exp.range]);
        out.mapped(&exp.content, &origin, MappingMode::Offset, Capabilities::ALL, None);
        out.write("};\n");
        out
    }

    pub(crate) fn if_chain(&mut self, node: &IfNode, ancestors: &[&str]) -> Fragment {
        let mut out = Fragment::new();
        let mut first = true;

        for branch in &node.branches {
            match &branch.condition {
                Some(condition) => {
                    out.write(if first { "if (\n(" } else { "else if (\n(" });
                    first = false;
                    let origin = self.origin(&condition.content, [condition.range]);
                    out.mapped(
                        &condition.content,
                        &origin,
                        MappingMode::Offset,
                        Capabilities::ALL,
                        None,
                    );
                    out.write(")\n) {\n");
                }
                None => out.write("else {\n"),
            }
            out.append(self.children(&branch.children, ancestors, &branch.loc));
            out.write("}\n");
        }
        out
    }

    pub(crate) fn for_loop(&mut self, node: &ForNode, ancestors: &[&str]) -> Fragment {
        let mut out = Fragment::new();
        let Some(value) = &node.value else {
            return out;
        };
        let source = &node.source;
        let source_var = self.next_var();

        out.write(&format!("const {source_var} = __VDS_getVforSourceType("));
        let source_origin = self.origin(&source.content, [source.range]);
        out.mapped(
            &source.content,
            &source_origin,
            MappingMode::Offset,
            Capabilities::NO_FORMATTING,
            None,
        );
        out.write(");\n");

        out.write("for (__VDS_for_key in ");
        out.mapped(
            &source_var,
            &source_origin,
            MappingMode::Gate,
            Capabilities::DIAGNOSTIC_ONLY,
            None,
        );
        out.write(") {\n");

        out.write("const ");
        let origin = self.origin(&value.content, [value.range]);
        out.mapped(
            &value.content,
            &origin,
            MappingMode::Offset,
            Capabilities::NO_FORMATTING,
            None,
        );
        out.write(&format!(" = {source_var}[__VDS_for_key];\n"));

        for (binding, init) in [(&node.key, " = 0 as any;\n"), (&node.index, " = 0;\n")] {
            let Some(binding) = binding else {
                continue;
            };
            out.write("const ");
            let origin = self.origin(&binding.content, [binding.range]);
            out.mapped(
                &binding.content,
                &origin,
                MappingMode::Offset,
                Capabilities::NO_FORMATTING,
                None,
            );
            out.write(init);
        }

        out.append(self.children(&node.children, ancestors, &node.loc));
        out.write("}\n");
        out
    }

    /// Children of a branch or loop body; elements share the enclosing block
    /// unless they came out of a `<template>` wrapper.
    fn children(
        &mut self,
        children: &[TemplateNode],
        ancestors: &[&str],
        loc: &SourceLocation,
    ) -> Fragment {
        let dont_create_block = !is_template_wrapper(loc);
        let mut out = Fragment::new();
        for child in children {
            out.append(self.node(child, ancestors, dont_create_block));
        }
        out
    }
}
