//! Element emission: props, events, slots and the registry lookup.

use crate::base::{TextRange, TextSize};
use crate::source_map::{Capabilities, MappingMode, MappingTag};
use crate::template::{AttributeProp, DirectiveProp, ElementNode, Expression, Prop};

use super::LoweringContext;
use super::fragment::Fragment;
use super::names::{camelize, prop_key};

/// A directive with an argument whose expression is not a literal.
fn bound_argument(directive: &DirectiveProp) -> Option<&Expression> {
    let constant = directive.exp.as_ref().is_some_and(|exp| exp.is_constant);
    directive.arg.as_ref().filter(|_| !constant)
}

impl LoweringContext {
    pub(crate) fn element(
        &mut self,
        node: &ElementNode,
        ancestors: &[&str],
        dont_create_block: bool,
    ) -> Fragment {
        let mut out = Fragment::new();
        if !dont_create_block {
            out.write("{\n");
        }

        self.tags.insert(node.tag.clone());
        out.append(self.import_slots(node, ancestors));
        out.append(self.argumentless_directives(node));
        out.append(self.props(node));
        out.append(self.events(node));
        out.append(self.option_references(node));
        out.append(self.slot_binding(node));

        let mut inner: Vec<&str> = ancestors.to_vec();
        inner.push(&node.tag);
        for child in &node.children {
            out.append(self.node(child, &inner, false));
        }

        out.write(&format!("__VDS_components['{}'][", node.tag));
        let tag = self.origin(&node.tag, [node.tag_range()]);
        out.quoted("__VDS_options", &tag, Capabilities::REFERENCES_ONLY, None);
        out.write("];\n");

        if !dont_create_block {
            out.write("}\n");
        }
        out
    }

    /// `v-slot="scope"`: declare the scope from the owning component's slot.
    fn import_slots(&mut self, node: &ElementNode, ancestors: &[&str]) -> Fragment {
        let mut out = Fragment::new();
        for prop in &node.props {
            let Prop::Directive(directive) = prop else {
                continue;
            };
            if directive.name != "slot" {
                continue;
            }
            let Some(exp) = &directive.exp else {
                continue;
            };
            let owner = std::iter::once(node.tag.as_str())
                .chain(ancestors.iter().rev().copied())
                .find(|tag| *tag != "template");
            let Some(owner) = owner else {
                continue;
            };

            out.write("let ");
            let origin = self.origin(&exp.content, [exp.range]);
            out.mapped(&exp.content, &origin, MappingMode::Offset, Capabilities::ALL, None);
            let slot = directive
                .arg
                .as_ref()
                .map(|arg| arg.content.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or("default");
            out.write(&format!(
                " = __VDS_components['{owner}'].__VDS_slots['{slot}'];\n"
            ));
        }
        out
    }

    /// `v-show="exp"` and every other directive without an argument.
    fn argumentless_directives(&mut self, node: &ElementNode) -> Fragment {
        let mut out = Fragment::new();
        for prop in &node.props {
            let Prop::Directive(DirectiveProp {
                arg: None,
                exp: Some(exp),
                ..
            }) = prop
            else {
                continue;
            };
            out.write("(");
            let origin = self.origin(&exp.content, [exp.range]);
            out.mapped(&exp.content, &origin, MappingMode::Offset, Capabilities::ALL, None);
            out.write(");\n");
        }
        out
    }

    /// The property bag checked against the component's prop table.
    fn props(&mut self, node: &ElementNode) -> Fragment {
        let mut out = Fragment::new();
        let tag_range = node.tag_range();
        let mut tag_ranges = vec![tag_range];
        if !node.self_closing {
            tag_ranges.extend(node.end_tag_name);
        }

        let bag = format!("__VDS_componentProps['{}']", node.tag);
        let origin = self.origin(&node.tag, [tag_range]);
        out.map_ahead(
            TextSize::of(bag.as_str()),
            &origin,
            MappingMode::Gate,
            Capabilities::DIAGNOSTIC_ONLY,
            None,
        );
        out.write("__VDS_componentProps[");
        let origin = self.origin(&node.tag, tag_ranges);
        out.quoted(
            &node.tag,
            &origin,
            Capabilities::HTML_TAG_OR_ATTR,
            Some(MappingTag::ElementTag),
        );
        out.write("] = {\n");

        for prop in &node.props {
            match prop {
                Prop::Directive(directive) => match bound_argument(directive) {
                    Some(arg) if directive.name == "bind" || directive.name == "model" => {
                        self.bound_prop(&mut out, directive, arg);
                    }
                    Some(_) => {}
                    None => {
                        let content = |e: &Option<Expression>| {
                            e.as_ref().map(|e| e.content.clone()).unwrap_or_default()
                        };
                        out.write(&format!(
                            "/* directive, {}, {}, {}, {} */\n",
                            directive.name,
                            content(&directive.arg),
                            content(&directive.exp),
                            directive.loc.source,
                        ));
                    }
                },
                Prop::Attribute(attribute) => self.attribute_prop(&mut out, attribute),
            }
        }
        out.write("};\n");
        out
    }

    /// `'key': (exp),` plus the original spelling when it was kebab-case.
    fn bound_prop(&self, out: &mut Fragment, directive: &DirectiveProp, arg: &Expression) {
        let key = prop_key(&arg.content);
        let value = directive
            .exp
            .as_ref()
            .map_or("undefined", |exp| exp.content.as_str());

        let entry = format!("'{key}': ({value})");
        let origin = self.origin(&directive.loc.source, [directive.loc.range]);
        out.map_ahead(
            TextSize::of(entry.as_str()),
            &origin,
            MappingMode::Gate,
            Capabilities::DIAGNOSTIC_ONLY,
            None,
        );
        let name_origin = self.origin(&arg.content, [arg.range]);
        out.quoted(
            &key,
            &name_origin,
            Capabilities::HTML_TAG_OR_ATTR,
            Some(MappingTag::Prop),
        );
        out.write(": (");
        match &directive.exp {
            Some(exp) => {
                let origin = self.origin(&exp.content, [exp.range]);
                out.mapped(&exp.content, &origin, MappingMode::Offset, Capabilities::ALL, None);
            }
            None => out.write(value),
        }
        out.write("),\n");

        if arg.content != key {
            out.quoted(
                &arg.content,
                &name_origin,
                Capabilities::HTML_TAG_OR_ATTR,
                Some(MappingTag::Prop),
            );
            out.write(&format!(": ({value}),\n"));
        }
    }

    /// ``'key': `value`,`` for a plain attribute.
    fn attribute_prop(&self, out: &mut Fragment, attribute: &AttributeProp) {
        let key = prop_key(&attribute.name);
        let value = attribute.value.as_deref().unwrap_or("").replace('`', "\\`");

        let entry = format!("'{key}': `{value}`");
        let origin = self.origin(&attribute.loc.source, [attribute.loc.range]);
        out.map_ahead(
            TextSize::of(entry.as_str()),
            &origin,
            MappingMode::Gate,
            Capabilities::DIAGNOSTIC_ONLY,
            None,
        );
        let name_origin = self.origin(&attribute.name, [attribute_name_range(attribute)]);
        out.quoted(
            &key,
            &name_origin,
            Capabilities::HTML_TAG_OR_ATTR,
            Some(MappingTag::Prop),
        );
        out.write(&format!(": `{value}`,\n"));

        if attribute.name != key {
            out.quoted(
                &attribute.name,
                &name_origin,
                Capabilities::HTML_TAG_OR_ATTR,
                Some(MappingTag::Prop),
            );
            out.write(&format!(": `{value}`,\n"));
        }
    }

    /// Event listeners checked against the component's emits, reading the
    /// handler both as a function value and as an inline statement.
    fn events(&mut self, node: &ElementNode) -> Fragment {
        let mut out = Fragment::new();
        let tag = &node.tag;
        for prop in &node.props {
            let var = self.next_var();
            let Prop::Directive(directive) = prop else {
                continue;
            };
            let Some(arg) = bound_argument(directive).filter(|_| directive.name == "on") else {
                continue;
            };

            let event = arg.content.as_str();
            let listener = camelize(&format!("on-{event}"));
            let origin = self.origin(event, [arg.range]);

            out.write(&format!(
                "let {var}!: {{ '{event}': __VDS_FirstFunction<typeof __VDS_componentEmits['{tag}']["
            ));
            out.quoted(event, &origin, Capabilities::HTML_TAG_OR_ATTR, None);
            out.write(&format!("], typeof __VDS_componentProps['{tag}']["));
            out.quoted(&listener, &origin, Capabilities::HTML_TAG_OR_ATTR, None);
            out.write("]> };\n");

            match &directive.exp {
                Some(exp) => {
                    let as_value = self.next_var();
                    let as_statement = self.next_var();
                    let picked = self.next_var();
                    let content = &exp.content;
                    out.write(&format!(
                        "const {as_value} = (() => {{ return {content} }})();\n"
                    ));
                    out.write(&format!("const {as_statement} = () => {{ {content} }};\n"));
                    out.write(&format!(
                        "let {picked}!: __VDS_PickFunc<typeof {as_value}, typeof {as_statement}>;\n"
                    ));
                    out.write(&format!("{var} = {{\n"));
                    out.quoted(event, &origin, Capabilities::HTML_TAG_OR_ATTR, None);
                    out.write(&format!(": {picked},\n}};\n"));
                }
                None => {
                    out.write(&format!("{var} = {{\n"));
                    out.quoted(event, &origin, Capabilities::HTML_TAG_OR_ATTR, None);
                    out.write(": undefined,\n};\n");
                }
            }

            if let Some(exp) = &directive.exp {
                out.write(&format!("{var} = {{\n'{event}': "));
                let exp_origin = self.origin(&exp.content, [exp.range]);
                if exp.content.contains("=>") {
                    out.write("(");
                    out.mapped(&exp.content, &exp_origin, MappingMode::Offset, Capabilities::ALL, None);
                    out.write("),\n");
                } else {
                    out.write("() => { ");
                    out.mapped(&exp.content, &exp_origin, MappingMode::Offset, Capabilities::ALL, None);
                    out.write(" },\n");
                }
                out.write("};\n");
            }
        }
        out
    }

    /// Reference the declaring option so find-references reaches prop and
    /// emit declarations (including props with default values).
    fn option_references(&mut self, node: &ElementNode) -> Fragment {
        let mut out = Fragment::new();
        for prop in &node.props {
            let (option, name, range) = match prop {
                Prop::Directive(directive) => {
                    let Some(arg) = bound_argument(directive) else {
                        continue;
                    };
                    match directive.name.as_str() {
                        "bind" | "model" => ("props", arg.content.as_str(), arg.range),
                        "on" => ("emits", arg.content.as_str(), arg.range),
                        _ => continue,
                    }
                }
                Prop::Attribute(attribute) => (
                    "props",
                    attribute.name.as_str(),
                    attribute_name_range(attribute),
                ),
            };

            let tag = (option == "props").then_some(MappingTag::Prop);
            out.write(&format!(
                "__VDS_components['{}']['__VDS_options']['{option}'][",
                node.tag
            ));
            let origin = self.origin(name, [range]);
            out.quoted(&prop_key(name), &origin, Capabilities::HTML_TAG_OR_ATTR, tag);
            out.write("];\n");
        }
        out
    }

    /// `<slot>`: a typed binding object for the consumer's scope variable.
    fn slot_binding(&mut self, node: &ElementNode) -> Fragment {
        let mut out = Fragment::new();
        if node.tag != "slot" {
            return out;
        }
        let default_bind = self.next_var();
        let binds = self.next_var();
        let slot_var = self.next_var();

        let mut has_default_bind = false;
        for prop in &node.props {
            let Prop::Directive(DirectiveProp {
                arg: None,
                exp: Some(exp),
                ..
            }) = prop
            else {
                continue;
            };
            has_default_bind = true;
            out.write(&format!("const {default_bind} = ("));
            let origin = self.origin(&exp.content, [exp.range]);
            out.mapped(&exp.content, &origin, MappingMode::Offset, Capabilities::ALL, None);
            out.write(");\n");
            break;
        }

        let mut has_binds = false;
        out.write(&format!("const {binds} = {{\n"));
        for prop in &node.props {
            let Prop::Directive(DirectiveProp {
                arg: Some(arg),
                exp: Some(exp),
                ..
            }) = prop
            else {
                continue;
            };
            has_binds = true;
            let name_origin = self.origin(&arg.content, [arg.range]);
            out.quoted(
                &arg.content,
                &name_origin,
                Capabilities::HTML_TAG_OR_ATTR,
                Some(MappingTag::Prop),
            );
            out.write(": (");
            let origin = self.origin(&exp.content, [exp.range]);
            out.mapped(&exp.content, &origin, MappingMode::Offset, Capabilities::ALL, None);
            out.write("),\n");
        }
        out.write("};\n");

        let slot_type = match (has_default_bind, has_binds) {
            (true, true) => format!("typeof {default_bind} & typeof {binds}"),
            (true, false) => format!("typeof {default_bind}"),
            (false, true) => format!("typeof {binds}"),
            (false, false) => return out,
        };
        out.write(&format!("var {slot_var}!: {slot_type};\n"));
        self.slots.insert(slot_name(node).into(), slot_var);
        out
    }
}

/// The `name` attribute of a `<slot>`, `default` when absent or empty.
fn slot_name(node: &ElementNode) -> &str {
    node.props
        .iter()
        .find_map(|prop| match prop {
            Prop::Attribute(attribute) if attribute.name == "name" => attribute.value.as_deref(),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .unwrap_or("default")
}

fn attribute_name_range(attribute: &AttributeProp) -> TextRange {
    TextRange::at(
        attribute.loc.range.start(),
        TextSize::of(attribute.name.as_str()),
    )
}
