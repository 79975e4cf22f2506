//! Indentation dialect ⇄ markup conversion.
//!
//! The two directions are not inverses of each other:
//!
//! - [`dialect_to_markup`] prepares a dialect document for typed analysis.
//!   It compiles the dialect, normalizes entity escapes, pretty-prints one
//!   construct per line and then re-indents every line that can be traced back
//!   to the dialect text, so that the markup lines up with what the user wrote.
//! - [`markup_to_dialect`] renders a markup tree as dialect text, for
//!   presenting results (e.g. formatted output) in the user's notation.
//!
//! [`OffsetMapper`] is the bridge between the two texts.

mod compile;
mod offset_mapper;
mod raise;

pub use compile::compile_dialect;
pub use offset_mapper::OffsetMapper;
pub use raise::markup_to_dialect;

use tracing::trace;

use crate::base::TextSize;
use crate::markup::{normalize_tree, parse_markup, pretty_print};

/// Indentation settings for generated dialect text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialectOptions {
    /// Spaces per nesting level when `use_tabs` is false.
    pub indent_width: usize,
    /// One tab per nesting level.
    pub use_tabs: bool,
}

impl Default for DialectOptions {
    fn default() -> Self {
        Self {
            indent_width: 2,
            use_tabs: false,
        }
    }
}

/// Convert dialect text into markup suitable for template parsing.
pub fn dialect_to_markup(dialect: &str) -> String {
    let compiled = compile_dialect(dialect);
    let mut nodes = parse_markup(&compiled);
    normalize_tree(&mut nodes);
    let pretty = pretty_print(&nodes);
    reindent(dialect, &pretty)
}

/// Re-indent each markup line with the whitespace that precedes the same text
/// in the dialect document.
///
/// Lines whose text cannot be located unambiguously keep their indentation.
pub fn reindent(dialect: &str, markup: &str) -> String {
    let mapper = OffsetMapper::new(dialect, markup);
    let mut out = String::with_capacity(markup.len());
    let mut offset = 0usize;

    for line in markup.split('\n') {
        let trimmed = line.trim_start();
        offset += line.len() - trimmed.len();
        // a comment's last line carries the closing marker the dialect lacks
        let needle = trimmed
            .strip_suffix("-->")
            .map(str::trim_end)
            .filter(|text| !text.is_empty())
            .unwrap_or(trimmed);
        let mapped = mapper.map(needle, TextSize::from(offset as u32));
        offset += trimmed.len() + 1;

        match mapped {
            Some(dialect_offset) => {
                let before = &dialect[..usize::from(dialect_offset)];
                let indent_start = before
                    .rfind(|c| c != ' ' && c != '\t')
                    .map_or(0, |i| i + 1);
                out.push_str(&before[indent_start..]);
                out.push_str(trimmed);
            }
            None => {
                if !trimmed.is_empty() {
                    trace!(line = trimmed, "no dialect position for markup line");
                }
                out.push_str(line);
            }
        }
        out.push('\n');
    }

    out.trim().to_string()
}
