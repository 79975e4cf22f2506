//! Source text positions and ranges.
//!
//! All offsets in this crate are UTF-8 byte offsets held in [`TextSize`].

use std::fmt;

pub use text_size::TextRange;
pub use text_size::TextSize;

/// A line and column position in source text.
///
/// Both line and column are 0-indexed internally, but displayed as 1-indexed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct LineCol {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column (in UTF-8 bytes, not characters)
    pub col: u32,
}

impl LineCol {
    /// Create a new LineCol position.
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Debug for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// Index for converting between byte offsets and line/column positions.
#[derive(Clone, Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line
    line_starts: Vec<TextSize>,
    /// Total length of the indexed text
    len: TextSize,
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];

        for (offset, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(TextSize::from((offset + 1) as u32));
            }
        }

        Self {
            line_starts,
            len: TextSize::of(text),
        }
    }

    /// Convert a byte offset to a line/column position.
    ///
    /// Offsets past the end clamp to the end of the text.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);

        let col = offset - self.line_starts[line];

        LineCol {
            line: line as u32,
            col: col.into(),
        }
    }

    /// The range of a line, excluding its terminating newline.
    pub fn line_range(&self, line: u32) -> Option<TextRange> {
        let start = *self.line_starts.get(line as usize)?;
        let end = match self.line_starts.get(line as usize + 1) {
            Some(next) => *next - TextSize::from(1),
            None => self.len,
        };
        Some(TextRange::new(start, end))
    }

    /// Get the number of lines.
    pub fn len(&self) -> usize {
        self.line_starts.len()
    }

    /// Check if there are no lines (never true: empty text has one line).
    pub fn is_empty(&self) -> bool {
        self.line_starts.is_empty()
    }
}
