use serde::Serialize;
use std::fmt;

/// 1-based source position of the first character of a token or node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Byte offset of this position inside `source`, used to label diagnostics.
    /// Columns count tabs as four, so the offset is clamped to the line.
    pub fn offset_in(&self, source: &str) -> usize {
        let mut offset = 0;
        for (index, line) in source.split_inclusive('\n').enumerate() {
            if index + 1 == self.line {
                let mut column = 1;
                for (byte, ch) in line.char_indices() {
                    if column >= self.column || ch == '\n' {
                        return offset + byte;
                    }
                    column += if ch == '\t' { 4 } else { 1 };
                }
                return offset + line.trim_end_matches('\n').len();
            }
            offset += line.len();
        }
        source.len()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

pub trait Positioned {
    fn position(&self) -> Position;

    fn line(&self) -> usize {
        self.position().line
    }

    fn column(&self) -> usize {
        self.position().column
    }
}
