use crate::language::span::{Position, Positioned};
use miette::SourceSpan;
use std::fmt;

/// A parse error: the human-readable message plus the position of the token
/// that was being examined when it was reported.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn to_source_span(&self, source: &str, len: usize) -> SourceSpan {
        (self.position.offset_in(source), len).into()
    }
}

impl Positioned for SyntaxError {
    fn position(&self) -> Position {
        self.position
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SyntaxError {}
