pub mod diagnostics;
pub mod engine;
pub mod language;
pub mod runtime;

pub use engine::{parse, run, ParseResult, RunOptions, RunResult};

#[cfg(test)]
mod tests;
