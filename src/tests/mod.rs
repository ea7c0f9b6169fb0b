use crate::engine::{run_with_output, RunOptions, RunResult};
use crate::runtime::value::Value;
use std::io;

mod domains;
mod trace;

/// Runs `source` with output discarded.
fn run_quiet(source: &str, options: RunOptions) -> RunResult {
    run_with_output(source, options, Box::new(io::sink()))
}

/// Like [`run_quiet`], failing the test when `source` does not parse.
fn run_clean(source: &str, options: RunOptions) -> RunResult {
    let outcome = run_quiet(source, options);
    assert!(outcome.errors.is_empty(), "parse errors: {:?}", outcome.errors);
    outcome
}

fn eval(source: &str) -> Value {
    run_clean(source, RunOptions::default())
        .result
        .expect("evaluation ran")
}

fn eval_number(source: &str) -> f64 {
    match eval(source) {
        Value::Number(value) => value,
        other => panic!("expected a number from {source:?}, got {other:?}"),
    }
}

fn eval_error(source: &str) -> String {
    match eval(source) {
        Value::Error(message) => message,
        other => panic!("expected an error from {source:?}, got {other:?}"),
    }
}
