//! One-call entry points: source text in, parse errors or a value (and
//! optionally a trace) out.

use crate::language::{ast::Program, errors::SyntaxError, parser::parse_source};
use crate::runtime::{
    environment::Environment,
    error::RuntimeError,
    tracer::{Breakpoint, RuntimeTrace, RuntimeTracer, TracerOptions},
    value::Value,
    Interpreter,
};
use std::io::{self, Write};
use tracing::debug;

#[derive(Debug)]
pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<SyntaxError>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub trace: bool,
    pub step_mode: bool,
    pub breakpoints: Vec<Breakpoint>,
    /// Global scope to evaluate in. A fresh one is created when absent.
    pub environment: Option<Environment>,
}

impl RunOptions {
    fn tracing_enabled(&self) -> bool {
        self.trace || self.step_mode || !self.breakpoints.is_empty()
    }
}

#[derive(Debug)]
pub struct RunResult {
    /// `None` when the source did not parse.
    pub result: Option<Value>,
    pub errors: Vec<SyntaxError>,
    pub trace: Option<RuntimeTrace>,
    pub environment: Environment,
    /// The error behind a `Value::Error` result.
    pub runtime_error: Option<RuntimeError>,
}

impl RunResult {
    pub fn failed(&self) -> bool {
        !self.errors.is_empty() || self.result.as_ref().is_some_and(Value::is_error)
    }
}

pub fn parse(source: &str) -> ParseResult {
    let (program, errors) = parse_source(source);
    ParseResult { program, errors }
}

pub fn run(source: &str, options: RunOptions) -> RunResult {
    run_with_output(source, options, Box::new(io::stdout()))
}

/// Like [`run`], sending `imprimir` output to `output`.
pub fn run_with_output(source: &str, options: RunOptions, output: Box<dyn Write>) -> RunResult {
    let ParseResult { program, errors } = parse(source);
    let environment = options.environment.clone().unwrap_or_default();
    if !errors.is_empty() {
        debug!(errors = errors.len(), "parse failed, skipping evaluation");
        return RunResult {
            result: None,
            errors,
            trace: None,
            environment,
            runtime_error: None,
        };
    }

    let mut interpreter = Interpreter::default().with_output(output);
    if options.tracing_enabled() {
        interpreter = interpreter.with_tracer(RuntimeTracer::new(TracerOptions {
            breakpoints: options.breakpoints,
            step_mode: options.step_mode,
        }));
    }

    let result = interpreter.evaluate(&program, &environment);
    let trace = interpreter.take_tracer().map(RuntimeTracer::into_trace);
    debug!(
        statements = program.statements.len(),
        traced = trace.is_some(),
        failed = result.is_error(),
        "run finished"
    );
    RunResult {
        result: Some(result),
        errors: Vec::new(),
        trace,
        environment,
        runtime_error: interpreter.last_error().cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_skip_evaluation() {
        let outcome = run("variable = 5;", RunOptions::default());
        assert!(outcome.result.is_none());
        assert!(outcome.trace.is_none());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.failed());
    }

    #[test]
    fn environment_is_reused_between_runs() {
        let env = Environment::new();
        let options = RunOptions {
            environment: Some(env.clone()),
            ..RunOptions::default()
        };
        run("variable x = 41;", options.clone());
        let outcome = run("x + 1", options);
        assert!(matches!(outcome.result, Some(Value::Number(v)) if v == 42.0));
        assert!(outcome.environment.ptr_eq(&env));
    }

    #[test]
    fn breakpoints_alone_enable_tracing() {
        let options = RunOptions {
            breakpoints: vec![Breakpoint::line(1)],
            ..RunOptions::default()
        };
        let outcome = run("1 + 1", options);
        let trace = outcome.trace.expect("trace collected");
        assert!(trace.events.iter().any(|event| event.breakpoint));
        assert!(run("1 + 1", RunOptions::default()).trace.is_none());
    }
}
