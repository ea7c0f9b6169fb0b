use super::run_clean;
use crate::engine::RunOptions;
use crate::runtime::{
    tracer::{Breakpoint, ChangeKind, FrameKind, IoKind, TraceEvent},
    value::Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const PROGRAM: &str = "variable a = 1;
variable incrementar = procedimiento(valor){
 variable siguiente = valor + 1;
 regresa siguiente;
};
variable resultado = incrementar(a);
resultado;";

fn traced(source: &str, options: RunOptions) -> (Value, Vec<TraceEvent>) {
    let outcome = run_clean(source, options);
    let trace = outcome.trace.expect("trace collected");
    (outcome.result.expect("evaluation ran"), trace.events)
}

fn let_event<'a>(events: &'a [TraceEvent], name: &str) -> &'a TraceEvent {
    events
        .iter()
        .find(|event| {
            event.node_type == "LetStatement"
                && event.metadata.identifier.as_deref() == Some(name)
        })
        .unwrap_or_else(|| panic!("no let event for {name}"))
}

#[test]
fn breakpoint_and_step_mode_run() {
    let options = RunOptions {
        trace: true,
        step_mode: true,
        breakpoints: vec![Breakpoint::line(4)],
        environment: None,
    };
    let (result, events) = traced(PROGRAM, options);
    assert!(matches!(result, Value::Number(v) if v == 2.0));
    assert!(!events.is_empty());
    assert!(events.iter().all(|event| event.step_mode));
    assert!(events
        .iter()
        .any(|event| event.breakpoint && event.position.line == 4));
    assert!(events
        .iter()
        .filter(|event| event.breakpoint)
        .all(|event| event.position.line == 4));

    let resultado = let_event(&events, "resultado");
    assert!(resultado
        .changes
        .iter()
        .any(|change| change.name == "resultado" && change.kind == ChangeKind::Add));
    assert_eq!(
        resultado.environment.scopes[0].variables["resultado"].value,
        json!(2.0)
    );
    assert_eq!(resultado.call_stack.len(), 1);

    let siguiente = let_event(&events, "siguiente");
    let frame = siguiente
        .call_stack
        .iter()
        .find(|frame| frame.kind == FrameKind::Function)
        .expect("function frame while inside the call");
    assert_eq!(frame.name, "incrementar");
    assert_eq!(siguiente.environment.scopes.len(), 2);
}

#[test]
fn steps_are_numbered_in_order() {
    let (_, events) = traced("1 + 2;", RunOptions { trace: true, ..RunOptions::default() });
    let steps: Vec<usize> = events.iter().map(|event| event.step).collect();
    assert_eq!(steps, vec![1, 2, 3, 4, 5]);
    let operations: Vec<&str> = events.iter().map(|event| event.operation).collect();
    assert_eq!(
        operations,
        vec![
            "literal:number",
            "literal:number",
            "expression:infix",
            "expression:evaluate",
            "program:evaluate",
        ]
    );
}

#[test]
fn once_breakpoint_fires_on_the_first_matching_node() {
    let options = RunOptions {
        breakpoints: vec![Breakpoint::line(1).once()],
        ..RunOptions::default()
    };
    let outcome = run_clean("variable x = 1 + 2;", options);
    let trace = outcome.trace.expect("trace collected");
    let hits = trace.events.iter().filter(|event| event.breakpoint).count();
    assert_eq!(hits, 1);
    assert!(trace.breakpoints.is_empty());
}

#[test]
fn output_is_captured_as_io_events() {
    let (_, events) = traced(
        "variable n = 2;\nimprimir(\"hola\", n);",
        RunOptions { trace: true, ..RunOptions::default() },
    );
    let call = events
        .iter()
        .find(|event| !event.io_events.is_empty())
        .expect("an event carries the output");
    assert_eq!(call.operation, "expression:call");
    assert_eq!(call.io_events[0].kind, IoKind::Output);
    assert_eq!(call.io_events[0].value, json!("hola 2"));
}

#[test]
fn builtin_frames_are_pushed_and_popped() {
    let (_, events) = traced(
        "longitud([maximo(1, 2)]);",
        RunOptions { trace: true, ..RunOptions::default() },
    );
    assert!(events.iter().all(|event| event.call_stack.len() == 1));
    assert_eq!(events[0].call_stack[0].kind, FrameKind::Program);
}

#[test]
fn function_frames_wrap_body_events() {
    let (_, events) = traced(
        "variable f = procedimiento() { 1 };\nf();",
        RunOptions { trace: true, ..RunOptions::default() },
    );
    let depths: Vec<usize> = events.iter().map(|event| event.call_stack.len()).collect();
    // function, let, f, then 1 / its statement / the body inside the call,
    // then call, statement, program
    assert_eq!(depths, vec![1, 1, 1, 2, 2, 2, 1, 1, 1]);
}

#[test]
fn serialized_trace_uses_external_field_names() {
    let outcome = run_clean(PROGRAM, RunOptions { trace: true, ..RunOptions::default() });
    let trace = outcome.trace.expect("trace collected");
    let json = serde_json::to_value(&trace).expect("trace serializes");

    let first = &json["events"][0];
    for key in [
        "step",
        "nodeType",
        "operation",
        "position",
        "metadata",
        "environment",
        "changes",
        "callStack",
        "result",
        "breakpoint",
        "stepMode",
        "ioEvents",
    ] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
    assert_eq!(
        first["callStack"][0],
        json!({"name": "programa", "type": "program"})
    );
    let last = json["events"].as_array().and_then(|events| events.last()).cloned();
    assert_eq!(last.map(|event| event["operation"].clone()), Some(json!("program:evaluate")));
    assert!(json["breakpoints"].as_array().is_some_and(Vec::is_empty));
}
