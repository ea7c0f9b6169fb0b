//! Evaluation with and without the runtime tracer. The tracer snapshots and
//! diffs every scope on each step, so the two should be compared on the same
//! program.

use codexivo::language::parser::parse_source;
use codexivo::runtime::{
    environment::Environment,
    tracer::{RuntimeTracer, TracerOptions},
    Interpreter,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io;

const FIBONACCI: &str = "
variable fib = procedimiento(n) {
  si (n < 2) { regresa n; }
  regresa fib(n - 1) + fib(n - 2);
};
fib(12);";

const LOOP: &str = "
variable a = 0; variable b = 0; variable c = 0;
para (variable i = 0; i < 200; i += 1) {
  a += i; b = a * 2; c = b - a;
}
c;";

fn bench_untraced(c: &mut Criterion) {
    for (name, source) in [("untraced_fib", FIBONACCI), ("untraced_loop", LOOP)] {
        let (program, errors) = parse_source(source);
        assert!(errors.is_empty());
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut interpreter = Interpreter::default().with_output(Box::new(io::sink()));
                black_box(interpreter.evaluate(&program, &Environment::new()))
            })
        });
    }
}

fn bench_traced(c: &mut Criterion) {
    for (name, source) in [("traced_fib", FIBONACCI), ("traced_loop", LOOP)] {
        let (program, errors) = parse_source(source);
        assert!(errors.is_empty());
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut interpreter = Interpreter::default()
                    .with_output(Box::new(io::sink()))
                    .with_tracer(RuntimeTracer::new(TracerOptions::default()));
                black_box(interpreter.evaluate(&program, &Environment::new()));
                black_box(interpreter.take_tracer())
            })
        });
    }
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_fib", |b| b.iter(|| black_box(parse_source(black_box(FIBONACCI)))));
}

criterion_group!(benches, bench_untraced, bench_traced, bench_parse);
criterion_main!(benches);
