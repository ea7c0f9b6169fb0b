use clap::{Parser, Subcommand};
use codexivo::{
    diagnostics::{emit_syntax_errors, report_io_error, report_runtime_error},
    engine::{parse, run, RunOptions, RunResult},
    runtime::{
        environment::Environment,
        tracer::{Breakpoint, RuntimeTrace, RuntimeValueSnapshot},
        value::Value,
    },
};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Intérprete de Codexivo, un lenguaje de scripting con palabras clave en español.
#[derive(Parser, Debug)]
#[command(name = "codexivo", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ejecuta un archivo fuente.
    Run {
        file: PathBuf,
        /// Registra cada paso de la ejecución.
        #[arg(long)]
        trace: bool,
        /// Marca la traza como ejecución paso a paso.
        #[arg(long)]
        step: bool,
        /// Punto de interrupción, `LINEA` o `LINEA:COLUMNA`. Se puede repetir.
        #[arg(long = "break", value_name = "LINEA[:COLUMNA]")]
        breakpoints: Vec<Breakpoint>,
        /// Imprime el resultado y la traza como JSON.
        #[arg(long)]
        json: bool,
    },
    /// Solo analiza el archivo e informa los errores de sintaxis.
    Parse { file: PathBuf },
    /// Sesión interactiva.
    Repl,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            file,
            trace,
            step,
            breakpoints,
            json,
        } => run_file(&file, trace, step, breakpoints, json),
        Command::Parse { file } => parse_file(&file),
        Command::Repl => repl(),
    }
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(err) => {
            report_io_error(path, &err);
            None
        }
    }
}

fn run_file(path: &Path, trace: bool, step: bool, breakpoints: Vec<Breakpoint>, json: bool) -> ExitCode {
    let Some(source) = read_source(path) else {
        return ExitCode::FAILURE;
    };
    let options = RunOptions {
        trace: trace || json,
        step_mode: step,
        breakpoints,
        environment: None,
    };
    let outcome = run(&source, options);
    if !outcome.errors.is_empty() {
        emit_syntax_errors(path, &source, &outcome.errors);
        return ExitCode::FAILURE;
    }

    if json {
        print_json(&outcome);
    } else {
        if let Some(trace) = &outcome.trace {
            print_trace(trace);
        }
        if let Some(value) = &outcome.result {
            if !matches!(value, Value::Null | Value::Error(_)) {
                println!("{value}");
            }
        }
    }

    if let Some(err) = &outcome.runtime_error {
        report_runtime_error(path, &source, err);
    }
    if outcome.failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_json(outcome: &RunResult) {
    let document = serde_json::json!({
        "result": outcome.result.as_ref().map(RuntimeValueSnapshot::of),
        "trace": outcome.trace,
    });
    match serde_json::to_string_pretty(&document) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("no se pudo serializar la traza: {err}"),
    }
}

fn print_trace(trace: &RuntimeTrace) {
    for event in &trace.events {
        let marker = if event.breakpoint { " [pausa]" } else { "" };
        let result = event
            .result
            .as_ref()
            .map(|snapshot| snapshot.repr.as_str())
            .unwrap_or("");
        println!(
            "#{:<4} {:<22} {:<6} {}{}",
            event.step, event.operation, event.position, result, marker
        );
    }
}

fn parse_file(path: &Path) -> ExitCode {
    let Some(source) = read_source(path) else {
        return ExitCode::FAILURE;
    };
    let parsed = parse(&source);
    if parsed.is_ok() {
        println!("ok");
        ExitCode::SUCCESS
    } else {
        emit_syntax_errors(path, &source, &parsed.errors);
        ExitCode::FAILURE
    }
}

fn repl() -> ExitCode {
    let environment = Environment::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!(">> ");
        if io::stdout().flush().is_err() {
            return ExitCode::FAILURE;
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(err)) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
            None => return ExitCode::SUCCESS,
        };
        let input = line.trim();
        if input == "salir" || input == "salir();" {
            println!("Adios!");
            return ExitCode::SUCCESS;
        }
        if input.is_empty() {
            continue;
        }

        let options = RunOptions {
            environment: Some(environment.clone()),
            ..RunOptions::default()
        };
        let outcome = run(input, options);
        for err in &outcome.errors {
            println!("{}", err.message);
        }
        match outcome.result {
            Some(Value::Null) | None => {}
            Some(value) => println!("{value}"),
        }
    }
}
