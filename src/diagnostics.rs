use crate::{language::errors::SyntaxError, runtime::error::RuntimeError};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(codexivo::sintaxis))]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("aquí")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, source: &str, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(source, 1),
            help: err.help.clone(),
            message: err.message.clone(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(codexivo::ejecucion))]
pub struct RuntimeDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("el error ocurrió aquí")]
    span: SourceSpan,
    message: String,
}

impl RuntimeDiagnostic {
    pub fn from_error(src: NamedSource<String>, source: &str, err: &RuntimeError) -> Self {
        let offset = err.position().offset_in(source);
        Self {
            src,
            span: (offset, 1).into(),
            message: err.to_string(),
        }
    }
}

pub fn emit_syntax_errors(path: &Path, source: &str, errors: &[SyntaxError]) {
    for err in errors {
        let src = NamedSource::new(path.display().to_string(), source.to_string());
        let diagnostic = SyntaxDiagnostic::from_error(src, source, err);
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

pub fn report_runtime_error(path: &Path, source: &str, error: &RuntimeError) {
    let src = NamedSource::new(path.display().to_string(), source.to_string());
    let diagnostic = RuntimeDiagnostic::from_error(src, source, error);
    eprintln!("{:?}", Report::new(diagnostic));
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("No se pudo leer {}: {}", path.display(), error);
}
