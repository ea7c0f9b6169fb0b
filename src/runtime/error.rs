use crate::language::span::Position;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised while evaluating a program. The messages are the ones shown
/// to users, so they stay in Spanish.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RuntimeError {
    #[error("tipo de operando desconocido: {left} {operator} {right} en la linea {line} columna {column}")]
    TypeMismatch {
        left: &'static str,
        operator: String,
        right: &'static str,
        line: usize,
        column: usize,
    },
    #[error("operador desconocido: {operator}{right} en la linea {line} columna {column}")]
    UnknownPrefixOperator {
        operator: String,
        right: &'static str,
        line: usize,
        column: usize,
    },
    #[error("operador desconocido: {left} {operator} {right} en la linea {line} columna {column}")]
    UnknownInfixOperator {
        left: &'static str,
        operator: String,
        right: &'static str,
        line: usize,
        column: usize,
    },
    #[error("identificador no encontrado: {name} en la linea {line} columna {column}")]
    UnknownIdentifier {
        name: String,
        line: usize,
        column: usize,
    },
    #[error("no se puede asignar a una variable no declarada: {name} en la linea {line} columna {column}")]
    UndefinedIdentifier {
        name: String,
        line: usize,
        column: usize,
    },
    #[error("{name} no es una función en la linea {line} columna {column}")]
    NotAFunction {
        name: &'static str,
        line: usize,
        column: usize,
    },
    #[error("no puedes usar la palabra reservada como identificador: {name} en la linea {line} columna {column}")]
    ReservedWord {
        name: String,
        line: usize,
        column: usize,
    },
    #[error("índice fuera de rango ({index}) en la linea {line} columna {column}")]
    IndexOutOfBounds {
        index: i64,
        line: usize,
        column: usize,
    },
    #[error("operador de índice no soportado: {type_name} en la linea {line} columna {column}")]
    IndexOperatorNotSupported {
        type_name: &'static str,
        line: usize,
        column: usize,
    },
    #[error("tipo de clave no válido para un diccionario: {type_name} en la linea {line} columna {column}")]
    InvalidDictionaryKey {
        type_name: &'static str,
        line: usize,
        column: usize,
    },
    #[error("no se puede asignar usando {operator} sobre {target} en la linea {line} columna {column}")]
    InvalidAssignmentTarget {
        operator: String,
        target: String,
        line: usize,
        column: usize,
    },
    #[error("{message} en la linea {line} columna {column}")]
    Generic {
        message: String,
        line: usize,
        column: usize,
    },
}

impl RuntimeError {
    pub fn generic(message: impl Into<String>, position: Position) -> Self {
        RuntimeError::Generic {
            message: message.into(),
            line: position.line,
            column: position.column,
        }
    }

    /// Source position the error refers to.
    pub fn position(&self) -> Position {
        let (line, column) = match self {
            RuntimeError::TypeMismatch { line, column, .. }
            | RuntimeError::UnknownPrefixOperator { line, column, .. }
            | RuntimeError::UnknownInfixOperator { line, column, .. }
            | RuntimeError::UnknownIdentifier { line, column, .. }
            | RuntimeError::UndefinedIdentifier { line, column, .. }
            | RuntimeError::NotAFunction { line, column, .. }
            | RuntimeError::ReservedWord { line, column, .. }
            | RuntimeError::IndexOutOfBounds { line, column, .. }
            | RuntimeError::IndexOperatorNotSupported { line, column, .. }
            | RuntimeError::InvalidDictionaryKey { line, column, .. }
            | RuntimeError::InvalidAssignmentTarget { line, column, .. }
            | RuntimeError::Generic { line, column, .. } => (*line, *column),
        };
        Position::new(line, column)
    }
}

/// Errors returned by native functions. The evaluator re-raises them as
/// [`RuntimeError::Generic`] annotated with the call position.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum BuiltinError {
    #[error("numero incorrecto de argumentos para '{name}' se recibieron {received}, se esperaban {expected}")]
    WrongNumberOfArguments {
        name: &'static str,
        received: usize,
        expected: String,
    },
    #[error("tipo de argumento incorrecto para '{name}' se recibió {received}, se esperaba {expected}")]
    WrongTypeOfArgument {
        name: &'static str,
        received: &'static str,
        expected: &'static str,
    },
    #[error("el arreglo está vacío para '{name}'")]
    EmptyArray { name: &'static str },
    #[error("no se pudo escribir la salida de '{name}': {message}")]
    Output { name: &'static str, message: String },
}
