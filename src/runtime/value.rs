use crate::language::ast::{format_number, FunctionLiteral};
use crate::runtime::{builtins::Builtin, environment::Environment};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
    Null,
    Array(Vec<Value>),
    /// Entries keep insertion order.
    Dictionary(IndexMap<String, Value>),
    Function(Rc<FunctionValue>),
    Builtin(Builtin),
    Domain(Rc<DomainValue>),
    /// Control-flow sentinel carrying the value of a `regresa`.
    Return(Box<Value>),
    /// Terminal error produced at the evaluator boundary.
    Error(String),
}

/// A closure: the literal it was created from plus the environment that was
/// active at that point.
pub struct FunctionValue {
    pub literal: Rc<FunctionLiteral>,
    pub env: Environment,
}

impl FunctionValue {
    pub fn name(&self) -> Option<&str> {
        self.literal.name.as_deref()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.literal
            .parameters
            .iter()
            .map(|parameter| parameter.name.clone())
            .collect()
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.literal.name)
            .field("parameters", &self.parameter_names())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct DomainValue {
    pub name: String,
    pub members: BTreeMap<String, Value>,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "NUMBER",
            Value::Boolean(_) => "BOOLEAN",
            Value::String(_) => "STRING",
            Value::Null => "NULL",
            Value::Array(_) => "ARRAY",
            Value::Dictionary(_) => "DICTIONARY",
            Value::Function(_) => "FUNCTION",
            Value::Builtin(_) => "BUILTIN",
            Value::Domain(_) => "DOMAIN",
            Value::Return(_) => "RETURN",
            Value::Error(_) => "ERROR",
        }
    }

    /// `falso` and `nulo` are falsy, everything else (including `0`) is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Generic equality used by `==`/`!=` when the operands are not both
    /// numbers or both strings. Values of different types are never equal;
    /// closures and domains compare by identity.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y))
            }
            (Value::Dictionary(a), Value::Dictionary(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(key, va)| b.get(key).is_some_and(|vb| va.same_value(vb)))
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::Domain(a), Value::Domain(b)) => Rc::ptr_eq(a, b),
            (Value::Return(a), Value::Return(b)) => a.same_value(b),
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }

    /// Strips one `Return` layer, as a function call does with its body result.
    pub fn unwrap_return(self) -> Value {
        match self {
            Value::Return(inner) => *inner,
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(value) => f.write_str(&format_number(*value)),
            Value::Boolean(true) => f.write_str("verdadero"),
            Value::Boolean(false) => f.write_str("falso"),
            Value::String(text) => f.write_str(text),
            Value::Null => f.write_str("nulo"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (idx, element) in elements.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Value::Dictionary(pairs) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Function(function) => {
                write!(f, "procedimiento({}) {{...}}", function.parameter_names().join(", "))
            }
            Value::Builtin(_) => f.write_str("builtin function"),
            Value::Domain(domain) => write!(f, "dominio {}", domain.name),
            Value::Return(inner) => write!(f, "{inner}"),
            Value::Error(message) => write!(f, "ERROR: {message}"),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
