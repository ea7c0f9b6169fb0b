use crate::language::{ast::format_number, span::Position};
use crate::runtime::{
    error::BuiltinError,
    tracer::{IoEvent, IoKind},
    value::{DomainValue, Value},
};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::rc::Rc;

pub type BuiltinFn = fn(&mut NativeContext<'_>, &[Value]) -> Result<Value, BuiltinError>;

/// A native function. It validates its own arguments.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl Builtin {
    pub fn call(&self, ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
        (self.func)(ctx, args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

/// What a native function may touch while it runs: the program's output sink
/// and the I/O log handed to the tracer afterwards.
pub struct NativeContext<'a> {
    output: &'a mut dyn Write,
    position: Position,
    io: Vec<IoEvent>,
}

impl<'a> NativeContext<'a> {
    pub fn new(output: &'a mut dyn Write, position: Position) -> Self {
        Self {
            output,
            position,
            io: Vec::new(),
        }
    }

    pub fn write_line(&mut self, name: &'static str, text: &str) -> Result<(), BuiltinError> {
        writeln!(self.output, "{text}").map_err(|err| BuiltinError::Output {
            name,
            message: err.to_string(),
        })?;
        self.io.push(IoEvent {
            kind: IoKind::Output,
            value: serde_json::Value::String(text.to_string()),
            at: Some(self.position),
        });
        Ok(())
    }

    pub fn take_io(&mut self) -> Vec<IoEvent> {
        std::mem::take(&mut self.io)
    }
}

/// Name-keyed lookup of native functions and builtin domains.
pub trait BuiltinRegistry {
    fn lookup(&self, name: &str) -> Option<Builtin>;

    fn domain(&self, _name: &str) -> Option<Rc<DomainValue>> {
        None
    }
}

const CATALOG: &[Builtin] = &[
    Builtin { name: "longitud", func: longitud },
    Builtin { name: "absoluto", func: absoluto },
    Builtin { name: "maximo", func: maximo },
    Builtin { name: "minimo", func: minimo },
    Builtin { name: "redondear", func: redondear },
    Builtin { name: "agregar", func: agregar },
    Builtin { name: "primero", func: primero },
    Builtin { name: "ultimo", func: ultimo },
    Builtin { name: "claves", func: claves },
    Builtin { name: "valores", func: valores },
    Builtin { name: "tiene_clave", func: tiene_clave },
    Builtin { name: "imprimir", func: imprimir },
];

const DOMAINS: &[(&str, &[&str])] = &[
    ("mates", &["absoluto", "maximo", "minimo", "redondear"]),
    ("arreglos", &["agregar", "primero", "ultimo"]),
    ("diccionarios", &["claves", "valores", "tiene_clave"]),
];

/// The default catalog shipped with the interpreter.
pub struct StandardLibrary {
    functions: HashMap<&'static str, Builtin>,
    domains: HashMap<&'static str, Rc<DomainValue>>,
}

impl Default for StandardLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardLibrary {
    pub fn new() -> Self {
        let functions: HashMap<&'static str, Builtin> =
            CATALOG.iter().map(|builtin| (builtin.name, *builtin)).collect();
        let domains = DOMAINS
            .iter()
            .map(|(domain, members)| {
                let members: BTreeMap<String, Value> = members
                    .iter()
                    .filter_map(|member| {
                        functions
                            .get(member)
                            .map(|builtin| (member.to_string(), Value::Builtin(*builtin)))
                    })
                    .collect();
                let value = DomainValue {
                    name: domain.to_string(),
                    members,
                };
                (*domain, Rc::new(value))
            })
            .collect();
        Self { functions, domains }
    }
}

impl BuiltinRegistry for StandardLibrary {
    fn lookup(&self, name: &str) -> Option<Builtin> {
        self.functions.get(name).copied()
    }

    fn domain(&self, name: &str) -> Option<Rc<DomainValue>> {
        self.domains.get(name).cloned()
    }
}

/// Dictionary keys are strings; numbers are stringified the way they print.
pub fn dictionary_key(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(format_number(*number)),
        _ => None,
    }
}

fn expect_arity(name: &'static str, args: &[Value], expected: usize) -> Result<(), BuiltinError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(BuiltinError::WrongNumberOfArguments {
            name,
            received: args.len(),
            expected: expected.to_string(),
        })
    }
}

fn wrong_type(name: &'static str, expected: &'static str, received: &Value) -> BuiltinError {
    BuiltinError::WrongTypeOfArgument {
        name,
        received: received.type_name(),
        expected,
    }
}

fn number_arg(name: &'static str, value: &Value) -> Result<f64, BuiltinError> {
    match value {
        Value::Number(number) => Ok(*number),
        other => Err(wrong_type(name, "NUMBER", other)),
    }
}

fn array_arg<'v>(name: &'static str, value: &'v Value) -> Result<&'v [Value], BuiltinError> {
    match value {
        Value::Array(elements) => Ok(elements),
        other => Err(wrong_type(name, "ARRAY", other)),
    }
}

fn dictionary_arg<'v>(
    name: &'static str,
    value: &'v Value,
) -> Result<&'v IndexMap<String, Value>, BuiltinError> {
    match value {
        Value::Dictionary(pairs) => Ok(pairs),
        other => Err(wrong_type(name, "DICTIONARY", other)),
    }
}

fn longitud(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("longitud", args, 1)?;
    let len = match &args[0] {
        Value::String(text) => text.chars().count(),
        Value::Array(elements) => elements.len(),
        Value::Dictionary(pairs) => pairs.len(),
        other => return Err(wrong_type("longitud", "STRING, ARREGLO o DICCIONARIO", other)),
    };
    Ok(Value::Number(len as f64))
}

fn absoluto(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("absoluto", args, 1)?;
    Ok(Value::Number(number_arg("absoluto", &args[0])?.abs()))
}

fn numbers(name: &'static str, args: &[Value]) -> Result<Vec<f64>, BuiltinError> {
    if args.is_empty() {
        return Err(BuiltinError::WrongNumberOfArguments {
            name,
            received: 0,
            expected: "al menos 1".to_string(),
        });
    }
    args.iter().map(|arg| number_arg(name, arg)).collect()
}

fn maximo(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    let max = numbers("maximo", args)?
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    Ok(Value::Number(max))
}

fn minimo(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    let min = numbers("minimo", args)?
        .into_iter()
        .fold(f64::INFINITY, f64::min);
    Ok(Value::Number(min))
}

fn redondear(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("redondear", args, 1)?;
    let number = number_arg("redondear", &args[0])?;
    // Halves round towards positive infinity: 2.5 -> 3, -2.5 -> -2.
    Ok(Value::Number((number + 0.5).floor()))
}

fn agregar(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("agregar", args, 2)?;
    let mut elements = array_arg("agregar", &args[0])?.to_vec();
    elements.push(args[1].clone());
    Ok(Value::Array(elements))
}

fn primero(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("primero", args, 1)?;
    array_arg("primero", &args[0])?
        .first()
        .cloned()
        .ok_or(BuiltinError::EmptyArray { name: "primero" })
}

fn ultimo(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("ultimo", args, 1)?;
    array_arg("ultimo", &args[0])?
        .last()
        .cloned()
        .ok_or(BuiltinError::EmptyArray { name: "ultimo" })
}

fn claves(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("claves", args, 1)?;
    let keys = dictionary_arg("claves", &args[0])?
        .keys()
        .map(|key| Value::String(key.clone()))
        .collect();
    Ok(Value::Array(keys))
}

fn valores(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("valores", args, 1)?;
    let values = dictionary_arg("valores", &args[0])?.values().cloned().collect();
    Ok(Value::Array(values))
}

fn tiene_clave(_: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("tiene_clave", args, 2)?;
    let pairs = dictionary_arg("tiene_clave", &args[0])?;
    let key =
        dictionary_key(&args[1]).ok_or_else(|| wrong_type("tiene_clave", "STRING o NUMBER", &args[1]))?;
    Ok(Value::Boolean(pairs.contains_key(&key)))
}

fn imprimir(ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, BuiltinError> {
    let text = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    ctx.write_line("imprimir", &text)?;
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, BuiltinError> {
        let library = StandardLibrary::new();
        let builtin = library.lookup(name).expect("builtin exists");
        let mut sink = Vec::new();
        let mut ctx = NativeContext::new(&mut sink, Position::new(1, 1));
        builtin.call(&mut ctx, args)
    }

    fn number(value: Result<Value, BuiltinError>) -> f64 {
        match value {
            Ok(Value::Number(n)) => n,
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn longitud_counts_strings_arrays_and_dictionaries() {
        assert_eq!(number(call("longitud", &[Value::from("año")])), 3.0);
        assert_eq!(
            number(call("longitud", &[Value::Array(vec![Value::Null, Value::Null])])),
            2.0
        );
        assert_eq!(
            call("longitud", &[Value::Number(1.0)]).unwrap_err().to_string(),
            "tipo de argumento incorrecto para 'longitud' se recibió NUMBER, se esperaba STRING, ARREGLO o DICCIONARIO"
        );
        assert_eq!(
            call("longitud", &[]).unwrap_err().to_string(),
            "numero incorrecto de argumentos para 'longitud' se recibieron 0, se esperaban 1"
        );
    }

    #[test]
    fn math_helpers() {
        assert_eq!(number(call("absoluto", &[Value::Number(-4.0)])), 4.0);
        assert_eq!(
            number(call("maximo", &[Value::Number(1.0), Value::Number(7.0), Value::Number(3.0)])),
            7.0
        );
        assert_eq!(number(call("minimo", &[Value::Number(2.0), Value::Number(-1.0)])), -1.0);
        assert_eq!(number(call("redondear", &[Value::Number(2.5)])), 3.0);
        assert_eq!(number(call("redondear", &[Value::Number(-2.5)])), -2.0);
        assert_eq!(
            call("maximo", &[]).unwrap_err().to_string(),
            "numero incorrecto de argumentos para 'maximo' se recibieron 0, se esperaban al menos 1"
        );
    }

    #[test]
    fn array_helpers() {
        let array = Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let appended = call("agregar", &[array.clone(), Value::Number(3.0)]).unwrap();
        assert_eq!(appended.to_string(), "[1, 2, 3]");
        assert_eq!(number(call("primero", &[array.clone()])), 1.0);
        assert_eq!(number(call("ultimo", &[array])), 2.0);
        assert_eq!(
            call("primero", &[Value::Array(Vec::new())]).unwrap_err(),
            BuiltinError::EmptyArray { name: "primero" }
        );
    }

    #[test]
    fn dictionary_helpers() {
        let mut pairs = IndexMap::new();
        pairs.insert("b".to_string(), Value::Number(2.0));
        pairs.insert("1".to_string(), Value::Boolean(true));
        let dict = Value::Dictionary(pairs);
        assert_eq!(call("claves", &[dict.clone()]).unwrap().to_string(), "[b, 1]");
        assert_eq!(call("valores", &[dict.clone()]).unwrap().to_string(), "[2, verdadero]");
        assert!(matches!(
            call("tiene_clave", &[dict.clone(), Value::Number(1.0)]),
            Ok(Value::Boolean(true))
        ));
        assert!(matches!(
            call("tiene_clave", &[dict, Value::from("z")]),
            Ok(Value::Boolean(false))
        ));
    }

    #[test]
    fn imprimir_writes_and_records_output() {
        let library = StandardLibrary::new();
        let builtin = library.lookup("imprimir").expect("imprimir exists");
        let mut sink = Vec::new();
        let io = {
            let mut ctx = NativeContext::new(&mut sink, Position::new(3, 1));
            let result = builtin
                .call(&mut ctx, &[Value::from("hola"), Value::Number(2.0)])
                .unwrap();
            assert!(matches!(result, Value::Null));
            ctx.take_io()
        };
        assert_eq!(String::from_utf8(sink).unwrap(), "hola 2\n");
        assert_eq!(io.len(), 1);
        assert_eq!(io[0].at, Some(Position::new(3, 1)));
    }

    #[test]
    fn domains_group_catalog_members() {
        let library = StandardLibrary::new();
        let mates = library.domain("mates").expect("mates domain");
        assert_eq!(mates.name, "mates");
        assert!(mates.members.contains_key("maximo"));
        assert!(library.domain("arreglos").is_some());
        assert!(library.domain("diccionarios").is_some());
        assert!(library.domain("nada").is_none());
    }
}
