use crate::language::{
    ast::{Block, Identifier, InfixOp, Node, NodeKind, PrefixOp, Program, Traceable},
    span::{Position, Positioned},
    token::KeywordTable,
};
use crate::runtime::{
    builtins::{dictionary_key, Builtin, BuiltinRegistry, NativeContext, StandardLibrary},
    environment::Environment,
    error::{RuntimeError, RuntimeResult},
    tracer::{CallFrame, FrameKind, RuntimeTracer},
    value::{DomainValue, FunctionValue, Value},
};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::rc::Rc;
use tracing::{debug, trace};

/// Tree-walking evaluator. Errors travel as [`RuntimeError`] internally and
/// surface as [`Value::Error`] from [`Interpreter::evaluate`].
pub struct Interpreter {
    keywords: KeywordTable,
    builtins: Box<dyn BuiltinRegistry>,
    tracer: Option<RuntimeTracer>,
    output: Box<dyn Write>,
    last_error: Option<RuntimeError>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(KeywordTable::standard(), Box::new(StandardLibrary::new()))
    }
}

impl Interpreter {
    pub fn new(keywords: KeywordTable, builtins: Box<dyn BuiltinRegistry>) -> Self {
        Self {
            keywords,
            builtins,
            tracer: None,
            output: Box::new(io::stdout()),
            last_error: None,
        }
    }

    pub fn with_tracer(mut self, tracer: RuntimeTracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Redirects what `imprimir` writes.
    pub fn with_output(mut self, output: Box<dyn Write>) -> Self {
        self.output = output;
        self
    }

    pub fn take_tracer(&mut self) -> Option<RuntimeTracer> {
        self.tracer.take()
    }

    /// The error that stopped the most recent [`Interpreter::evaluate`], with
    /// its source position intact.
    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    pub fn evaluate(&mut self, program: &Program, env: &Environment) -> Value {
        self.last_error = None;
        self.enter_frame(CallFrame::new(
            "programa",
            FrameKind::Program,
            Some(program.position()),
        ));
        let (operation, value) = match self.eval_statements(&program.statements, env) {
            Ok(Value::Return(inner)) => ("program:return", *inner),
            Ok(value) => ("program:evaluate", value),
            Err(err) => {
                debug!(error = %err, "program stopped");
                let value = Value::Error(err.to_string());
                self.last_error = Some(err);
                ("program:error", value)
            }
        };
        self.record(program, env, &value, operation);
        self.exit_frame();
        value
    }

    fn eval_statements(&mut self, statements: &[Node], env: &Environment) -> RuntimeResult<Value> {
        let mut result = Value::Null;
        for statement in statements {
            result = self.eval_node(statement, env)?;
            if let Value::Return(_) = result {
                break;
            }
        }
        Ok(result)
    }

    fn eval_block(&mut self, block: &Block, env: &Environment) -> RuntimeResult<Value> {
        let result = self.eval_statements(&block.statements, env);
        self.traced(block, env, "block:evaluate", result)
    }

    fn eval_node(&mut self, node: &Node, env: &Environment) -> RuntimeResult<Value> {
        let position = node.position;
        let (operation, result) = match &node.kind {
            NodeKind::Let { name, value } => ("statement:let", self.eval_let(name, value, env)),
            NodeKind::Assignment {
                name,
                operator,
                value,
            } => {
                let result = match env.get(&name.name) {
                    Some(current) => self.eval_node(value, env).and_then(|assigned| {
                        let updated = match operator.arithmetic() {
                            Some(op) => self.eval_infix(op, current, assigned, position)?,
                            None => assigned,
                        };
                        env.assign(&name.name, updated.clone());
                        Ok(updated)
                    }),
                    None => Err(RuntimeError::UndefinedIdentifier {
                        name: name.name.clone(),
                        line: position.line,
                        column: position.column,
                    }),
                };
                ("statement:assignment", result)
            }
            NodeKind::Return { value } => {
                let result = self.eval_node(value, env).map(Value::unwrap_return);
                let value = self.traced(node, env, "statement:return", result)?;
                return Ok(Value::Return(Box::new(value)));
            }
            NodeKind::Expression(expression) => {
                ("expression:evaluate", self.eval_node(expression, env))
            }
            NodeKind::Block(block) => return self.eval_block(block, env),
            NodeKind::Domain { name, body } => {
                ("statement:domain", self.eval_domain(name, body, env))
            }
            NodeKind::Identifier(name) => {
                ("expression:identifier", self.eval_identifier(name, position, env))
            }
            NodeKind::Number(value) => ("literal:number", Ok(Value::Number(*value))),
            NodeKind::String(text) => ("literal:string", Ok(Value::String(text.clone()))),
            NodeKind::Boolean(flag) => ("literal:boolean", Ok(Value::Boolean(*flag))),
            NodeKind::Array(elements) => {
                let result = elements
                    .iter()
                    .map(|element| self.eval_node(element, env))
                    .collect::<RuntimeResult<Vec<_>>>()
                    .map(Value::Array);
                ("literal:array", result)
            }
            NodeKind::Dictionary(pairs) => {
                ("literal:dictionary", self.eval_dictionary(pairs, env))
            }
            NodeKind::Prefix { operator, right } => {
                let result = self
                    .eval_node(right, env)
                    .and_then(|right| eval_prefix(*operator, right, position));
                ("expression:prefix", result)
            }
            NodeKind::Infix {
                left,
                operator,
                right,
            } => ("expression:infix", self.eval_infix_node(left, *operator, right, position, env)),
            NodeKind::If {
                condition,
                consequence,
                alternative,
            } => {
                let result = self.eval_if(condition, consequence, alternative.as_deref(), env);
                ("expression:if", result)
            }
            NodeKind::While { condition, body } => {
                ("loop:while", self.eval_while(condition, body, env))
            }
            NodeKind::DoWhile { body, condition } => {
                ("loop:dowhile", self.eval_do_while(body, condition, env))
            }
            NodeKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let result = self.eval_for(
                    initializer.as_deref(),
                    condition.as_deref(),
                    increment.as_deref(),
                    body,
                    env,
                );
                ("loop:for", result)
            }
            NodeKind::Function(literal) => {
                let function = FunctionValue {
                    literal: Rc::clone(literal),
                    env: env.clone(),
                };
                ("literal:function", Ok(Value::Function(Rc::new(function))))
            }
            NodeKind::Call { callee, arguments } => {
                ("expression:call", self.eval_call(callee, arguments, position, env))
            }
            NodeKind::Index { target, index } => {
                ("expression:index", self.eval_index(target, index, position, env))
            }
            NodeKind::Member { object, property } => {
                ("expression:member", self.eval_member(object, property, position, env))
            }
        };
        self.traced(node, env, operation, result)
    }

    fn eval_let(&mut self, name: &Identifier, value: &Node, env: &Environment) -> RuntimeResult<Value> {
        let value = self.eval_node(value, env)?;
        env.set(name.name.clone(), value.clone());
        Ok(value)
    }

    fn eval_domain(&mut self, name: &Identifier, body: &Block, env: &Environment) -> RuntimeResult<Value> {
        let scope = Environment::enclosed(env);
        self.eval_block(body, &scope)?;
        let members: BTreeMap<String, Value> = scope.bindings().into_iter().collect();
        debug!(domain = %name.name, members = members.len(), "domain declared");
        let domain = Value::Domain(Rc::new(DomainValue {
            name: name.name.clone(),
            members,
        }));
        env.set(name.name.clone(), domain.clone());
        Ok(domain)
    }

    fn eval_identifier(&self, name: &str, position: Position, env: &Environment) -> RuntimeResult<Value> {
        if self.keywords.is_reserved(name) {
            return Err(RuntimeError::ReservedWord {
                name: name.to_string(),
                line: position.line,
                column: position.column,
            });
        }
        if let Some(value) = env.get(name) {
            return Ok(value);
        }
        if let Some(builtin) = self.builtins.lookup(name) {
            return Ok(Value::Builtin(builtin));
        }
        if let Some(domain) = self.builtins.domain(name) {
            return Ok(Value::Domain(domain));
        }
        Err(RuntimeError::UnknownIdentifier {
            name: name.to_string(),
            line: position.line,
            column: position.column,
        })
    }

    fn eval_dictionary(&mut self, pairs: &[(Node, Node)], env: &Environment) -> RuntimeResult<Value> {
        let mut entries = IndexMap::new();
        for (key_node, value_node) in pairs {
            let key = self.eval_node(key_node, env)?;
            let key = dictionary_key(&key).ok_or_else(|| RuntimeError::InvalidDictionaryKey {
                type_name: key.type_name(),
                line: key_node.position.line,
                column: key_node.position.column,
            })?;
            let value = self.eval_node(value_node, env)?;
            entries.insert(key, value);
        }
        Ok(Value::Dictionary(entries))
    }

    fn eval_infix_node(
        &mut self,
        left: &Node,
        operator: InfixOp,
        right: &Node,
        position: Position,
        env: &Environment,
    ) -> RuntimeResult<Value> {
        let left_value = self.eval_node(left, env)?;
        let right_value = self.eval_node(right, env)?;
        let InfixOp::Compound(assign) = operator else {
            return self.eval_infix(operator, left_value, right_value, position);
        };

        let NodeKind::Identifier(name) = &left.kind else {
            return Err(RuntimeError::InvalidAssignmentTarget {
                operator: assign.to_string(),
                target: left.token_literal(),
                line: position.line,
                column: position.column,
            });
        };
        let updated = match assign.arithmetic() {
            Some(op) => self.eval_infix(op, left_value, right_value, position)?,
            None => right_value,
        };
        if !env.assign(name, updated.clone()) {
            env.set(name.clone(), updated.clone());
        }
        Ok(updated)
    }

    fn eval_infix(&self, operator: InfixOp, left: Value, right: Value, position: Position) -> RuntimeResult<Value> {
        let unknown = |left: &Value, right: &Value| RuntimeError::UnknownInfixOperator {
            left: left.type_name(),
            operator: operator.to_string(),
            right: right.type_name(),
            line: position.line,
            column: position.column,
        };
        match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => {
                let (a, b) = (*a, *b);
                let value = match operator {
                    InfixOp::Add => Value::Number(a + b),
                    InfixOp::Sub => Value::Number(a - b),
                    InfixOp::Mul => Value::Number(a * b),
                    InfixOp::Div => Value::Number(a / b),
                    InfixOp::Lt => Value::Boolean(a < b),
                    InfixOp::Gt => Value::Boolean(a > b),
                    InfixOp::LtEq => Value::Boolean(a <= b),
                    InfixOp::GtEq => Value::Boolean(a >= b),
                    InfixOp::Eq => Value::Boolean(a == b),
                    InfixOp::NotEq => Value::Boolean(a != b),
                    _ => return Err(unknown(&left, &right)),
                };
                Ok(value)
            }
            (Value::String(a), Value::String(b)) => match operator {
                InfixOp::Add => Ok(Value::String(format!("{a}{b}"))),
                InfixOp::Eq => Ok(Value::Boolean(a == b)),
                InfixOp::NotEq => Ok(Value::Boolean(a != b)),
                _ => Err(unknown(&left, &right)),
            },
            _ if operator == InfixOp::Eq => Ok(Value::Boolean(left.same_value(&right))),
            _ if operator == InfixOp::NotEq => Ok(Value::Boolean(!left.same_value(&right))),
            (Value::Boolean(a), Value::Boolean(b)) => match operator {
                InfixOp::And => Ok(Value::Boolean(*a && *b)),
                InfixOp::Or => Ok(Value::Boolean(*a || *b)),
                _ => Err(unknown(&left, &right)),
            },
            _ if left.type_name() != right.type_name() => Err(RuntimeError::TypeMismatch {
                left: left.type_name(),
                operator: operator.to_string(),
                right: right.type_name(),
                line: position.line,
                column: position.column,
            }),
            _ => Err(unknown(&left, &right)),
        }
    }

    fn eval_if(
        &mut self,
        condition: &Node,
        consequence: &Block,
        alternative: Option<&Node>,
        env: &Environment,
    ) -> RuntimeResult<Value> {
        if self.eval_node(condition, env)?.is_truthy() {
            self.eval_block(consequence, env)
        } else if let Some(alternative) = alternative {
            self.eval_node(alternative, env)
        } else {
            Ok(Value::Null)
        }
    }

    fn eval_while(&mut self, condition: &Node, body: &Block, env: &Environment) -> RuntimeResult<Value> {
        let mut result = Value::Null;
        while self.eval_node(condition, env)?.is_truthy() {
            result = self.eval_block(body, env)?;
            if let Value::Return(_) = result {
                break;
            }
        }
        Ok(result)
    }

    fn eval_do_while(&mut self, body: &Block, condition: &Node, env: &Environment) -> RuntimeResult<Value> {
        loop {
            let result = self.eval_block(body, env)?;
            if let Value::Return(_) = result {
                return Ok(result);
            }
            // the loop stops once the condition holds
            if self.eval_node(condition, env)?.is_truthy() {
                return Ok(result);
            }
        }
    }

    fn eval_for(
        &mut self,
        initializer: Option<&Node>,
        condition: Option<&Node>,
        increment: Option<&Node>,
        body: &Block,
        env: &Environment,
    ) -> RuntimeResult<Value> {
        if let Some(initializer) = initializer {
            let value = self.eval_node(initializer, env)?;
            if let Value::Return(_) = value {
                return Ok(value);
            }
        }
        let mut result = Value::Null;
        loop {
            if let Some(condition) = condition {
                if !self.eval_node(condition, env)?.is_truthy() {
                    break;
                }
            }
            result = self.eval_block(body, env)?;
            if let Value::Return(_) = result {
                break;
            }
            if let Some(increment) = increment {
                let value = self.eval_node(increment, env)?;
                if let Value::Return(_) = value {
                    return Ok(value);
                }
            }
        }
        Ok(result)
    }

    fn eval_call(
        &mut self,
        callee: &Node,
        arguments: &[Node],
        position: Position,
        env: &Environment,
    ) -> RuntimeResult<Value> {
        let function = self.eval_node(callee, env)?;
        let args = arguments
            .iter()
            .map(|argument| self.eval_node(argument, env))
            .collect::<RuntimeResult<Vec<_>>>()?;
        let callee_name = match &callee.kind {
            NodeKind::Identifier(name) => Some(name.as_str()),
            _ => None,
        };

        match function {
            Value::Function(function) => {
                let name = callee_name.unwrap_or("procedimiento");
                trace!(name, args = args.len(), %position, "call");
                self.call_function(&function, name, args, position)
            }
            Value::Builtin(builtin) => {
                let name = callee_name.unwrap_or("builtin");
                trace!(name, args = args.len(), %position, "builtin call");
                self.call_builtin(builtin, name, &args, position)
            }
            other => Err(RuntimeError::NotAFunction {
                name: other.type_name(),
                line: position.line,
                column: position.column,
            }),
        }
    }

    fn call_function(
        &mut self,
        function: &FunctionValue,
        name: &str,
        args: Vec<Value>,
        position: Position,
    ) -> RuntimeResult<Value> {
        let scope = Environment::enclosed(&function.env);
        let mut args = args.into_iter();
        for parameter in &function.literal.parameters {
            scope.set(parameter.name.clone(), args.next().unwrap_or(Value::Null));
        }

        self.enter_frame(CallFrame::new(name, FrameKind::Function, Some(position)));
        let result = self.eval_block(&function.literal.body, &scope);
        self.exit_frame();
        result.map(Value::unwrap_return)
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        name: &str,
        args: &[Value],
        position: Position,
    ) -> RuntimeResult<Value> {
        self.enter_frame(CallFrame::new(name, FrameKind::Builtin, Some(position)));
        let (result, io) = {
            let mut ctx = NativeContext::new(&mut *self.output, position);
            let result = builtin.call(&mut ctx, args);
            (result, ctx.take_io())
        };
        if let Some(tracer) = self.tracer.as_mut() {
            for event in io {
                tracer.record_io(event);
            }
        }
        self.exit_frame();
        result.map_err(|err| RuntimeError::generic(err.to_string(), position))
    }

    fn eval_index(
        &mut self,
        target: &Node,
        index: &Node,
        position: Position,
        env: &Environment,
    ) -> RuntimeResult<Value> {
        let target = self.eval_node(target, env)?;
        let index = self.eval_node(index, env)?;

        if let Value::Dictionary(entries) = &target {
            let key = dictionary_key(&index).ok_or_else(|| RuntimeError::InvalidDictionaryKey {
                type_name: index.type_name(),
                line: position.line,
                column: position.column,
            })?;
            return Ok(entries.get(&key).cloned().unwrap_or(Value::Null));
        }

        let Value::Number(number) = index else {
            return Err(RuntimeError::TypeMismatch {
                left: target.type_name(),
                operator: "[]".to_string(),
                right: index.type_name(),
                line: position.line,
                column: position.column,
            });
        };
        if number.fract() != 0.0 || !number.is_finite() {
            return Err(RuntimeError::generic(
                "los índices deben ser números enteros",
                position,
            ));
        }

        let out_of_bounds = || RuntimeError::IndexOutOfBounds {
            index: number as i64,
            line: position.line,
            column: position.column,
        };
        let slot = usize::try_from(number as i64).ok();
        match &target {
            Value::Array(elements) => slot
                .and_then(|slot| elements.get(slot))
                .cloned()
                .ok_or_else(out_of_bounds),
            Value::String(text) => slot
                .and_then(|slot| text.chars().nth(slot))
                .map(|ch| Value::String(ch.to_string()))
                .ok_or_else(out_of_bounds),
            other => Err(RuntimeError::IndexOperatorNotSupported {
                type_name: other.type_name(),
                line: position.line,
                column: position.column,
            }),
        }
    }

    fn eval_member(
        &mut self,
        object: &Node,
        property: &Identifier,
        position: Position,
        env: &Environment,
    ) -> RuntimeResult<Value> {
        match self.eval_node(object, env)? {
            Value::Domain(domain) => domain.members.get(&property.name).cloned().ok_or_else(|| {
                RuntimeError::generic(
                    format!(
                        "el dominio '{}' no tiene el miembro '{}'",
                        domain.name, property.name
                    ),
                    position,
                )
            }),
            other => Err(RuntimeError::generic(
                format!(
                    "no se puede acceder al miembro '{}' en un objeto de tipo {}",
                    property.name,
                    other.type_name()
                ),
                position,
            )),
        }
    }

    fn traced(
        &mut self,
        node: &dyn Traceable,
        env: &Environment,
        operation: &'static str,
        result: RuntimeResult<Value>,
    ) -> RuntimeResult<Value> {
        if self.tracer.is_some() {
            match &result {
                Ok(value) => self.record(node, env, value, operation),
                Err(err) => self.record(node, env, &Value::Error(err.to_string()), operation),
            }
        }
        result
    }

    fn record(&mut self, node: &dyn Traceable, env: &Environment, value: &Value, operation: &'static str) {
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.record(node, env, Some(value), operation);
        }
    }

    fn enter_frame(&mut self, frame: CallFrame) {
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.enter_frame(frame);
        }
    }

    fn exit_frame(&mut self) {
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.exit_frame();
        }
    }
}

fn eval_prefix(operator: PrefixOp, right: Value, position: Position) -> RuntimeResult<Value> {
    match operator {
        PrefixOp::Bang | PrefixOp::Not => Ok(Value::Boolean(!right.is_truthy())),
        PrefixOp::Negate => match right {
            Value::Number(value) => Ok(Value::Number(-value)),
            other => Err(RuntimeError::UnknownPrefixOperator {
                operator: operator.to_string(),
                right: other.type_name(),
                line: position.line,
                column: position.column,
            }),
        },
    }
}
