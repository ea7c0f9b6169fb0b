use crate::language::{
    ast::{format_number, NodeMetadata, Traceable},
    span::{Position, Positioned},
};
use crate::runtime::{environment::Environment, value::Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A pause point. Without a column the breakpoint matches any node on the line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(default)]
    pub once: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Breakpoint {
    pub fn line(line: usize) -> Self {
        Self {
            line,
            column: None,
            once: false,
            label: None,
        }
    }

    pub fn at(line: usize, column: usize) -> Self {
        Self {
            column: Some(column),
            ..Self::line(line)
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn key(&self) -> (usize, Option<usize>) {
        (self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseBreakpointError(String);

impl fmt::Display for ParseBreakpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "punto de interrupción inválido '{}': se esperaba LINEA[:COLUMNA]", self.0)
    }
}

impl std::error::Error for ParseBreakpointError {}

/// Parses `LINE` or `LINE:COLUMN`.
impl FromStr for Breakpoint {
    type Err = ParseBreakpointError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseBreakpointError(text.to_string());
        let (line, column) = match text.split_once(':') {
            Some((line, column)) => (line, Some(column)),
            None => (text, None),
        };
        let line: usize = line.trim().parse().map_err(|_| invalid())?;
        if line == 0 {
            return Err(invalid());
        }
        match column {
            Some(column) => {
                let column: usize = column.trim().parse().map_err(|_| invalid())?;
                Ok(Breakpoint::at(line, column))
            }
            None => Ok(Breakpoint::line(line)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TracerOptions {
    pub breakpoints: Vec<Breakpoint>,
    pub step_mode: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RuntimeValueSnapshot {
    #[serde(rename = "type")]
    pub value_type: &'static str,
    pub value: serde_json::Value,
    pub repr: String,
}

impl RuntimeValueSnapshot {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Return(inner) => {
                let inner = Self::of(inner);
                Self {
                    value_type: value.type_name(),
                    value: inner.value,
                    repr: inner.repr,
                }
            }
            other => Self {
                value_type: other.type_name(),
                value: payload(other),
                repr: other.to_string(),
            },
        }
    }
}

fn payload(value: &Value) -> serde_json::Value {
    match value {
        Value::Number(number) if number.is_finite() => json!(number),
        Value::Number(number) => json!(format_number(*number)),
        Value::Boolean(flag) => json!(flag),
        Value::String(text) => json!(text),
        Value::Null => serde_json::Value::Null,
        Value::Array(elements) => elements.iter().map(payload).collect(),
        Value::Dictionary(pairs) => pairs
            .iter()
            .map(|(key, value)| (key.clone(), payload(value)))
            .collect::<serde_json::Map<_, _>>()
            .into(),
        Value::Function(function) => json!({
            "parameters": function.parameter_names(),
            "hasName": function.name().is_some(),
        }),
        Value::Builtin(_) => json!("builtin"),
        Value::Domain(domain) => json!({
            "name": domain.name,
            "members": domain.members.keys().collect::<Vec<_>>(),
        }),
        Value::Return(inner) => payload(inner),
        Value::Error(message) => json!(message),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScopeSnapshot {
    pub level: usize,
    pub variables: BTreeMap<String, RuntimeValueSnapshot>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EnvironmentSnapshot {
    pub scopes: Vec<ScopeSnapshot>,
}

impl EnvironmentSnapshot {
    /// Captures every scope reachable from `env`, outermost first.
    pub fn capture(env: &Environment) -> Self {
        let scopes = env
            .chain()
            .iter()
            .enumerate()
            .map(|(level, scope)| ScopeSnapshot {
                level,
                variables: scope
                    .bindings()
                    .into_iter()
                    .map(|(name, value)| (name, RuntimeValueSnapshot::of(&value)))
                    .collect(),
            })
            .collect();
        Self { scopes }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Update,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnvironmentChange {
    pub scope: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<RuntimeValueSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<RuntimeValueSnapshot>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Program,
    Function,
    Builtin,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallFrame {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FrameKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Position>,
}

impl CallFrame {
    pub fn new(name: impl Into<String>, kind: FrameKind, location: Option<Position>) -> Self {
        Self {
            name: name.into(),
            kind,
            location,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IoKind {
    Output,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IoEvent {
    #[serde(rename = "type")]
    pub kind: IoKind,
    pub value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<Position>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub step: usize,
    pub node_type: &'static str,
    pub operation: &'static str,
    pub position: Position,
    pub metadata: NodeMetadata,
    pub environment: EnvironmentSnapshot,
    pub changes: Vec<EnvironmentChange>,
    pub call_stack: Vec<CallFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RuntimeValueSnapshot>,
    pub breakpoint: bool,
    pub step_mode: bool,
    pub io_events: Vec<IoEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RuntimeTrace {
    pub events: Vec<TraceEvent>,
    pub breakpoints: Vec<Breakpoint>,
    pub io: Vec<IoEvent>,
}

/// Observes evaluation and accumulates one [`TraceEvent`] per recorded node.
#[derive(Debug, Default)]
pub struct RuntimeTracer {
    step_mode: bool,
    breakpoints: Vec<Breakpoint>,
    events: Vec<TraceEvent>,
    call_stack: Vec<CallFrame>,
    pending_io: Vec<IoEvent>,
    io_log: Vec<IoEvent>,
    last_snapshot: Option<EnvironmentSnapshot>,
    cursor: usize,
}

impl RuntimeTracer {
    pub fn new(options: TracerOptions) -> Self {
        let mut tracer = Self {
            step_mode: options.step_mode,
            ..Self::default()
        };
        for breakpoint in options.breakpoints {
            tracer.add_breakpoint(breakpoint);
        }
        tracer
    }

    pub fn enter_frame(&mut self, frame: CallFrame) {
        self.call_stack.push(frame);
    }

    pub fn exit_frame(&mut self) {
        self.call_stack.pop();
    }

    pub fn record_io(&mut self, event: IoEvent) {
        self.pending_io.push(event.clone());
        self.io_log.push(event);
    }

    /// Registers a breakpoint, replacing any with the same line and column.
    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) {
        match self
            .breakpoints
            .iter_mut()
            .find(|existing| existing.key() == breakpoint.key())
        {
            Some(existing) => *existing = breakpoint,
            None => self.breakpoints.push(breakpoint),
        }
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn set_step_mode(&mut self, enabled: bool) {
        self.step_mode = enabled;
    }

    pub fn record(
        &mut self,
        node: &dyn Traceable,
        env: &Environment,
        result: Option<&Value>,
        operation: &'static str,
    ) -> &TraceEvent {
        let environment = EnvironmentSnapshot::capture(env);
        let changes = diff(self.last_snapshot.as_ref(), &environment);
        self.last_snapshot = Some(environment.clone());

        let position = node.position();
        let event = TraceEvent {
            step: self.events.len() + 1,
            node_type: node.node_type(),
            operation,
            position,
            metadata: node.metadata(),
            environment,
            changes,
            call_stack: self.call_stack.clone(),
            result: result.map(RuntimeValueSnapshot::of),
            breakpoint: self.match_breakpoint(position),
            step_mode: self.step_mode,
            io_events: std::mem::take(&mut self.pending_io),
        };
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Next unread event, advancing the read cursor.
    pub fn next_step(&mut self) -> Option<&TraceEvent> {
        let event = self.events.get(self.cursor)?;
        self.cursor += 1;
        Some(event)
    }

    pub fn reset_steps(&mut self) {
        self.cursor = 0;
    }

    pub fn trace(&self) -> RuntimeTrace {
        RuntimeTrace {
            events: self.events.clone(),
            breakpoints: self.list_breakpoints(),
            io: self.io_log.clone(),
        }
    }

    pub fn into_trace(self) -> RuntimeTrace {
        let breakpoints = self.list_breakpoints();
        RuntimeTrace {
            events: self.events,
            breakpoints,
            io: self.io_log,
        }
    }

    fn list_breakpoints(&self) -> Vec<Breakpoint> {
        let mut seen = Vec::new();
        self.breakpoints
            .iter()
            .filter(|breakpoint| {
                let signature = (breakpoint.line, breakpoint.column, breakpoint.label.clone());
                if seen.contains(&signature) {
                    false
                } else {
                    seen.push(signature);
                    true
                }
            })
            .cloned()
            .collect()
    }

    fn match_breakpoint(&mut self, position: Position) -> bool {
        // line 0 marks nodes without a source position
        if position.line == 0 {
            return false;
        }
        let exact = (position.line, Some(position.column));
        let wildcard = (position.line, None);
        let matched = self
            .breakpoints
            .iter()
            .position(|breakpoint| breakpoint.key() == exact)
            .or_else(|| {
                self.breakpoints
                    .iter()
                    .position(|breakpoint| breakpoint.key() == wildcard)
            });
        match matched {
            Some(index) => {
                if self.breakpoints[index].once {
                    self.breakpoints.remove(index);
                }
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a RuntimeTracer {
    type Item = &'a TraceEvent;
    type IntoIter = std::slice::Iter<'a, TraceEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

fn diff(previous: Option<&EnvironmentSnapshot>, current: &EnvironmentSnapshot) -> Vec<EnvironmentChange> {
    let empty = BTreeMap::new();
    let previous_scopes = previous.map(|snapshot| snapshot.scopes.as_slice()).unwrap_or(&[]);
    let depth = current.scopes.len().max(previous_scopes.len());
    let mut changes = Vec::new();

    for level in 0..depth {
        let now = current.scopes.get(level).map_or(&empty, |scope| &scope.variables);
        let before = previous_scopes.get(level).map_or(&empty, |scope| &scope.variables);

        for (name, after) in now {
            match before.get(name) {
                None => changes.push(EnvironmentChange {
                    scope: level,
                    name: name.clone(),
                    kind: ChangeKind::Add,
                    before: None,
                    after: Some(after.clone()),
                }),
                Some(old) if old.value_type != after.value_type || old.value != after.value => {
                    changes.push(EnvironmentChange {
                        scope: level,
                        name: name.clone(),
                        kind: ChangeKind::Update,
                        before: Some(old.clone()),
                        after: Some(after.clone()),
                    })
                }
                Some(_) => {}
            }
        }
        for (name, old) in before {
            if !now.contains_key(name) {
                changes.push(EnvironmentChange {
                    scope: level,
                    name: name.clone(),
                    kind: ChangeKind::Delete,
                    before: Some(old.clone()),
                    after: None,
                });
            }
        }
    }
    changes
}
