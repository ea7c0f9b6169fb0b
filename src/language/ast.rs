use crate::language::span::{Position, Positioned};
use serde::Serialize;
use std::{fmt, rc::Rc};

#[derive(Clone, Debug, Default)]
pub struct Program {
    pub statements: Vec<Node>,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub statements: Vec<Node>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub position: Position,
}

/// A function literal shared between the syntax tree and every closure
/// created from it.
#[derive(Debug)]
pub struct FunctionLiteral {
    pub parameters: Vec<Identifier>,
    pub body: Block,
    pub name: Option<String>,
    pub position: Position,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub position: Position,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Let {
        name: Identifier,
        value: Box<Node>,
    },
    Assignment {
        name: Identifier,
        operator: AssignOp,
        value: Box<Node>,
    },
    Return {
        value: Box<Node>,
    },
    Expression(Box<Node>),
    Block(Block),
    Domain {
        name: Identifier,
        body: Block,
    },

    Identifier(String),
    Number(f64),
    String(String),
    Boolean(bool),
    Array(Vec<Node>),
    Dictionary(Vec<(Node, Node)>),
    Prefix {
        operator: PrefixOp,
        right: Box<Node>,
    },
    Infix {
        left: Box<Node>,
        operator: InfixOp,
        right: Box<Node>,
    },
    If {
        condition: Box<Node>,
        consequence: Block,
        /// Either a `Block` node (`si_no`) or another `If` node (`o_si`).
        alternative: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Block,
    },
    DoWhile {
        body: Block,
        condition: Box<Node>,
    },
    For {
        initializer: Option<Box<Node>>,
        condition: Option<Box<Node>>,
        increment: Option<Box<Node>>,
        body: Block,
    },
    Function(Rc<FunctionLiteral>),
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    Index {
        target: Box<Node>,
        index: Box<Node>,
    },
    Member {
        object: Box<Node>,
        property: Identifier,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixOp {
    Bang,
    Not,
    Negate,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrefixOp::Bang => "!",
            PrefixOp::Not => "no",
            PrefixOp::Negate => "-",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
    /// `+=`, `-=`, `*=` and `/=` used in expression position.
    Compound(AssignOp),
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfixOp::Add => f.write_str("+"),
            InfixOp::Sub => f.write_str("-"),
            InfixOp::Mul => f.write_str("*"),
            InfixOp::Div => f.write_str("/"),
            InfixOp::Lt => f.write_str("<"),
            InfixOp::Gt => f.write_str(">"),
            InfixOp::LtEq => f.write_str("<="),
            InfixOp::GtEq => f.write_str(">="),
            InfixOp::Eq => f.write_str("=="),
            InfixOp::NotEq => f.write_str("!="),
            InfixOp::And => f.write_str("y"),
            InfixOp::Or => f.write_str("o"),
            InfixOp::Compound(op) => write!(f, "{op}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    /// Arithmetic operator applied before storing, `None` for plain `=`.
    pub fn arithmetic(self) -> Option<InfixOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(InfixOp::Add),
            AssignOp::Sub => Some(InfixOp::Sub),
            AssignOp::Mul => Some(InfixOp::Mul),
            AssignOp::Div => Some(InfixOp::Div),
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        })
    }
}

impl Node {
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self { kind, position }
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Let { .. }
                | NodeKind::Assignment { .. }
                | NodeKind::Return { .. }
                | NodeKind::Expression(_)
                | NodeKind::Block(_)
                | NodeKind::Domain { .. }
        )
    }

    /// Literal text of the token that opened this node, used when an
    /// error message has to name a syntactic target.
    pub fn token_literal(&self) -> String {
        match &self.kind {
            NodeKind::Let { .. } => "variable".to_string(),
            NodeKind::Assignment { name, .. } => name.name.clone(),
            NodeKind::Return { .. } => "regresa".to_string(),
            NodeKind::Expression(inner) => inner.token_literal(),
            NodeKind::Block(_) => "{".to_string(),
            NodeKind::Domain { .. } => "dominio".to_string(),
            NodeKind::Identifier(name) => name.clone(),
            NodeKind::Number(value) => format_number(*value),
            NodeKind::String(text) => text.clone(),
            NodeKind::Boolean(true) => "verdadero".to_string(),
            NodeKind::Boolean(false) => "falso".to_string(),
            NodeKind::Array(_) => "[".to_string(),
            NodeKind::Dictionary(_) => "{".to_string(),
            NodeKind::Prefix { operator, .. } => operator.to_string(),
            NodeKind::Infix { operator, .. } => operator.to_string(),
            NodeKind::If { .. } => "si".to_string(),
            NodeKind::While { .. } => "mientras".to_string(),
            NodeKind::DoWhile { .. } => "hacer".to_string(),
            NodeKind::For { .. } => "para".to_string(),
            NodeKind::Function(_) => "procedimiento".to_string(),
            NodeKind::Call { .. } => "(".to_string(),
            NodeKind::Index { .. } => "[".to_string(),
            NodeKind::Member { .. } => ".".to_string(),
        }
    }
}

impl Positioned for Node {
    fn position(&self) -> Position {
        self.position
    }
}

impl Positioned for Block {
    fn position(&self) -> Position {
        self.position
    }
}

/// Formats a number the way the language prints it: integral values drop
/// the fractional part.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{value}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeCategory {
    Program,
    Statement,
    Expression,
}

/// Static description of a node attached to each trace event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeMetadata {
    #[serde(rename = "type")]
    pub node_type: &'static str,
    pub kind: NodeCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl NodeMetadata {
    fn new(node_type: &'static str, kind: NodeCategory) -> Self {
        Self {
            node_type,
            kind,
            size: None,
            identifier: None,
            name: None,
            arguments: None,
            parameters: None,
            value: None,
        }
    }
}

/// Anything the runtime tracer can record an event for.
pub trait Traceable: Positioned {
    fn node_type(&self) -> &'static str;
    fn metadata(&self) -> NodeMetadata;
}

impl Positioned for Program {
    fn position(&self) -> Position {
        Position::default()
    }
}

impl Traceable for Program {
    fn node_type(&self) -> &'static str {
        "Program"
    }

    fn metadata(&self) -> NodeMetadata {
        let mut metadata = NodeMetadata::new(self.node_type(), NodeCategory::Program);
        metadata.size = Some(self.statements.len());
        metadata
    }
}

impl Traceable for Block {
    fn node_type(&self) -> &'static str {
        "Block"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new(self.node_type(), NodeCategory::Statement)
    }
}

impl Traceable for Node {
    fn node_type(&self) -> &'static str {
        match &self.kind {
            NodeKind::Let { .. } => "LetStatement",
            NodeKind::Assignment { .. } => "AssignmentStatement",
            NodeKind::Return { .. } => "ReturnStatement",
            NodeKind::Expression(_) => "ExpressionStatement",
            NodeKind::Block(_) => "Block",
            NodeKind::Domain { .. } => "DomainStatement",
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::Number(_) => "Number",
            NodeKind::String(_) => "StringLiteral",
            NodeKind::Boolean(_) => "Boolean",
            NodeKind::Array(_) => "ArrayLiteral",
            NodeKind::Dictionary(_) => "DictionaryLiteral",
            NodeKind::Prefix { .. } => "Prefix",
            NodeKind::Infix { .. } => "Infix",
            NodeKind::If { .. } => "If",
            NodeKind::While { .. } => "While",
            NodeKind::DoWhile { .. } => "DoWhile",
            NodeKind::For { .. } => "For",
            NodeKind::Function(_) => "Function",
            NodeKind::Call { .. } => "Call",
            NodeKind::Index { .. } => "Index",
            NodeKind::Member { .. } => "MemberAccess",
        }
    }

    fn metadata(&self) -> NodeMetadata {
        let category = if self.is_statement() {
            NodeCategory::Statement
        } else {
            NodeCategory::Expression
        };
        let mut metadata = NodeMetadata::new(self.node_type(), category);
        match &self.kind {
            NodeKind::Let { name, .. } | NodeKind::Domain { name, .. } => {
                metadata.identifier = Some(name.name.clone());
            }
            NodeKind::Assignment { name, .. } => metadata.identifier = Some(name.name.clone()),
            NodeKind::Identifier(name) => metadata.name = Some(name.clone()),
            NodeKind::Call { arguments, .. } => metadata.arguments = Some(arguments.len()),
            NodeKind::Function(literal) => {
                metadata.parameters = Some(
                    literal
                        .parameters
                        .iter()
                        .map(|parameter| parameter.name.clone())
                        .collect(),
                );
                metadata.name = literal.name.clone();
            }
            NodeKind::Number(value) => metadata.value = Some(serde_json::json!(value)),
            NodeKind::Boolean(value) => metadata.value = Some(serde_json::json!(value)),
            NodeKind::String(text) => metadata.value = Some(serde_json::json!(text)),
            NodeKind::Member { property, .. } => metadata.name = Some(property.name.clone()),
            _ => {}
        }
        metadata
    }
}
