//! The AST node shape consumed from the parsing collaborator, plus the typed
//! value representation threaded through the evaluator.
//!
//! `spec.md` §3 describes `Node` as a uniform, stringly-kinded element; here
//! `kind` becomes a closed `NodeKind` so the evaluator's dispatch (§9) is
//! exhaustive instead of relying on a `default: should never get here` arm.

use std::{fmt, rc::Rc};

use chrono::{DateTime, Utc};

/// Position of a node in its source file, used only for error messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePos {
    pub file: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    #[must_use]
    pub fn new(file: Rc<str>, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// The literal kinds a value node can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Str,
    Integer,
    Decimal,
    Date,
    Bool,
    Null,
}

/// Closed tag for every shape a `Node` can take.
///
/// Per `spec.md` §9's redesign flag, this replaces the source's stringly-typed
/// `kind` field so the evaluator can match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Import,
    Entity,
    Generation,
    Field,
    Identifier,
    Builtin,
    Literal(LiteralKind),
    Dict,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Root => "root",
            Self::Import => "import",
            Self::Entity => "entity",
            Self::Generation => "generation",
            Self::Field => "field",
            Self::Identifier => "identifier",
            Self::Builtin => "builtin",
            Self::Literal(LiteralKind::Str) => "literal-string",
            Self::Literal(LiteralKind::Integer) => "literal-integer",
            Self::Literal(LiteralKind::Decimal) => "literal-decimal",
            Self::Literal(LiteralKind::Date) => "literal-date",
            Self::Literal(LiteralKind::Bool) => "literal-bool",
            Self::Literal(LiteralKind::Null) => "literal-null",
            Self::Dict => "dict",
        };
        f.write_str(s)
    }
}

/// Heterogeneous payload a node's `value` slot may carry.
///
/// `spec.md` §9 asks for a sum type in place of the source's unconstrained
/// value slot; `Node` is boxed rather than inlined to keep `Value` small.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Bool(bool),
    Null,
    Node(Box<Node>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// The type name used in "Expected X to be a Y, but was Z." messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "decimal",
            Self::Timestamp(_) => "datetime",
            Self::Bool(_) => "bool",
            Self::Null => "null",
            Self::Node(_) => "node",
        }
    }
}

/// Multiplicity range controlling how many values a field emits per record.
///
/// Invariant: `min <= max`. Defaults to `{1, 1}` when absent from the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    pub min: i64,
    pub max: i64,
}

impl Default for Bound {
    fn default() -> Self {
        Self { min: 1, max: 1 }
    }
}

impl Bound {
    #[must_use]
    pub fn exact(n: i64) -> Self {
        Self { min: n, max: n }
    }

    pub fn is_scalar(&self) -> bool {
        self.min == 1 && self.max == 1
    }
}

/// A uniform AST element as consumed from the parsing collaborator.
///
/// Not every field is populated for every `kind`; see `spec.md` §3 for which
/// fields apply to which kinds.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub value: Option<Value>,
    pub children: Vec<Node>,
    pub args: Vec<Node>,
    pub bound: Option<Vec<Node>>,
    pub related: Option<Box<Node>>,
    pub pos: SourcePos,
}

impl Node {
    #[must_use]
    pub fn new(kind: NodeKind, pos: SourcePos) -> Self {
        Self {
            kind,
            name: None,
            value: None,
            children: Vec::new(),
            args: Vec::new(),
            bound: None,
            related: None,
            pos,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<Node>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_bound(mut self, bound: Vec<Node>) -> Self {
        self.bound = Some(bound);
        self
    }

    #[must_use]
    pub fn with_related(mut self, related: Node) -> Self {
        self.related = Some(Box::new(related));
        self
    }

    /// The nested node carried in `value`, for kinds where `value` is itself a node
    /// (`field`, `generation`).
    pub fn value_node(&self) -> Option<&Node> {
        match &self.value {
            Some(Value::Node(n)) => Some(n),
            _ => None,
        }
    }

    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    pub fn value_int(&self) -> Option<i64> {
        self.value.as_ref().and_then(Value::as_int)
    }
}
