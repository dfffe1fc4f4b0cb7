//! Abstract syntax tree.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    /// Primitive name the operator lowers to. Both equality spellings are
    /// strict.
    pub fn primitive(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq | BinaryOp::StrictEq => "==",
            BinaryOp::NotEq | BinaryOp::StrictNotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// An object literal entry or a top-level program definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Entry {
    Property {
        key: String,
        value: Node,
    },
    Method {
        key: String,
        params: Vec<String>,
        body: Node,
    },
}

impl Entry {
    pub fn key(&self) -> &str {
        match self {
            Entry::Property { key, .. } | Entry::Method { key, .. } => key,
        }
    }
}

/// A program: an ordered list of top-level property and method definitions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub definitions: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Number {
        value: f64,
    },
    Str {
        value: String,
    },
    Bool {
        value: bool,
    },
    Null,
    Identifier {
        name: String,
    },
    This,
    Array {
        elements: Vec<Node>,
    },
    Object {
        entries: Vec<Entry>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Ternary {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    /// `object.name` stores `name` as an identifier with `computed: false`;
    /// `object[expr]` stores the expression with `computed: true`.
    Member {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    /// Target is always an identifier or member node.
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    Block {
        body: Vec<Node>,
    },
    /// `elif` chains nest in `alternate`.
    If {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Option<Box<Node>>,
    },
    For {
        init: Option<Box<Node>>,
        /// Missing test means `true`.
        test: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    Arrow {
        params: Vec<String>,
        body: Box<Node>,
    },
}

impl Node {
    pub fn identifier(name: impl Into<String>) -> Self {
        Node::Identifier { name: name.into() }
    }

    pub fn number(value: f64) -> Self {
        Node::Number { value }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Node::Str {
            value: value.into(),
        }
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Legal assignment targets.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Node::Identifier { .. } | Node::Member { .. })
    }

    /// Short name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Number { .. } => "number",
            Node::Str { .. } => "string",
            Node::Bool { .. } => "boolean",
            Node::Null => "null",
            Node::Identifier { .. } => "identifier",
            Node::This => "this",
            Node::Array { .. } => "array",
            Node::Object { .. } => "object",
            Node::Unary { .. } => "unary expression",
            Node::Binary { .. } => "binary expression",
            Node::Ternary { .. } => "ternary expression",
            Node::Member { .. } => "member expression",
            Node::Call { .. } => "call expression",
            Node::Assign { .. } => "assignment",
            Node::Block { .. } => "block",
            Node::If { .. } => "if statement",
            Node::For { .. } => "for statement",
            Node::Arrow { .. } => "arrow function",
        }
    }
}
