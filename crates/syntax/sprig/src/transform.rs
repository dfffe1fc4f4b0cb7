//! Lowering from AST to list-expressions.
//!
//! String literals lower to `(quote "text")` so they are never mistaken for
//! variable references, and static member keys lower to `(quote name)`.
//! Loops become self-referential local functions named `__loop_N`.

use crate::ast::{Entry, Node, Program, UnaryOp};
use rhizome_sprig_ir::Value;
use thiserror::Error;

/// Prefix of generated loop function names.
pub const LOOP_PREFIX: &str = "__loop_";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("invalid assignment target: {0}")]
    InvalidTarget(String),
}

/// Lowers nodes, allocating one generated name per loop.
#[derive(Debug, Default)]
pub struct Transformer {
    loops: usize,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(progn (define name value) ...)` in definition order. Methods become
    /// lambdas.
    pub fn program(&mut self, program: &Program) -> Result<Value, TransformError> {
        let mut forms = Vec::with_capacity(program.definitions.len());
        for entry in &program.definitions {
            let value = self.entry_value(entry)?;
            forms.push(Value::call(
                "define",
                vec![Value::symbol(entry.key()), value],
            ));
        }
        Ok(Value::call("progn", forms))
    }

    pub fn node(&mut self, node: &Node) -> Result<Value, TransformError> {
        Ok(match node {
            Node::Number { value } => Value::Number(*value),
            Node::Str { value } => Value::quote(Value::str(value)),
            Node::Bool { value } => Value::Bool(*value),
            Node::Null => Value::Null,
            Node::Identifier { name } => Value::symbol(name),
            Node::This => Value::symbol("this"),
            Node::Array { elements } => Value::call("list", self.nodes(elements)?),
            Node::Object { entries } => {
                let mut args = Vec::with_capacity(entries.len() * 2);
                for entry in entries {
                    args.push(Value::quote(Value::symbol(entry.key())));
                    args.push(self.entry_value(entry)?);
                }
                Value::call("object", args)
            }
            Node::Unary { op, operand } => {
                let head = match op {
                    UnaryOp::Not => "not",
                    UnaryOp::Neg => "-",
                };
                Value::call(head, vec![self.node(operand)?])
            }
            Node::Binary { op, left, right } => Value::call(
                op.primitive(),
                vec![self.node(left)?, self.node(right)?],
            ),
            Node::Ternary {
                test,
                consequent,
                alternate,
            } => Value::call(
                "if",
                vec![
                    self.node(test)?,
                    self.node(consequent)?,
                    self.node(alternate)?,
                ],
            ),
            Node::Member { .. } => self.load(node)?,
            Node::Call { callee, args } => {
                let args = self.nodes(args)?;
                match callee.as_ref() {
                    Node::Identifier { name } => Value::call(name, args),
                    other => Value::call(
                        "apply",
                        vec![self.node(other)?, Value::call("list", args)],
                    ),
                }
            }
            Node::Assign { target, value } => {
                let value = self.node(value)?;
                self.store(target, value)?
            }
            Node::Block { body } => Value::call("progn", self.nodes(body)?),
            Node::If {
                test,
                consequent,
                alternate,
            } => {
                let mut args = vec![self.node(test)?, self.node(consequent)?];
                if let Some(alternate) = alternate {
                    args.push(self.node(alternate)?);
                }
                Value::call("if", args)
            }
            Node::For {
                init,
                test,
                update,
                body,
            } => self.for_loop(init.as_deref(), test.as_deref(), update.as_deref(), body)?,
            Node::Arrow { params, body } => self.lambda(params, body)?,
        })
    }

    fn nodes(&mut self, nodes: &[Node]) -> Result<Vec<Value>, TransformError> {
        nodes.iter().map(|n| self.node(n)).collect()
    }

    fn entry_value(&mut self, entry: &Entry) -> Result<Value, TransformError> {
        match entry {
            Entry::Property { value, .. } => self.node(value),
            Entry::Method { params, body, .. } => self.lambda(params, body),
        }
    }

    fn lambda(&mut self, params: &[String], body: &Node) -> Result<Value, TransformError> {
        let params = params.iter().map(Value::symbol).collect();
        Ok(Value::call("lambda", vec![Value::List(params), self.node(body)?]))
    }

    /// `(get object key)` with static keys quoted.
    fn load(&mut self, node: &Node) -> Result<Value, TransformError> {
        match node {
            Node::Member {
                object,
                property,
                computed,
            } => Ok(Value::call(
                "get",
                vec![self.node(object)?, self.member_key(property, *computed)?],
            )),
            other => self.node(other),
        }
    }

    fn member_key(&mut self, property: &Node, computed: bool) -> Result<Value, TransformError> {
        match (property, computed) {
            (Node::Identifier { name }, false) => Ok(Value::quote(Value::symbol(name))),
            (other, _) => self.node(other),
        }
    }

    /// Identifiers store with `(define name value)`. Member targets are a
    /// read-modify-write of their base, recursively, so `a.b.c = v` becomes
    /// `(define a (set a 'b (set (get a 'b) 'c v)))`. Properties of `this`
    /// write a single key: `this.x = v` is `(set-this 'x v)`.
    fn store(&mut self, target: &Node, value: Value) -> Result<Value, TransformError> {
        match target {
            Node::Identifier { name } => Ok(Value::call(
                "define",
                vec![Value::symbol(name), value],
            )),
            Node::This => Ok(Value::call("define", vec![Value::symbol("this"), value])),
            Node::Member {
                object,
                property,
                computed,
            } => {
                if let Node::This = object.as_ref() {
                    let key = self.member_key(property, *computed)?;
                    return Ok(Value::call("set-this", vec![key, value]));
                }
                let base = self.load(object)?;
                let key = self.member_key(property, *computed)?;
                let updated = Value::call("set", vec![base, key, value]);
                self.store(object, updated)
            }
            other => Err(TransformError::InvalidTarget(other.kind_name().to_string())),
        }
    }

    /// ```text
    /// (progn
    ///   INIT
    ///   (define __loop_N
    ///     (lambda () (if TEST (progn BODY UPDATE (__loop_N)))))
    ///   (__loop_N))
    /// ```
    /// Missing clauses lower to `null`, a missing test to `true`.
    fn for_loop(
        &mut self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> Result<Value, TransformError> {
        let name = format!("{LOOP_PREFIX}{}", self.loops);
        self.loops += 1;

        let init = self.optional(init, Value::Null)?;
        let test = self.optional(test, Value::Bool(true))?;
        let body = self.node(body)?;
        let update = self.optional(update, Value::Null)?;
        let again = Value::call(&name, vec![]);

        let step = Value::call("progn", vec![body, update, again.clone()]);
        let lambda = Value::call(
            "lambda",
            vec![Value::List(vec![]), Value::call("if", vec![test, step])],
        );
        Ok(Value::call(
            "progn",
            vec![
                init,
                Value::call("define", vec![Value::symbol(&name), lambda]),
                again,
            ],
        ))
    }

    fn optional(&mut self, node: Option<&Node>, default: Value) -> Result<Value, TransformError> {
        node.map_or(Ok(default), |n| self.node(n))
    }
}

/// Lowers one node with a fresh loop counter.
pub fn transform(node: &Node) -> Result<Value, TransformError> {
    Transformer::new().node(node)
}

/// Lowers a program with a fresh loop counter.
pub fn transform_program(program: &Program) -> Result<Value, TransformError> {
    Transformer::new().program(program)
}
