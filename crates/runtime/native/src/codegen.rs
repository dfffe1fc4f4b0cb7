//! Syntax tree to closure compilation.
//!
//! Each node compiles to a [`Code`] closure once; running a program never
//! revisits the tree. Identifiers are bound here:
//!
//! - parameters and names a function body assigns become frame slots
//! - top-level definition names read and write the state object
//! - remaining names that the registry knows become primitive references
//! - anything else is looked up in the caller context and state at run time

use rhizome_sprig_ir::stdlib::higher;
use rhizome_sprig_ir::{EvalError, Object, PrimitiveFn, Primitives, Value, ops};
use rhizome_sprig_syntax::{BinaryOp, Entry, Node, UnaryOp};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

use crate::machine::{Code, Exec, FunctionCode, NativeHost, call_value, function_value, primitive_value};

/// Parameter names of implicit higher-order callbacks.
const ITEM_NAMES: [&str; 2] = ["item", "index"];
const REDUCE_NAMES: [&str; 3] = ["acc", "item", "index"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("invalid assignment target: {0}")]
    InvalidTarget(String),
}

type Lookup = Rc<dyn Fn(&Exec) -> Option<Value>>;

enum Binding {
    Slot { up: usize, index: usize },
    State,
    Primitive(Rc<PrimitiveFn>),
}

fn code(f: impl Fn(&Exec) -> Result<Value, EvalError> + 'static) -> Code {
    Rc::new(f)
}

fn constant(value: Value) -> Code {
    code(move |_| Ok(value.clone()))
}

fn run_all(codes: &[Code], exec: &Exec) -> Result<Vec<Value>, EvalError> {
    codes.iter().map(|c| c(exec)).collect()
}

/// Calls whatever a name denotes: a bound function first, then the
/// primitive of that name.
fn dispatch(
    name: &str,
    func: Option<Value>,
    prim: Option<&PrimitiveFn>,
    args: Vec<Value>,
) -> Result<Value, EvalError> {
    match (func, prim) {
        (Some(func), _) if func.is_callable() => call_value(&func, args),
        (_, Some(prim)) => prim(&args, &NativeHost),
        (Some(_), None) => Err(EvalError::NotCallable(name.to_string())),
        (None, None) => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

pub(crate) struct Compiler<'a> {
    primitives: &'a Primitives,
    /// Top-level definition names. These live in the state object.
    globals: &'a HashSet<String>,
    /// Slot names of the enclosing functions, innermost last.
    scopes: Vec<Vec<String>>,
}

impl<'a> Compiler<'a> {
    pub fn new(primitives: &'a Primitives, globals: &'a HashSet<String>) -> Self {
        Self {
            primitives,
            globals,
            scopes: Vec::new(),
        }
    }

    /// Parameters take the first slots, followed by every name the body
    /// assigns that is not already visible from an enclosing scope.
    pub fn function(
        &mut self,
        name: &str,
        params: &[String],
        body: &Node,
    ) -> Result<FunctionCode, CompileError> {
        let mut assigned = Vec::new();
        assigned_names(body, &mut assigned);

        let mut scope = params.to_vec();
        for local in assigned {
            if !scope.contains(&local) && !self.is_visible(&local) {
                scope.push(local);
            }
        }
        let slots = scope.len();

        self.scopes.push(scope);
        let body = self.expr(body);
        self.scopes.pop();

        Ok(FunctionCode {
            name: name.into(),
            params: params.len(),
            slots,
            body: body?,
        })
    }

    /// Value of an object literal entry or top-level definition.
    pub fn entry(&mut self, entry: &Entry) -> Result<Code, CompileError> {
        match entry {
            Entry::Property { value, .. } => self.expr(value),
            Entry::Method { key, params, body } => self.closure(key, params, body),
        }
    }

    pub fn expr(&mut self, node: &Node) -> Result<Code, CompileError> {
        Ok(match node {
            Node::Number { value } => constant(Value::Number(*value)),
            Node::Str { value } => constant(Value::str(value)),
            Node::Bool { value } => constant(Value::Bool(*value)),
            Node::Null => constant(Value::Null),
            Node::Identifier { name } => self.read(name),
            Node::This => code(|exec| Ok(Value::Object(exec.machine.state()))),
            Node::Array { elements } => {
                let elements = self.exprs(elements)?;
                code(move |exec| Ok(Value::List(run_all(&elements, exec)?)))
            }
            Node::Object { entries } => {
                let mut fields = Vec::with_capacity(entries.len());
                for entry in entries {
                    fields.push((entry.key().to_string(), self.entry(entry)?));
                }
                code(move |exec| {
                    let mut map = Object::new();
                    for (key, value) in &fields {
                        map.insert(key.clone(), value(exec)?);
                    }
                    Ok(Value::Object(map))
                })
            }
            Node::Unary { op, operand } => {
                let name = match op {
                    UnaryOp::Not => "not",
                    UnaryOp::Neg => "-",
                };
                let operand = self.expr(operand)?;
                self.operator(name, vec![operand])
            }
            Node::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => self.logical(left, right, false)?,
            Node::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => self.logical(left, right, true)?,
            Node::Binary { op, left, right } => {
                let args = vec![self.expr(left)?, self.expr(right)?];
                self.operator(op.primitive(), args)
            }
            Node::Ternary {
                test,
                consequent,
                alternate,
            } => self.branch(test, consequent, Some(&**alternate))?,
            Node::If {
                test,
                consequent,
                alternate,
            } => self.branch(test, consequent, alternate.as_deref())?,
            Node::Member {
                object,
                property,
                computed,
            } => self.load(object, property, *computed)?,
            Node::Call { callee, args } => self.call(callee, args)?,
            Node::Assign { target, value } => {
                let value = self.expr(value)?;
                self.store(target, value, true)?
            }
            Node::Block { body } => self.block(body, true)?,
            Node::For {
                init,
                test,
                update,
                body,
            } => self.for_loop(init.as_deref(), test.as_deref(), update.as_deref(), body)?,
            Node::Arrow { params, body } => self.closure("lambda", params, body)?,
        })
    }

    fn exprs(&mut self, nodes: &[Node]) -> Result<Vec<Code>, CompileError> {
        nodes.iter().map(|n| self.expr(n)).collect()
    }

    /// Like [`Compiler::expr`], for nodes whose value may be discarded.
    fn statement(&mut self, node: &Node, used: bool) -> Result<Code, CompileError> {
        match node {
            Node::Assign { target, value } => {
                let value = self.expr(value)?;
                self.store(target, value, used)
            }
            Node::Block { body } => self.block(body, used),
            other => self.expr(other),
        }
    }

    fn resolve(&self, name: &str) -> Binding {
        for (up, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(index) = scope.iter().rposition(|n| n == name) {
                return Binding::Slot { up, index };
            }
        }
        if self.globals.contains(name) {
            return Binding::State;
        }
        match self.primitives.get(name) {
            Some(prim) => Binding::Primitive(prim),
            None => Binding::State,
        }
    }

    fn is_visible(&self, name: &str) -> bool {
        self.globals.contains(name) || self.scopes.iter().any(|s| s.iter().any(|n| n == name))
    }

    fn read(&self, name: &str) -> Code {
        let owned = name.to_string();
        match self.resolve(name) {
            Binding::Slot { up, index } => code(move |exec| {
                exec.frame
                    .get(up, index)
                    .ok_or_else(|| EvalError::UnboundVariable(owned.clone()))
            }),
            Binding::State => code(move |exec| {
                exec.machine
                    .read_global(&owned)
                    .ok_or_else(|| EvalError::UnboundVariable(owned.clone()))
            }),
            Binding::Primitive(prim) => constant(primitive_value(name, prim)),
        }
    }

    /// Current binding of a name, if any. Primitives are not bindings.
    fn lookup(&self, name: &str) -> Lookup {
        match self.resolve(name) {
            Binding::Slot { up, index } => Rc::new(move |exec: &Exec| exec.frame.get(up, index)),
            Binding::State => {
                let name = name.to_string();
                Rc::new(move |exec: &Exec| exec.machine.read_global(&name))
            }
            Binding::Primitive(_) => Rc::new(|_: &Exec| None),
        }
    }

    fn operator(&self, name: &'static str, args: Vec<Code>) -> Code {
        match self.primitives.get(name) {
            Some(prim) => code(move |exec| prim(&run_all(&args, exec)?, &NativeHost)),
            None => code(move |_| Err(EvalError::UnknownFunction(name.to_string()))),
        }
    }

    fn logical(&mut self, left: &Node, right: &Node, stop_on: bool) -> Result<Code, CompileError> {
        let left = self.expr(left)?;
        let right = self.expr(right)?;
        Ok(code(move |exec| {
            if ops::truthy(&left(exec)?) == stop_on {
                return Ok(Value::Bool(stop_on));
            }
            Ok(Value::Bool(ops::truthy(&right(exec)?)))
        }))
    }

    fn branch(
        &mut self,
        test: &Node,
        consequent: &Node,
        alternate: Option<&Node>,
    ) -> Result<Code, CompileError> {
        let test = self.expr(test)?;
        let consequent = self.expr(consequent)?;
        let alternate = alternate.map(|n| self.expr(n)).transpose()?;
        Ok(code(move |exec| {
            if ops::truthy(&test(exec)?) {
                consequent(exec)
            } else if let Some(alternate) = &alternate {
                alternate(exec)
            } else {
                Ok(Value::Null)
            }
        }))
    }

    fn block(&mut self, body: &[Node], used: bool) -> Result<Code, CompileError> {
        let mut codes = Vec::with_capacity(body.len());
        for (i, node) in body.iter().enumerate() {
            codes.push(self.statement(node, used && i + 1 == body.len())?);
        }
        Ok(code(move |exec| {
            let mut result = Value::Null;
            for c in &codes {
                result = c(exec)?;
            }
            Ok(result)
        }))
    }

    fn for_loop(
        &mut self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> Result<Code, CompileError> {
        let init = init.map(|n| self.statement(n, false)).transpose()?;
        let test = test.map(|n| self.expr(n)).transpose()?;
        let body = self.statement(body, false)?;
        let update = update.map(|n| self.statement(n, false)).transpose()?;
        Ok(code(move |exec| {
            if let Some(init) = &init {
                init(exec)?;
            }
            let limit = exec.machine.config.max_loop_iterations;
            let mut iterations = 0;
            loop {
                if let Some(test) = &test {
                    if !ops::truthy(&test(exec)?) {
                        break;
                    }
                }
                if iterations >= limit {
                    return Err(EvalError::LoopLimit(limit));
                }
                iterations += 1;
                body(exec)?;
                if let Some(update) = &update {
                    update(exec)?;
                }
            }
            Ok(Value::Null)
        }))
    }

    /// A function value closing over the frame it is created in.
    fn closure(&mut self, name: &str, params: &[String], body: &Node) -> Result<Code, CompileError> {
        let func = self.function(name, params, body)?;
        Ok(code(move |exec| {
            Ok(function_value(exec.machine, func.clone(), Some(exec.frame.clone())))
        }))
    }

    fn member_key(&mut self, property: &Node, computed: bool) -> Result<Code, CompileError> {
        match (property, computed) {
            (Node::Identifier { name }, false) => Ok(constant(Value::str(name))),
            (other, _) => self.expr(other),
        }
    }

    fn load(&mut self, object: &Node, property: &Node, computed: bool) -> Result<Code, CompileError> {
        if let Node::This = object {
            let key = self.member_key(property, computed)?;
            return Ok(code(move |exec| {
                let key = key(exec)?;
                Ok(ops::key_string(&key)
                    .ok()
                    .and_then(|k| exec.machine.state_get(&k))
                    .unwrap_or(Value::Null))
            }));
        }
        let object = self.expr(object)?;
        let key = self.member_key(property, computed)?;
        Ok(code(move |exec| {
            let target = object(exec)?;
            Ok(ops::get(&target, &key(exec)?))
        }))
    }

    /// Member targets rebuild their base and store it back, so `a.b.c = v`
    /// writes a fresh copy of `a`. Properties of `this` are written in place;
    /// when the result is `used` it is the updated state object.
    fn store(&mut self, target: &Node, value: Code, used: bool) -> Result<Code, CompileError> {
        match target {
            Node::Identifier { name } => Ok(match self.resolve(name) {
                Binding::Slot { up, index } => code(move |exec| {
                    let value = value(exec)?;
                    exec.frame.set(up, index, value.clone());
                    Ok(value)
                }),
                _ => {
                    let name = name.clone();
                    code(move |exec| {
                        let value = value(exec)?;
                        exec.machine.state_set(&name, value.clone());
                        Ok(value)
                    })
                }
            }),
            Node::This => Ok(code(move |exec| {
                let value = value(exec)?;
                exec.machine.replace_this(value.clone())?;
                Ok(value)
            })),
            Node::Member {
                object,
                property,
                computed,
            } => {
                let key = self.member_key(property, *computed)?;
                if let Node::This = object.as_ref() {
                    return Ok(code(move |exec| {
                        let key = key(exec)?;
                        let value = value(exec)?;
                        exec.machine.state_set(&ops::key_string(&key)?, value);
                        Ok(if used {
                            Value::Object(exec.machine.state())
                        } else {
                            Value::Null
                        })
                    }));
                }
                let base = self.expr(object)?;
                let updated = code(move |exec| {
                    let target = base(exec)?;
                    let key = key(exec)?;
                    ops::set(&target, &key, value(exec)?)
                });
                self.store(object, updated, used)
            }
            other => Err(CompileError::InvalidTarget(other.kind_name().to_string())),
        }
    }

    fn call(&mut self, callee: &Node, args: &[Node]) -> Result<Code, CompileError> {
        let Node::Identifier { name } = callee else {
            let callee = self.expr(callee)?;
            let args = self.exprs(args)?;
            return Ok(code(move |exec| {
                let func = callee(exec)?;
                call_value(&func, run_all(&args, exec)?)
            }));
        };
        if name == "apply" {
            return self.apply(args);
        }

        let direct = self.named_call(name, args)?;
        let Some(kind) = higher::canonical(name) else {
            return Ok(direct);
        };
        let form = self.higher_order(kind, name, args)?;
        Ok(match self.resolve(name) {
            Binding::Primitive(_) => form,
            _ => {
                let lookup = self.lookup(name);
                code(move |exec| {
                    if lookup(exec).is_some_and(|f| f.is_callable()) {
                        direct(exec)
                    } else {
                        form(exec)
                    }
                })
            }
        })
    }

    fn named_call(&mut self, name: &str, args: &[Node]) -> Result<Code, CompileError> {
        let args = self.exprs(args)?;
        if let Binding::Primitive(prim) = self.resolve(name) {
            return Ok(code(move |exec| prim(&run_all(&args, exec)?, &NativeHost)));
        }
        let lookup = self.lookup(name);
        let prim = self.primitives.get(name);
        let name = name.to_string();
        Ok(code(move |exec| {
            let func = lookup(exec);
            dispatch(&name, func, prim.as_deref(), run_all(&args, exec)?)
        }))
    }

    /// `apply(f, list)` spreads a list into a call.
    fn apply(&mut self, args: &[Node]) -> Result<Code, CompileError> {
        let [func, list] = args else {
            let err = EvalError::arity("apply", "2", args.len());
            return Ok(code(move |_| Err(err.clone())));
        };
        let func = self.expr(func)?;
        let list = self.expr(list)?;
        Ok(code(move |exec| {
            let func = func(exec)?;
            let args = match list(exec)? {
                Value::List(items) => items,
                Value::Null => Vec::new(),
                other => {
                    return Err(EvalError::Type(format!(
                        "apply expects an argument list, got {}",
                        other.type_name()
                    )));
                }
            };
            call_value(&func, args)
        }))
    }

    fn higher_order(
        &mut self,
        kind: &'static str,
        name: &str,
        args: &[Node],
    ) -> Result<Code, CompileError> {
        let reduce = kind == "reduce";
        let (arity, expected) = if reduce { (3, "3") } else { (2, "2") };
        if args.len() != arity {
            let err = EvalError::arity(name, expected, args.len());
            return Ok(code(move |_| Err(err.clone())));
        }

        let collection = self.expr(&args[0])?;
        let callback = self.callback(&args[1], reduce)?;
        let init = if reduce {
            Some(self.expr(&args[2])?)
        } else {
            None
        };
        let name = name.to_string();
        Ok(code(move |exec| {
            let collection = collection(exec)?;
            let items: &[Value] = match &collection {
                Value::List(items) => items.as_slice(),
                Value::Null => &[],
                other => {
                    return Err(EvalError::Type(format!(
                        "{name} expects a list, got {}",
                        other.type_name()
                    )));
                }
            };
            let func = callback(exec)?;
            match &init {
                Some(init) => higher::reduce(items, &func, init(exec)?, &NativeHost),
                None => higher::apply(kind, items, &func, &NativeHost),
            }
        }))
    }

    /// Arrows and names bound to functions are passed as they are. Any other
    /// expression becomes a function of `item` and `index` (`acc`, `item`
    /// and `index` for reductions).
    fn callback(&mut self, node: &Node, reduce: bool) -> Result<Code, CompileError> {
        match node {
            Node::Arrow { params, body } => self.closure("lambda", params, body),
            Node::Identifier { name } => {
                if let Binding::Primitive(prim) = self.resolve(name) {
                    return Ok(constant(primitive_value(name, prim)));
                }
                let implicit = self.implicit(node, reduce)?;
                let lookup = self.lookup(name);
                Ok(code(move |exec| match lookup(exec) {
                    Some(func) if func.is_callable() => Ok(func),
                    _ => implicit(exec),
                }))
            }
            other => self.implicit(other, reduce),
        }
    }

    fn implicit(&mut self, node: &Node, reduce: bool) -> Result<Code, CompileError> {
        let names: &[&str] = if reduce { &REDUCE_NAMES } else { &ITEM_NAMES };
        let params: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        self.closure("implicit", &params, node)
    }
}

/// Identifiers assigned anywhere in `node`, not counting nested functions.
fn assigned_names(node: &Node, out: &mut Vec<String>) {
    let mut visit = |n: &Node| assigned_names(n, out);
    match node {
        Node::Assign { target, value } => {
            match target.as_ref() {
                Node::Identifier { name } => {
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
                other => assigned_names(other, out),
            }
            assigned_names(value, out);
        }
        Node::Array { elements } => elements.iter().for_each(visit),
        Node::Object { entries } => {
            for entry in entries {
                if let Entry::Property { value, .. } = entry {
                    visit(value);
                }
            }
        }
        Node::Unary { operand, .. } => visit(operand),
        Node::Binary { left, right, .. } => {
            visit(left);
            visit(right);
        }
        Node::Ternary {
            test,
            consequent,
            alternate,
        } => {
            visit(test);
            visit(consequent);
            visit(alternate);
        }
        Node::Member {
            object, property, ..
        } => {
            visit(object);
            visit(property);
        }
        Node::Call { callee, args } => {
            visit(callee);
            args.iter().for_each(visit);
        }
        Node::Block { body } => body.iter().for_each(visit),
        Node::If {
            test,
            consequent,
            alternate,
        } => {
            visit(test);
            visit(consequent);
            if let Some(alternate) = alternate {
                visit(alternate);
            }
        }
        Node::For {
            init,
            test,
            update,
            body,
        } => {
            for clause in [init, test, update].into_iter().flatten() {
                visit(clause);
            }
            visit(body);
        }
        Node::Number { .. }
        | Node::Str { .. }
        | Node::Bool { .. }
        | Node::Null
        | Node::Identifier { .. }
        | Node::This
        | Node::Arrow { .. } => {}
    }
}
