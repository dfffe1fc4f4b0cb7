//! Runtime structures shared by compiled code.

use rhizome_sprig_ir::{EvalError, Host, NativeFn, Object, PrimitiveFn, Primitives, Value};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::NativeConfig;

/// A compiled expression or statement.
pub(crate) type Code = Rc<dyn Fn(&Exec) -> Result<Value, EvalError>>;

/// Execution context handed to compiled code.
pub(crate) struct Exec<'a> {
    pub machine: &'a Rc<Machine>,
    pub frame: &'a Rc<Frame>,
}

/// Parameter and local slots of one function invocation.
pub(crate) struct Frame {
    slots: RefCell<Vec<Value>>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    pub fn root() -> Rc<Self> {
        Rc::new(Frame {
            slots: RefCell::new(Vec::new()),
            parent: None,
        })
    }

    fn ancestor(&self, up: usize) -> Option<&Frame> {
        let mut frame = self;
        for _ in 0..up {
            frame = frame.parent.as_deref()?;
        }
        Some(frame)
    }

    pub fn get(&self, up: usize, index: usize) -> Option<Value> {
        self.ancestor(up)?.slots.borrow().get(index).cloned()
    }

    pub fn set(&self, up: usize, index: usize, value: Value) -> bool {
        let Some(frame) = self.ancestor(up) else {
            return false;
        };
        match frame.slots.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Shape of a compiled function: its body and slot layout.
#[derive(Clone)]
pub(crate) struct FunctionCode {
    pub name: Rc<str>,
    pub params: usize,
    pub slots: usize,
    pub body: Code,
}

/// State shared by every function of one compiled program.
pub(crate) struct Machine {
    pub config: NativeConfig,
    pub primitives: Rc<Primitives>,
    state: RefCell<Object>,
    /// Bindings supplied by the caller of the action currently running.
    context: RefCell<Vec<Object>>,
    depth: Cell<usize>,
}

impl Machine {
    pub fn new(config: NativeConfig, primitives: Rc<Primitives>) -> Rc<Self> {
        Rc::new(Machine {
            config,
            primitives,
            state: RefCell::new(Object::new()),
            context: RefCell::new(Vec::new()),
            depth: Cell::new(0),
        })
    }

    pub fn state(&self) -> Object {
        self.state.borrow().clone()
    }

    pub fn state_get(&self, name: &str) -> Option<Value> {
        self.state.borrow().get(name).cloned()
    }

    pub fn state_set(&self, name: &str, value: Value) {
        self.state.borrow_mut().insert(name.to_string(), value);
    }

    /// Upserts every key of `value` into the state object.
    pub fn replace_this(&self, value: Value) -> Result<(), EvalError> {
        match value {
            Value::Object(map) => {
                self.state.borrow_mut().extend(map);
                Ok(())
            }
            other => Err(EvalError::Type(format!(
                "cannot replace this with {}",
                other.type_name()
            ))),
        }
    }

    /// Reads a name that is not a slot: caller context first, then state.
    pub fn read_global(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.context.borrow().last().and_then(|c| c.get(name)) {
            return Some(value.clone());
        }
        self.state_get(name)
    }

    /// Runs `f` with `context` visible to global reads.
    pub fn with_context<T>(&self, context: Object, f: impl FnOnce() -> T) -> T {
        self.context.borrow_mut().push(context);
        let result = f();
        self.context.borrow_mut().pop();
        result
    }

    /// Runs a function body in a fresh frame. Missing arguments are null and
    /// extra arguments are dropped.
    pub fn invoke(
        self: &Rc<Self>,
        func: &FunctionCode,
        parent: Option<Rc<Frame>>,
        mut args: Vec<Value>,
    ) -> Result<Value, EvalError> {
        let depth = self.depth.get();
        if depth >= self.config.max_depth {
            return Err(EvalError::MaxDepth(self.config.max_depth));
        }
        self.depth.set(depth + 1);

        args.truncate(func.params);
        args.resize(func.slots, Value::Null);
        let frame = Rc::new(Frame {
            slots: RefCell::new(args),
            parent,
        });
        let result = (func.body)(&Exec {
            machine: self,
            frame: &frame,
        });

        self.depth.set(depth);
        result
    }
}

/// Packages compiled code as a callable value closing over `parent`.
///
/// The value holds the machine weakly, so state objects that store their
/// own methods do not keep themselves alive.
pub(crate) fn function_value(
    machine: &Rc<Machine>,
    func: FunctionCode,
    parent: Option<Rc<Frame>>,
) -> Value {
    let weak: Weak<Machine> = Rc::downgrade(machine);
    let name = func.name.clone();
    Value::Native(NativeFn::new(name, move |args| {
        let machine = weak
            .upgrade()
            .ok_or_else(|| EvalError::Type(format!("{} outlived its program", func.name)))?;
        machine.invoke(&func, parent.clone(), args)
    }))
}

/// Wraps a primitive as a first-class value.
pub(crate) fn primitive_value(name: &str, prim: Rc<PrimitiveFn>) -> Value {
    Value::Native(NativeFn::new(name, move |args| prim(&args, &NativeHost)))
}

pub(crate) fn call_value(func: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
    match func {
        Value::Native(native) => native.call(args),
        other => Err(EvalError::NotCallable(other.to_string())),
    }
}

/// Callback surface for primitives: compiled functions carry their own
/// machine, so the host needs no state.
pub(crate) struct NativeHost;

impl Host for NativeHost {
    fn call(&self, func: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        call_value(func, args)
    }
}
