//! Lexical environments.

use crate::{EvalError, Object, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Reserved name denoting the nearest state frame as an object.
pub const THIS: &str = "this";

struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Env>,
    /// State frames back a program's shared state object.
    state: bool,
}

/// A shared, mutable chain of binding frames.
///
/// Cloning an `Env` clones the handle, not the frame.
#[derive(Clone)]
pub struct Env(Rc<RefCell<Frame>>);

impl Env {
    /// Creates a root frame.
    pub fn new() -> Self {
        Env::with_frame(None, false)
    }

    /// Creates a root state frame. Reading `this` below it yields its
    /// bindings as an object and defining `this` writes keys back into it.
    pub fn new_state() -> Self {
        Env::with_frame(None, true)
    }

    /// Creates a child frame whose parent is `self`.
    pub fn child(&self) -> Self {
        Env::with_frame(Some(self.clone()), false)
    }

    fn with_frame(parent: Option<Env>, state: bool) -> Self {
        Env(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent,
            state,
        })))
    }

    pub fn is_state(&self) -> bool {
        self.0.borrow().state
    }

    pub fn parent(&self) -> Option<Env> {
        self.0.borrow().parent.clone()
    }

    /// Walks the chain outward and returns the first binding found.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let frame = env.0.borrow();
            if let Some(value) = frame.bindings.get(name) {
                return Some(value.clone());
            }
            if frame.state && name == THIS {
                return Some(Value::Object(snapshot(&frame.bindings)));
            }
            current = frame.parent.clone();
        }
        None
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Binds `name` in this frame, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Mutates the frame where `name` is bound, or binds it here if it is
    /// bound nowhere.
    ///
    /// Setting `this` on a state frame upserts the object's keys into it.
    pub fn set(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let mut frame = env.0.borrow_mut();
            if let Some(slot) = frame.bindings.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            if frame.state && name == THIS {
                return match value {
                    Value::Object(map) => {
                        frame.bindings.extend(map);
                        Ok(())
                    }
                    other => Err(EvalError::Type(format!(
                        "cannot replace this with {}",
                        other.type_name()
                    ))),
                };
            }
            current = frame.parent.clone();
        }
        self.define(name, value);
        Ok(())
    }

    /// Writes one property of `this`. On a state frame only `key` changes;
    /// an explicit `this` binding is replaced by an updated copy.
    pub fn set_this_key(&self, key: &str, value: Value) -> Result<(), EvalError> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let mut frame = env.0.borrow_mut();
            if let Some(slot) = frame.bindings.get_mut(THIS) {
                *slot = crate::ops::set(slot, &Value::Str(key.to_string()), value)?;
                return Ok(());
            }
            if frame.state {
                frame.bindings.insert(key.to_string(), value);
                return Ok(());
            }
            current = frame.parent.clone();
        }
        Err(EvalError::UnboundVariable(THIS.to_string()))
    }

    /// Bindings of this frame only, as an object.
    pub fn snapshot(&self) -> Object {
        snapshot(&self.0.borrow().bindings)
    }

    /// Names bound in this frame only.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().bindings.keys().cloned().collect();
        names.sort();
        names
    }

    /// Nearest state frame in the chain.
    pub fn state_frame(&self) -> Option<Env> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            if env.is_state() {
                return Some(env);
            }
            current = env.parent();
        }
        None
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0.borrow();
        f.debug_struct("Env")
            .field("names", &self.names())
            .field("state", &frame.state)
            .field("has_parent", &frame.parent.is_some())
            .finish()
    }
}

fn snapshot(bindings: &HashMap<String, Value>) -> Object {
    bindings
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
