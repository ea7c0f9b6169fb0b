use crate::runtime::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

struct Scope {
    store: HashMap<String, Value>,
    outer: Option<Environment>,
}

/// A lexical scope: name → value bindings plus a link to the enclosing scope.
///
/// Cloning an `Environment` clones the handle, not the bindings; closures hold
/// such handles, so an assignment through one holder is seen by all of them.
#[derive(Clone)]
pub struct Environment {
    scope: Rc<RefCell<Scope>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::with_outer(None)
    }

    pub fn enclosed(outer: &Environment) -> Self {
        Self::with_outer(Some(outer.clone()))
    }

    fn with_outer(outer: Option<Environment>) -> Self {
        Self {
            scope: Rc::new(RefCell::new(Scope {
                store: HashMap::new(),
                outer,
            })),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let scope = self.scope.borrow();
        match scope.store.get(name) {
            Some(value) => Some(value.clone()),
            None => scope.outer.as_ref().and_then(|outer| outer.get(name)),
        }
    }

    /// Binds `name` in this scope, shadowing any outer binding.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.scope.borrow_mut().store.insert(name.into(), value);
    }

    /// Rebinds `name` in the nearest scope that already defines it.
    /// Returns `false` when no scope in the chain binds the name.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut scope = self.scope.borrow_mut();
        if let Some(slot) = scope.store.get_mut(name) {
            *slot = value;
            return true;
        }
        match scope.outer.as_ref() {
            Some(outer) => outer.assign(name, value),
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        let scope = self.scope.borrow();
        scope.store.contains_key(name)
            || scope
                .outer
                .as_ref()
                .is_some_and(|outer| outer.contains(name))
    }

    pub fn outer(&self) -> Option<Environment> {
        self.scope.borrow().outer.clone()
    }

    /// Local bindings of this scope only, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut bindings: Vec<(String, Value)> = self
            .scope
            .borrow()
            .store
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }

    /// This scope and all its ancestors, outermost first.
    pub fn chain(&self) -> Vec<Environment> {
        let mut chain = vec![self.clone()];
        let mut current = self.outer();
        while let Some(env) = current {
            current = env.outer();
            chain.push(env);
        }
        chain.reverse();
        chain
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.scope, &other.scope)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.scope.borrow();
        let mut names: Vec<&String> = scope.store.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_outer", &scope.outer.is_some())
            .finish()
    }
}
