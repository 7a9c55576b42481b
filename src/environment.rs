use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::value::Value;

/// Shared handle to a scope. Closures hold one of these, never a copy.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Clone)]
pub struct Binding {
    pub mutable: bool,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("cannot find identifier {0}")]
    Unbound(String),
    #[error("cannot update const identifier {0}")]
    Immutable(String),
}

/// One scope of name bindings, linked to the scope it was created in.
#[derive(Default)]
pub struct Environment {
    store: FxHashMap<String, Binding>,
    outer: Option<Env>,
}

impl Environment {
    /// A root scope with no outer environment.
    pub fn new() -> Env {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn enclosed(outer: &Env) -> Env {
        Rc::new(RefCell::new(Self {
            store: FxHashMap::default(),
            outer: Some(Rc::clone(outer)),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        match self.store.get(name) {
            Some(binding) => Some(binding.value.clone()),
            None => self.outer.as_ref().and_then(|outer| outer.borrow().get(name)),
        }
    }

    /// Binds `name` in this scope, shadowing any earlier binding of the
    /// same name here.
    pub fn define(&mut self, name: &str, value: Value, mutable: bool) {
        self.store.insert(name.to_owned(), Binding { mutable, value });
    }

    /// Updates the nearest existing binding of `name`, searching outwards.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), AssignError> {
        match self.store.get_mut(name) {
            Some(binding) if binding.mutable => {
                binding.value = value;
                Ok(())
            }
            Some(_) => Err(AssignError::Immutable(name.to_owned())),
            None => match &self.outer {
                Some(outer) => outer.borrow_mut().assign(name, value),
                None => Err(AssignError::Unbound(name.to_owned())),
            },
        }
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Closures stored in the scope point back at it, so only names are shown
        f.debug_struct("Environment")
            .field("names", &self.store.keys().collect::<Vec<_>>())
            .field("has_outer", &self.outer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lookups_walk_outwards() {
        let root = Environment::new();
        root.borrow_mut().define("x", Value::Integer(1), true);

        let inner = Environment::enclosed(&root);
        inner.borrow_mut().define("y", Value::Integer(2), true);

        assert_eq!(inner.borrow().get("x"), Some(Value::Integer(1)));
        assert_eq!(inner.borrow().get("y"), Some(Value::Integer(2)));
        assert_eq!(root.borrow().get("y"), None);
    }

    #[test]
    fn define_shadows_in_the_same_scope() {
        let root = Environment::new();
        root.borrow_mut().define("x", Value::Integer(1), false);
        root.borrow_mut().define("x", Value::Integer(2), true);

        assert_eq!(root.borrow().get("x"), Some(Value::Integer(2)));
        assert_eq!(root.borrow_mut().assign("x", Value::Integer(3)), Ok(()));
    }

    #[test]
    fn assign_updates_the_defining_scope() {
        let root = Environment::new();
        root.borrow_mut().define("counter", Value::Integer(0), true);
        let inner = Environment::enclosed(&root);

        assert_eq!(inner.borrow_mut().assign("counter", Value::Integer(5)), Ok(()));
        assert_eq!(root.borrow().get("counter"), Some(Value::Integer(5)));
    }

    #[test]
    fn assign_rejects_unbound_and_const() {
        let root = Environment::new();
        root.borrow_mut().define("limit", Value::Integer(10), false);
        let inner = Environment::enclosed(&root);

        assert_eq!(
            inner.borrow_mut().assign("missing", Value::Null),
            Err(AssignError::Unbound("missing".into()))
        );
        assert_eq!(
            inner.borrow_mut().assign("limit", Value::Null).map_err(|err| err.to_string()),
            Err("cannot update const identifier limit".to_owned())
        );
        assert_eq!(root.borrow().get("limit"), Some(Value::Integer(10)));
    }
}
