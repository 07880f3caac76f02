use crate::value::Value;
use privvy_common::{NameError, Position};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A lexical scope: an owned binding table plus a link to its parent.
/// Shared ownership (`Rc<RefCell<..>>`) is required because closures,
/// bound methods, and nested blocks all need to keep an environment
/// alive and mutable after the code that created it has returned.
pub struct Environment {
    parent: Option<Rc<RefCell<Environment>>>,
    variables: FxHashMap<String, Value>,
}

impl Environment {
    pub fn new(parent: Option<Rc<RefCell<Environment>>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment { parent, variables: FxHashMap::default() }))
    }

    /// Bind `name` in this scope only. Re-declaring a name shadows the
    /// previous binding in the same scope (the reference interpreter
    /// allows re-declaration at the same `let` site).
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Look up `name` starting at `env` and walking to outer scopes.
    pub fn get(env: &Rc<RefCell<Environment>>, name: &str, position: Position) -> Result<Value, NameError> {
        if let Some(value) = env.borrow().variables.get(name) {
            return Ok(value.clone());
        }
        let parent = env.borrow().parent.clone();
        match parent {
            Some(parent) => Environment::get(&parent, name, position),
            None => Err(NameError::new(name.to_string(), position)),
        }
    }

    /// Update the nearest binding of `name` on the chain. Fails if `name`
    /// is unbound anywhere — assignment never implicitly declares.
    pub fn set(env: &Rc<RefCell<Environment>>, name: &str, value: Value, position: Position) -> Result<(), NameError> {
        if env.borrow().variables.contains_key(name) {
            env.borrow_mut().variables.insert(name.to_string(), value);
            return Ok(());
        }
        let parent = env.borrow().parent.clone();
        match parent {
            Some(parent) => Environment::set(&parent, name, value, position),
            None => Err(NameError::new(name.to_string(), position)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get_in_same_scope() {
        let env = Environment::new(None);
        env.borrow_mut().define("x", Value::Int(1));
        let v = Environment::get(&env, "x", Position::start()).unwrap();
        assert!(matches!(v, Value::Int(1)));
    }

    #[test]
    fn get_walks_parent_chain() {
        let parent = Environment::new(None);
        parent.borrow_mut().define("x", Value::Int(7));
        let child = Environment::new(Some(parent));
        let v = Environment::get(&child, "x", Position::start()).unwrap();
        assert!(matches!(v, Value::Int(7)));
    }

    #[test]
    fn get_unbound_name_fails() {
        let env = Environment::new(None);
        assert!(Environment::get(&env, "missing", Position::start()).is_err());
    }

    #[test]
    fn set_updates_innermost_existing_binding() {
        let parent = Environment::new(None);
        parent.borrow_mut().define("x", Value::Int(1));
        let child = Environment::new(Some(parent.clone()));
        Environment::set(&child, "x", Value::Int(2), Position::start()).unwrap();
        let v = Environment::get(&parent, "x", Position::start()).unwrap();
        assert!(matches!(v, Value::Int(2)));
    }

    #[test]
    fn set_unbound_name_fails_without_declaring() {
        let env = Environment::new(None);
        assert!(Environment::set(&env, "y", Value::Int(1), Position::start()).is_err());
        assert!(Environment::get(&env, "y", Position::start()).is_err());
    }

    #[test]
    fn define_in_child_does_not_leak_to_parent() {
        let parent = Environment::new(None);
        let child = Environment::new(Some(parent.clone()));
        child.borrow_mut().define("local", Value::Bool(true));
        assert!(Environment::get(&parent, "local", Position::start()).is_err());
    }
}
