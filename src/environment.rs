//! Runtime environments: a chain of name → value frames.
//!
//! Frames are reference-counted and interior-mutable because a frame is
//! shared between the block/call currently executing in it and every
//! closure that captured it; whichever holder lives longest keeps it
//! alive.  The chain only ever points outward (child → enclosing), so no
//! cycles arise.
//!
//! `get`/`assign` search outward and are used for unresolved (global)
//! names; `get_at`/`assign_at` hop exactly the resolver-computed number
//! of ancestors and address that frame directly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::LoxError;
use crate::token::Token;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    pub enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite in *this* frame.  Redeclaration at the same
    /// scope is allowed, consistent with `var` semantics.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Chained lookup: this frame, then each enclosing ancestor.
    pub fn get(&self, name: &Token) -> Result<Value, LoxError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(LoxError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Chained assignment: writes the nearest existing binding.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), LoxError> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(LoxError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Read a binding at exactly `distance` ancestors out.  No search:
    /// the resolver computed the distance, so the name is present there.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Value {
        Self::ancestor(env, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .expect("resolved binding missing at its recorded depth")
    }

    /// Write a binding at exactly `distance` ancestors out.
    pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str, value: Value) {
        Self::ancestor(env, distance)
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
    }

    fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current
                .borrow()
                .enclosing
                .as_ref()
                .expect("no enclosing environment at resolved depth")
                .clone();

            current = next;
        }

        current
    }
}
