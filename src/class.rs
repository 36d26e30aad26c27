//! Classes and instances.
//!
//! A class is a named method table with an optional superclass; an
//! instance is a class reference plus a mutable field map.  Method
//! lookup walks the superclass chain; field lookup on an instance wins
//! over methods of the same name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::LoxFunction;
use crate::error::LoxError;
use crate::token::Token;
use crate::value::Value;

pub struct LoxClass {
    pub name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, LoxFunction>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, LoxFunction>,
    ) -> Self {
        LoxClass {
            name,
            superclass,
            methods,
        }
    }

    /// Look a method up on this class, then up the superclass chain.
    /// Returned unbound; callers bind it to a receiver.
    pub fn find_method(&self, name: &str) -> Option<&LoxFunction> {
        if let Some(method) = self.methods.get(name) {
            return Some(method);
        }

        if let Some(parent) = &self.superclass {
            return parent.find_method(name);
        }

        None
    }

    /// A class called as a constructor has the arity of its `init`
    /// method, or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map(LoxFunction::arity).unwrap_or(0)
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("methods", &self.methods.keys())
            .finish()
    }
}

pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Property read: own field first, then a class method bound to this
    /// instance.  Takes the `Rc` handle because binding captures the
    /// receiver.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value, LoxError> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let class = Rc::clone(&instance.borrow().class);

        if let Some(method) = class.find_method(&name.lexeme) {
            debug!("bound method '{}' on {}", name.lexeme, class.name);

            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance)))));
        }

        Err(LoxError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Property write: always an own field, shadowing any method of the
    /// same name.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for LoxInstance {
    // Shallow on purpose: a field can hold the instance itself.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys())
            .finish()
    }
}
