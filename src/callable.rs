//! Callable values: user-defined functions (closures) and native
//! functions.
//!
//! Classes are also callable; they live in [`crate::class`] and the
//! interpreter dispatches over all three in one match.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::debug;

use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::interpreter::{Interpreter, Unwind};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A host-provided function registered into the global environment
/// before any user source runs.  Adding one never touches the evaluator:
/// it is just another [`Value`] the call machinery dispatches on.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl NativeFunction {
    /// The one stock native: wall-clock seconds since the Unix epoch.
    pub fn clock() -> Self {
        NativeFunction {
            name: "clock".to_string(),
            arity: 0,
            func: |_args: &[Value]| {
                let timestamp: f64 = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                    .as_secs_f64();

                Ok(Value::Number(timestamp))
            },
        }
    }
}

/// A user-defined function value: the declaration it was built from plus
/// the environment active at its definition site.
///
/// The captured environment — not the caller's — becomes the parent of
/// each call's frame, which is exactly what makes closures work.
#[derive(Clone)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce the bound form of a method: same declaration, but closing
    /// over a fresh one-entry environment where `this` is the receiver.
    /// Binding happens lazily, when the method is fetched off an
    /// instance.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(env)),
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke: fresh frame under the captured closure, parameters bound
    /// to arguments, body executed as a block.  Falling off the end
    /// yields `nil`; a `Return` unwind yields its value — except in an
    /// initializer, which always yields the bound instance.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, Unwind> {
        debug!(
            "calling <fn {}> with {} argument(s)",
            self.name(),
            arguments.len()
        );

        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            env.define(&param.lexeme, argument);
        }

        let result = interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(env)));

        match result {
            Ok(()) => {
                if self.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Unwind::Return(value)) => {
                if self.is_initializer {
                    // A bare `return;` inside `init` is legal but the
                    // instance still wins.
                    Ok(self.bound_this())
                } else {
                    Ok(value)
                }
            }

            Err(err) => Err(err),
        }
    }

    /// An initializer's closure is always a bind frame, so `this` lives
    /// at distance zero.
    fn bound_this(&self) -> Value {
        Environment::get_at(&self.closure, 0, "this")
    }
}

impl fmt::Debug for LoxFunction {
    // Shallow on purpose: the closure chain can reach back to a frame
    // that holds this very function.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.declaration.name.lexeme)
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}
