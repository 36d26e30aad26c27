//! The tree-walking evaluator.
//!
//! The interpreter owns the global environment (seeded with the native
//! `clock`), the *current* environment pointer, the resolver's distance
//! table, and the output sink that `print` writes to.
//!
//! Statement execution threads a control-flow channel, [`Unwind`],
//! distinct from ordinary results: `return` travels as
//! `Unwind::Return(value)` up to the nearest function-call boundary and
//! is never an error; runtime failures travel as `Unwind::Error` and
//! surface from [`Interpreter::interpret`] as a plain [`LoxError`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::callable::{LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::LoxError;
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::resolver::Resolutions;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-local control transfer during statement execution.
///
/// `Return` is control flow, not failure: it must never be reported or
/// logged as an error, which is why it shares a channel with errors only
/// structurally — every consumer matches on the variant.
#[derive(Debug)]
pub enum Unwind {
    /// Unwinding to the nearest enclosing call with a return value.
    Return(Value),

    /// A runtime error propagating to the top of the interpreter stack.
    Error(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(err: LoxError) -> Self {
        Unwind::Error(err)
    }
}

type EvalResult = Result<Value, Unwind>;
type ExecResult = Result<(), Unwind>;

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: Resolutions,
    output: Box<dyn Write>,
}

impl Interpreter {
    /// Interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Interpreter printing to a caller-supplied sink (tests, embedders).
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction::clock())),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Resolutions::default(),
            output,
        }
    }

    /// Register a host function into the global environment.  The
    /// extension point for embedders; the evaluator needs no change.
    pub fn define_native(&mut self, native: NativeFunction) {
        debug!("registering native function '{}'", native.name);

        let name = native.name.clone();
        self.globals
            .borrow_mut()
            .define(&name, Value::NativeFunction(Rc::new(native)));
    }

    /// Merge a resolver pass's distance table into the accumulated one.
    pub fn adopt_resolutions(&mut self, resolutions: Resolutions) {
        debug!("adopting {} resolved binding(s)", resolutions.len());

        self.locals.extend(resolutions);
    }

    /// Execute a statement list.  The first runtime error aborts the
    /// remainder and is returned; nothing is retried.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        debug!("interpreting {} statement(s)", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Unwind::Error(err)) => return Err(err),
                // The resolver rejects top-level `return`; if one gets
                // here anyway (resolution skipped), it just ends the run.
                Err(Unwind::Return(_)) => return Ok(()),
            }
        }

        info!("Interpretation completed");

        Ok(())
    }

    // ─────────────────────────── statements ───────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("var '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(env)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(decl) => {
                // Capture the environment active right now: that is the
                // closure.
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                debug!("defined <fn {}>", decl.name.lexeme);

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> ExecResult {
        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => {
                let line = match expr {
                    Expr::Variable { name, .. } => name.line,
                    _ => name.line,
                };

                match self.evaluate(expr)? {
                    Value::Class(parent) => Some(parent),
                    _ => {
                        return Err(LoxError::runtime(line, "Superclass must be a class.").into());
                    }
                }
            }
            None => None,
        };

        // Two-step definition so methods can refer to the class by name.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra frame binding
        // `super` to the statically-known superclass.
        let method_env = match &superclass_value {
            Some(parent) => {
                let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
                env.define("super", Value::Class(Rc::clone(parent)));

                Rc::new(RefCell::new(env))
            }
            None => Rc::clone(&self.environment),
        };

        let mut method_table = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";

            method_table.insert(
                method.name.lexeme.clone(),
                LoxFunction::new(Rc::clone(method), Rc::clone(&method_env), is_initializer),
            );
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_table);

        debug!("defined class {}", name.lexeme);

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;

        Ok(())
    }

    /// Execute `statements` against `environment`, restoring the previous
    /// environment pointer on **every** exit path — normal completion,
    /// runtime error, or `return` unwind.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> ExecResult {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(());

        for statement in statements {
            result = self.execute(statement);

            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    // ─────────────────────────── expressions ──────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(lit) => Ok(literal_value(lit)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;

                // Short circuit: `or` keeps a truthy left, `and` keeps a
                // falsy left; either way the operand itself is the result.
                match operator.token_type {
                    TokenType::OR if is_truthy(&left_value) => Ok(left_value),
                    TokenType::AND if !is_truthy(&left_value) => Ok(left_value),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.depth(*id) {
                    Some(distance) => {
                        Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        );
                    }
                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                let mut argument_values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(argument)?);
                }

                self.call_value(callee_value, argument_values, paren)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Ok(LoxInstance::get(&instance, name)?),
                _ => Err(LoxError::runtime(name.line, "Only instances have properties.").into()),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;

                    instance.borrow_mut().set(name, value.clone());

                    Ok(value)
                }
                _ => Err(LoxError::runtime(name.line, "Only instances have fields.").into()),
            },

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> EvalResult {
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(operator.line, "Operand must be a number.").into()),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            // The parser only builds unary nodes for `!` and `-`.
            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left_value, &right_value)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left_value, &right_value)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                // Plain IEEE-754 division; x/0 is inf, 0/0 is NaN.
                let (a, b) = number_operands(operator, &left_value, &right_value)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left_value, &right_value)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left_value, &right_value)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left_value, &right_value)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left_value, &right_value)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value == right_value)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_value != right_value)),

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.").into()),
        }
    }

    /// A resolved node addresses its frame by distance; an unresolved
    /// one is a global, looked up directly on the global frame rather
    /// than searched from the current one.  That asymmetry is deliberate:
    /// an unresolved name must never accidentally hit a shadowing local.
    fn look_up_variable(&self, name: &Token, id: ExprId) -> EvalResult {
        match self.locals.depth(id) {
            Some(distance) => Ok(Environment::get_at(&self.environment, distance, &name.lexeme)),
            None => Ok(self.globals.borrow().get(name)?),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> EvalResult {
        let distance = self
            .locals
            .depth(id)
            .expect("'super' is always resolved before execution");

        let Value::Class(superclass) = Environment::get_at(&self.environment, distance, "super")
        else {
            return Err(LoxError::runtime(keyword.line, "'super' is not a class.").into());
        };

        // The receiver lives one frame closer than the `super` binding.
        let Value::Instance(object) = Environment::get_at(&self.environment, distance - 1, "this")
        else {
            return Err(LoxError::runtime(keyword.line, "'this' is not an instance.").into());
        };

        // Lookup starts at the *static* superclass; binding to the
        // dynamic receiver is what keeps overridden methods dispatching
        // correctly through `super` chains.
        let resolved = superclass.find_method(&method.lexeme).ok_or_else(|| {
            LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Function(Rc::new(resolved.bind(object))))
    }

    /// Shared call protocol for all three callable kinds.
    fn call_value(&mut self, callee: Value, arguments: Vec<Value>, paren: &Token) -> EvalResult {
        match callee {
            Value::NativeFunction(native) => {
                check_arity(native.arity, arguments.len(), paren)?;

                debug!("calling <native fn {}>", native.name);

                (native.func)(&arguments)
                    .map_err(|msg| LoxError::runtime(paren.line, msg).into())
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;

                function.call(self, arguments)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;

                debug!("instantiating {}", class.name);

                let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(&class))));

                // The initializer's own return value is discarded: the
                // class call always yields the instance.
                if let Some(initializer) = class.find_method("init") {
                    initializer
                        .bind(Rc::clone(&instance))
                        .call(self, arguments)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(LoxError::runtime(paren.line, "Can only call functions and classes.").into()),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────── free helpers ─────────────────────────────

fn literal_value(lit: &LiteralValue) -> Value {
    match lit {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// Only `nil` and `false` are falsy; everything else, including `0` and
/// `""`, is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn number_operands(
    operator: &Token,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), LoxError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<(), LoxError> {
    if expected == got {
        return Ok(());
    }

    Err(LoxError::runtime(
        paren.line,
        format!("Expected {} arguments but got {}.", expected, got),
    ))
}
