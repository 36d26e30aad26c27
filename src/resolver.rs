//! Static resolver pass.
//!
//! One AST walk that does three things:
//! 1. Builds lexical scopes (a stack of `HashMap<String, bool>` tracking
//!    declared/defined names).
//! 2. Reports static errors (redeclaration, forward-read in an
//!    initializer, invalid `return`, `this`/`super` misuse, a class
//!    inheriting from itself).  All of them are collected, none aborts
//!    the pass, and together they block execution the same way syntax
//!    errors do.
//! 3. Records, for every variable occurrence, how many environments
//!    outward the interpreter must hop at run time — or nothing at all,
//!    in which case the occurrence is a global and the interpreter goes
//!    straight to the global frame.
//!
//! The output is a [`Resolutions`] table keyed by [`ExprId`].  Handing
//! the table over instead of mutating the interpreter in place keeps the
//! pass free of interpreter state and makes idempotence checkable: two
//! fresh resolvers over one program produce equal tables.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::LoxError;
use crate::expr::{Expr, ExprId};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

/// What kind of function body are we inside?  Validates `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body are we inside?  Validates `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Node → scope-distance table produced by the resolver.
///
/// A present entry means "local, this many environment hops out"; an
/// absent one means "global".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolutions {
    depths: HashMap<ExprId, usize>,
}

impl Resolutions {
    pub fn depth(&self, id: ExprId) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Merge another table in (a REPL session accumulates one table per
    /// line; ids never collide because the parser counter is threaded
    /// through the session).
    pub fn extend(&mut self, other: Resolutions) {
        self.depths.extend(other.depths);
    }

    fn insert(&mut self, id: ExprId, depth: usize) {
        self.depths.insert(id, depth);
    }
}

/// Resolver: tracks scopes, enforces static rules, records binding
/// distances.
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false = declared, true = defined
    resolutions: Resolutions,
    errors: Vec<LoxError>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            resolutions: Resolutions::default(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top-level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    /// Drain every static error recorded during [`resolve`](Self::resolve).
    pub fn take_errors(&mut self) -> Vec<LoxError> {
        std::mem::take(&mut self.errors)
    }

    /// Consume the resolver, yielding the finished distance table.
    pub fn into_resolutions(self) -> Resolutions {
        self.resolutions
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(LoxError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define, so that
                // `var a = a;` trips the forward-read check below.
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // The name is visible inside its own body, which is what
                // lets recursive and mutually-recursive functions resolve.
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(sup) = superclass {
                    if let Expr::Variable {
                        id,
                        name: super_name,
                    } = sup
                    {
                        if super_name.lexeme == name.lexeme {
                            self.error(super_name, "A class can't inherit from itself.");
                        }

                        self.current_class = ClassType::Subclass;
                        self.resolve_local(*id, super_name);
                    }

                    // Methods of a subclass close over a scope where
                    // `super` is bound.
                    self.begin_scope();
                    self.scope_insert("super");
                }

                self.begin_scope();
                self.scope_insert("this");

                for method in methods {
                    let declaration = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(method, declaration);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // Reading a name that is declared but not yet defined in
                // the *same* scope is the `var a = a;` case.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                        return;
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, decl: &FunctionDecl, function_type: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = function_type;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Seed the innermost scope with an implicit binding (`this`/`super`).
    fn scope_insert(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.error(name, "Variable already declared in this scope.");
                return;
            }

            scope.insert(name.lexeme.clone(), false);
        }
        // Global scope: duplicates are allowed, nothing to track.
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at the depth of the innermost
    /// scope containing the name, or as a global (no entry) if none does.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.resolutions.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
