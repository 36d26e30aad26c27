//! Statement nodes of the abstract syntax tree.
//!
//! There is deliberately no `for` variant: the parser desugars `for`
//! loops into an initialiser block wrapping a `while`, so the resolver
//! and interpreter never see one.

use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// A function or method declaration.
///
/// Shared behind `Rc` because closures hold on to their declaration past
/// the statement list that introduced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    /// Body executed when the function is called.
    pub body: Vec<Stmt>,
}

/// Every kind of Lox *statement*.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand-alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop (also the desugared form of `for`).
    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration — becomes a first-class callable value.
    Function(Rc<FunctionDecl>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for diagnostics).
        keyword: Token,

        /// Optional result expression.  Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    /// Class declaration with an optional superclass reference and a
    /// method list.  The superclass is always an `Expr::Variable`.
    Class {
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
