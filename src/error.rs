//! Centralised error hierarchy and diagnostic sink for the **Lox interpreter**.
//!
//! Every subsystem (scanner, parser, resolver, runtime, CLI) converts its
//! failure modes into a [`LoxError`] variant.  This gives the crate one
//! `Result<T>` alias and ergonomic inter-operation with `anyhow` at the
//! driver boundary, while keeping the diagnostic detail (line, token
//! context) each phase produced.
//!
//! The module never prints anything itself: errors accumulate in a
//! [`Diagnostics`] sink owned by the caller, which tracks the *static*
//! ("had error") and *runtime* ("had runtime error") failure flags
//! independently so the driver can map them to distinct exit codes.

use std::io;

use log::debug;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.  `location` is either empty, ` at end`,
    /// or ` at 'lexeme'`, mirroring the offending token.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        location: String,
    },

    /// Static-analysis failure from the resolver pass.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    /// Runtime evaluation error.  Rendered the way the reference driver
    /// prints it: message first, source line on its own trailer line.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on
    /// output-sink writes and file ingestion.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Render the ` at ...` context of a parse/resolve diagnostic from the
/// offending token.
fn location_of(token: &Token) -> String {
    if matches!(token.token_type, TokenType::EOF) {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.  Carries the offending
    /// token's lexeme as context.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Caller-owned diagnostic sink.
///
/// The pipeline reports every error here instead of flipping process-wide
/// flags, so one process can run many programs (REPL, test harness) and
/// each run's outcome stays attributable.  Static errors (lex, parse,
/// resolve) and runtime errors are tracked separately: file-mode drivers
/// use the distinction to pick between exit codes.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error and flip the matching flag.
    pub fn report(&mut self, error: LoxError) {
        match &error {
            LoxError::Runtime { .. } | LoxError::Io(_) => self.had_runtime_error = true,
            _ => self.had_error = true,
        }

        self.errors.push(error);
    }

    /// Did any lexical, syntax, or resolution error occur?
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Did execution abort with a runtime error?
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Everything reported so far, in order.
    pub fn errors(&self) -> &[LoxError] {
        &self.errors
    }

    /// Reset between runs (the REPL clears after printing each line's
    /// diagnostics so the session keeps going).
    pub fn clear(&mut self) {
        self.errors.clear();
        self.had_error = false;
        self.had_runtime_error = false;
    }
}
