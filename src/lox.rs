//! Pipeline front door.
//!
//! [`Lox`] wires scanner → parser → resolver → interpreter for one
//! source string at a time, reporting every diagnostic into a
//! caller-owned [`Diagnostics`] sink.  It holds no process-wide state:
//! the interpreter (globals, distance table) and the ExprId counter live
//! on the struct, so one `Lox` can run many programs in a process — a
//! REPL session, or a test harness — and successive runs share globals
//! the way successive REPL lines should.

use std::io::Write;

use log::{debug, info};

use crate::callable::NativeFunction;
use crate::error::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Lox {
    interpreter: Interpreter,
    next_id: usize,
}

impl Lox {
    /// Engine printing to stdout.
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
            next_id: 0,
        }
    }

    /// Engine printing to a caller-supplied sink.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(output),
            next_id: 0,
        }
    }

    /// Register a host function before (or between) runs.
    pub fn define_native(&mut self, native: NativeFunction) {
        self.interpreter.define_native(native);
    }

    /// Run one source string through the whole pipeline.
    ///
    /// Scanning, parsing, and resolution each report every error they
    /// find; if any of them reported, execution does not start.  A
    /// runtime error stops execution and is reported with its own flag.
    pub fn run(&mut self, source: &[u8], diagnostics: &mut Diagnostics) {
        info!("Running {} byte(s) of source", source.len());

        let mut tokens: Vec<Token> = Vec::new();

        for item in Scanner::new(source) {
            match item {
                Ok(token) => tokens.push(token),
                Err(err) => diagnostics.report(err),
            }
        }

        let mut parser = Parser::new(&tokens, self.next_id);
        let statements = parser.parse();

        self.next_id = parser.next_id();

        for err in parser.take_errors() {
            diagnostics.report(err);
        }

        let mut resolver = Resolver::new();
        resolver.resolve(&statements);

        for err in resolver.take_errors() {
            diagnostics.report(err);
        }

        if diagnostics.had_error() {
            debug!("static errors reported; skipping execution");

            return;
        }

        self.interpreter.adopt_resolutions(resolver.into_resolutions());

        if let Err(err) = self.interpreter.interpret(&statements) {
            diagnostics.report(err);
        }
    }
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}
