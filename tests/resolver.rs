use rlox::parser::Parser;
use rlox::resolver::{Resolutions, Resolver};
use rlox::scanner::Scanner;
use rlox::stmt::Stmt;
use rlox::token::Token;

fn parse(source: &str) -> Vec<Stmt> {
    let tokens: Vec<Token> = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source should scan cleanly");

    let mut parser = Parser::new(&tokens, 0);
    let statements = parser.parse();

    let errors = parser.take_errors();
    assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);

    statements
}

/// Run a fresh resolver over `source`, returning the distance table and
/// the rendered static errors.
fn resolve_source(source: &str) -> (Resolutions, Vec<String>) {
    let statements = parse(source);

    let mut resolver = Resolver::new();
    resolver.resolve(&statements);

    let errors = resolver
        .take_errors()
        .iter()
        .map(|e| e.to_string())
        .collect();

    (resolver.into_resolutions(), errors)
}

fn resolve_errors(source: &str) -> Vec<String> {
    resolve_source(source).1
}

#[test]
fn duplicate_local_declaration_is_a_static_error() {
    let errors = resolve_errors("{ var a = 1; var a = 2; }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Variable already declared in this scope."));
}

#[test]
fn shadowing_in_a_nested_block_is_allowed() {
    let errors = resolve_errors("{ var a = 1; { var a = 2; } }");

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}

#[test]
fn global_redeclaration_is_allowed() {
    let errors = resolve_errors("var a = 1; var a = 2;");

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}

#[test]
fn reading_a_local_in_its_own_initializer_is_a_static_error() {
    let errors = resolve_errors("var a = 1; { var a = a + 1; }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Can't read local variable in its own initializer."));
}

#[test]
fn return_outside_a_function_is_a_static_error() {
    let errors = resolve_errors("return 1;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Can't return from top-level code."));
}

#[test]
fn returning_a_value_from_init_is_a_static_error() {
    let errors = resolve_errors("class A { init() { return 1; } }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Can't return a value from an initializer."));
}

#[test]
fn bare_return_inside_init_is_allowed() {
    let errors = resolve_errors("class A { init() { return; } }");

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}

#[test]
fn this_outside_a_class_is_a_static_error() {
    let errors = resolve_errors("print this;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Can't use 'this' outside of a class."));
}

#[test]
fn super_outside_a_class_is_a_static_error() {
    let errors = resolve_errors("print super.m();");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Can't use 'super' outside of a class."));
}

#[test]
fn super_without_a_superclass_is_a_static_error() {
    let errors = resolve_errors("class A { m() { return super.m(); } }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Can't use 'super' in a class with no superclass."));
}

#[test]
fn class_inheriting_from_itself_is_a_static_error() {
    let errors = resolve_errors("class A < A {}");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("A class can't inherit from itself."));
}

/// Several independent static errors surface from one pass.
#[test]
fn static_errors_are_collected_not_thrown() {
    let errors = resolve_errors("return 1;\nprint this;\n{ var x = 1; var x = 2; }");

    assert_eq!(errors.len(), 3);
}

const CLOSURE_PROGRAM: &str = "\
fun make() {
  var i = 0;
  fun inc() {
    i = i + 1;
    return i;
  }
  return inc;
}
var c = make();
print c();
";

/// Resolving the same program twice from fresh state yields an
/// identical distance table.
#[test]
fn resolution_is_idempotent() {
    let (first, errors_a) = resolve_source(CLOSURE_PROGRAM);
    let (second, errors_b) = resolve_source(CLOSURE_PROGRAM);

    assert!(errors_a.is_empty() && errors_b.is_empty());
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

/// Top-level names resolve as globals: they get no table entry at all.
#[test]
fn globals_are_left_unresolved() {
    let (resolutions, errors) = resolve_source("var a = 1; print a;");

    assert!(errors.is_empty());
    assert!(resolutions.is_empty());
}
