use rlox::ast_printer::AstPrinter;
use rlox::error::LoxError;
use rlox::expr::{Expr, LiteralValue};
use rlox::parser::Parser;
use rlox::scanner::Scanner;
use rlox::stmt::Stmt;
use rlox::token::Token;

fn parse_source(source: &str) -> (Vec<Stmt>, Vec<LoxError>) {
    let tokens: Vec<Token> = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source should scan cleanly");

    let mut parser = Parser::new(&tokens, 0);
    let statements = parser.parse();
    let errors = parser.take_errors();

    (statements, errors)
}

fn parse_clean(source: &str) -> Vec<Stmt> {
    let (statements, errors) = parse_source(source);

    assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);

    statements
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let statements = parse_clean("1 + 2 * 3;");

    assert_eq!(
        AstPrinter::print_stmt(&statements[0]),
        "(; (+ 1.0 (* 2.0 3.0)))"
    );
}

#[test]
fn grouping_overrides_precedence() {
    let statements = parse_clean("(1 + 2) * 3;");

    assert_eq!(
        AstPrinter::print_stmt(&statements[0]),
        "(; (* (group (+ 1.0 2.0)) 3.0))"
    );
}

#[test]
fn comparison_and_equality_nest_correctly() {
    let statements = parse_clean("print 1 + 2 < 4 == true;");

    assert_eq!(
        AstPrinter::print_stmt(&statements[0]),
        "(print (== (< (+ 1.0 2.0) 4.0) true))"
    );
}

#[test]
fn unary_is_right_associative() {
    let statements = parse_clean("print !!ok;");

    assert_eq!(AstPrinter::print_stmt(&statements[0]), "(print (! (! ok)))");
}

#[test]
fn assignment_is_right_associative() {
    let statements = parse_clean("a = b = 1;");

    assert_eq!(
        AstPrinter::print_stmt(&statements[0]),
        "(; (= a (= b 1.0)))"
    );
}

#[test]
fn call_and_property_chains_are_left_associative() {
    let statements = parse_clean("a.b.c(1).d;");

    assert_eq!(
        AstPrinter::print_stmt(&statements[0]),
        "(; (. (call (. (. a b) c) 1.0) d))"
    );
}

/// `for` has no AST node of its own: a full header desugars into
/// `{ init; while (cond) { body; incr; } }`.
#[test]
fn for_loop_desugars_to_while() {
    let statements = parse_clean("for (var i = 0; i < 3; i = i + 1) print i;");

    assert_eq!(statements.len(), 1);

    let Stmt::Block(outer) = &statements[0] else {
        panic!("expected initializer block, got {:?}", statements[0]);
    };

    assert_eq!(outer.len(), 2);
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected while loop, got {:?}", outer[1]);
    };

    let Stmt::Block(inner) = body.as_ref() else {
        panic!("expected body block, got {:?}", body);
    };

    // original body + increment expression
    assert_eq!(inner.len(), 2);
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

/// An empty header desugars to a bare `while (true)`.
#[test]
fn empty_for_header_desugars_to_while_true() {
    let statements = parse_clean("for (;;) print 1;");

    let Stmt::While { condition, .. } = &statements[0] else {
        panic!("expected while loop, got {:?}", statements[0]);
    };

    assert_eq!(*condition, Expr::Literal(LiteralValue::True));
}

#[test]
fn class_declaration_with_superclass_and_methods() {
    let statements = parse_clean("class B < A { greet() { return super.greet(); } }");

    let Stmt::Class {
        name,
        superclass,
        methods,
    } = &statements[0]
    else {
        panic!("expected class declaration, got {:?}", statements[0]);
    };

    assert_eq!(name.lexeme, "B");
    assert!(matches!(superclass, Some(Expr::Variable { .. })));
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].name.lexeme, "greet");
}

/// An invalid assignment target is reported but parsing continues with
/// the expression already built.
#[test]
fn invalid_assignment_target_is_non_fatal() {
    let (statements, errors) = parse_source("1 = 2;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Invalid assignment target."));

    // The statement survives, holding the left-hand side.
    assert_eq!(statements.len(), 1);
    assert_eq!(AstPrinter::print_stmt(&statements[0]), "(; 1.0)");
}

/// One diagnostic per broken statement; healthy statements in between
/// still parse.
#[test]
fn synchronize_bounds_error_cascades() {
    let (statements, errors) = parse_source("var = 1;\nprint 2;\nvar b = ;\nprint 3;");

    assert_eq!(errors.len(), 2);
    assert_eq!(statements.len(), 2);
    assert!(matches!(statements[0], Stmt::Print(_)));
    assert!(matches!(statements[1], Stmt::Print(_)));
}

#[test]
fn argument_cap_is_reported_once_and_parsing_continues() {
    let args = (0..256).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
    let source = format!("f({});", args);

    let (statements, errors) = parse_source(&source);

    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .to_string()
        .contains("Can't have more than 255 arguments."));

    // The call expression is still built, with every argument.
    let Stmt::Expression(Expr::Call { arguments, .. }) = &statements[0] else {
        panic!("expected call statement, got {:?}", statements[0]);
    };
    assert_eq!(arguments.len(), 256);
}

#[test]
fn missing_expression_reports_offending_token() {
    let (_, errors) = parse_source("print ;");

    assert_eq!(errors.len(), 1);

    let rendered = errors[0].to_string();
    assert!(rendered.contains("Expected expression."));
    assert!(rendered.contains("at ';'"));
}
