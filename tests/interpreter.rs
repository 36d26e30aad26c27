use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rlox::error::Diagnostics;
use rlox::lox::Lox;

/// Output sink the test can read back after the run.
#[derive(Clone, Default)]
struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn run(source: &str) -> (String, Diagnostics) {
    let sink = SharedOutput::default();
    let mut lox = Lox::with_output(Box::new(sink.clone()));
    let mut diagnostics = Diagnostics::new();

    lox.run(source.as_bytes(), &mut diagnostics);

    let output = String::from_utf8(sink.0.borrow().clone()).unwrap();
    (output, diagnostics)
}

fn run_ok(source: &str) -> String {
    let (output, diagnostics) = run(source);

    assert!(
        !diagnostics.had_error(),
        "static errors: {:?}",
        diagnostics.errors()
    );
    assert!(
        !diagnostics.had_runtime_error(),
        "runtime errors: {:?}",
        diagnostics.errors()
    );

    output
}

/// Run a program expected to die at runtime; returns (output so far,
/// rendered error).
fn run_runtime_error(source: &str) -> (String, String) {
    let (output, diagnostics) = run(source);

    assert!(!diagnostics.had_error(), "unexpected static errors");
    assert!(diagnostics.had_runtime_error(), "expected a runtime error");
    assert_eq!(diagnostics.errors().len(), 1);

    let rendered = diagnostics.errors()[0].to_string();
    (output, rendered)
}

// ───────────────────────── expressions ─────────────────────────

#[test]
fn arithmetic_precedence() {
    assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
}

#[test]
fn grouping_and_division() {
    assert_eq!(run_ok("print (5 - 3) / 2;"), "1\n");
    assert_eq!(run_ok("print 10 / 4;"), "2.5\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
}

#[test]
fn unary_negation_and_not() {
    assert_eq!(run_ok("print -(3);"), "-3\n");
    assert_eq!(run_ok("print !nil;"), "true\n");
    // 0 and "" are truthy.
    assert_eq!(run_ok("print !0;"), "false\n");
    assert_eq!(run_ok("print !\"\";"), "false\n");
}

#[test]
fn equality_is_structural_and_type_strict() {
    assert_eq!(
        run_ok("print 1 == 1; print 1 != 1; print \"a\" == 1; print nil == nil;"),
        "true\nfalse\nfalse\ntrue\n"
    );
}

#[test]
fn functions_compare_by_identity() {
    let source = "\
fun f() {}
fun g() {}
var h = f;
print f == h;
print f == g;
";
    assert_eq!(run_ok(source), "true\nfalse\n");
}

#[test]
fn logical_operators_short_circuit_and_return_operands() {
    assert_eq!(
        run_ok("print \"hi\" or 2; print nil or \"yes\"; print nil and 2; print 1 and 2;"),
        "hi\nyes\nnil\n2\n"
    );
}

#[test]
fn short_circuit_skips_right_operand_effects() {
    let source = "\
var called = false;
fun touch() { called = true; return true; }
var r = false and touch();
print called;
";
    assert_eq!(run_ok(source), "false\n");
}

#[test]
fn number_formatting_trims_integral_decimals() {
    assert_eq!(run_ok("print 4 / 2; print 2.5; print 0.5;"), "2\n2.5\n0.5\n");
}

// ───────────────────────── statements & scope ─────────────────────────

#[test]
fn block_scope_shadows_and_restores() {
    assert_eq!(
        run_ok("var a = 1; { var a = 2; print a; } print a;"),
        "2\n1\n"
    );
}

#[test]
fn assignment_in_inner_scope_writes_outer_binding() {
    assert_eq!(
        run_ok("var a = 1; { a = a + 1; print a; } print a;"),
        "2\n2\n"
    );
}

#[test]
fn while_loop_runs_until_condition_is_falsy() {
    let source = "\
var a = 0;
var b = 1;
while (b < 20) {
  var t = a + b;
  a = b;
  b = t;
}
print b;
";
    assert_eq!(run_ok(source), "21\n");
}

#[test]
fn for_loop_desugar_executes_like_while() {
    let source = "\
var sum = 0;
for (var i = 0; i < 5; i = i + 1) {
  sum = sum + i;
}
print sum;
";
    assert_eq!(run_ok(source), "10\n");
}

#[test]
fn if_runs_exactly_one_branch() {
    assert_eq!(
        run_ok("if (1 < 2) print \"then\"; else print \"else\";"),
        "then\n"
    );
    assert_eq!(
        run_ok("if (nil) print \"then\"; else print \"else\";"),
        "else\n"
    );
}

#[test]
fn late_bound_globals_resolve_at_call_time() {
    let source = "\
fun show() { print g; }
var g = \"late\";
show();
";
    assert_eq!(run_ok(source), "late\n");
}

// ───────────────────────── functions & closures ─────────────────────────

#[test]
fn closure_retains_defining_environment() {
    let source = "\
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
print c();
";
    assert_eq!(run_ok(source), "1\n2\n");
}

#[test]
fn sibling_closures_share_one_upvalue() {
    let source = "\
fun pair() {
  var n = 0;
  fun bump() { n = n + 1; }
  fun read() { return n; }
  print read();
  bump();
  print read();
}
pair();
";
    assert_eq!(run_ok(source), "0\n1\n");
}

#[test]
fn recursion_resolves_through_the_function_name() {
    let source = "\
fun fib(n) {
  if (n < 2) return n;
  return fib(n - 1) + fib(n - 2);
}
print fib(10);
";
    assert_eq!(run_ok(source), "55\n");
}

#[test]
fn return_unwinds_through_nested_blocks() {
    let source = "\
fun f() {
  {
    var x = 1;
    return x;
  }
}
print f();
print \"after\";
";
    assert_eq!(run_ok(source), "1\nafter\n");
}

#[test]
fn falling_off_the_end_yields_nil() {
    assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
}

#[test]
fn function_values_stringify_with_their_name() {
    assert_eq!(run_ok("fun add(a, b) { return a + b; } print add;"), "<fn add>\n");
}

#[test]
fn clock_native_is_predefined() {
    assert_eq!(run_ok("print clock() >= 0;"), "true\n");
}

// ───────────────────────── classes ─────────────────────────

#[test]
fn instances_hold_fields() {
    let source = "\
class Box {}
var box = Box();
box.contents = 42;
print box.contents;
print Box;
print box;
";
    assert_eq!(run_ok(source), "42\nBox\nBox instance\n");
}

#[test]
fn methods_bind_this_to_the_receiver() {
    let source = "\
class Point {
  init(x, y) {
    this.x = x;
    this.y = y;
  }
  sum() {
    return this.x + this.y;
  }
}
var p = Point(1, 2);
print p.sum();
";
    assert_eq!(run_ok(source), "3\n");
}

#[test]
fn bound_methods_remember_their_receiver() {
    let source = "\
class Greeter {
  init(name) { this.name = name; }
  greet() { return this.name; }
}
var m = Greeter(\"kit\").greet;
print m();
";
    assert_eq!(run_ok(source), "kit\n");
}

#[test]
fn fields_shadow_methods() {
    let source = "\
class C {
  m() { return \"method\"; }
}
var c = C();
print c.m();
c.m = \"field\";
print c.m;
";
    assert_eq!(run_ok(source), "method\nfield\n");
}

#[test]
fn class_call_yields_the_instance_not_init_result() {
    let source = "\
class Foo {
  init() {
    this.v = 1;
    return;
  }
}
print Foo().v;
print Foo();
";
    assert_eq!(run_ok(source), "1\nFoo instance\n");
}

#[test]
fn superclass_methods_are_inherited() {
    let source = "\
class A {
  greet() { return \"A\"; }
}
class B < A {}
print B().greet();
";
    assert_eq!(run_ok(source), "A\n");
}

#[test]
fn super_dispatches_to_the_static_superclass() {
    let source = "\
class A {
  greet() { return \"A\"; }
}
class B < A {
  greet() { return super.greet() + \"B\"; }
}
print B().greet();
";
    assert_eq!(run_ok(source), "AB\n");
}

/// `super` starts lookup at the *static* superclass but binds the
/// dynamic receiver, so an inherited `test` still reaches A's method.
#[test]
fn super_lookup_is_static_receiver_is_dynamic() {
    let source = "\
class A {
  method() { print \"A method\"; }
}
class B < A {
  method() { print \"B method\"; }
  test() { super.method(); }
}
class C < B {}
C().test();
";
    assert_eq!(run_ok(source), "A method\n");
}

#[test]
fn init_arity_becomes_class_arity() {
    let source = "\
class Pair {
  init(a, b) { this.a = a; this.b = b; }
}
var p = Pair(1, 2);
print p.a + p.b;
";
    assert_eq!(run_ok(source), "3\n");
}

// ───────────────────────── runtime errors ─────────────────────────

#[test]
fn first_runtime_error_aborts_the_rest() {
    let (output, rendered) = run_runtime_error("print \"one\";\nprint 1 + nil;\nprint \"two\";");

    assert_eq!(output, "one\n");
    assert!(rendered.contains("Operands must be two numbers or two strings."));
    assert!(rendered.contains("[line 2]"));
}

#[test]
fn arity_mismatch_names_expected_and_actual() {
    let (_, rendered) = run_runtime_error("fun f(a, b) { return a; } f(1);");

    assert!(rendered.contains("Expected 2 arguments but got 1."));
}

#[test]
fn calling_a_non_callable_is_a_distinct_error() {
    let (_, rendered) = run_runtime_error("var x = 123; x();");

    assert!(rendered.contains("Can only call functions and classes."));
}

#[test]
fn undefined_variable_read() {
    let (_, rendered) = run_runtime_error("print missing;");

    assert!(rendered.contains("Undefined variable 'missing'."));
}

#[test]
fn undefined_variable_assignment() {
    let (_, rendered) = run_runtime_error("missing = 1;");

    assert!(rendered.contains("Undefined variable 'missing'."));
}

#[test]
fn operand_type_errors_are_distinct() {
    let (_, rendered) = run_runtime_error("print -\"a\";");
    assert!(rendered.contains("Operand must be a number."));

    let (_, rendered) = run_runtime_error("print 1 < \"a\";");
    assert!(rendered.contains("Operands must be numbers."));
}

#[test]
fn property_access_requires_an_instance() {
    let (_, rendered) = run_runtime_error("print \"s\".length;");
    assert!(rendered.contains("Only instances have properties."));

    let (_, rendered) = run_runtime_error("123.x = 1;");
    assert!(rendered.contains("Only instances have fields."));
}

#[test]
fn undefined_property_read() {
    let (_, rendered) = run_runtime_error("class E {} print E().missing;");

    assert!(rendered.contains("Undefined property 'missing'."));
}

#[test]
fn superclass_must_be_a_class() {
    let (_, rendered) = run_runtime_error("var NotClass = 1; class Sub < NotClass {}");

    assert!(rendered.contains("Superclass must be a class."));
}

// ───────────────────────── pipeline behaviour ─────────────────────────

#[test]
fn static_errors_block_execution() {
    let (output, diagnostics) = run("print 1;\nvar;");

    assert!(diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
    assert_eq!(output, "", "nothing may execute after a syntax error");
}

#[test]
fn resolver_errors_block_execution_like_syntax_errors() {
    let (output, diagnostics) = run("print 1;\nreturn 2;");

    assert!(diagnostics.had_error());
    assert!(!diagnostics.had_runtime_error());
    assert_eq!(output, "");
}

#[test]
fn runtime_and_static_flags_are_independent() {
    let (_, diagnostics) = run("print 1 + nil;");

    assert!(!diagnostics.had_error());
    assert!(diagnostics.had_runtime_error());
}

/// One engine, several runs: globals and functions persist, the way a
/// REPL session needs them to.
#[test]
fn session_state_persists_across_runs() {
    let sink = SharedOutput::default();
    let mut lox = Lox::with_output(Box::new(sink.clone()));
    let mut diagnostics = Diagnostics::new();

    lox.run(b"fun double(n) { return n + n; }", &mut diagnostics);
    assert!(!diagnostics.had_error() && !diagnostics.had_runtime_error());

    lox.run(b"var x = double(21);", &mut diagnostics);
    lox.run(b"print x;", &mut diagnostics);

    assert!(!diagnostics.had_error() && !diagnostics.had_runtime_error());

    let output = String::from_utf8(sink.0.borrow().clone()).unwrap();
    assert_eq!(output, "42\n");
}

/// A side-effect-free program produces identical output on identical
/// fresh runs.
#[test]
fn execution_is_deterministic() {
    let source = "\
fun fib(n) {
  if (n < 2) return n;
  return fib(n - 1) + fib(n - 2);
}
for (var i = 0; i < 8; i = i + 1) print fib(i);
";
    assert_eq!(run_ok(source), run_ok(source));
}
