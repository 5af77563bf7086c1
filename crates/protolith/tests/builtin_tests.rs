//! The native built-in surface: `Array` prototype methods, `console`, and
//! `parseFloat`, all driven through the language.

use pretty_assertions::assert_eq;
use protolith::{CollectConsole, ErrorKind, ReplSession, Value};

fn session_with(console: CollectConsole) -> ReplSession {
    ReplSession::with_console(Box::new(console))
}

fn session() -> ReplSession {
    session_with(CollectConsole::new())
}

fn eval(session: &mut ReplSession, line: &str) -> Value {
    session
        .eval_line(line)
        .unwrap_or_else(|error| panic!("line {line:?} failed: {error}"))
        .unwrap_or_else(|| panic!("line {line:?} produced no value"))
}

fn eval_err(session: &mut ReplSession, line: &str) -> ErrorKind {
    session
        .eval_line(line)
        .expect_err(&format!("line {line:?} should have failed"))
        .kind()
}

// =============================================================================
// 1. Arrays
// =============================================================================

/// Arrays are created, sized, read, and written through their methods.
#[test]
fn array_size_get_set_scenario() {
    let mut session = session();
    assert_eq!(eval(&mut session, "(do (setl a (array 10 20 30)) (a size))"), Value::Number(3.0));
    assert_eq!(eval(&mut session, "(a get 1)"), Value::Number(20.0));
    assert_eq!(eval(&mut session, "(a set 1 99)"), Value::Number(99.0));
    assert_eq!(eval(&mut session, "(a get 1)"), Value::Number(99.0));
}

/// `(array items…)` evaluates items left to right.
#[test]
fn array_literal_evaluates_in_order() {
    let mut session = session();
    eval(&mut session, "(setl n 0)");
    eval(&mut session, "(setl a (array (setl n (+ n 1)) (setl n (+ n 1))))");
    assert_eq!(eval(&mut session, "(a get 0)"), Value::Number(1.0));
    assert_eq!(eval(&mut session, "(a get 1)"), Value::Number(2.0));
}

/// Arrays render as indented lists; the empty array stays on one line.
#[test]
fn array_rendering() {
    let mut session = session();
    let value = eval(&mut session, "(array 10 20)");
    assert_eq!(session.render(value), "[\n  10,\n  20\n]");
    let empty = eval(&mut session, "(array)");
    assert_eq!(session.render(empty), "[ ]");
}

/// Index checking: out-of-range on both ends, invalid-arg for non-integers
/// and wrong arity.
#[test]
fn array_index_errors() {
    let mut session = session();
    eval(&mut session, "(setl a (array 1 2))");
    assert_eq!(eval_err(&mut session, "(a get 5)"), ErrorKind::OutOfRange);
    assert_eq!(eval_err(&mut session, "(a get (- 1))"), ErrorKind::OutOfRange);
    assert_eq!(eval_err(&mut session, "(a get 0.5)"), ErrorKind::InvalidArg);
    assert_eq!(eval_err(&mut session, "(a get \"0\")"), ErrorKind::InvalidArg);
    assert_eq!(eval_err(&mut session, "(a get)"), ErrorKind::InvalidArg);
    assert_eq!(eval_err(&mut session, "(a set 5 1)"), ErrorKind::OutOfRange);
    assert_eq!(eval_err(&mut session, "(a size 1)"), ErrorKind::InvalidArg);
}

/// Array methods require an actual array receiver; `(new Array)` is a plain
/// object that merely shares the prototype.
#[test]
fn array_methods_require_array_receiver() {
    let mut session = session();
    eval(&mut session, "(setl fake (new Array))");
    assert_eq!(eval_err(&mut session, "(fake size)"), ErrorKind::NotArray);
}

/// Arrays hold arbitrary values, other arrays included.
#[test]
fn arrays_nest() {
    let mut session = session();
    eval(&mut session, "(setl outer (array (array 1) \"s\" null))");
    assert_eq!(eval(&mut session, "((outer get 0) get 0)"), Value::Number(1.0));
    assert_eq!(eval(&mut session, "(outer get 2)"), Value::Object(None));
}

// =============================================================================
// 2. console
// =============================================================================

/// `console.dump` pretty-prints each item on its own line and returns
/// undefined.
#[test]
fn console_dump_writes_each_item() {
    let console = CollectConsole::new();
    let mut session = session_with(console.clone());
    let value = eval(&mut session, "(console dump 1 \"hi\" true (array))");
    assert_eq!(value, Value::Undefined);
    assert_eq!(console.output(), "1\n\"hi\"\ntrue\n[ ]\n");
}

/// `console.dump` with no items writes nothing (variadic, zero accepted).
#[test]
fn console_dump_accepts_zero_items() {
    let console = CollectConsole::new();
    let mut session = session_with(console.clone());
    eval(&mut session, "(console dump)");
    assert_eq!(console.output(), "");
}

/// `console.readLine` returns the scripted line as a string.
#[test]
fn console_read_line_returns_string() {
    let console = CollectConsole::with_input(["hello world"]);
    let mut session = session_with(console);
    let value = eval(&mut session, "(console readLine)");
    assert_eq!(session.vm().string_content(value), Some("hello world"));
}

/// At end of scripted input, `console.readLine` returns the empty string.
#[test]
fn console_read_line_at_eof_is_empty() {
    let mut session = session();
    let value = eval(&mut session, "(console readLine)");
    assert_eq!(session.vm().string_content(value), Some(""));
}

#[test]
fn console_read_line_rejects_arguments() {
    let mut session = session();
    assert_eq!(eval_err(&mut session, "(console readLine 1)"), ErrorKind::InvalidArg);
}

// =============================================================================
// 3. parseFloat
// =============================================================================

/// `parseFloat` parses a whole string into a number.
#[test]
fn parse_float_parses_full_strings() {
    let mut session = session();
    assert_eq!(eval(&mut session, "(global parseFloat \"3.5\")"), Value::Number(3.5));
    assert_eq!(eval(&mut session, "(this parseFloat \"42\")"), Value::Number(42.0));
    assert_eq!(eval(&mut session, "(global parseFloat \"1e3\")"), Value::Number(1000.0));
}

/// Partial parses and non-string arguments are invalid-arg.
#[test]
fn parse_float_rejects_bad_input() {
    let mut session = session();
    assert_eq!(eval_err(&mut session, "(global parseFloat \"3.5x\")"), ErrorKind::InvalidArg);
    assert_eq!(eval_err(&mut session, "(global parseFloat \"\")"), ErrorKind::InvalidArg);
    assert_eq!(eval_err(&mut session, "(global parseFloat 5)"), ErrorKind::InvalidArg);
    assert_eq!(eval_err(&mut session, "(global parseFloat)"), ErrorKind::InvalidArg);
    assert_eq!(eval_err(&mut session, "(global parseFloat \"1\" \"2\")"), ErrorKind::InvalidArg);
}

// =============================================================================
// 4. Built-ins are ordinary values
// =============================================================================

/// Built-in functions can be pulled out and called generically.
#[test]
fn builtins_are_first_class() {
    let mut session = session();
    eval(&mut session, "(setl pf (getf global parseFloat))");
    assert_eq!(eval(&mut session, "(null pf \"2.5\")"), Value::Number(2.5));
}

/// Native functions render like script functions.
#[test]
fn native_functions_render() {
    let mut session = session();
    let value = eval(&mut session, "(getf global parseFloat)");
    assert_eq!(session.render(value), "(func (str) (..))");
}
