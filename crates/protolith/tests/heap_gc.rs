//! Collection behavior: liveness through the environment, reclamation of
//! unreachable objects, intern-table weakness, and arena slot reuse.

use pretty_assertions::assert_eq;
use protolith::{CollectConsole, ReplSession, Value};

fn session() -> ReplSession {
    ReplSession::with_console(Box::new(CollectConsole::new()))
}

fn eval(session: &mut ReplSession, line: &str) -> Value {
    session
        .eval_line(line)
        .unwrap_or_else(|error| panic!("line {line:?} failed: {error}"))
        .unwrap_or_else(|| panic!("line {line:?} produced no value"))
}

// =============================================================================
// 1. Baseline
// =============================================================================

/// Everything allocated by bootstrap is reachable from the roots.
#[test]
fn fresh_session_collects_nothing() {
    let mut session = session();
    assert_eq!(session.collect_garbage(), 0, "bootstrap objects must all be rooted");
}

/// Collection is idempotent when nothing changes.
#[test]
fn repeated_collection_is_stable() {
    let mut session = session();
    eval(&mut session, "(setl a (array 1 2 3))");
    session.collect_garbage();
    let stats = session.heap_stats();
    assert_eq!(session.collect_garbage(), 0);
    assert_eq!(session.heap_stats(), stats);
}

// =============================================================================
// 2. Reclamation
// =============================================================================

/// A result no one kept is reclaimed on the next collection.
#[test]
fn unreferenced_results_are_reclaimed() {
    let mut session = session();
    session.collect_garbage();
    let baseline = session.heap_stats().live_objects;

    eval(&mut session, "(array 1 2 3)");
    assert!(session.heap_stats().live_objects > baseline);
    assert!(session.collect_garbage() >= 1);
    assert_eq!(session.heap_stats().live_objects, baseline);
}

/// Global bindings keep their values alive.
#[test]
fn bound_values_survive_collection() {
    let mut session = session();
    eval(&mut session, "(setl keep (array 7 8))");
    session.collect_garbage();
    assert_eq!(eval(&mut session, "(keep get 0)"), Value::Number(7.0));
    assert_eq!(eval(&mut session, "(keep size)"), Value::Number(2.0));
}

/// A script function keeps its parsed body alive across collections.
#[test]
fn function_bodies_survive_collection() {
    let mut session = session();
    eval(&mut session, "(func adder (a b) (+ a b))");
    session.collect_garbage();
    session.collect_garbage();
    assert_eq!(eval(&mut session, "(null adder 2 3)"), Value::Number(5.0));
}

/// Prototype links keep ancestors alive even when nothing else refers to
/// them.
#[test]
fn prototype_links_are_traced() {
    let mut session = session();
    eval(&mut session, "(func Base () null)");
    eval(&mut session, "(setf (getf (getl Base) prototype) tag 42)");
    eval(&mut session, "(setl child (new Base))");
    // drop every named path to the prototype object except child's link
    eval(&mut session, "(setl Base null)");
    session.collect_garbage();
    assert_eq!(eval(&mut session, "(getf child tag)"), Value::Number(42.0));
}

// =============================================================================
// 3. Intern table weakness
// =============================================================================

/// A string literal nobody kept leaves the intern table on collection.
#[test]
fn dead_strings_leave_the_intern_table() {
    let mut session = session();
    session.collect_garbage();
    let baseline = session.heap_stats().interned_strings;

    eval(&mut session, "\"zebra\"");
    assert_eq!(session.heap_stats().interned_strings, baseline + 1);
    session.collect_garbage();
    assert_eq!(session.heap_stats().interned_strings, baseline);
}

/// A string bound into the environment stays interned.
#[test]
fn live_strings_stay_interned() {
    let mut session = session();
    session.collect_garbage();
    let baseline = session.heap_stats().interned_strings;

    eval(&mut session, "(setl s \"kept\")");
    session.collect_garbage();
    // "s" (the binding's key) and "kept" both remain
    assert_eq!(session.heap_stats().interned_strings, baseline + 2);
    let value = eval(&mut session, "s");
    assert_eq!(session.vm().string_content(value), Some("kept"));
}

// =============================================================================
// 4. Slot reuse
// =============================================================================

/// Freed slots are reused instead of growing the arena.
#[test]
fn freed_slots_are_reused() {
    let mut session = session();
    eval(&mut session, "(array 1 2 3)");
    session.collect_garbage();
    let total = session.heap_stats().total_slots;

    for _ in 0..8 {
        eval(&mut session, "(array 1 2 3)");
        session.collect_garbage();
    }
    assert_eq!(
        session.heap_stats().total_slots,
        total,
        "repeated allocate/collect cycles must not grow the arena"
    );
}
