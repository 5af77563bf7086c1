//! Persistent REPL session support.
//!
//! `ReplSession` keeps interpreter state across reads so interactive lines
//! share the global environment, the heap, and the intern table. The prompt
//! and line handling live in the caller; the session accepts any character
//! source.

use crate::{
    error::RunResult,
    heap::HeapStats,
    io::Console,
    parse::{ReadOutcome, Reader},
    value::Value,
    vm::Vm,
};

/// Result of one REPL step.
#[derive(Debug)]
pub enum ReplStep {
    /// A form was read and evaluated.
    Value {
        value: Value,
        /// The value, rendered the way the REPL prints it.
        rendered: String,
        /// The parsed-tree dump, present when `replConfig.dumpExpr` is set.
        expr_dump: Option<String>,
    },
    /// The line held no expression.
    Empty,
    /// The input source is exhausted.
    Eof,
}

/// A persistent session: one interpreter evaluated one top-level form at a
/// time.
pub struct ReplSession {
    vm: Vm,
}

impl Default for ReplSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplSession {
    /// Creates a session bound to the process console.
    #[must_use]
    pub fn new() -> Self {
        Self { vm: Vm::new() }
    }

    /// Creates a session with a custom console (tests, embedding).
    #[must_use]
    pub fn with_console(console: Box<dyn Console>) -> Self {
        Self {
            vm: Vm::with_console(console),
        }
    }

    /// Reads one top-level form from `input` and evaluates it.
    ///
    /// Enforces the trailing-character rule after a successful read: the
    /// next character must be a newline or end of input. Errors from the
    /// reader and the evaluator both surface here; the caller decides how to
    /// report them and what to do with the rest of the line.
    pub fn step(&mut self, input: &mut dyn Iterator<Item = char>) -> RunResult<ReplStep> {
        let mut reader = Reader::new(input);
        match reader.read(&mut self.vm)? {
            ReadOutcome::EndOfInput => Ok(ReplStep::Eof),
            ReadOutcome::BlankLine => Ok(ReplStep::Empty),
            ReadOutcome::Expression(expr) => {
                reader.finish_line()?;
                let expr_dump = self.vm.dump_expr_enabled().then(|| self.vm.render_expr(&expr));
                let value = self.vm.eval(&expr)?;
                let rendered = self.vm.render_value(value);
                Ok(ReplStep::Value {
                    value,
                    rendered,
                    expr_dump,
                })
            }
        }
    }

    /// Evaluates a single source line; `Ok(None)` when the line was blank.
    ///
    /// Convenience wrapper over [`ReplSession::step`] used heavily in tests.
    pub fn eval_line(&mut self, line: &str) -> RunResult<Option<Value>> {
        let mut chars = line.chars();
        match self.step(&mut chars)? {
            ReplStep::Value { value, .. } => Ok(Some(value)),
            ReplStep::Empty | ReplStep::Eof => Ok(None),
        }
    }

    /// Renders a value the way the REPL prints results.
    #[must_use]
    pub fn render(&self, value: Value) -> String {
        self.vm.render_value(value)
    }

    /// Collects garbage; the CLI calls this once per logical line.
    pub fn collect_garbage(&mut self) -> usize {
        self.vm.collect_garbage()
    }

    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.vm.heap_stats()
    }

    #[must_use]
    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }
}
