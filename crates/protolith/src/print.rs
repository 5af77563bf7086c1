//! Human-readable rendering of values and parsed expressions.
//!
//! Nothing in the core depends on this output; it exists for the REPL, for
//! `console.dump`, and for the `replConfig.dumpExpr` tree dump.

use std::fmt::Write as _;

use crate::{
    expressions::Expr,
    heap::{HeapData, HeapId},
    value::Value,
    vm::Vm,
};

/// Property graphs can be made cyclic through `setf`; rendering stops here
/// and prints `...` instead of overflowing.
const MAX_RENDER_DEPTH: usize = 16;

impl Vm {
    /// Renders a value the way the REPL prints results.
    #[must_use]
    pub fn render_value(&self, value: Value) -> String {
        let mut out = String::new();
        self.render_into(&mut out, value, 0);
        out
    }

    fn render_into(&self, out: &mut String, value: Value, depth: usize) {
        match value {
            Value::Undefined => out.push_str("(undefined)"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Number(n) => {
                let _ = write!(out, "{n}");
            }
            Value::Object(None) => out.push_str("(null)"),
            Value::Object(Some(id)) => self.render_object(out, id, depth),
        }
    }

    fn render_object(&self, out: &mut String, id: HeapId, depth: usize) {
        if depth >= MAX_RENDER_DEPTH {
            out.push_str("...");
            return;
        }
        let object = self.heap.get(id);
        match &object.data {
            HeapData::Str(content) => {
                let _ = write!(out, "\"{content}\"");
            }
            HeapData::Function(function) => {
                out.push_str("(func (");
                let mut first = true;
                for &param in &function.params {
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    out.push_str(self.heap.get(param).as_str().unwrap_or(""));
                }
                if function.variadic {
                    if !first {
                        out.push_str(", ");
                    }
                    out.push_str("...");
                }
                out.push_str(") ");
                // Tag with the function's prototype-object name when it has
                // one (named functions, constructors); body placeholder
                // otherwise.
                let proto_name = object
                    .props
                    .get(&self.interner.prototype)
                    .and_then(|value| value.heap_id())
                    .and_then(|proto| self.object_name(proto));
                match proto_name {
                    Some(name) => {
                        let _ = write!(out, "<{name}>");
                    }
                    None => out.push_str("(..)"),
                }
                out.push(')');
            }
            HeapData::Array(items) => {
                if items.is_empty() {
                    out.push_str("[ ]");
                    return;
                }
                out.push('[');
                for (position, &item) in items.iter().enumerate() {
                    if position > 0 {
                        out.push(',');
                    }
                    out.push('\n');
                    push_indent(out, depth + 1);
                    self.render_into(out, item, depth + 1);
                }
                out.push('\n');
                push_indent(out, depth);
                out.push(']');
            }
            HeapData::Plain => {
                if let Some(proto_name) = object.proto.and_then(|proto| self.object_name(proto)) {
                    let _ = write!(out, "<{proto_name}> ");
                }
                if object.props.is_empty() {
                    out.push_str("{ }");
                    return;
                }
                out.push('{');
                for (position, (&key, &value)) in object.props.iter().enumerate() {
                    if position > 0 {
                        out.push(',');
                    }
                    out.push('\n');
                    push_indent(out, depth + 1);
                    out.push_str(self.heap.get(key).as_str().unwrap_or(""));
                    out.push_str(": ");
                    self.render_into(out, value, depth + 1);
                }
                out.push('\n');
                push_indent(out, depth);
                out.push('}');
            }
        }
    }

    /// Renders the `[atom] x` / parenthesized tree dump the REPL emits when
    /// `replConfig.dumpExpr` is enabled. Every line is newline-terminated.
    #[must_use]
    pub fn render_expr(&self, expr: &Expr) -> String {
        let mut out = String::new();
        self.render_expr_into(&mut out, expr, 0);
        out
    }

    fn render_expr_into(&self, out: &mut String, expr: &Expr, depth: usize) {
        push_indent(out, depth);
        match expr {
            Expr::Atom(id) => {
                let _ = writeln!(out, "[atom] {}", self.heap.get(*id).as_str().unwrap_or(""));
            }
            Expr::Str(id) => {
                let _ = writeln!(out, "[string] {}", self.heap.get(*id).as_str().unwrap_or(""));
            }
            Expr::Number(n) => {
                let _ = writeln!(out, "[number] {n}");
            }
            Expr::List(items) => {
                if items.is_empty() {
                    out.push_str("( )\n");
                } else {
                    out.push_str("(\n");
                    for item in items {
                        self.render_expr_into(out, item, depth + 1);
                    }
                    push_indent(out, depth);
                    out.push_str(")\n");
                }
            }
        }
    }

    /// An object's display name: the interned string in its name slot, when
    /// set and non-empty.
    fn object_name(&self, id: HeapId) -> Option<&str> {
        let name_id = self.heap.get(id).name?;
        let name = self.heap.get(name_id).as_str()?;
        if name.is_empty() { None } else { Some(name) }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}
