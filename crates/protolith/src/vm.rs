use std::rc::Rc;

use ahash::AHashMap;
use smallvec::SmallVec;
use strum::IntoEnumIterator;

use crate::{
    builtins::NativeFunction,
    error::{Error, ErrorKind, RunResult},
    expressions::Expr,
    frames::{BlockMap, Frame},
    function::{Function, FunctionKind},
    heap::{Heap, HeapData, HeapId, HeapObject, HeapStats},
    intern::Interner,
    io::{Console, StdConsole},
    keyword::{AtomKeyword, ListKeyword},
    value::Value,
};

/// The four root prototype objects.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Prototypes {
    pub object: HeapId,
    pub function: HeapId,
    pub string: HeapId,
    pub array: HeapId,
}

/// The four named constructor functions installed on the global object.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Constructors {
    pub object: HeapId,
    pub function: HeapId,
    pub string: HeapId,
    pub array: HeapId,
}

/// Keyword identity tables.
///
/// All strings are interned, so a reserved word read anywhere in a session
/// resolves to one id; the evaluator dispatches special forms by id lookup
/// instead of re-comparing text. The table keys are collection roots, which
/// pins keyword identity for the life of the interpreter.
pub(crate) struct Keywords {
    pub atom: AHashMap<HeapId, AtomKeyword>,
    pub list: AHashMap<HeapId, ListKeyword>,
}

impl Keywords {
    pub fn contains(&self, id: HeapId) -> bool {
        self.atom.contains_key(&id) || self.list.contains_key(&id)
    }
}

/// One interpreter: the whole mutable VM state behind a single value.
///
/// Owning everything here (heap, intern table, global environment, frame
/// stack, console handle) means independent interpreters can coexist in one
/// process; nothing is process-global. The evaluator is single-threaded and
/// non-reentrant with respect to one `Vm`.
pub struct Vm {
    pub(crate) heap: Heap,
    pub(crate) interner: Interner,
    pub(crate) console: Box<dyn Console>,
    pub(crate) keywords: Keywords,
    pub(crate) protos: Prototypes,
    pub(crate) ctors: Constructors,
    /// The root plain object; top-level bindings live in its property table.
    pub(crate) global: HeapId,
    /// Current receiver. Updated on function entry, restored on exit.
    pub(crate) this: Value,
    /// Most recently completed sub-expression of the nearest enclosing
    /// `do`/`while`; undefined outside of one.
    pub(crate) prev: Value,
    pub(crate) frames: Vec<Frame>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Creates an interpreter bound to the process console.
    #[must_use]
    pub fn new() -> Self {
        Self::with_console(Box::new(StdConsole))
    }

    /// Creates an interpreter with a custom console (tests, embedding).
    #[must_use]
    pub fn with_console(console: Box<dyn Console>) -> Self {
        let mut heap = Heap::new();

        // Prototype objects. The Object prototype terminates every chain.
        let object_proto = heap.allocate(HeapObject::new(HeapData::Plain, None));
        let function_proto = heap.allocate(HeapObject::new(HeapData::Plain, Some(object_proto)));
        let string_proto = heap.allocate(HeapObject::new(HeapData::Plain, Some(object_proto)));
        let array_proto = heap.allocate(HeapObject::new(HeapData::Plain, Some(object_proto)));
        let protos = Prototypes {
            object: object_proto,
            function: function_proto,
            string: string_proto,
            array: array_proto,
        };

        // The interner creates the empty-string sentinel before any other
        // string, then the permanently cached names.
        let mut interner = Interner::new(&mut heap, string_proto);

        let mut atom_keywords = AHashMap::new();
        for keyword in AtomKeyword::iter() {
            let spelling: &'static str = keyword.into();
            atom_keywords.insert(interner.intern(&mut heap, spelling), keyword);
        }
        let mut list_keywords = AHashMap::new();
        for keyword in ListKeyword::iter() {
            let spelling: &'static str = keyword.into();
            list_keywords.insert(interner.intern(&mut heap, spelling), keyword);
        }
        let keywords = Keywords {
            atom: atom_keywords,
            list: list_keywords,
        };

        // Name the prototypes.
        let name_object = interner.intern(&mut heap, "Object");
        let name_function = interner.intern(&mut heap, "Function");
        let name_string = interner.intern(&mut heap, "String");
        let name_array = interner.intern(&mut heap, "Array");
        heap.get_mut(object_proto).name = Some(name_object);
        heap.get_mut(function_proto).name = Some(name_function);
        heap.get_mut(string_proto).name = Some(name_string);
        heap.get_mut(array_proto).name = Some(name_array);

        // Constructor functions share one empty body that evaluates to
        // undefined, so `new Object` yields a fresh object linked to the
        // named prototype and nothing else.
        let empty_body: Rc<Expr> = Rc::new(Expr::List(Vec::new()));
        let ctors = Constructors {
            object: create_constructor(&mut heap, &interner, function_proto, object_proto, name_object, &empty_body),
            function: create_constructor(
                &mut heap,
                &interner,
                function_proto,
                function_proto,
                name_function,
                &empty_body,
            ),
            string: create_constructor(&mut heap, &interner, function_proto, string_proto, name_string, &empty_body),
            array: create_constructor(&mut heap, &interner, function_proto, array_proto, name_array, &empty_body),
        };

        // Array prototype methods.
        for (name, native, params) in [
            ("size", NativeFunction::ArraySize, &[][..]),
            ("get", NativeFunction::ArrayGet, &["index"][..]),
            ("set", NativeFunction::ArraySet, &["index", "val"][..]),
        ] {
            let method = create_native(&mut heap, &mut interner, function_proto, name, native, params, false);
            let key = interner.intern(&mut heap, name);
            heap.get_mut(array_proto).props.insert(key, Value::Object(Some(method)));
        }

        // The global object and its built-ins.
        let global = heap.allocate(HeapObject::new(HeapData::Plain, Some(object_proto)));
        for (name, ctor) in [
            (name_object, ctors.object),
            (name_function, ctors.function),
            (name_string, ctors.string),
            (name_array, ctors.array),
        ] {
            heap.get_mut(global).props.insert(name, Value::Object(Some(ctor)));
        }

        let console_obj = heap.allocate(HeapObject::new(HeapData::Plain, Some(object_proto)));
        for (name, native, variadic) in [
            ("dump", NativeFunction::ConsoleDump, true),
            ("readLine", NativeFunction::ConsoleReadLine, false),
        ] {
            let method = create_native(&mut heap, &mut interner, function_proto, name, native, &[], variadic);
            let key = interner.intern(&mut heap, name);
            heap.get_mut(console_obj).props.insert(key, Value::Object(Some(method)));
        }
        let console_key = interner.intern(&mut heap, "console");
        heap.get_mut(global).props.insert(console_key, Value::Object(Some(console_obj)));

        let parse_float = create_native(
            &mut heap,
            &mut interner,
            function_proto,
            "parseFloat",
            NativeFunction::ParseFloat,
            &["str"],
            false,
        );
        let parse_float_key = interner.intern(&mut heap, "parseFloat");
        heap.get_mut(global)
            .props
            .insert(parse_float_key, Value::Object(Some(parse_float)));

        // replConfig: { dumpExpr: false }
        let repl_config = heap.allocate(HeapObject::new(HeapData::Plain, Some(object_proto)));
        let dump_expr_key = interner.dump_expr;
        heap.get_mut(repl_config).props.insert(dump_expr_key, Value::Bool(false));
        let repl_config_key = interner.repl_config;
        heap.get_mut(global)
            .props
            .insert(repl_config_key, Value::Object(Some(repl_config)));

        Self {
            heap,
            interner,
            console,
            keywords,
            protos,
            ctors,
            global,
            this: Value::Object(Some(global)),
            prev: Value::Undefined,
            frames: Vec::new(),
        }
    }

    pub(crate) fn intern(&mut self, text: &str) -> HeapId {
        self.interner.intern(&mut self.heap, text)
    }

    /// Walks the prototype chain of `object` for a property named `name`.
    pub(crate) fn find_member(&self, object: HeapId, name: HeapId) -> Option<Value> {
        let mut current = Some(object);
        while let Some(id) = current {
            let entry = self.heap.get(id);
            if let Some(&value) = entry.props.get(&name) {
                return Some(value);
            }
            current = entry.proto;
        }
        None
    }

    /// Locals lookup: innermost frame block outward, then the global
    /// object's member lookup (its prototype chain included).
    pub(crate) fn find_local(&self, name: HeapId) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.lookup(name) {
                return Some(value);
            }
        }
        self.find_member(self.global, name)
    }

    /// Binds a local: overwrites the innermost existing binding, otherwise
    /// creates one in the current frame's outermost block (or on the global
    /// object at top level).
    ///
    /// A hit on the global object's prototype chain does not count as an
    /// existing binding; writes never escape the global object itself.
    pub(crate) fn set_local(&mut self, name: HeapId, value: Value) {
        for frame in self.frames.iter_mut().rev() {
            if frame.assign_existing(name, value) {
                return;
            }
        }
        if self.heap.get(self.global).props.contains_key(&name) {
            self.heap.get_mut(self.global).props.insert(name, value);
            return;
        }
        match self.frames.last_mut() {
            Some(frame) => frame.declare(name, value),
            None => {
                self.heap.get_mut(self.global).props.insert(name, value);
            }
        }
    }

    /// Allocates a plain object linked to the Object prototype.
    pub(crate) fn allocate_object(&mut self) -> HeapId {
        self.heap
            .allocate(HeapObject::new(HeapData::Plain, Some(self.protos.object)))
    }

    /// Allocates an array linked to the Array prototype.
    pub(crate) fn allocate_array(&mut self, items: Vec<Value>) -> HeapId {
        self.heap
            .allocate(HeapObject::new(HeapData::Array(items), Some(self.protos.array)))
    }

    /// Allocates a function linked to the Function prototype.
    pub(crate) fn create_function(&mut self, params: SmallVec<[HeapId; 4]>, variadic: bool, body: Rc<Expr>) -> HeapId {
        let function = Function {
            params,
            variadic,
            kind: FunctionKind::Script(body),
        };
        self.heap
            .allocate(HeapObject::new(HeapData::Function(function), Some(self.protos.function)))
    }

    /// Invokes a function: the shared protocol behind member calls, generic
    /// calls, `new`, and natives.
    ///
    /// A fixed-arity function rejects extra arguments; missing trailing
    /// arguments bind to undefined. The frame is pushed before and popped
    /// after the body on every exit path, and `this` is restored to the
    /// innermost remaining frame's receiver (the global object once the
    /// stack empties), so an error unwinding through nested calls leaves the
    /// environment exactly as it was.
    pub(crate) fn call_function(&mut self, function_id: HeapId, new_this: Value, arguments_id: HeapId) -> RunResult<Value> {
        let function = match &self.heap.get(function_id).data {
            HeapData::Function(function) => function.clone(),
            _ => return Err(Error::new(ErrorKind::NotFunction)),
        };
        let args: Vec<Value> = match &self.heap.get(arguments_id).data {
            HeapData::Array(items) => items.clone(),
            _ => return Err(Error::new(ErrorKind::NotArray)),
        };

        if !function.variadic && args.len() > function.params.len() {
            return Err(Error::with_detail(
                ErrorKind::InvalidArg,
                format!(
                    "expected at most {} argument(s), got {}",
                    function.params.len(),
                    args.len()
                ),
            ));
        }

        let mut locals = BlockMap::with_capacity(function.params.len());
        for (position, &param) in function.params.iter().enumerate() {
            locals.insert(param, args.get(position).copied().unwrap_or(Value::Undefined));
        }

        self.frames.push(Frame::new(arguments_id, new_this, locals));
        self.this = new_this;

        let result = match &function.kind {
            FunctionKind::Script(body) => self.eval(body),
            FunctionKind::Native(native) => native.call(self, new_this, &args),
        };

        self.frames.pop();
        self.this = match self.frames.last() {
            Some(frame) => frame.this,
            None => Value::Object(Some(self.global)),
        };

        result
    }

    /// True when `replConfig.dumpExpr` is the boolean `true`.
    pub(crate) fn dump_expr_enabled(&self) -> bool {
        let config = self.heap.get(self.global).props.get(&self.interner.repl_config).copied();
        let Some(Value::Object(Some(config_id))) = config else {
            return false;
        };
        matches!(
            self.heap.get(config_id).props.get(&self.interner.dump_expr),
            Some(Value::Bool(true))
        )
    }

    /// Reads a top-level binding through the global object's member lookup.
    ///
    /// Returns `None` when the name was never interned or is unbound.
    #[must_use]
    pub fn global_get(&self, name: &str) -> Option<Value> {
        let id = self.interner.lookup(name)?;
        self.find_member(self.global, id)
    }

    /// The text of a string value, if the value is a string.
    #[must_use]
    pub fn string_content(&self, value: Value) -> Option<&str> {
        self.heap.get(value.heap_id()?).as_str()
    }

    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.heap.live_objects(),
            free_slots: self.heap.free_slots(),
            total_slots: self.heap.slot_count(),
            interned_strings: self.interner.len(),
        }
    }

    /// Runs a mark-and-sweep collection and returns how many objects were
    /// reclaimed.
    ///
    /// Roots: the global object, the four prototypes and constructors, the
    /// interner's cached names, the keyword identity tables, the `this` and
    /// `prev` cells, and everything on the frame stack. The REPL collects
    /// between lines; nothing collects mid-evaluation, so expression trees
    /// being evaluated never need rooting.
    pub fn collect_garbage(&mut self) -> usize {
        let mut marks = vec![false; self.heap.slot_count()];
        let mut stack: Vec<HeapId> = Vec::with_capacity(64);

        stack.push(self.global);
        stack.extend([
            self.protos.object,
            self.protos.function,
            self.protos.string,
            self.protos.array,
            self.ctors.object,
            self.ctors.function,
            self.ctors.string,
            self.ctors.array,
        ]);
        stack.extend(self.interner.roots());
        stack.extend(self.keywords.atom.keys().copied());
        stack.extend(self.keywords.list.keys().copied());
        if let Some(id) = self.this.heap_id() {
            stack.push(id);
        }
        if let Some(id) = self.prev.heap_id() {
            stack.push(id);
        }
        for frame in &self.frames {
            stack.push(frame.arguments);
            if let Some(id) = frame.this.heap_id() {
                stack.push(id);
            }
            for block in frame.blocks() {
                for (&name, value) in block {
                    stack.push(name);
                    if let Some(id) = value.heap_id() {
                        stack.push(id);
                    }
                }
            }
        }

        self.heap.mark(&mut stack, &mut marks);
        self.interner.sweep(&marks);
        self.heap.sweep(&marks)
    }
}

/// Builds one of the four named constructors: an empty-bodied function whose
/// `prototype` property points at the matching prototype object.
fn create_constructor(
    heap: &mut Heap,
    interner: &Interner,
    function_proto: HeapId,
    target_proto: HeapId,
    name: HeapId,
    empty_body: &Rc<Expr>,
) -> HeapId {
    let function = Function {
        params: SmallVec::new(),
        variadic: false,
        kind: FunctionKind::Script(Rc::clone(empty_body)),
    };
    let id = heap.allocate(HeapObject::new(HeapData::Function(function), Some(function_proto)));
    let object = heap.get_mut(id);
    object.name = Some(name);
    object.props.insert(interner.prototype, Value::Object(Some(target_proto)));
    id
}

/// Builds a native function object with the given parameter names.
fn create_native(
    heap: &mut Heap,
    interner: &mut Interner,
    function_proto: HeapId,
    name: &str,
    native: NativeFunction,
    param_names: &[&str],
    variadic: bool,
) -> HeapId {
    let params = param_names.iter().map(|param| interner.intern(heap, param)).collect();
    let function = Function {
        params,
        variadic,
        kind: FunctionKind::Native(native),
    };
    let name_id = interner.intern(heap, name);
    let id = heap.allocate(HeapObject::new(HeapData::Function(function), Some(function_proto)));
    heap.get_mut(id).name = Some(name_id);
    id
}
