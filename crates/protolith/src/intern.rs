use std::rc::Rc;

use ahash::AHashMap;

use crate::heap::{Heap, HeapData, HeapId, HeapObject};

/// Content-addressed string intern table.
///
/// Every string in the system is interned, so property keys (and string
/// values generally) compare by heap identity. The table maps content to the
/// string's heap object and is value-weak: after a collection, entries whose
/// string died are dropped, and re-interning the same content later yields a
/// fresh object.
///
/// A handful of ids are cached for the lifetime of the interpreter and act
/// as collection roots: the empty-string sentinel (created before any other
/// string), `"prototype"` (constructor wiring), and `"replConfig"` /
/// `"dumpExpr"` (REPL configuration lookup).
pub(crate) struct Interner {
    map: AHashMap<Rc<str>, HeapId>,
    string_proto: HeapId,
    pub empty: HeapId,
    pub prototype: HeapId,
    pub repl_config: HeapId,
    pub dump_expr: HeapId,
}

impl Interner {
    /// Creates the interner and the permanently cached strings.
    ///
    /// The empty string is allocated first, before any other string exists.
    pub fn new(heap: &mut Heap, string_proto: HeapId) -> Self {
        let empty = allocate_string(heap, Rc::from(""), string_proto);
        let mut interner = Self {
            map: AHashMap::new(),
            string_proto,
            empty,
            prototype: empty,
            repl_config: empty,
            dump_expr: empty,
        };
        interner.prototype = interner.intern(heap, "prototype");
        interner.repl_config = interner.intern(heap, "replConfig");
        interner.dump_expr = interner.intern(heap, "dumpExpr");
        interner
    }

    /// Returns the heap id of the interned string with this content,
    /// allocating it on first sight.
    pub fn intern(&mut self, heap: &mut Heap, content: &str) -> HeapId {
        if content.is_empty() {
            return self.empty;
        }
        if let Some(&id) = self.map.get(content) {
            return id;
        }
        let shared: Rc<str> = Rc::from(content);
        let id = allocate_string(heap, Rc::clone(&shared), self.string_proto);
        self.map.insert(shared, id);
        id
    }

    /// Looks up already-interned content without allocating.
    pub fn lookup(&self, content: &str) -> Option<HeapId> {
        if content.is_empty() {
            return Some(self.empty);
        }
        self.map.get(content).copied()
    }

    /// Drops entries whose string was not marked in the current collection.
    pub fn sweep(&mut self, marks: &[bool]) {
        self.map.retain(|_, id| marks[id.index()]);
    }

    /// The permanently cached ids, rooted on every collection.
    pub fn roots(&self) -> [HeapId; 4] {
        [self.empty, self.prototype, self.repl_config, self.dump_expr]
    }

    /// Number of tracked (non-permanent) interned strings.
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

fn allocate_string(heap: &mut Heap, content: Rc<str>, string_proto: HeapId) -> HeapId {
    heap.allocate(HeapObject::new(HeapData::Str(content), Some(string_proto)))
}
