use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    function::{Function, FunctionKind},
    value::Value,
};

/// Property table: interned-string key to value, iterating in insertion
/// order (the pretty-printer depends on the order; the evaluator does not).
pub(crate) type PropertyMap = IndexMap<HeapId, Value, ahash::RandomState>;

/// Index into the heap arena.
///
/// `u32` keeps `Value` small; four billion live objects is far beyond what a
/// single interpreter session can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(u32);

impl HeapId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("heap index exceeds u32"))
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Variant payload of a heap object.
#[derive(Debug)]
pub(crate) enum HeapData {
    /// A plain object: nothing beyond the shared header.
    Plain,
    /// An immutable string. All strings are interned, so the content is also
    /// the identity used for property keys.
    Str(Rc<str>),
    Function(Function),
    /// A dense, ordered sequence of values.
    Array(Vec<Value>),
}

/// A heap object: variant payload plus the shared object header.
///
/// Every object carries a prototype link (`None` terminates the chain), an
/// optional interned display name, and a property table. Prototype chains
/// are acyclic by construction: links are only assigned at bootstrap and by
/// `new`, always pointing at pre-existing objects.
#[derive(Debug)]
pub(crate) struct HeapObject {
    pub data: HeapData,
    pub proto: Option<HeapId>,
    pub name: Option<HeapId>,
    pub props: PropertyMap,
}

impl HeapObject {
    pub fn new(data: HeapData, proto: Option<HeapId>) -> Self {
        Self {
            data,
            proto,
            name: None,
            props: PropertyMap::default(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            HeapData::Str(content) => Some(content),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.data, HeapData::Function(_))
    }
}

/// Snapshot of heap and interner occupancy.
///
/// Used by tests and host inspection; collection correctness never depends
/// on these numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Live objects currently in the arena.
    pub live_objects: usize,
    /// Freed slots awaiting reuse.
    pub free_slots: usize,
    /// Total arena capacity (live + free).
    pub total_slots: usize,
    /// Strings currently tracked by the intern table (cached permanent
    /// strings excluded).
    pub interned_strings: usize,
}

/// Slot arena backing all runtime objects.
///
/// Freed slots go on a free list and are reused by later allocations, so
/// long-running sessions that allocate and collect repeatedly keep a stable
/// footprint. Reclamation is mark-and-sweep: the interpreter marks from its
/// roots and then calls [`Heap::sweep`].
pub(crate) struct Heap {
    entries: Vec<Option<HeapObject>>,
    free_list: Vec<HeapId>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub fn allocate(&mut self, object: HeapObject) -> HeapId {
        if let Some(id) = self.free_list.pop() {
            self.entries[id.index()] = Some(object);
            id
        } else {
            let id = HeapId::new(self.entries.len());
            self.entries.push(Some(object));
            id
        }
    }

    /// # Panics
    /// Panics on a dangling id; live values never hold one between
    /// collections, so this is an internal-invariant check.
    pub fn get(&self, id: HeapId) -> &HeapObject {
        self.entries[id.index()].as_ref().expect("dangling heap id")
    }

    /// # Panics
    /// Panics on a dangling id, as [`Heap::get`] does.
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapObject {
        self.entries[id.index()].as_mut().expect("dangling heap id")
    }

    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    pub fn free_slots(&self) -> usize {
        self.free_list.len()
    }

    pub fn live_objects(&self) -> usize {
        self.entries.len() - self.free_list.len()
    }

    /// Marks every object reachable from the ids already on `stack`.
    ///
    /// Traverses prototype links, names, property keys and values, array
    /// elements, function parameter names, and the interned ids inside
    /// retained script bodies.
    pub fn mark(&self, stack: &mut Vec<HeapId>, marks: &mut [bool]) {
        while let Some(id) = stack.pop() {
            let index = id.index();
            if marks[index] {
                continue;
            }
            marks[index] = true;

            let object = self.get(id);
            if let Some(proto) = object.proto {
                stack.push(proto);
            }
            if let Some(name) = object.name {
                stack.push(name);
            }
            for (&key, value) in &object.props {
                stack.push(key);
                if let Some(referenced) = value.heap_id() {
                    stack.push(referenced);
                }
            }
            match &object.data {
                HeapData::Plain | HeapData::Str(_) => {}
                HeapData::Array(items) => {
                    for item in items {
                        if let Some(referenced) = item.heap_id() {
                            stack.push(referenced);
                        }
                    }
                }
                HeapData::Function(function) => {
                    stack.extend(function.params.iter().copied());
                    if let FunctionKind::Script(body) = &function.kind {
                        body.for_each_interned(&mut |interned| stack.push(interned));
                    }
                }
            }
        }
    }

    /// Frees every unmarked slot and returns how many objects were reclaimed.
    pub fn sweep(&mut self, marks: &[bool]) -> usize {
        let mut freed = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.is_some() && !marks[index] {
                *entry = None;
                self.free_list.push(HeapId::new(index));
                freed += 1;
            }
        }
        freed
    }
}
