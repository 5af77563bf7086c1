use ahash::AHashMap;

use crate::{heap::HeapId, value::Value};

/// One block-scope map: interned name to value. Unordered; locals have no
/// observable iteration order.
pub(crate) type BlockMap = AHashMap<HeapId, Value>;

/// A call frame: the call's arguments array, its receiver, and a stack of
/// block-scope maps.
///
/// Parameters live in the outermost block. Blocks obey strict LIFO and never
/// outlive their frame; lookup walks innermost-first. No current special
/// form introduces an inner block, but the lookup order is fixed here so a
/// block construct can be added without touching callers.
pub(crate) struct Frame {
    pub arguments: HeapId,
    pub this: Value,
    blocks: Vec<BlockMap>,
}

impl Frame {
    pub fn new(arguments: HeapId, this: Value, locals: BlockMap) -> Self {
        Self {
            arguments,
            this,
            blocks: vec![locals],
        }
    }

    /// Innermost-first lookup across this frame's blocks.
    pub fn lookup(&self, name: HeapId) -> Option<Value> {
        self.blocks.iter().rev().find_map(|block| block.get(&name).copied())
    }

    /// Overwrites the innermost existing binding. Returns false when the
    /// name is not bound anywhere in this frame.
    pub fn assign_existing(&mut self, name: HeapId, value: Value) -> bool {
        for block in self.blocks.iter_mut().rev() {
            if let Some(slot) = block.get_mut(&name) {
                *slot = value;
                return true;
            }
        }
        false
    }

    /// Creates a binding in the outermost block (function-level local).
    pub fn declare(&mut self, name: HeapId, value: Value) {
        self.blocks[0].insert(name, value);
    }

    /// All blocks, for collection root gathering.
    pub fn blocks(&self) -> &[BlockMap] {
        &self.blocks
    }
}
