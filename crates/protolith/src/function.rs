use std::rc::Rc;

use smallvec::SmallVec;

use crate::{builtins::NativeFunction, expressions::Expr, heap::HeapId};

/// The callable payload of a function object.
///
/// Script functions keep shared ownership of their body subtree, so the
/// parsed tree a function came from outlives the REPL line that produced it.
/// Native functions dispatch through the [`NativeFunction`] enum.
#[derive(Debug, Clone)]
pub(crate) enum FunctionKind {
    Script(Rc<Expr>),
    Native(NativeFunction),
}

/// A function object's payload: parameter names, variadic flag, and body.
///
/// Parameter names are interned string ids in declaration order. A variadic
/// function accepts any argument count; a fixed-arity one rejects extras at
/// call time (missing trailing arguments bind to undefined either way).
#[derive(Debug, Clone)]
pub(crate) struct Function {
    pub params: SmallVec<[HeapId; 4]>,
    pub variadic: bool,
    pub kind: FunctionKind,
}
