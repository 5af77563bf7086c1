use crate::{
    error::{Error, ErrorKind, RunResult},
    heap::{HeapData, HeapId},
    value::Value,
    vm::Vm,
};

/// The native built-in callables.
///
/// An enum rather than function pointers so dispatch stays data-free and the
/// whole native surface is visible in one place. Each variant is wrapped in
/// an ordinary function object at bootstrap, so native calls go through the
/// same frame protocol as script calls.
///
/// Natives validate their own argument lists and surface violations as
/// invalid-arg, translating internal not-integer/not-number failures so the
/// user-visible taxonomy stays uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NativeFunction {
    /// `Array.prototype.size()` — element count.
    ArraySize,
    /// `Array.prototype.get(index)` — range-checked element read.
    ArrayGet,
    /// `Array.prototype.set(index, val)` — range-checked element write.
    ArraySet,
    /// `console.dump(items…)` — pretty-print each item on its own line.
    ConsoleDump,
    /// `console.readLine()` — read one line from the console.
    ConsoleReadLine,
    /// `parseFloat(str)` — full-string float parse.
    ParseFloat,
}

impl NativeFunction {
    pub fn call(self, vm: &mut Vm, this: Value, args: &[Value]) -> RunResult<Value> {
        match self {
            Self::ArraySize => {
                expect_arity(args, 0, "size() takes no arguments")?;
                let items = array_receiver(vm, this)?;
                Ok(Value::Number(items.len() as f64))
            }
            Self::ArrayGet => {
                expect_arity(args, 1, "get() takes exactly one argument")?;
                let index = array_index(args[0])?;
                let items = array_receiver(vm, this)?;
                match items.get(index) {
                    Some(&item) => Ok(item),
                    None => Err(Error::new(ErrorKind::OutOfRange)),
                }
            }
            Self::ArraySet => {
                expect_arity(args, 2, "set() takes exactly two arguments")?;
                let index = array_index(args[0])?;
                let value = args[1];
                let id = array_receiver_id(vm, this)?;
                let HeapData::Array(items) = &mut vm.heap.get_mut(id).data else {
                    unreachable!("receiver re-checked above");
                };
                match items.get_mut(index) {
                    Some(slot) => {
                        *slot = value;
                        Ok(value)
                    }
                    None => Err(Error::new(ErrorKind::OutOfRange)),
                }
            }
            Self::ConsoleDump => {
                for &item in args {
                    let line = vm.render_value(item);
                    vm.console.write_line(&line);
                }
                Ok(Value::Undefined)
            }
            Self::ConsoleReadLine => {
                expect_arity(args, 0, "readLine() takes no arguments")?;
                let line = vm.console.read_line().unwrap_or_default();
                let id = vm.intern(&line);
                Ok(Value::Object(Some(id)))
            }
            Self::ParseFloat => {
                expect_arity(args, 1, "parseFloat() takes exactly one argument")?;
                let Some(content) = args[0].heap_id().map(|id| vm.heap.get(id)).and_then(|object| object.as_str())
                else {
                    return Err(Error::with_detail(ErrorKind::InvalidArg, "parseFloat() expects a string"));
                };
                let number: f64 = content
                    .parse()
                    .map_err(|_| Error::with_detail(ErrorKind::InvalidArg, "parseFloat() could not parse the string"))?;
                Ok(Value::Number(number))
            }
        }
    }
}

fn expect_arity(args: &[Value], arity: usize, detail: &'static str) -> RunResult<()> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(Error::with_detail(ErrorKind::InvalidArg, detail))
    }
}

/// Integer-coerces an index argument, re-raising coercion failures as
/// invalid-arg, and rejects negatives up front as out-of-range.
fn array_index(value: Value) -> RunResult<usize> {
    let index = value
        .as_integer()
        .map_err(|_| Error::with_detail(ErrorKind::InvalidArg, "array index must be an integer"))?;
    usize::try_from(index).map_err(|_| Error::new(ErrorKind::OutOfRange))
}

fn array_receiver_id(vm: &Vm, this: Value) -> RunResult<HeapId> {
    match this.heap_id() {
        Some(id) if matches!(&vm.heap.get(id).data, HeapData::Array(_)) => Ok(id),
        _ => Err(Error::new(ErrorKind::NotArray)),
    }
}

fn array_receiver(vm: &Vm, this: Value) -> RunResult<&Vec<Value>> {
    let id = array_receiver_id(vm, this)?;
    match &vm.heap.get(id).data {
        HeapData::Array(items) => Ok(items),
        _ => unreachable!("receiver checked by array_receiver_id"),
    }
}
