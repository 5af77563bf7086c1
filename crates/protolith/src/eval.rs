//! The tree-walking evaluator: atom keywords, special forms, and calls.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    error::{Error, ErrorKind, RunResult},
    expressions::Expr,
    heap::HeapId,
    keyword::{AtomKeyword, ListKeyword},
    value::Value,
    vm::Vm,
};

impl Vm {
    /// Evaluates one expression against the current environment.
    ///
    /// Literals evaluate to themselves; atoms are keywords or local reads (a
    /// missing local reads as undefined, not an error); lists are special
    /// forms or calls. Every failure unwinds here as an [`Error`]; frames
    /// are restored by [`Vm::call_function`] on the way out.
    pub fn eval(&mut self, expr: &Expr) -> RunResult<Value> {
        match expr {
            Expr::Str(id) => Ok(Value::Object(Some(*id))),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Atom(id) => self.eval_atom(*id),
            Expr::List(items) => self.eval_list(items),
        }
    }

    fn eval_atom(&mut self, id: HeapId) -> RunResult<Value> {
        if let Some(&keyword) = self.keywords.atom.get(&id) {
            return match keyword {
                AtomKeyword::Global => Ok(Value::Object(Some(self.global))),
                AtomKeyword::This => Ok(self.this),
                AtomKeyword::Undefined => Ok(Value::Undefined),
                AtomKeyword::Null => Ok(Value::Object(None)),
                AtomKeyword::True => Ok(Value::Bool(true)),
                AtomKeyword::False => Ok(Value::Bool(false)),
                AtomKeyword::Prev => Ok(self.prev),
                AtomKeyword::Arguments => Ok(self
                    .frames
                    .last()
                    .map_or(Value::Undefined, |frame| Value::Object(Some(frame.arguments)))),
                AtomKeyword::Rest => Err(Error::with_detail(
                    ErrorKind::InvalidKeywordAtom,
                    "`...` is only valid inside a parameter list",
                )),
            };
        }
        Ok(self.find_local(id).unwrap_or(Value::Undefined))
    }

    fn eval_list(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let Some(head) = items.first() else {
            return Ok(Value::Undefined);
        };
        if let Expr::Atom(id) = &**head {
            if let Some(&keyword) = self.keywords.list.get(id) {
                return self.eval_keyword(keyword, items);
            }
        }
        self.eval_call(items)
    }

    fn eval_keyword(&mut self, keyword: ListKeyword, items: &[Rc<Expr>]) -> RunResult<Value> {
        match keyword {
            ListKeyword::Func => self.eval_func(items),
            ListKeyword::New => self.eval_new(items),
            ListKeyword::Array => {
                let values = self.eval_args(&items[1..])?;
                Ok(Value::Object(Some(self.allocate_array(values))))
            }
            ListKeyword::Getf => self.eval_getf(items),
            ListKeyword::Setf => self.eval_setf(items),
            ListKeyword::Getl => self.eval_getl(items),
            ListKeyword::Setl => self.eval_setl(items),
            ListKeyword::Geti => self.eval_geti(items),
            ListKeyword::Seti => self.eval_seti(items),
            ListKeyword::Do => self.eval_do(items),
            ListKeyword::If => self.eval_if(items),
            ListKeyword::While => self.eval_while(items),
            ListKeyword::Add
            | ListKeyword::Sub
            | ListKeyword::Mul
            | ListKeyword::Div
            | ListKeyword::Rem
            | ListKeyword::Idiv
            | ListKeyword::Imod
            | ListKeyword::BitAnd
            | ListKeyword::BitOr
            | ListKeyword::BitXor => self.eval_arith(keyword, items),
            ListKeyword::And | ListKeyword::Or => self.eval_logic(keyword, items),
            ListKeyword::Not => {
                let [_, operand] = items else {
                    return Err(arity_error("not takes exactly one operand"));
                };
                let truthy = self.eval(operand)?.truthiness()?;
                Ok(Value::Bool(!truthy))
            }
            ListKeyword::Eq | ListKeyword::Ne => {
                let [_, left, right] = items else {
                    return Err(arity_error("comparison takes exactly two operands"));
                };
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                let equal = left == right;
                Ok(Value::Bool(if keyword == ListKeyword::Eq { equal } else { !equal }))
            }
            ListKeyword::Lt | ListKeyword::Le | ListKeyword::Gt | ListKeyword::Ge => {
                let [_, left, right] = items else {
                    return Err(arity_error("comparison takes exactly two operands"));
                };
                let left = self.eval(left)?.as_number()?;
                let right = self.eval(right)?.as_number()?;
                let outcome = match keyword {
                    ListKeyword::Lt => left < right,
                    ListKeyword::Le => left <= right,
                    ListKeyword::Gt => left > right,
                    _ => left >= right,
                };
                Ok(Value::Bool(outcome))
            }
        }
    }

    /// Call semantics for a non-special-form list.
    ///
    /// First the member path: when the head evaluates to a non-null object,
    /// the second item is syntactically an atom, and the receiver's
    /// prototype chain holds a function under that name, the call binds
    /// `this` to the receiver. Otherwise the second item is evaluated and
    /// must itself be a function (generic call, head still becomes `this`).
    fn eval_call(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        if items.len() < 2 {
            return Err(Error::new(ErrorKind::InvalidFuncCall));
        }

        let receiver = self.eval(&items[0])?;

        let mut callee: Option<HeapId> = None;
        let mut member_was_undefined = false;
        if let (Value::Object(Some(object_id)), Expr::Atom(name)) = (receiver, items[1].as_ref()) {
            match self.find_member(object_id, *name) {
                Some(Value::Object(Some(id))) if self.heap.get(id).is_function() => callee = Some(id),
                Some(Value::Undefined) => member_was_undefined = true,
                _ => {}
            }
        }
        if callee.is_none() {
            if let Value::Object(Some(id)) = self.eval(&items[1])? {
                if self.heap.get(id).is_function() {
                    callee = Some(id);
                }
            }
        }
        let Some(function_id) = callee else {
            // A chain property that held undefined is the likelier mistake
            // to report than a generic resolution failure.
            return Err(Error::new(if member_was_undefined {
                ErrorKind::Undefined
            } else {
                ErrorKind::ListEvaluate
            }));
        };

        let args = self.eval_args(&items[2..])?;
        let arguments_id = self.allocate_array(args);
        self.call_function(function_id, receiver, arguments_id)
    }

    /// `(func (p1 … [...]) body)` and `(func name (p1 … [...]) body)`.
    fn eval_func(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let (name, params_expr, body) = match items {
            [_, params, body] => (None, params, body),
            [_, name, params, body] => {
                let name_id = name
                    .as_atom()
                    .ok_or_else(|| arity_error("function name must be an atom"))?;
                if self.keywords.contains(name_id) {
                    return Err(Error::with_detail(
                        ErrorKind::InvalidKeywordAtom,
                        "a keyword cannot name a function",
                    ));
                }
                (Some(name_id), params, body)
            }
            _ => return Err(arity_error("func takes a parameter list and a body")),
        };

        let Expr::List(param_items) = &**params_expr else {
            return Err(arity_error("func parameters must be a list"));
        };
        let mut params: SmallVec<[HeapId; 4]> = SmallVec::new();
        let mut variadic = false;
        for param in param_items {
            if variadic {
                return Err(arity_error("no parameter may follow `...`"));
            }
            let id = param
                .as_atom()
                .ok_or_else(|| arity_error("function parameters must be atoms"))?;
            if matches!(self.keywords.atom.get(&id), Some(AtomKeyword::Rest)) {
                variadic = true;
                continue;
            }
            if self.keywords.contains(id) {
                return Err(Error::with_detail(
                    ErrorKind::InvalidKeywordAtom,
                    "a keyword cannot name a parameter",
                ));
            }
            params.push(id);
        }

        let function_id = self.create_function(params, variadic, Rc::clone(body));

        if let Some(name_id) = name {
            // A named function gets a fresh prototype object tagged with its
            // name, and is bound like a local assignment.
            let proto_object = self.allocate_object();
            self.heap.get_mut(proto_object).name = Some(name_id);
            self.heap.get_mut(function_id).name = Some(name_id);
            let prototype_key = self.interner.prototype;
            self.heap
                .get_mut(function_id)
                .props
                .insert(prototype_key, Value::Object(Some(proto_object)));
            self.set_local(name_id, Value::Object(Some(function_id)));
        }

        Ok(Value::Object(Some(function_id)))
    }

    /// `(new ctor args…)`: fresh object wired to `ctor.prototype` (the
    /// Object prototype when absent), constructor invoked with the fresh
    /// object as `this`, constructor return value discarded.
    fn eval_new(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        if items.len() < 2 {
            return Err(arity_error("new takes a constructor"));
        }
        let ctor_value = self.eval(&items[1])?;
        let Value::Object(ctor) = ctor_value else {
            return Err(Error::new(ErrorKind::NotObject));
        };
        let Some(ctor_id) = ctor else {
            return Err(Error::new(ErrorKind::NotFunction));
        };
        if !self.heap.get(ctor_id).is_function() {
            return Err(Error::new(ErrorKind::NotFunction));
        }

        let args = self.eval_args(&items[2..])?;
        let arguments_id = self.allocate_array(args);

        let fresh = self.allocate_object();
        if let Some(proto_value) = self.find_member(ctor_id, self.interner.prototype) {
            let Value::Object(proto) = proto_value else {
                return Err(Error::new(ErrorKind::NotObject));
            };
            self.heap.get_mut(fresh).proto = proto;
        }

        self.call_function(ctor_id, Value::Object(Some(fresh)), arguments_id)?;
        Ok(Value::Object(Some(fresh)))
    }

    /// `(getf [obj] atom)` — member read through the prototype chain; a
    /// missing key reads as undefined.
    fn eval_getf(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let (object, name) = match items {
            [_, name_expr] => {
                let Value::Object(object) = self.this else {
                    return Err(Error::new(ErrorKind::NotObject));
                };
                (object, atom_name(name_expr)?)
            }
            [_, object_expr, name_expr] => {
                let Value::Object(object) = self.eval(object_expr)? else {
                    return Err(Error::new(ErrorKind::NotObject));
                };
                (object, atom_name(name_expr)?)
            }
            _ => return Err(arity_error("getf takes an optional object and a name")),
        };
        let object = object.ok_or(Error::new(ErrorKind::NullReference))?;
        Ok(self.find_member(object, name).unwrap_or(Value::Undefined))
    }

    /// `(setf [obj] atom expr)` — member write on the receiver. An existing
    /// slot on the receiver is mutated in place; a key only present further
    /// up the chain shadows rather than mutating the prototype.
    fn eval_setf(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let (object, name, value_expr) = match items {
            [_, name_expr, value_expr] => {
                let Value::Object(object) = self.this else {
                    return Err(Error::new(ErrorKind::NotObject));
                };
                (object, atom_name(name_expr)?, value_expr)
            }
            [_, object_expr, name_expr, value_expr] => {
                let Value::Object(object) = self.eval(object_expr)? else {
                    return Err(Error::new(ErrorKind::NotObject));
                };
                (object, atom_name(name_expr)?, value_expr)
            }
            _ => return Err(arity_error("setf takes an optional object, a name, and a value")),
        };
        let object = object.ok_or(Error::new(ErrorKind::NullReference))?;
        let value = self.eval(value_expr)?;
        self.heap.get_mut(object).props.insert(name, value);
        Ok(value)
    }

    fn eval_getl(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let [_, name_expr] = items else {
            return Err(arity_error("getl takes exactly one name"));
        };
        let name = atom_name(name_expr)?;
        Ok(self.find_local(name).unwrap_or(Value::Undefined))
    }

    fn eval_setl(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let [_, name_expr, value_expr] = items else {
            return Err(arity_error("setl takes a name and a value"));
        };
        let name = atom_name(name_expr)?;
        let value = self.eval(value_expr)?;
        self.set_local(name, value);
        Ok(value)
    }

    /// `(geti obj str-expr)` — like `getf` with a computed key: the key
    /// expression must evaluate to a string, whose interned identity is the
    /// property key.
    fn eval_geti(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let [_, object_expr, key_expr] = items else {
            return Err(arity_error("geti takes an object and a key"));
        };
        let object = self.eval_receiver(object_expr)?;
        let key = self.eval_string_key(key_expr)?;
        Ok(self.find_member(object, key).unwrap_or(Value::Undefined))
    }

    fn eval_seti(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let [_, object_expr, key_expr, value_expr] = items else {
            return Err(arity_error("seti takes an object, a key, and a value"));
        };
        let object = self.eval_receiver(object_expr)?;
        let key = self.eval_string_key(key_expr)?;
        let value = self.eval(value_expr)?;
        self.heap.get_mut(object).props.insert(key, value);
        Ok(value)
    }

    /// `(do e1 e2 …)` — left-to-right, tracking `prev`, returning the last.
    fn eval_do(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        if items.len() < 2 {
            return Err(arity_error("do takes at least one form"));
        }
        let mut last = Value::Undefined;
        for expr in &items[1..] {
            last = self.eval(expr)?;
            self.prev = last;
        }
        self.prev = Value::Undefined;
        Ok(last)
    }

    fn eval_if(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let [_, condition, then_branch, else_branch] = items else {
            return Err(arity_error("if takes a condition and two branches"));
        };
        if self.eval(condition)?.truthiness()? {
            self.eval(then_branch)
        } else {
            self.eval(else_branch)
        }
    }

    /// `(while cond body)` — returns the last body value (undefined when the
    /// loop never ran), tracking `prev` across iterations.
    fn eval_while(&mut self, items: &[Rc<Expr>]) -> RunResult<Value> {
        let [_, condition, body] = items else {
            return Err(arity_error("while takes a condition and a body"));
        };
        let mut last = Value::Undefined;
        while self.eval(condition)?.truthiness()? {
            last = self.eval(body)?;
            self.prev = last;
        }
        self.prev = Value::Undefined;
        Ok(last)
    }

    fn eval_arith(&mut self, keyword: ListKeyword, items: &[Rc<Expr>]) -> RunResult<Value> {
        let operands = &items[1..];
        let result = match keyword {
            ListKeyword::Add | ListKeyword::Mul => {
                if operands.is_empty() {
                    return Err(arity_error("arithmetic takes at least one operand"));
                }
                let mut accumulator = self.eval_number(&operands[0])?;
                for operand in &operands[1..] {
                    let value = self.eval_number(operand)?;
                    if keyword == ListKeyword::Add {
                        accumulator += value;
                    } else {
                        accumulator *= value;
                    }
                }
                accumulator
            }
            ListKeyword::Sub => match operands {
                [operand] => -self.eval_number(operand)?,
                [left, right] => self.eval_number(left)? - self.eval_number(right)?,
                _ => return Err(arity_error("- takes one or two operands")),
            },
            ListKeyword::Div | ListKeyword::Rem => {
                let [left, right] = operands else {
                    return Err(arity_error("division takes exactly two operands"));
                };
                let left = self.eval_number(left)?;
                let right = self.eval_number(right)?;
                if keyword == ListKeyword::Div { left / right } else { left % right }
            }
            ListKeyword::Idiv | ListKeyword::Imod => {
                let [left, right] = operands else {
                    return Err(arity_error("integer division takes exactly two operands"));
                };
                let left = self.eval_integer(left)?;
                let right = self.eval_integer(right)?;
                if right == 0 {
                    return Err(Error::with_detail(ErrorKind::InvalidArg, "integer division by zero"));
                }
                let outcome = if keyword == ListKeyword::Idiv {
                    left.checked_div(right)
                } else {
                    left.checked_rem(right)
                };
                outcome.ok_or_else(|| Error::with_detail(ErrorKind::InvalidArg, "integer overflow"))? as f64
            }
            // bitwise operators
            _ => {
                let [left, right] = operands else {
                    return Err(arity_error("bitwise operators take exactly two operands"));
                };
                let left = self.eval_integer(left)?;
                let right = self.eval_integer(right)?;
                let outcome = match keyword {
                    ListKeyword::BitAnd => left & right,
                    ListKeyword::BitOr => left | right,
                    _ => left ^ right,
                };
                outcome as f64
            }
        };
        Ok(Value::Number(result))
    }

    /// `and` / `or`: short-circuiting, returning a boolean (not the operand).
    fn eval_logic(&mut self, keyword: ListKeyword, items: &[Rc<Expr>]) -> RunResult<Value> {
        let operands = &items[1..];
        if operands.is_empty() {
            return Err(arity_error("logic operators take at least one operand"));
        }
        let stop_on = keyword == ListKeyword::Or;
        for operand in operands {
            if self.eval(operand)?.truthiness()? == stop_on {
                return Ok(Value::Bool(stop_on));
            }
        }
        Ok(Value::Bool(!stop_on))
    }

    fn eval_args(&mut self, exprs: &[Rc<Expr>]) -> RunResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval(expr)?);
        }
        Ok(values)
    }

    fn eval_number(&mut self, expr: &Expr) -> RunResult<f64> {
        self.eval(expr)?.as_number()
    }

    fn eval_integer(&mut self, expr: &Expr) -> RunResult<i64> {
        self.eval(expr)?.as_integer()
    }

    /// Evaluates to a non-null object reference or fails.
    fn eval_receiver(&mut self, expr: &Expr) -> RunResult<HeapId> {
        let Value::Object(object) = self.eval(expr)? else {
            return Err(Error::new(ErrorKind::NotObject));
        };
        object.ok_or(Error::new(ErrorKind::NullReference))
    }

    /// Evaluates to a string value and returns its interned id.
    fn eval_string_key(&mut self, expr: &Expr) -> RunResult<HeapId> {
        let value = self.eval(expr)?;
        match value.heap_id() {
            Some(id) if self.heap.get(id).as_str().is_some() => Ok(id),
            _ => Err(Error::new(ErrorKind::NotString)),
        }
    }
}

fn atom_name(expr: &Expr) -> RunResult<HeapId> {
    expr.as_atom()
        .ok_or_else(|| Error::with_detail(ErrorKind::InvalidKeywordList, "expected an atom"))
}

fn arity_error(detail: &'static str) -> Error {
    Error::with_detail(ErrorKind::InvalidKeywordList, detail)
}
