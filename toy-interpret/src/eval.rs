#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::rc::Rc;

use toy_ast::builtins::{self, ArgMode, Builtin};
use toy_ast::{BinOp, Expr, ExprKind, FunctionDef, Ident, Span};
use toy_core::{CheckedProgram, Scopes, ValueKind, is_temporary};
use toy_rt::{CharSink, Element, Handle, Heap, Text};

use crate::error::{At, EvalError};
use crate::value::Value;

pub const DEFAULT_MAX_DEPTH: usize = 10_000;

#[derive(Clone, Debug)]
pub struct InterpreterConfig {
    /// Deepest user-function recursion allowed before [`EvalError::StackOverflow`].
    pub max_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Value of the last top-level statement.
    pub value: Value,
    /// What the compiled program passes to `exit`.
    pub exit_status: i32,
}

/// Runs checked programs directly against the runtime library, producing the output
/// and exit status the compiled program would.
pub struct Interpreter<S: CharSink> {
    sink: S,
    heap: Heap,
    config: InterpreterConfig,
}

impl<S: CharSink> Interpreter<S> {
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, InterpreterConfig::default())
    }

    pub fn with_config(sink: S, config: InterpreterConfig) -> Self {
        Interpreter {
            sink,
            heap: Heap::new(),
            config,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn run(&mut self, checked: &CheckedProgram) -> Result<ExecOutcome, EvalError> {
        let mut machine = Machine {
            checked,
            functions: checked
                .program
                .functions()
                .map(|f| (f.name.node.as_str(), f))
                .collect(),
            heap: &mut self.heap,
            sink: &mut self.sink,
            max_depth: self.config.max_depth,
            depth: 0,
        };

        let mut env = Scopes::new();
        let mut value = Value::Undef;
        let mut kind = ValueKind::Undef;
        for stmt in checked.program.entry_stmts() {
            value = match machine.expr(&mut env, stmt) {
                Ok(v) => v,
                Err(EvalError::Exit { status, .. }) => {
                    return Ok(ExecOutcome {
                        value: Value::Undef,
                        exit_status: status,
                    });
                }
                Err(e) => return Err(e),
            };
            kind = checked.kind(stmt);
        }

        let exit_status = if kind.is_scalar() {
            value.word().unwrap_or(0)
        } else {
            0
        };
        Ok(ExecOutcome { value, exit_status })
    }
}

type Env = Scopes<Value>;

struct Machine<'a, S> {
    checked: &'a CheckedProgram,
    functions: HashMap<&'a str, &'a FunctionDef>,
    heap: &'a mut Heap,
    sink: &'a mut S,
    max_depth: usize,
    depth: usize,
}

impl<'a, S: CharSink> Machine<'a, S> {
    fn kind(&self, e: &Expr) -> ValueKind {
        self.checked.kind(e)
    }

    fn expr(&mut self, env: &mut Env, e: &'a Expr) -> Result<Value, EvalError> {
        match &e.kind {
            ExprKind::IntLit(n) => Ok(Value::Int(*n)),
            ExprKind::StringLit(s) => Ok(Value::Str(Rc::from(s.as_str()))),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::Undef => Ok(Value::Undef),
            ExprKind::Ident(name) => lookup(env, name),
            ExprKind::Binary { left, op, right } => {
                let l = self.expr(env, left)?;
                let r = self.expr(env, right)?;
                let equal = match (self.text(&l, left.span)?, self.text(&r, right.span)?) {
                    (Some(a), Some(b)) => Some(a == b),
                    _ => None,
                };
                let value = match (equal, op) {
                    (Some(equal), BinOp::Eq) => Value::Bool(equal),
                    (Some(equal), BinOp::Ne) => Value::Bool(!equal),
                    _ => binary(&l, *op, &r, e.span)?,
                };
                self.release_temporary(left, &l)?;
                self.release_temporary(right, &r)?;
                Ok(value)
            }
            ExprKind::Call { callee, args } => self.call(env, callee, args, e.span),
            ExprKind::Block(block) => {
                env.push();
                let mut last = Ok(Value::Undef);
                for stmt in &block.stmts {
                    last = self.expr(env, stmt);
                    if last.is_err() {
                        break;
                    }
                }
                env.pop();
                last
            }
            ExprKind::Var { name, value } => {
                let v = self.expr(env, value)?;
                if self.checked.annotations.releases_previous(e.id) {
                    if let Some(old) = env.get(&name.node).cloned() {
                        self.release(&old, e.span)?;
                    }
                }
                env.assign(&name.node, v);
                Ok(Value::Undef)
            }
            ExprKind::ListRange { lo, hi } => {
                let lo = self.int(env, lo)?;
                let hi = self.int(env, hi)?;
                let count = if hi < lo {
                    0
                } else {
                    hi.wrapping_sub(lo).wrapping_add(1)
                };
                let a = self.heap.array_new(count).at(e.span)?;
                for n in lo..=hi {
                    self.heap.push(a, Element::Int(n)).at(e.span)?;
                }
                Ok(Value::Array(a))
            }
            ExprKind::ListLit(items) => {
                let a = self.heap.array_new(items.len() as i32).at(e.span)?;
                for item in items {
                    let v = self.owned(env, item)?;
                    self.heap.push(a, v.element()).at(item.span)?;
                }
                Ok(Value::Array(a))
            }
            ExprKind::HeadOf(list) => {
                let l = self.expr(env, list)?;
                let h = expect_handle(&l, "an Array", list.span)?;
                let head = if self.heap.size(h).at(e.span)? == 0 {
                    Value::Undef
                } else {
                    Value::Int(self.heap.get(h, 0).at(e.span)?.slot())
                };
                self.release_temporary(list, &l)?;
                Ok(head)
            }
            ExprKind::TailOf(list) => {
                let l = self.expr(env, list)?;
                let h = expect_handle(&l, "an Array", list.span)?;
                let rest = self.heap.tail(h).at(e.span)?;
                self.release_temporary(list, &l)?;
                Ok(Value::Array(rest))
            }
        }
    }

    /// The bytes of a literal or heap string; `None` for every other value.
    fn text<'v>(&'v self, v: &'v Value, span: Span) -> Result<Option<&'v [u8]>, EvalError> {
        match v {
            Value::Str(s) => Ok(Some(s.as_bytes())),
            Value::String(h) => Ok(Some(self.heap.string_bytes(*h).at(span)?)),
            _ => Ok(None),
        }
    }

    fn int(&mut self, env: &mut Env, e: &'a Expr) -> Result<i32, EvalError> {
        let v = self.expr(env, e)?;
        v.word().ok_or(EvalError::LiteralComparison { span: e.span })
    }

    /// Evaluates a value headed for an owning position. A string literal is copied to
    /// the heap first.
    fn owned(&mut self, env: &mut Env, e: &'a Expr) -> Result<Value, EvalError> {
        match self.expr(env, e)? {
            Value::Str(s) => {
                let h = self.heap.string_copy(Text::from(&*s)).at(e.span)?;
                Ok(Value::String(h))
            }
            v => Ok(v),
        }
    }

    fn release(&mut self, v: &Value, span: Span) -> Result<(), EvalError> {
        match v {
            Value::String(h) => self.heap.free_str(*h).at(span),
            Value::Array(h) => self.heap.free_array(*h).at(span),
            _ => Ok(()),
        }
    }

    fn release_temporary(&mut self, e: &Expr, v: &Value) -> Result<(), EvalError> {
        if is_temporary(e, self.kind(e)) {
            self.release(v, e.span)?;
        }
        Ok(())
    }

    fn call(
        &mut self,
        env: &mut Env,
        callee: &'a Ident,
        args: &'a [Expr],
        span: Span,
    ) -> Result<Value, EvalError> {
        if let Some(f) = self.functions.get(callee.node.as_str()).copied() {
            let mut values = Vec::with_capacity(args.len());
            for (arg, param) in args.iter().zip(&f.params) {
                let v = if param.ty.node == toy_ast::TypeName::String {
                    self.owned(env, arg)?
                } else {
                    self.expr(env, arg)?
                };
                values.push(v);
            }
            return self.invoke(f, values, span);
        }

        let builtin = builtins::lookup(&callee.node).ok_or_else(|| EvalError::UnknownCall {
            name: callee.node.clone(),
            span: callee.span,
        })?;

        let mut values = Vec::with_capacity(args.len());
        for (arg, spec) in args.iter().zip(builtin.params) {
            let v = if spec.mode == ArgMode::Consume {
                self.owned(env, arg)?
            } else {
                self.expr(env, arg)?
            };
            values.push(v);
        }

        let result = self.builtin(builtin, args, &values, span)?;

        for ((arg, spec), v) in args.iter().zip(builtin.params).zip(&values) {
            if spec.mode == ArgMode::Read {
                self.release_temporary(arg, v)?;
            }
        }
        Ok(result)
    }

    fn invoke(
        &mut self,
        f: &'a FunctionDef,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, EvalError> {
        if self.depth >= self.max_depth {
            return Err(EvalError::StackOverflow {
                depth: self.max_depth,
                span,
            });
        }
        self.depth += 1;

        let mut env = Env::new();
        for (p, v) in f.params.iter().zip(args) {
            env.declare(p.name.node.clone(), v);
        }
        let result = self.clauses(&mut env, f);

        self.depth -= 1;
        result
    }

    fn clauses(&mut self, env: &mut Env, f: &'a FunctionDef) -> Result<Value, EvalError> {
        for clause in &f.clauses {
            let holds = clause.is_catch_all() || self.int(env, &clause.cond)? != 0;
            if holds {
                let mut body_env = env.clone();
                return self.expr(&mut body_env, &clause.body);
            }
        }
        Ok(Value::Undef)
    }

    fn builtin(
        &mut self,
        builtin: &Builtin,
        args: &'a [Expr],
        values: &[Value],
        span: Span,
    ) -> Result<Value, EvalError> {
        let arg_span = |i: usize| args.get(i).map_or(span, |a| a.span);
        let handle = |i: usize, expected: &'static str| {
            values
                .get(i)
                .and_then(Value::handle)
                .ok_or(EvalError::NullHandle {
                    expected,
                    span: arg_span(i),
                })
        };
        let int = |i: usize| -> Result<i32, EvalError> {
            values
                .get(i)
                .and_then(Value::word)
                .ok_or(EvalError::LiteralComparison { span: arg_span(i) })
        };
        let text = |i: usize| match values.get(i) {
            Some(Value::Str(s)) => Ok(Text::Literal(s.as_bytes())),
            Some(Value::String(h)) => Ok(Text::Handle(*h)),
            _ => Err(EvalError::NullHandle {
                expected: "a string",
                span: arg_span(i),
            }),
        };
        let element = |i: usize| values.get(i).map_or(Element::Int(0), Value::element);

        match builtin.name {
            "print" => {
                self.print(args, values, span)?;
                return Ok(Value::Undef);
            }
            "println" => {
                self.print(args, values, span)?;
                self.sink.put_char(b'\n').at(span)?;
                return Ok(Value::Undef);
            }
            "exit" => {
                return Err(EvalError::Exit {
                    status: int(0)?,
                    span,
                });
            }
            _ => {}
        }

        let heap = &mut *self.heap;
        let value = match builtin.name {
            "print_i" => {
                toy_rt::print_i(&mut *self.sink, int(0)?).at(span)?;
                Value::Undef
            }
            "println_i" => {
                toy_rt::print_i(&mut *self.sink, int(0)?).at(span)?;
                self.sink.put_char(b'\n').at(span)?;
                Value::Undef
            }
            "print_array" => {
                toy_rt::print_array(&mut *self.sink, heap, handle(0, "an Array")?).at(span)?;
                Value::Undef
            }

            "String" => Value::String(heap.string_copy(text(0)?).at(span)?),
            "Int2str" => Value::String(heap.int2str(int(0)?).at(span)?),
            "Concat" => Value::String(heap.concat(text(0)?, text(1)?).at(span)?),
            "Substr" => Value::String(heap.substr(text(0)?, int(1)?, int(2)?).at(span)?),
            "Revstr" => Value::String(heap.revstr(text(0)?).at(span)?),
            "Upper" => Value::String(heap.upper(text(0)?, int(1)?, int(2)?).at(span)?),
            "Lower" => Value::String(heap.lower(text(0)?, int(1)?, int(2)?).at(span)?),
            "free_str" => {
                heap.free_str(handle(0, "a String")?).at(span)?;
                Value::Undef
            }
            "len" => match values.first() {
                Some(Value::Array(h)) => Value::Int(heap.size(*h).at(span)?),
                _ => Value::Int(heap.len(text(0)?).at(span)?),
            },
            "append" => Value::String(heap.append(handle(0, "a String")?, text(1)?).at(span)?),

            "Array_new" => Value::Array(heap.array_new(int(0)?).at(span)?),
            "Copy" => Value::Array(heap.copy(handle(0, "an Array")?).at(span)?),
            "Slice" => Value::Array(
                heap.slice(handle(0, "an Array")?, int(1)?, int(2)?)
                    .at(span)?,
            ),
            "free_array" => {
                heap.free_array(handle(0, "an Array")?).at(span)?;
                Value::Undef
            }
            "put" => {
                heap.put(handle(0, "an Array")?, int(1)?, element(2))
                    .at(span)?;
                Value::Undef
            }
            "push" => {
                heap.push(handle(0, "an Array")?, element(1)).at(span)?;
                Value::Undef
            }
            "pop" => slot_or_undef(heap.pop(handle(0, "an Array")?).at(span)?),
            "shift" => slot_or_undef(heap.shift(handle(0, "an Array")?).at(span)?),
            "unshift" => Value::Int(heap.unshift(handle(0, "an Array")?, element(1)).at(span)?),
            "insert" => {
                heap.insert(handle(0, "an Array")?, int(1)?, element(2))
                    .at(span)?;
                Value::Undef
            }
            "remove_at" => {
                heap.remove_at(handle(0, "an Array")?, int(1)?).at(span)?;
                Value::Undef
            }
            "reverse" => {
                heap.reverse(handle(0, "an Array")?).at(span)?;
                Value::Undef
            }
            "sort" => {
                heap.sort(handle(0, "an Array")?).at(span)?;
                Value::Undef
            }
            "get" => Value::Int(heap.get(handle(0, "an Array")?, int(1)?).at(span)?.slot()),
            "get_type" => Value::Str(Rc::from(
                heap.get_type(handle(0, "an Array")?, int(1)?).at(span)?,
            )),
            "size" => Value::Int(heap.size(handle(0, "an Array")?).at(span)?),
            "stringify" => Value::String(heap.stringify(handle(0, "an Array")?).at(span)?),
            other => {
                return Err(EvalError::UnknownCall {
                    name: other.to_string(),
                    span,
                });
            }
        };
        Ok(value)
    }

    /// `print` picks its routine from the argument's static kind, as compiled code does.
    fn print(&mut self, args: &[Expr], values: &[Value], span: Span) -> Result<(), EvalError> {
        let (Some(arg), Some(v)) = (args.first(), values.first()) else {
            return Ok(());
        };
        match (self.kind(arg), v) {
            (ValueKind::Undef, _) => Ok(()),
            (ValueKind::Str, Value::Str(s)) => toy_rt::print_str(&mut *self.sink, s.as_bytes()).at(span),
            (ValueKind::String, Value::String(h)) => {
                let bytes = self.heap.string_bytes(*h).at(span)?;
                toy_rt::print_str(&mut *self.sink, bytes).at(span)
            }
            (ValueKind::Array, Value::Array(h)) => {
                toy_rt::print_array(&mut *self.sink, &*self.heap, *h).at(span)
            }
            (ValueKind::Int | ValueKind::Bool, v) => {
                let n = v.word().ok_or(EvalError::LiteralComparison { span: arg.span })?;
                toy_rt::print_i(&mut *self.sink, n).at(span)
            }
            (kind, _) => Err(EvalError::NullHandle {
                expected: accepts_name(kind),
                span: arg.span,
            }),
        }
    }
}

fn lookup(env: &Env, name: &Ident) -> Result<Value, EvalError> {
    env.get(&name.node).cloned().ok_or_else(|| EvalError::Unbound {
        name: name.node.clone(),
        span: name.span,
    })
}

fn expect_handle(v: &Value, expected: &'static str, span: Span) -> Result<Handle, EvalError> {
    v.handle().ok_or(EvalError::NullHandle { expected, span })
}

fn slot_or_undef(elem: Option<Element>) -> Value {
    elem.map_or(Value::Undef, |e| Value::Int(e.slot()))
}

fn accepts_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Array => "an Array",
        ValueKind::String | ValueKind::Str => "a string",
        _ => "a value",
    }
}

/// Two's-complement arithmetic, signed comparison and truth-valued connectives on
/// machine words.
fn binary(l: &Value, op: BinOp, r: &Value, span: Span) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (l.word(), r.word()) else {
        return Err(EvalError::LiteralComparison { span });
    };

    let value = match op {
        BinOp::Add => Value::Int(a.wrapping_add(b)),
        BinOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinOp::Div => {
            if b == 0 {
                return Err(EvalError::DivisionByZero { span });
            }
            Value::Int(a.checked_div(b).ok_or(EvalError::DivisionOverflow { span })?)
        }
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Ne => Value::Bool(a != b),
        BinOp::Lt => Value::Bool(a < b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Le => Value::Bool(a <= b),
        BinOp::Ge => Value::Bool(a >= b),
        BinOp::And => Value::Bool(a != 0 && b != 0),
        BinOp::Or => Value::Bool(a != 0 || b != 0),
    };
    Ok(value)
}
