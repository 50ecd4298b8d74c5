#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use toy_ast::builtins::{self, Accepts, ArgMode};
use toy_ast::{BinOp, Expr, ExprKind, FunctionDef, Ident, NodeId, Program, Span};

use crate::error::{OwnershipWarning, SemanticError};
use crate::kinds::{FunctionKinds, KindFacts, ValueKind, infer_kinds, is_temporary};
use crate::ownership::{
    LifecycleState, OwnershipBinding, OwnershipContext, OwnershipViolation, ViolationKind,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Promote leak warnings to errors.
    pub deny_leaks: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingRecord {
    pub name: String,
    pub kind: ValueKind,
    pub state: LifecycleState,
}

/// Final binding states at the end of one routine path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeRecord {
    /// `None` for the entry routine.
    pub function: Option<String>,
    /// The clause whose body ended the path; `None` when every guard failed.
    pub clause: Option<usize>,
    pub bindings: Vec<BindingRecord>,
}

#[derive(Clone, Debug, Default)]
pub struct Annotations {
    kinds: HashMap<NodeId, ValueKind>,
    releases_previous: HashSet<NodeId>,
    functions: HashMap<String, FunctionKinds>,
    scopes: Vec<ScopeRecord>,
}

impl Annotations {
    pub fn kind_of(&self, id: NodeId) -> Option<ValueKind> {
        self.kinds.get(&id).copied()
    }

    /// This `var` node overwrites a binding that still owns a heap value.
    pub fn releases_previous(&self, id: NodeId) -> bool {
        self.releases_previous.contains(&id)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionKinds> {
        self.functions.get(name)
    }

    pub fn scopes(&self) -> &[ScopeRecord] {
        &self.scopes
    }
}

#[derive(Clone, Debug)]
pub struct CheckedProgram {
    pub program: Program,
    pub annotations: Annotations,
    pub warnings: Vec<OwnershipWarning>,
}

impl CheckedProgram {
    pub fn kind(&self, expr: &Expr) -> ValueKind {
        self.annotations
            .kind_of(expr.id)
            .unwrap_or(ValueKind::Undef)
    }
}

/// How the surrounding expression uses a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Position {
    Read,
    Move,
    Release(ValueKind),
    /// Evaluated for effect; the value is dropped.
    Discard,
}

#[derive(Clone, Debug, Default)]
pub struct Checker {
    options: CheckOptions,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CheckOptions) -> Self {
        Checker { options }
    }

    pub fn check_program(&self, program: &Program) -> Result<CheckedProgram, SemanticError> {
        let facts = infer_kinds(program)?;
        let mut walk = Walk {
            facts: &facts,
            releases: HashSet::new(),
            scopes: Vec::new(),
            warnings: Vec::new(),
            warned: HashSet::new(),
        };

        for f in program.functions() {
            walk.function(f)?;
        }

        let mut ctx = OwnershipContext::new();
        for stmt in program.entry_stmts() {
            walk.expr(&mut ctx, stmt, Position::Discard)?;
        }
        walk.finish_path(&ctx, None, None, "the program");

        if self.options.deny_leaks {
            if let Some(first) = walk.warnings.first() {
                return Err(first.clone().into());
            }
        }

        let Walk {
            releases,
            scopes,
            warnings,
            ..
        } = walk;
        Ok(CheckedProgram {
            program: program.clone(),
            annotations: Annotations {
                kinds: facts.exprs,
                releases_previous: releases,
                functions: facts.functions,
                scopes,
            },
            warnings,
        })
    }
}

struct Walk<'k> {
    facts: &'k KindFacts,
    releases: HashSet<NodeId>,
    scopes: Vec<ScopeRecord>,
    warnings: Vec<OwnershipWarning>,
    warned: HashSet<(String, usize)>,
}

impl Walk<'_> {
    fn kind(&self, e: &Expr) -> ValueKind {
        self.facts
            .exprs
            .get(&e.id)
            .copied()
            .unwrap_or(ValueKind::Undef)
    }

    fn function(&mut self, f: &FunctionDef) -> Result<(), SemanticError> {
        let mut ctx = OwnershipContext::new();
        for p in &f.params {
            ctx.define_binding(&p.name.node, ValueKind::from_type(p.ty.node), p.name.span);
        }
        let owner = format!("function '{}'", f.name.node);

        for (i, clause) in f.clauses.iter().enumerate() {
            self.expr(&mut ctx, &clause.cond, Position::Discard)?;

            let mut body_ctx = ctx.clone();
            let pos = if self.kind(&clause.body).is_heap() {
                Position::Move
            } else {
                Position::Read
            };
            self.expr(&mut body_ctx, &clause.body, pos)?;
            self.finish_path(&body_ctx, Some(&f.name), Some(i), &owner);

            if clause.is_catch_all() {
                return Ok(());
            }
        }

        self.finish_path(&ctx, Some(&f.name), None, &owner);
        Ok(())
    }

    fn finish_path(
        &mut self,
        ctx: &OwnershipContext,
        function: Option<&Ident>,
        clause: Option<usize>,
        owner: &str,
    ) {
        let leaked: Vec<OwnershipBinding> = ctx
            .bindings()
            .filter(|b| b.holds_live_heap())
            .cloned()
            .collect();
        for b in &leaked {
            self.leak(b, owner);
        }

        self.scopes.push(ScopeRecord {
            function: function.map(|f| f.node.clone()),
            clause,
            bindings: ctx
                .bindings()
                .map(|b| BindingRecord {
                    name: b.name.clone(),
                    kind: b.kind,
                    state: b.state,
                })
                .collect(),
        });
    }

    fn leak(&mut self, b: &OwnershipBinding, owner: &str) {
        self.warn(
            format!(
                "'{}' still owns its {} at the end of {owner}; it is never released",
                b.name, b.kind
            ),
            b.defined_at,
        );
    }

    fn warn(&mut self, message: String, span: Span) {
        if self.warned.insert((message.clone(), span.offset())) {
            self.warnings.push(OwnershipWarning { message, span });
        }
    }

    fn expr(
        &mut self,
        ctx: &mut OwnershipContext,
        e: &Expr,
        pos: Position,
    ) -> Result<(), SemanticError> {
        let kind = self.kind(e);
        match &e.kind {
            ExprKind::IntLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::Undef => {}
            ExprKind::Ident(id) => {
                match pos {
                    Position::Read | Position::Discard => {
                        ctx.record_use(&id.node, id.span)?;
                    }
                    Position::Move => ctx.record_move(&id.node, id.span)?,
                    Position::Release(expected) => {
                        ctx.record_release(&id.node, expected, e.span)?
                    }
                }
                return Ok(());
            }
            ExprKind::Binary { left, op, right } => {
                self.expr(ctx, left, Position::Read)?;
                self.expr(ctx, right, Position::Read)?;
                let (lk, rk) = (self.kind(left), self.kind(right));
                let text_equality =
                    matches!(op, BinOp::Eq | BinOp::Ne) && lk.is_text() && rk.is_text();
                if !text_equality {
                    for (side, k) in [(left, lk), (right, rk)] {
                        if k.is_scalar() {
                            continue;
                        }
                        let wanted = if op.is_comparison() && k.is_text() {
                            "two strings for '==' or '!=', or Int operands"
                        } else {
                            "Int operands"
                        };
                        return Err(mismatch(
                            format!("'{}' needs {wanted}, found {lk} and {rk}", op.symbol()),
                            side.span,
                        ));
                    }
                }
            }
            ExprKind::Call { callee, args } => self.call(ctx, callee, args)?,
            ExprKind::Block(b) => {
                ctx.push_scope();
                let last = b.stmts.len().saturating_sub(1);
                for (i, s) in b.stmts.iter().enumerate() {
                    let pos = if i < last {
                        Position::Discard
                    } else if self.kind(s).is_heap() {
                        // The block's value leaves the block; its owner becomes the consumer.
                        Position::Move
                    } else {
                        Position::Read
                    };
                    self.expr(ctx, s, pos)?;
                }
                for b in ctx.pop_scope() {
                    if b.holds_live_heap() {
                        self.leak(&b, "the block");
                    }
                }
            }
            ExprKind::Var { name, value } => {
                let vk = self.kind(value);
                let pos = if vk.is_heap() {
                    Position::Move
                } else {
                    Position::Read
                };
                self.expr(ctx, value, pos)?;
                if ctx.assign(&name.node, vk, name.span).releases_previous {
                    self.releases.insert(e.id);
                }
            }
            ExprKind::ListRange { lo, hi } => {
                for bound in [lo, hi] {
                    self.expr(ctx, bound, Position::Read)?;
                    self.expect(Accepts::Int, bound, "a list range bound")?;
                }
            }
            ExprKind::ListLit(items) => {
                for item in items {
                    self.expr(ctx, item, Position::Move)?;
                }
            }
            ExprKind::HeadOf(list) => {
                self.expr(ctx, list, Position::Read)?;
                self.expect(Accepts::Array, list, "head")?;
            }
            ExprKind::TailOf(list) => {
                self.expr(ctx, list, Position::Read)?;
                self.expect(Accepts::Array, list, "tail")?;
            }
        }

        match pos {
            Position::Release(expected) => {
                if !kind.is_heap() {
                    return Err(OwnershipViolation {
                        binding_name: String::new(),
                        error_kind: ViolationKind::ReleaseNonOwning,
                        span: e.span,
                        previous: None,
                        message: format!("cannot release a {kind}: it owns no heap value"),
                    }
                    .into());
                }
                if kind != expected {
                    return Err(mismatch(
                        format!("cannot release a {kind} as {expected}"),
                        e.span,
                    ));
                }
            }
            Position::Discard if is_temporary(e, kind) => {
                self.warn(
                    format!("a {kind} produced here is discarded and never released"),
                    e.span,
                );
            }
            _ => {}
        }
        Ok(())
    }

    fn call(
        &mut self,
        ctx: &mut OwnershipContext,
        callee: &Ident,
        args: &[Expr],
    ) -> Result<(), SemanticError> {
        if let Some(sig) = self.facts.functions.get(&callee.node) {
            let params = sig.params.clone();
            for (arg, param) in args.iter().zip(params) {
                let ak = self.kind(arg);
                if param.is_heap() {
                    self.expr(ctx, arg, Position::Move)?;
                    let ok = ak == param || (param == ValueKind::String && ak == ValueKind::Str);
                    if !ok {
                        return Err(mismatch(
                            format!(
                                "'{}' expects {param} for this parameter, found {ak}",
                                callee.node
                            ),
                            arg.span,
                        ));
                    }
                } else {
                    self.expr(ctx, arg, Position::Read)?;
                    if !ak.is_scalar() {
                        return Err(mismatch(
                            format!(
                                "'{}' expects {param} for this parameter, found {ak}",
                                callee.node
                            ),
                            arg.span,
                        ));
                    }
                }
            }
            return Ok(());
        }

        let Some(builtin) = builtins::lookup(&callee.node) else {
            return Err(SemanticError {
                message: format!("unknown built-in call '{}'", callee.node),
                span: callee.span,
            });
        };

        for (arg, spec) in args.iter().zip(builtin.params) {
            match spec.mode {
                ArgMode::Release => {
                    let expected = match spec.accepts {
                        Accepts::OwnedString => ValueKind::String,
                        _ => ValueKind::Array,
                    };
                    self.expr(ctx, arg, Position::Release(expected))?;
                }
                ArgMode::Read => {
                    self.expr(ctx, arg, Position::Read)?;
                    self.expect(spec.accepts, arg, builtin.name)?;
                }
                ArgMode::Consume => {
                    self.expr(ctx, arg, Position::Move)?;
                    self.expect(spec.accepts, arg, builtin.name)?;
                }
            }
        }
        Ok(())
    }

    fn expect(&self, accepts: Accepts, arg: &Expr, what: &str) -> Result<(), SemanticError> {
        let kind = self.kind(arg);
        if accepts_kind(accepts, kind) {
            return Ok(());
        }
        Err(mismatch(
            format!("{what} expects {}, found {kind}", describe(accepts)),
            arg.span,
        ))
    }
}

pub fn accepts_kind(accepts: Accepts, kind: ValueKind) -> bool {
    match accepts {
        Accepts::Int => kind.is_scalar(),
        Accepts::Text | Accepts::OwnedString => {
            matches!(kind, ValueKind::Str | ValueKind::String)
        }
        Accepts::Array => kind == ValueKind::Array,
        Accepts::TextOrArray => matches!(
            kind,
            ValueKind::Str | ValueKind::String | ValueKind::Array
        ),
        Accepts::Element | Accepts::Any => true,
    }
}

fn describe(accepts: Accepts) -> &'static str {
    match accepts {
        Accepts::Int => "an Int",
        Accepts::Text => "text",
        Accepts::OwnedString => "a String",
        Accepts::Array => "an Array",
        Accepts::TextOrArray => "text or an Array",
        Accepts::Element | Accepts::Any => "a value",
    }
}

fn mismatch(message: String, span: Span) -> SemanticError {
    OwnershipViolation {
        binding_name: String::new(),
        error_kind: ViolationKind::KindMismatch,
        span,
        previous: None,
        message: format!("kind mismatch: {message}"),
    }
    .into()
}
