#![forbid(unsafe_code)]

use std::fmt;

use miette::SourceSpan;

pub mod builtins;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Smallest span covering both `a` and `b`.
pub fn join(a: Span, b: Span) -> Span {
    let a0: usize = a.offset();
    let b0: usize = b.offset();
    let start = a0.min(b0);
    let end = (a0 + a.len()).max(b0 + b.len());
    span_between(start, end)
}

pub type Ident = Spanned<String>;

/// Parser-assigned identity of an expression, used by later passes to attach facts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            Item::Stmt(_) => None,
        })
    }

    /// Top-level statements, in source order. Together they form the entry routine.
    pub fn entry_stmts(&self) -> impl Iterator<Item = &Expr> {
        self.items.iter().filter_map(|item| match item {
            Item::Stmt(e) => Some(e),
            Item::Function(_) => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Function(FunctionDef),
    Stmt(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub span: Span,
    pub name: Ident,
    pub params: Vec<Param>,
    /// Tried top to bottom; the first clause whose condition holds produces the result.
    pub clauses: Vec<GuardedClause>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub span: Span,
    pub name: Ident,
    pub ty: Spanned<TypeName>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Bool,
    String,
    Array,
}

impl TypeName {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Int" => Some(TypeName::Int),
            "Bool" => Some(TypeName::Bool),
            "String" => Some(TypeName::String),
            "Array" => Some(TypeName::Array),
            _ => None,
        }
    }

    pub fn is_heap(self) -> bool {
        matches!(self, TypeName::String | TypeName::Array)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeName::Int => "Int",
            TypeName::Bool => "Bool",
            TypeName::String => "String",
            TypeName::Array => "Array",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GuardedClause {
    pub span: Span,
    pub cond: Expr,
    pub body: Expr,
}

impl GuardedClause {
    /// `True -> ...`, the clause that always matches.
    pub fn is_catch_all(&self) -> bool {
        matches!(self.cond.kind, ExprKind::BoolLit(true))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    IntLit(i32),
    StringLit(String),
    BoolLit(bool),
    Undef,
    Ident(Ident),
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
    Block(Block),
    /// `var(name, expr)`
    Var {
        name: Ident,
        value: Box<Expr>,
    },
    /// `[lo .. hi]`, materialized eagerly.
    ListRange {
        lo: Box<Expr>,
        hi: Box<Expr>,
    },
    /// `[a, b, c]`
    ListLit(Vec<Expr>),
    HeadOf(Box<Expr>),
    TailOf(Box<Expr>),
}

impl Expr {
    /// The identifier name when this expression is a bare binding reference.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(id) => Some(&id.node),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    /// Both operands are always evaluated.
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    /// Comparisons and connectives yield a Bool; arithmetic yields an Int.
    pub fn yields_bool(self) -> bool {
        self.is_comparison() || self.is_logical()
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

/// Pre-order walk over an expression tree.
pub fn walk_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    match &expr.kind {
        ExprKind::IntLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::Undef
        | ExprKind::Ident(_) => {}
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        ExprKind::Call { args, .. } | ExprKind::ListLit(args) => {
            for a in args {
                walk_expr(a, f);
            }
        }
        ExprKind::Block(b) => {
            for s in &b.stmts {
                walk_expr(s, f);
            }
        }
        ExprKind::Var { value, .. } => walk_expr(value, f),
        ExprKind::ListRange { lo, hi } => {
            walk_expr(lo, f);
            walk_expr(hi, f);
        }
        ExprKind::HeadOf(e) | ExprKind::TailOf(e) => walk_expr(e, f),
    }
}
