#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use toy_ast::builtins::{self, Returns};
use toy_ast::{Expr, ExprKind, FunctionDef, NodeId, Program, TypeName};

use crate::error::SemanticError;
use crate::scope::Scopes;

/// What an expression evaluates to, as far as ownership is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Bool,
    /// A string literal in static data. Never released.
    Str,
    /// An owned heap string.
    String,
    /// An owned heap array.
    Array,
    Undef,
}

impl ValueKind {
    pub fn is_heap(self) -> bool {
        matches!(self, ValueKind::String | ValueKind::Array)
    }

    /// Int, Bool and Undef all travel as plain machine integers.
    pub fn is_scalar(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Bool | ValueKind::Undef)
    }

    /// A string literal or an owned string.
    pub fn is_text(self) -> bool {
        matches!(self, ValueKind::Str | ValueKind::String)
    }

    pub fn from_type(ty: TypeName) -> Self {
        match ty {
            TypeName::Int => ValueKind::Int,
            TypeName::Bool => ValueKind::Bool,
            TypeName::String => ValueKind::String,
            TypeName::Array => ValueKind::Array,
        }
    }

    pub fn from_returns(r: Returns) -> Self {
        match r {
            Returns::Int => ValueKind::Int,
            Returns::Str => ValueKind::Str,
            Returns::String => ValueKind::String,
            Returns::Array => ValueKind::Array,
            Returns::Undef => ValueKind::Undef,
        }
    }

    /// Runtime element tag for values stored into arrays: 0 INT, 1 STRING, 2 ARRAY.
    pub fn element_tag(self) -> i32 {
        match self {
            ValueKind::Str | ValueKind::String => 1,
            ValueKind::Array => 2,
            ValueKind::Int | ValueKind::Bool | ValueKind::Undef => 0,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Int => "Int",
            ValueKind::Bool => "Bool",
            ValueKind::Str => "string literal",
            ValueKind::String => "String",
            ValueKind::Array => "Array",
            ValueKind::Undef => "Undef",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionKinds {
    pub params: Vec<ValueKind>,
    pub result: ValueKind,
}

#[derive(Clone, Debug, Default)]
pub struct KindFacts {
    pub exprs: HashMap<NodeId, ValueKind>,
    pub functions: HashMap<String, FunctionKinds>,
}

/// `None` is "not known yet" while function results are still being solved.
type Partial = Option<ValueKind>;

/// Least upper bound of two clause results.
fn join(a: Partial, b: Partial) -> Result<Partial, (ValueKind, ValueKind)> {
    match (a, b) {
        (None, k) | (k, None) => Ok(k),
        (Some(x), Some(y)) if x == y => Ok(Some(x)),
        (Some(ValueKind::Undef), k) | (k, Some(ValueKind::Undef)) => Ok(k),
        (Some(ValueKind::Int), Some(ValueKind::Bool))
        | (Some(ValueKind::Bool), Some(ValueKind::Int)) => Ok(Some(ValueKind::Int)),
        (Some(x), Some(y)) => Err((x, y)),
    }
}

/// Infers the kind of every expression. Function results are solved by iterating to a
/// fixpoint, so recursive and mutually recursive functions settle on a kind.
pub fn infer_kinds(program: &Program) -> Result<KindFacts, SemanticError> {
    let mut inference = KindInference {
        results: program
            .functions()
            .map(|f| (f.name.node.clone(), None))
            .collect(),
        exprs: HashMap::new(),
    };

    let functions: Vec<&FunctionDef> = program.functions().collect();
    let max_rounds = functions.len() * 8 + 2;
    for _ in 0..max_rounds {
        let mut changed = false;
        for f in &functions {
            let result = inference.function(f)?;
            if inference.results.get(&f.name.node) != Some(&result) {
                inference.results.insert(f.name.node.clone(), result);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // One last pass with settled results so every recorded kind is final.
    for f in &functions {
        inference.function(f)?;
    }
    let mut env = Scopes::new();
    for stmt in program.entry_stmts() {
        inference.expr(&mut env, stmt);
    }

    let functions = functions
        .iter()
        .map(|f| {
            let params = f
                .params
                .iter()
                .map(|p| ValueKind::from_type(p.ty.node))
                .collect();
            let result = inference
                .results
                .get(&f.name.node)
                .copied()
                .flatten()
                .unwrap_or(ValueKind::Undef);
            (f.name.node.clone(), FunctionKinds { params, result })
        })
        .collect();

    Ok(KindFacts {
        exprs: inference
            .exprs
            .into_iter()
            .map(|(id, k)| (id, k.unwrap_or(ValueKind::Undef)))
            .collect(),
        functions,
    })
}

struct KindInference {
    results: HashMap<String, Partial>,
    exprs: HashMap<NodeId, Partial>,
}

impl KindInference {
    fn function(&mut self, f: &FunctionDef) -> Result<Partial, SemanticError> {
        let mut env: Scopes<Partial> = Scopes::new();
        for p in &f.params {
            env.declare(p.name.node.clone(), Some(ValueKind::from_type(p.ty.node)));
        }

        let mut result: Partial = None;
        let mut fallible = true;
        for clause in &f.clauses {
            self.expr(&mut env, &clause.cond);
            let mut body_env = env.clone();
            let body = self.expr(&mut body_env, &clause.body);
            result = join(result, body).map_err(|(a, b)| SemanticError {
                message: format!(
                    "incompatible clause results in '{}': {a} and {b}",
                    f.name.node
                ),
                span: clause.body.span,
            })?;
            if clause.is_catch_all() {
                fallible = false;
                break;
            }
        }

        // Falling through every clause yields Undef, which joins with anything.
        if fallible && result.is_none() {
            result = Some(ValueKind::Undef);
        }
        Ok(result)
    }

    fn expr(&mut self, env: &mut Scopes<Partial>, e: &Expr) -> Partial {
        let kind = match &e.kind {
            ExprKind::IntLit(_) => Some(ValueKind::Int),
            ExprKind::StringLit(_) => Some(ValueKind::Str),
            ExprKind::BoolLit(_) => Some(ValueKind::Bool),
            ExprKind::Undef => Some(ValueKind::Undef),
            ExprKind::Ident(id) => env
                .get(&id.node)
                .copied()
                .unwrap_or(Some(ValueKind::Undef)),
            ExprKind::Binary { left, op, right } => {
                self.expr(env, left);
                self.expr(env, right);
                if op.yields_bool() {
                    Some(ValueKind::Bool)
                } else {
                    Some(ValueKind::Int)
                }
            }
            ExprKind::Call { callee, args } => {
                for a in args {
                    self.expr(env, a);
                }
                match self.results.get(&callee.node) {
                    Some(result) => *result,
                    None => builtins::lookup(&callee.node)
                        .map(|b| ValueKind::from_returns(b.returns))
                        .or(Some(ValueKind::Undef)),
                }
            }
            ExprKind::Block(b) => {
                env.push();
                let mut last = Some(ValueKind::Undef);
                for s in &b.stmts {
                    last = self.expr(env, s);
                }
                env.pop();
                last
            }
            ExprKind::Var { name, value } => {
                let k = self.expr(env, value);
                env.assign(&name.node, k);
                Some(ValueKind::Undef)
            }
            ExprKind::ListRange { lo, hi } => {
                self.expr(env, lo);
                self.expr(env, hi);
                Some(ValueKind::Array)
            }
            ExprKind::ListLit(items) => {
                for item in items {
                    self.expr(env, item);
                }
                Some(ValueKind::Array)
            }
            ExprKind::HeadOf(list) => {
                self.expr(env, list);
                Some(ValueKind::Int)
            }
            ExprKind::TailOf(list) => {
                self.expr(env, list);
                Some(ValueKind::Array)
            }
        };
        self.exprs.insert(e.id, kind);
        kind
    }
}

/// A heap value produced by an expression rather than read from a binding. Whoever
/// receives it owns it.
pub fn is_temporary(expr: &Expr, kind: ValueKind) -> bool {
    kind.is_heap() && !matches!(expr.kind, ExprKind::Ident(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(src: &str) -> KindFacts {
        let program = toy_parse::parse_source(src).expect("parse");
        infer_kinds(&program).expect("kinds")
    }

    #[test]
    fn recursive_results_settle() {
        let f = facts("fac(n: Int) = (n < 0 -> Undef, n == 0 -> 1, True -> n * fac(n - 1))");
        assert_eq!(f.functions["fac"].result, ValueKind::Int);
    }

    #[test]
    fn mutual_recursion_propagates_heap_results() {
        let f = facts(
            "a(n: Int) = (n == 0 -> String('x'), True -> b(n - 1))\n\
             b(n: Int) = a(n)",
        );
        assert_eq!(f.functions["a"].result, ValueKind::String);
        assert_eq!(f.functions["b"].result, ValueKind::String);
    }

    #[test]
    fn function_without_value_is_undef() {
        let f = facts("loop(n: Int) = loop(n)");
        assert_eq!(f.functions["loop"].result, ValueKind::Undef);
    }

    #[test]
    fn mixing_heap_and_int_results_is_rejected() {
        let program =
            toy_parse::parse_source("f(n: Int) = (n == 0 -> [1], True -> 2)").expect("parse");
        let err = infer_kinds(&program).expect_err("expected kind error");
        assert!(err.message.contains("incompatible clause results in 'f'"));
    }

    #[test]
    fn undef_and_bool_join_quietly() {
        assert_eq!(
            join(Some(ValueKind::Undef), Some(ValueKind::Array)),
            Ok(Some(ValueKind::Array))
        );
        assert_eq!(
            join(Some(ValueKind::Bool), Some(ValueKind::Int)),
            Ok(Some(ValueKind::Int))
        );
        assert!(join(Some(ValueKind::Str), Some(ValueKind::String)).is_err());
    }
}
