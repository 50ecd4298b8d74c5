#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::mem;

use toy_ast::{
    BinOp, Block, Expr, ExprKind, FunctionDef, GuardedClause, Ident, Item, NodeId, Param,
    Program, Span, Spanned, TypeName, builtins, join, walk_expr,
};
use toy_lex::{Token, TokenKind};

use crate::error::ParseError;

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    next_id: u32,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            idx: 0,
            next_id: 0,
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();
        while !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Semi) {
                self.next();
                continue;
            }
            if self.looks_like_fundef() {
                items.push(Item::Function(self.parse_fundef()?));
            } else {
                items.push(Item::Stmt(self.parse_expr()?));
            }
        }

        let program = Program { items };
        resolve_calls(&program)?;
        Ok(program)
    }

    /// `name(` ... matching `)` followed by `=`.
    fn looks_like_fundef(&self) -> bool {
        if !matches!(self.peek_kind(), Some(TokenKind::Ident(_)))
            || !matches!(self.peek_kind_n(1), Some(TokenKind::LParen))
        {
            return false;
        }
        let mut depth = 0usize;
        let mut i = self.idx + 1;
        while let Some(tok) = self.tokens.get(i) {
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::Eq)
                        );
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn parse_fundef(&mut self) -> Result<FunctionDef, ParseError> {
        let name = self.expect_ident()?;
        if builtins::is_reserved(&name.node) {
            return Err(ParseError {
                message: format!("cannot redefine built-in '{}'", name.node),
                span: name.span,
            });
        }

        self.expect(TokenKind::LParen)?;
        let mut params: Vec<Param> = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let param = self.parse_param()?;
                if params.iter().any(|p| p.name.node == param.name.node) {
                    return Err(ParseError {
                        message: format!("duplicate parameter '{}'", param.name.node),
                        span: param.name.span,
                    });
                }
                params.push(param);
                if self.at(TokenKind::Comma) {
                    self.next();
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Eq)?;

        let clauses = self.parse_body()?;
        let end = clauses.last().map(|c| c.span).unwrap_or(name.span);
        Ok(FunctionDef {
            span: join(name.span, end),
            name,
            params,
            clauses,
        })
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let name = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty_ident = self.expect_ident()?;
        let Some(ty) = TypeName::from_name(&ty_ident.node) else {
            return Err(ParseError {
                message: format!(
                    "unknown parameter type '{}' (expected Int, Bool, String or Array)",
                    ty_ident.node
                ),
                span: ty_ident.span,
            });
        };
        Ok(Param {
            span: join(name.span, ty_ident.span),
            name,
            ty: Spanned::new(ty_ident.span, ty),
        })
    }

    /// Either a parenthesized guard list or a bare expression, which becomes a single
    /// catch-all clause.
    fn parse_body(&mut self) -> Result<Vec<GuardedClause>, ParseError> {
        if !self.paren_holds_clauses() {
            let body = self.parse_expr()?;
            let cond = self.mk(body.span, ExprKind::BoolLit(true));
            return Ok(vec![GuardedClause {
                span: body.span,
                cond,
                body,
            }]);
        }

        let open = self.expect(TokenKind::LParen)?;
        let mut clauses = Vec::new();
        loop {
            clauses.push(self.parse_clause()?);
            if self.at(TokenKind::Comma) {
                self.next();
                if self.at(TokenKind::RParen) {
                    break;
                }
                continue;
            }
            break;
        }
        if !self.at(TokenKind::RParen) {
            let span = self.peek_span().unwrap_or(open.span);
            return Err(ParseError {
                message: format!(
                    "expected ',' or ')' after guard clause, found {}",
                    self.describe_current()
                ),
                span,
            });
        }
        self.next();
        Ok(clauses)
    }

    /// An `->` directly inside the upcoming parenthesis means a guard list.
    fn paren_holds_clauses(&self) -> bool {
        if !self.at(TokenKind::LParen) {
            return false;
        }
        let mut depth = 0usize;
        let mut i = self.idx;
        while let Some(tok) = self.tokens.get(i) {
            match tok.kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return false;
                    }
                }
                TokenKind::Arrow if depth == 1 => return true,
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn parse_clause(&mut self) -> Result<GuardedClause, ParseError> {
        let cond = self.parse_expr()?;
        if !self.at(TokenKind::Arrow) {
            let span = self.peek_span().unwrap_or(cond.span);
            return Err(ParseError {
                message: format!(
                    "malformed guard clause: expected '->' after condition, found {}",
                    self.describe_current()
                ),
                span,
            });
        }
        self.next();
        let body = self.parse_expr()?;
        Ok(GuardedClause {
            span: join(cond.span, body.span),
            cond,
            body,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;
        while self.at(TokenKind::KwOr) {
            self.next();
            let right = self.parse_and_expr()?;
            left = self.binary(left, BinOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not_expr()?;
        while self.at(TokenKind::KwAnd) {
            self.next();
            let right = self.parse_not_expr()?;
            left = self.binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    /// `not e` is `e == False`.
    fn parse_not_expr(&mut self) -> Result<Expr, ParseError> {
        if !self.at(TokenKind::KwNot) {
            return self.parse_cmp_expr();
        }
        let not = self.expect(TokenKind::KwNot)?;
        let operand = self.parse_not_expr()?;
        let span = join(not.span, operand.span);
        let falsity = self.mk(not.span, ExprKind::BoolLit(false));
        Ok(self.mk(
            span,
            ExprKind::Binary {
                left: Box::new(operand),
                op: BinOp::Eq,
                right: Box::new(falsity),
            },
        ))
    }

    fn parse_cmp_expr(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_add_expr()?;
        let Some(op) = self.peek_kind().and_then(comparison_op) else {
            return Ok(left);
        };
        self.next();
        let right = self.parse_add_expr()?;
        let span = join(left.span, right.span);
        let expr = self.mk(
            span,
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        );

        if self.peek_kind().and_then(comparison_op).is_some() {
            let span = self.peek_span().unwrap_or(expr.span);
            return Err(ParseError {
                message: "chained comparisons are not supported; use parentheses".to_string(),
                span,
            });
        }

        Ok(expr)
    }

    fn parse_add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next();
            let right = self.parse_mul_expr()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                _ => break,
            };
            self.next();
            let right = self.parse_unary_expr()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        if !self.at(TokenKind::Minus) {
            return self.parse_primary_expr();
        }
        let minus = self.expect(TokenKind::Minus)?;

        // A literal directly after the sign is folded, so `-2147483648` fits.
        if let Some(TokenKind::Int(n)) = self.peek_kind() {
            let n = *n;
            let tok = self.expect_any()?;
            let span = join(minus.span, tok.span);
            let value = i64::try_from(n)
                .ok()
                .and_then(|n| i32::try_from(-n).ok())
                .ok_or_else(|| out_of_range(span))?;
            return Ok(self.mk(span, ExprKind::IntLit(value)));
        }

        let operand = self.parse_unary_expr()?;
        let zero = self.mk(minus.span, ExprKind::IntLit(0));
        Ok(self.binary(zero, BinOp::Sub, operand))
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Int(n) => {
                let value = i32::try_from(n).map_err(|_| out_of_range(tok.span))?;
                Ok(self.mk(tok.span, ExprKind::IntLit(value)))
            }
            TokenKind::String(s) => Ok(self.mk(tok.span, ExprKind::StringLit(s))),
            TokenKind::KwTrue => Ok(self.mk(tok.span, ExprKind::BoolLit(true))),
            TokenKind::KwFalse => Ok(self.mk(tok.span, ExprKind::BoolLit(false))),
            TokenKind::KwUndef => Ok(self.mk(tok.span, ExprKind::Undef)),
            TokenKind::Ident(name) => {
                let ident = Ident {
                    span: tok.span,
                    node: name,
                };
                if self.at(TokenKind::LParen) {
                    self.parse_call(ident)
                } else {
                    Ok(self.mk(tok.span, ExprKind::Ident(ident)))
                }
            }
            TokenKind::LBrace => self.parse_block(tok.span),
            TokenKind::LBracket => self.parse_list(tok.span),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                let close = self.expect_closing(TokenKind::RParen, tok.span, "parenthesis")?;
                Ok(Expr {
                    span: join(tok.span, close.span),
                    ..inner
                })
            }
            other => Err(ParseError {
                message: format!("expected expression, found {}", other.describe()),
                span: tok.span,
            }),
        }
    }

    fn parse_call(&mut self, callee: Ident) -> Result<Expr, ParseError> {
        let open = self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.at(TokenKind::Comma) {
                    self.next();
                    continue;
                }
                break;
            }
        }
        let close = self.expect_closing(TokenKind::RParen, open.span, "argument list")?;
        let span = join(callee.span, close.span);

        match callee.node.as_str() {
            "var" => {
                let [target, value] = special_args::<2>(&callee, args, span)?;
                let ExprKind::Ident(name) = target.kind else {
                    return Err(ParseError {
                        message: "first argument of var must be an identifier".to_string(),
                        span: target.span,
                    });
                };
                Ok(self.mk(
                    span,
                    ExprKind::Var {
                        name,
                        value: Box::new(value),
                    },
                ))
            }
            "head" => {
                let [list] = special_args::<1>(&callee, args, span)?;
                Ok(self.mk(span, ExprKind::HeadOf(Box::new(list))))
            }
            "tail" => {
                let [list] = special_args::<1>(&callee, args, span)?;
                Ok(self.mk(span, ExprKind::TailOf(Box::new(list))))
            }
            _ => Ok(self.mk(span, ExprKind::Call { callee, args })),
        }
    }

    fn parse_block(&mut self, open: Span) -> Result<Expr, ParseError> {
        let mut stmts = Vec::new();
        loop {
            if self.at(TokenKind::RBrace) {
                break;
            }
            if self.at(TokenKind::Eof) {
                return Err(unclosed("block", open));
            }
            stmts.push(self.parse_expr()?);
            if self.at(TokenKind::Semi) {
                self.next();
                continue;
            }
            if !self.at(TokenKind::RBrace) {
                if self.at(TokenKind::Eof) {
                    return Err(unclosed("block", open));
                }
                let span = self.peek_span().unwrap_or(open);
                return Err(ParseError {
                    message: format!(
                        "expected ';' or '}}' in block, found {}",
                        self.describe_current()
                    ),
                    span,
                });
            }
        }
        let close = self.expect(TokenKind::RBrace)?;
        let span = join(open, close.span);
        Ok(self.mk(span, ExprKind::Block(Block { span, stmts })))
    }

    fn parse_list(&mut self, open: Span) -> Result<Expr, ParseError> {
        if self.at(TokenKind::RBracket) {
            let close = self.expect(TokenKind::RBracket)?;
            return Ok(self.mk(join(open, close.span), ExprKind::ListLit(Vec::new())));
        }

        let first = self.parse_expr()?;
        if self.at(TokenKind::DotDot) {
            self.next();
            let hi = self.parse_expr()?;
            let close = self.expect_closing(TokenKind::RBracket, open, "list range")?;
            return Ok(self.mk(
                join(open, close.span),
                ExprKind::ListRange {
                    lo: Box::new(first),
                    hi: Box::new(hi),
                },
            ));
        }

        let mut elems = vec![first];
        while self.at(TokenKind::Comma) {
            self.next();
            if self.at(TokenKind::RBracket) {
                break;
            }
            elems.push(self.parse_expr()?);
        }
        let close = self.expect_closing(TokenKind::RBracket, open, "list")?;
        Ok(self.mk(join(open, close.span), ExprKind::ListLit(elems)))
    }

    fn binary(&mut self, left: Expr, op: BinOp, right: Expr) -> Expr {
        let span = join(left.span, right.span);
        self.mk(
            span,
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        )
    }

    fn mk(&mut self, span: Span, kind: ExprKind) -> Expr {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Expr { id, span, kind }
    }

    fn describe_current(&self) -> String {
        self.peek_kind()
            .map(TokenKind::describe)
            .unwrap_or_else(|| TokenKind::Eof.describe())
    }

    fn expect_closing(
        &mut self,
        expected: TokenKind,
        open: Span,
        what: &str,
    ) -> Result<Token, ParseError> {
        if self.at(TokenKind::Eof) {
            return Err(unclosed(what, open));
        }
        self.expect(expected)
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(Ident {
                span: tok.span,
                node: name,
            }),
            other => Err(ParseError {
                message: format!("expected identifier, found {}", other.describe()),
                span: tok.span,
            }),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let tok = self.expect_any()?;
        if mem::discriminant(&tok.kind) == mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError {
                message: format!(
                    "expected {}, found {}",
                    expected.describe(),
                    tok.kind.describe()
                ),
                span: tok.span,
            })
        }
    }

    fn expect_any(&mut self) -> Result<Token, ParseError> {
        let span = self
            .tokens
            .last()
            .map(|t| t.span)
            .unwrap_or_else(|| toy_ast::span(0, 0));
        self.next().ok_or_else(|| ParseError {
            message: "unexpected end of input".to_string(),
            span,
        })
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| mem::discriminant(k) == mem::discriminant(&kind))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx)?.clone();
        self.idx += 1;
        Some(tok)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.idx).map(|t| &t.kind)
    }

    fn peek_kind_n(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.idx + n).map(|t| &t.kind)
    }

    fn peek_span(&self) -> Option<Span> {
        self.tokens.get(self.idx).map(|t| t.span)
    }
}

fn comparison_op(kind: &TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::EqEq => Some(BinOp::Eq),
        TokenKind::Neq => Some(BinOp::Ne),
        TokenKind::Lt => Some(BinOp::Lt),
        TokenKind::Gt => Some(BinOp::Gt),
        TokenKind::Le => Some(BinOp::Le),
        TokenKind::Ge => Some(BinOp::Ge),
        _ => None,
    }
}

fn special_args<const N: usize>(
    callee: &Ident,
    args: Vec<Expr>,
    span: Span,
) -> Result<[Expr; N], ParseError> {
    let found = args.len();
    args.try_into().map_err(|_| ParseError {
        message: arity_message(&callee.node, N, found),
        span,
    })
}

fn arity_message(name: &str, expected: usize, found: usize) -> String {
    format!("'{name}' expects {expected} argument(s), found {found}")
}

fn out_of_range(span: Span) -> ParseError {
    ParseError {
        message: "integer literal out of range for a 32-bit Int".to_string(),
        span,
    }
}

fn unclosed(what: &str, open: Span) -> ParseError {
    ParseError {
        message: format!("unclosed {what}"),
        span: open,
    }
}

/// Every call must name a function defined somewhere in the program or a built-in,
/// with the matching number of arguments.
fn resolve_calls(program: &Program) -> Result<(), ParseError> {
    let mut arities: HashMap<&str, usize> = HashMap::new();
    for f in program.functions() {
        if arities.insert(&f.name.node, f.params.len()).is_some() {
            return Err(ParseError {
                message: format!("duplicate function '{}'", f.name.node),
                span: f.name.span,
            });
        }
    }

    let mut first_error = None;
    let mut check = |expr: &Expr| {
        if first_error.is_some() {
            return;
        }
        let ExprKind::Call { callee, args } = &expr.kind else {
            return;
        };
        let expected = match arities.get(callee.node.as_str()) {
            Some(n) => *n,
            None => match builtins::lookup(&callee.node) {
                Some(b) => b.arity(),
                None => {
                    first_error = Some(ParseError {
                        message: format!("unknown built-in call '{}'", callee.node),
                        span: callee.span,
                    });
                    return;
                }
            },
        };
        if args.len() != expected {
            first_error = Some(ParseError {
                message: arity_message(&callee.node, expected, args.len()),
                span: expr.span,
            });
        }
    };

    for item in &program.items {
        match item {
            Item::Function(f) => {
                for clause in &f.clauses {
                    walk_expr(&clause.cond, &mut check);
                    walk_expr(&clause.body, &mut check);
                }
            }
            Item::Stmt(e) => walk_expr(e, &mut check),
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
