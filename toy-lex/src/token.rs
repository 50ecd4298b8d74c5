#![forbid(unsafe_code)]

use std::fmt;

use toy_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwTrue,
    KwFalse,
    KwUndef,
    KwAnd,
    KwOr,
    KwNot,

    // Operators / punctuation
    Arrow,
    EqEq,
    Neq,
    Le,
    Ge,
    Lt,
    Gt,
    Eq,

    Plus,
    Minus,
    Star,
    Slash,

    DotDot,
    Comma,
    Colon,
    Semi,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,

    // Literals / identifiers
    Ident(String),
    Int(u64),
    String(String),
}

impl TokenKind {
    /// Short human-readable form used in parser diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::KwTrue => "'True'".to_string(),
            TokenKind::KwFalse => "'False'".to_string(),
            TokenKind::KwUndef => "'Undef'".to_string(),
            TokenKind::KwAnd => "'and'".to_string(),
            TokenKind::KwOr => "'or'".to_string(),
            TokenKind::KwNot => "'not'".to_string(),
            TokenKind::Arrow => "'->'".to_string(),
            TokenKind::EqEq => "'=='".to_string(),
            TokenKind::Neq => "'!='".to_string(),
            TokenKind::Le => "'<='".to_string(),
            TokenKind::Ge => "'>='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::Eq => "'='".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::DotDot => "'..'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Semi => "';'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Int(n) => format!("integer {n}"),
            TokenKind::String(_) => "string literal".to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.span.offset();
        let end = start + self.span.len();
        write!(f, "{start}..{end}\t{:?}", self.kind)
    }
}
