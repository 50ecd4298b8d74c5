#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;
use toy_ast::Span;

#[derive(Debug, Error, Diagnostic)]
#[error("semantic error: {message}")]
#[diagnostic(code(toy::sema))]
#[allow(unused_assignments)]
pub struct SemanticError {
    pub message: String,
    #[label]
    pub span: Span,
}

/// A heap value that is never released. Reported, not fatal, unless leaks are denied.
#[derive(Clone, Debug, Error, Diagnostic)]
#[error("ownership warning: {message}")]
#[diagnostic(code(toy::leak), severity(Warning))]
#[allow(unused_assignments)]
pub struct OwnershipWarning {
    pub message: String,
    #[label]
    pub span: Span,
}

impl From<OwnershipWarning> for SemanticError {
    fn from(w: OwnershipWarning) -> Self {
        SemanticError {
            message: format!("leaks are denied: {}", w.message),
            span: w.span,
        }
    }
}
