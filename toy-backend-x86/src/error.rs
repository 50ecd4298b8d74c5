#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("x86 backend error: {message}")]
#[diagnostic(code(toy::backend_x86))]
#[allow(unused_assignments)]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        BackendError {
            message: message.into(),
        }
    }
}
