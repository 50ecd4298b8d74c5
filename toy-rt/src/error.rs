#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

use crate::heap::Handle;

#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    #[error("runtime error: handle {0} does not refer to a live object")]
    #[diagnostic(code(toy::rt::dangling))]
    DanglingHandle(Handle),

    #[error("runtime error: handle {0} released twice")]
    #[diagnostic(code(toy::rt::double_free))]
    DoubleFree(Handle),

    #[error("runtime error: handle {handle} is not {expected}")]
    #[diagnostic(code(toy::rt::wrong_object))]
    WrongObject {
        handle: Handle,
        expected: &'static str,
    },

    #[error("runtime error: index {index} out of range for array of size {size}")]
    #[diagnostic(code(toy::rt::index))]
    IndexOutOfRange { index: i32, size: usize },

    #[error("runtime error: heap handle space exhausted")]
    #[diagnostic(code(toy::rt::exhausted))]
    HeapExhausted,

    #[error("runtime error: output failed: {0}")]
    #[diagnostic(code(toy::rt::output))]
    Output(#[from] std::io::Error),
}
