#![forbid(unsafe_code)]

//! NASM 32-bit x86 code generation for checked guard-language programs.

mod emit;
mod error;
mod frame;
mod target;

use miette::IntoDiagnostic;

pub use emit::{EmitOptions, emit_program};
pub use error::BackendError;
pub use frame::{Frame, Slot};
pub use target::{DEFAULT_TARGET, validate_target};

/// Parse, check and emit in one step.
pub fn compile_source(src: &str, options: &EmitOptions) -> miette::Result<String> {
    let checked = toy_core::check_source(src)?;
    emit_program(&checked, options).into_diagnostic()
}
