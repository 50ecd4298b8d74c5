#![forbid(unsafe_code)]

mod checker;
mod error;
mod kinds;
mod ownership;
mod scope;

use miette::IntoDiagnostic;

pub use checker::{
    Annotations, BindingRecord, CheckOptions, CheckedProgram, Checker, ScopeRecord, accepts_kind,
};
pub use error::{OwnershipWarning, SemanticError};
pub use kinds::{FunctionKinds, KindFacts, ValueKind, infer_kinds, is_temporary};
pub use ownership::{
    Assignment, LifecycleState, OwnershipBinding, OwnershipContext, OwnershipViolation,
    ViolationKind,
};
pub use scope::Scopes;

/// Parse and check in one step.
pub fn check_source(src: &str) -> miette::Result<CheckedProgram> {
    let program = toy_parse::parse_source(src)?;
    Checker::new().check_program(&program).into_diagnostic()
}
