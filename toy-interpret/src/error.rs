#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;
use toy_ast::Span;
use toy_rt::RuntimeError;

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum EvalError {
    #[error("evaluation error: division by zero")]
    #[diagnostic(code(toy::eval::div_zero))]
    DivisionByZero {
        #[label("divisor is zero")]
        span: Span,
    },

    #[error("evaluation error: -2147483648 / -1 overflows")]
    #[diagnostic(code(toy::eval::div_overflow))]
    DivisionOverflow {
        #[label]
        span: Span,
    },

    #[error("evaluation error: recursion deeper than {depth} calls")]
    #[diagnostic(
        code(toy::eval::stack_overflow),
        help("raise `max_depth` under [run] in toy.toml")
    )]
    StackOverflow {
        depth: usize,
        #[label("this call exceeds the limit")]
        span: Span,
    },

    #[error("evaluation error: Undef used where {expected} was expected")]
    #[diagnostic(code(toy::eval::null_handle))]
    NullHandle {
        expected: &'static str,
        #[label]
        span: Span,
    },

    #[error("evaluation error: a string literal has no address to compare")]
    #[diagnostic(code(toy::eval::literal_compare))]
    LiteralComparison {
        #[label]
        span: Span,
    },

    #[error("evaluation error: binding '{name}' has no value")]
    #[diagnostic(code(toy::eval::unbound))]
    Unbound {
        name: String,
        #[label]
        span: Span,
    },

    #[error("evaluation error: no definition for '{name}'")]
    #[diagnostic(code(toy::eval::unknown_call))]
    UnknownCall {
        name: String,
        #[label]
        span: Span,
    },

    /// Raised by `exit(n)` to unwind every pending call. [`Interpreter::run`] turns it
    /// into the outcome, so it never reaches callers.
    ///
    /// [`Interpreter::run`]: crate::Interpreter::run
    #[error("program exited with status {status}")]
    #[diagnostic(code(toy::eval::exit))]
    Exit {
        status: i32,
        #[label]
        span: Span,
    },

    #[error("evaluation error: {source}")]
    #[diagnostic(code(toy::eval::runtime))]
    Runtime {
        source: RuntimeError,
        #[label]
        span: Span,
    },
}

/// Attaches the span of the expression that made a runtime call.
pub(crate) trait At<T> {
    fn at(self, span: Span) -> Result<T, EvalError>;
}

impl<T> At<T> for Result<T, RuntimeError> {
    fn at(self, span: Span) -> Result<T, EvalError> {
        self.map_err(|source| EvalError::Runtime { source, span })
    }
}
