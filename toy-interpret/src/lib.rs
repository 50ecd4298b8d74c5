#![forbid(unsafe_code)]

mod error;
mod eval;
mod value;

pub use error::EvalError;
pub use eval::{DEFAULT_MAX_DEPTH, ExecOutcome, Interpreter, InterpreterConfig};
pub use value::Value;

/// Parse, check and evaluate `src`, collecting output in memory.
pub fn run_source(src: &str) -> miette::Result<(ExecOutcome, String)> {
    let checked = toy_core::check_source(src)?;
    let mut interp = Interpreter::new(toy_rt::BufferSink::new());
    let outcome = interp.run(&checked)?;
    Ok((outcome, interp.into_sink().into_string()))
}
