#![forbid(unsafe_code)]

use std::str::FromStr;

use target_lexicon::{Architecture, OperatingSystem, Triple};

use crate::error::BackendError;

pub const DEFAULT_TARGET: &str = "i686-unknown-linux-gnu";

/// Parses `triple` and checks it names 32-bit x86 Linux, the only target whose
/// `int 0x80` syscall numbers the emitted code uses.
pub fn validate_target(triple: &str) -> Result<Triple, BackendError> {
    let parsed = Triple::from_str(triple)
        .map_err(|e| BackendError::new(format!("invalid target triple '{triple}': {e}")))?;

    if !matches!(parsed.architecture, Architecture::X86_32(_)) {
        return Err(BackendError::new(format!(
            "unsupported target '{triple}': architecture {} is not 32-bit x86",
            parsed.architecture
        )));
    }
    if parsed.operating_system != OperatingSystem::Linux {
        return Err(BackendError::new(format!(
            "unsupported target '{triple}': only Linux system calls are emitted"
        )));
    }
    Ok(parsed)
}
