#![deny(unsafe_op_in_unsafe_fn)]
#![allow(non_snake_case, clippy::missing_safety_doc)]

//! The runtime library as assembled programs link it.
//!
//! Every routine generated code calls is exported under its own unmangled name with the
//! cdecl convention, so `nasm -f elf32` output links against `libtoy_rt_native.a`.
//!
//! - A String is a NUL-terminated `char*` owned by this library. String literals from
//!   the program's data section are accepted wherever text is only read.
//! - An Array is an opaque pointer.
//! - An element position takes a value word followed by its tag (0 INT, 1 STRING,
//!   2 ARRAY).
//!
//! Every entry point shares one contract: pointer arguments are null (Undef) or values
//! this library handed out and that are still live, and literals are only passed where
//! text is read. Compiled programs get that from the ownership checker; nothing here
//! can verify it.

pub mod array;
pub mod string;

pub use array::NativeArray;

/// One machine word: an Int, or the address of a string or an array.
pub type Word = isize;

/// Ends the program on an error generated code has no way to handle.
fn fail(err: toy_rt::RuntimeError) -> ! {
    eprintln!("{err}");
    std::process::exit(1)
}
