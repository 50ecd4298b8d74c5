#![forbid(unsafe_code)]

//! Native runtime for compiled guard-language programs: growable strings, tagged
//! dynamic arrays and decimal output, all owned by a handle-based [`Heap`].

mod array;
mod error;
mod heap;
mod output;
mod string;
pub mod symbols;

pub use array::RtArray;
pub use error::RuntimeError;
pub use heap::{Element, ElementTag, Handle, Heap};
pub use output::{BufferSink, CharSink, WriteSink, format_decimal, print_i, print_str};
pub use string::{RtString, Text, clamp_range};

/// `print_array(a)`: writes the `stringify` rendering of `a`.
pub fn print_array(
    sink: &mut impl CharSink,
    heap: &Heap,
    a: Handle,
) -> Result<(), RuntimeError> {
    for byte in heap.render_array(a)? {
        sink.put_char(byte)?;
    }
    Ok(())
}
