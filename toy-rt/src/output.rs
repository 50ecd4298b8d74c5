#![forbid(unsafe_code)]

use std::io::Write;

use crate::error::RuntimeError;

/// The single-character output primitive every printing routine is built on.
pub trait CharSink {
    fn put_char(&mut self, byte: u8) -> Result<(), RuntimeError>;
}

impl<S: CharSink + ?Sized> CharSink for &mut S {
    fn put_char(&mut self, byte: u8) -> Result<(), RuntimeError> {
        (**self).put_char(byte)
    }
}

/// Writes straight through to `W`, flushing after every byte.
pub struct WriteSink<W: Write> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        WriteSink { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> CharSink for WriteSink<W> {
    fn put_char(&mut self, byte: u8) -> Result<(), RuntimeError> {
        self.inner.write_all(&[byte])?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Collects output in memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferSink {
    bytes: Vec<u8>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl CharSink for BufferSink {
    fn put_char(&mut self, byte: u8) -> Result<(), RuntimeError> {
        self.bytes.push(byte);
        Ok(())
    }
}

/// Decimal digits of `n`, exactly as the generated `print_i` routine produces them.
///
/// The sign is read from the top bit. Negation wraps, and digits are extracted from the
/// unsigned magnitude, so `i32::MIN` prints as `-2147483648`. Ten digits are always
/// pushed (least significant first), then leading zeros are dropped down to one digit.
pub fn format_decimal(n: i32) -> Vec<u8> {
    let bits = n as u32;
    let negative = bits & 0x8000_0000 != 0;
    let mut magnitude = if negative { bits.wrapping_neg() } else { bits };

    let mut stack = [0u8; 10];
    for digit in stack.iter_mut() {
        *digit = (magnitude % 10) as u8;
        magnitude /= 10;
    }

    let mut top = stack.len();
    while top > 1 && stack[top - 1] == 0 {
        top -= 1;
    }

    let mut out = Vec::with_capacity(top + 1);
    if negative {
        out.push(b'-');
    }
    while top > 0 {
        top -= 1;
        out.push(b'0' + stack[top]);
    }
    out
}

pub fn print_i(sink: &mut impl CharSink, n: i32) -> Result<(), RuntimeError> {
    for byte in format_decimal(n) {
        sink.put_char(byte)?;
    }
    Ok(())
}

/// Writes bytes up to (not including) the first NUL.
pub fn print_str(sink: &mut impl CharSink, bytes: &[u8]) -> Result<(), RuntimeError> {
    for &byte in bytes.iter().take_while(|b| **b != 0) {
        sink.put_char(byte)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(n: i32) -> String {
        String::from_utf8(format_decimal(n)).unwrap()
    }

    #[test]
    fn zero_keeps_one_digit() {
        assert_eq!(decimal(0), "0");
    }

    #[test]
    fn int_min_prints_its_full_magnitude() {
        assert_eq!(decimal(i32::MIN), "-2147483648");
        assert_eq!(decimal(i32::MAX), "2147483647");
    }

    #[test]
    fn interior_zeros_survive_the_strip() {
        assert_eq!(decimal(1000000007), "1000000007");
        assert_eq!(decimal(-10), "-10");
    }

    #[test]
    fn print_str_stops_at_nul() {
        let mut sink = BufferSink::new();
        print_str(&mut sink, b"ab\0cd").unwrap();
        print_i(&mut sink, -7).unwrap();
        assert_eq!(sink.into_string(), "ab-7");
    }

    #[test]
    fn write_sink_passes_bytes_through() {
        let mut sink = WriteSink::new(Vec::new());
        print_i(&mut sink, 42).unwrap();
        assert_eq!(sink.into_inner(), b"42");
    }
}
