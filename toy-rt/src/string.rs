#![forbid(unsafe_code)]

use crate::error::RuntimeError;
use crate::heap::{Handle, Heap, Object};
use crate::output::format_decimal;

/// Growable byte string. `capacity` counts the terminating NUL the native layout keeps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtString {
    bytes: Vec<u8>,
    capacity: usize,
}

impl RtString {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        let capacity = bytes.len() + 1;
        RtString { bytes, capacity }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn extend(&mut self, extra: &[u8]) {
        let needed = self.bytes.len() + extra.len() + 1;
        while self.capacity < needed {
            self.capacity *= 2;
        }
        self.bytes.extend_from_slice(extra);
    }
}

/// A string argument: either literal data baked into the program or a heap string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Text<'a> {
    Literal(&'a [u8]),
    Handle(Handle),
}

impl<'a> From<&'a str> for Text<'a> {
    fn from(s: &'a str) -> Self {
        Text::Literal(s.as_bytes())
    }
}

impl From<Handle> for Text<'_> {
    fn from(h: Handle) -> Self {
        Text::Handle(h)
    }
}

/// Half-open `[begin, end)` clamped into `[0, size]`; an inverted range is empty.
pub fn clamp_range(begin: i32, end: i32, size: usize) -> (usize, usize) {
    let clamp = |i: i32| usize::try_from(i.max(0)).unwrap_or(0).min(size);
    let b = clamp(begin);
    let e = clamp(end).max(b);
    (b, e)
}

impl Heap {
    fn alloc_string(&mut self, bytes: Vec<u8>) -> Result<Handle, RuntimeError> {
        self.alloc(Object::String(RtString::new(bytes)))
    }

    pub fn string_new(&mut self, s: &str) -> Result<Handle, RuntimeError> {
        self.alloc_string(s.as_bytes().to_vec())
    }

    pub fn string_bytes(&self, h: Handle) -> Result<&[u8], RuntimeError> {
        Ok(self.string(h)?.as_bytes())
    }

    pub fn string_capacity(&self, h: Handle) -> Result<usize, RuntimeError> {
        Ok(self.string(h)?.capacity())
    }

    pub fn text_bytes<'s>(&'s self, t: Text<'s>) -> Result<&'s [u8], RuntimeError> {
        match t {
            Text::Literal(bytes) => Ok(bytes),
            Text::Handle(h) => self.string_bytes(h),
        }
    }

    /// `String(s)`: a fresh heap copy.
    pub fn string_copy(&mut self, s: Text<'_>) -> Result<Handle, RuntimeError> {
        let bytes = self.text_bytes(s)?.to_vec();
        self.alloc_string(bytes)
    }

    pub fn int2str(&mut self, n: i32) -> Result<Handle, RuntimeError> {
        self.alloc_string(format_decimal(n))
    }

    pub fn concat(&mut self, a: Text<'_>, b: Text<'_>) -> Result<Handle, RuntimeError> {
        let mut bytes = self.text_bytes(a)?.to_vec();
        bytes.extend_from_slice(self.text_bytes(b)?);
        self.alloc_string(bytes)
    }

    pub fn substr(&mut self, s: Text<'_>, begin: i32, end: i32) -> Result<Handle, RuntimeError> {
        let src = self.text_bytes(s)?;
        let (b, e) = clamp_range(begin, end, src.len());
        let bytes = src[b..e].to_vec();
        self.alloc_string(bytes)
    }

    pub fn revstr(&mut self, s: Text<'_>) -> Result<Handle, RuntimeError> {
        let mut bytes = self.text_bytes(s)?.to_vec();
        bytes.reverse();
        self.alloc_string(bytes)
    }

    /// A copy of `s` with the bytes in `[begin, end)` upper-cased.
    pub fn upper(&mut self, s: Text<'_>, begin: i32, end: i32) -> Result<Handle, RuntimeError> {
        self.map_range(s, begin, end, u8::to_ascii_uppercase)
    }

    /// A copy of `s` with the bytes in `[begin, end)` lower-cased.
    pub fn lower(&mut self, s: Text<'_>, begin: i32, end: i32) -> Result<Handle, RuntimeError> {
        self.map_range(s, begin, end, u8::to_ascii_lowercase)
    }

    fn map_range(
        &mut self,
        s: Text<'_>,
        begin: i32,
        end: i32,
        f: fn(&u8) -> u8,
    ) -> Result<Handle, RuntimeError> {
        let mut bytes = self.text_bytes(s)?.to_vec();
        let (b, e) = clamp_range(begin, end, bytes.len());
        for byte in &mut bytes[b..e] {
            *byte = f(byte);
        }
        self.alloc_string(bytes)
    }

    pub fn len(&self, s: Text<'_>) -> Result<i32, RuntimeError> {
        Ok(self.text_bytes(s)?.len() as i32)
    }

    /// Appends `s2` to `s` in place, doubling capacity as needed. Takes ownership of `s`
    /// and returns the handle that now owns the result.
    pub fn append(&mut self, s: Handle, s2: Text<'_>) -> Result<Handle, RuntimeError> {
        let extra = self.text_bytes(s2)?.to_vec();
        self.string_mut(s)?.extend(&extra);
        Ok(s)
    }

    pub fn free_str(&mut self, s: Handle) -> Result<(), RuntimeError> {
        self.release(s, |o| matches!(o, Object::String(_)), "a string")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(heap: &Heap, h: Handle) -> String {
        String::from_utf8(heap.string_bytes(h).unwrap().to_vec()).unwrap()
    }

    #[test]
    fn constructors_never_touch_their_inputs() {
        let mut heap = Heap::new();
        let a = heap.string_new("Hello").unwrap();
        let c = heap.concat(a.into(), ", world".into()).unwrap();
        let r = heap.revstr(a.into()).unwrap();
        let u = heap.upper(a.into(), 1, 3).unwrap();
        let l = heap.lower(a.into(), 0, 99).unwrap();

        assert_eq!(text(&heap, a), "Hello");
        assert_eq!(text(&heap, c), "Hello, world");
        assert_eq!(text(&heap, r), "olleH");
        assert_eq!(text(&heap, u), "HELlo");
        assert_eq!(text(&heap, l), "hello");
        assert_eq!(heap.live_objects(), 5);
    }

    #[test]
    fn substr_is_half_open_and_clamped() {
        let mut heap = Heap::new();
        let s = heap.string_new("abcdef").unwrap();
        let mid = heap.substr(s.into(), 1, 4).unwrap();
        let wide = heap.substr(s.into(), -5, 100).unwrap();
        let inverted = heap.substr(s.into(), 4, 2).unwrap();
        assert_eq!(text(&heap, mid), "bcd");
        assert_eq!(text(&heap, wide), "abcdef");
        assert_eq!(text(&heap, inverted), "");
    }

    #[test]
    fn int2str_handles_the_edges() {
        let mut heap = Heap::new();
        let zero = heap.int2str(0).unwrap();
        let min = heap.int2str(i32::MIN).unwrap();
        assert_eq!(text(&heap, zero), "0");
        assert_eq!(text(&heap, min), "-2147483648");
    }

    #[test]
    fn append_grows_by_doubling_and_keeps_the_handle() {
        let mut heap = Heap::new();
        let s = heap.string_new("ab").unwrap();
        assert_eq!(heap.string_capacity(s).unwrap(), 3);

        let t = heap.append(s, "cd".into()).unwrap();
        assert_eq!(t, s);
        assert_eq!(text(&heap, t), "abcd");
        assert_eq!(heap.string_capacity(t).unwrap(), 6);

        let t = heap.append(t, t.into()).unwrap();
        assert_eq!(text(&heap, t), "abcdabcd");
        assert_eq!(heap.string_capacity(t).unwrap(), 12);
        assert_eq!(heap.len(t.into()).unwrap(), 8);
    }

    #[test]
    fn free_str_rejects_arrays() {
        let mut heap = Heap::new();
        let a = heap.array_new(1).unwrap();
        assert!(matches!(
            heap.free_str(a),
            Err(RuntimeError::WrongObject { .. })
        ));
        assert!(heap.is_live(a));
    }
}
