//! Array entry points. An array is a boxed [`NativeArray`] whose address generated code
//! passes around without looking inside.

use std::collections::{HashMap, HashSet};
use std::ffi::{CStr, c_char, c_int};
use std::io;

use toy_rt::{ElementTag, RuntimeError, WriteSink, clamp_range, format_decimal};

use crate::string::{duplicate, free_str, into_raw, text};
use crate::{Word, fail};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Slot {
    value: Word,
    tag: ElementTag,
}

impl Slot {
    /// A null string or array is stored as the integer 0, as the handle heap does.
    fn new(value: Word, tag: c_int) -> Slot {
        let tag = match ElementTag::from_raw(tag) {
            Some(tag) if value != 0 => tag,
            _ => ElementTag::Int,
        };
        Slot { value, tag }
    }
}

#[derive(Clone, Debug, Default)]
pub struct NativeArray {
    slots: Vec<Slot>,
}

type ArrayPtr = *mut NativeArray;

impl NativeArray {
    fn index(&self, i: c_int, inclusive_end: bool) -> usize {
        let size = self.slots.len();
        let limit = if inclusive_end { size + 1 } else { size };
        match usize::try_from(i) {
            Ok(i) if i < limit => i,
            _ => fail(RuntimeError::IndexOutOfRange { index: i, size }),
        }
    }
}

fn into_raw_array(slots: Vec<Slot>) -> ArrayPtr {
    Box::into_raw(Box::new(NativeArray { slots }))
}

/// Elements of `a`; Undef reads as empty.
unsafe fn slots<'a>(a: ArrayPtr) -> &'a [Slot] {
    // SAFETY: the caller passes null or a live array.
    match unsafe { a.as_ref() } {
        Some(arr) => &arr.slots,
        None => &[],
    }
}

/// Writes to Undef are dropped.
unsafe fn with_array<R: Default>(a: ArrayPtr, f: impl FnOnce(&mut NativeArray) -> R) -> R {
    // SAFETY: the caller passes null or a live array nothing else is borrowing.
    match unsafe { a.as_mut() } {
        Some(arr) => f(arr),
        None => R::default(),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn Array_new(n: c_int) -> ArrayPtr {
    let capacity = usize::try_from(n).unwrap_or(0).max(1);
    into_raw_array(Vec::with_capacity(capacity))
}

/// Shallow: the copy shares every string and nested array with `a`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Copy(a: ArrayPtr) -> ArrayPtr {
    into_raw_array(unsafe { slots(a) }.to_vec())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Slice(a: ArrayPtr, begin: c_int, end: c_int) -> ArrayPtr {
    let src = unsafe { slots(a) };
    let (b, e) = clamp_range(begin, end, src.len());
    into_raw_array(src[b..e].to_vec())
}

/// Everything after the first element, copied all the way down. An array met twice is
/// copied once, so cycles come out as cycles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn Tail(a: ArrayPtr) -> ArrayPtr {
    let rest = unsafe { slots(a) }.get(1..).unwrap_or_default().to_vec();
    let copy = into_raw_array(Vec::with_capacity(rest.len()));
    let mut copies = HashMap::from([(a, copy)]);
    unsafe { fill_deep(copy, rest, &mut copies) };
    copy
}

unsafe fn fill_deep(into: ArrayPtr, elems: Vec<Slot>, copies: &mut HashMap<ArrayPtr, ArrayPtr>) {
    for slot in elems {
        let value = match slot.tag {
            ElementTag::Int => slot.value,
            ElementTag::String => (unsafe { duplicate(slot.value as *const c_char) }) as Word,
            ElementTag::Array => {
                let src = slot.value as ArrayPtr;
                match copies.get(&src) {
                    Some(&done) => done as Word,
                    None => {
                        let inner = unsafe { slots(src) }.to_vec();
                        let copy = into_raw_array(Vec::with_capacity(inner.len()));
                        copies.insert(src, copy);
                        unsafe { fill_deep(copy, inner, copies) };
                        copy as Word
                    }
                }
            }
        };
        unsafe { with_array(into, |arr| arr.slots.push(Slot { value, ..slot })) };
    }
}

/// Releases `a` with every string and array it reaches. Shared and cyclic arrays are
/// released once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_array(a: ArrayPtr) {
    unsafe { release(a, &mut HashSet::new()) }
}

unsafe fn release(a: ArrayPtr, released: &mut HashSet<ArrayPtr>) {
    if a.is_null() || !released.insert(a) {
        return;
    }
    // SAFETY: `a` came from `into_raw_array` and the caller gives it up.
    let arr = unsafe { Box::from_raw(a) };
    for slot in arr.slots {
        match slot.tag {
            ElementTag::Int => {}
            ElementTag::String => unsafe { free_str(slot.value as *mut c_char) },
            ElementTag::Array => unsafe { release(slot.value as ArrayPtr, released) },
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn put(a: ArrayPtr, i: c_int, value: Word, tag: c_int) {
    unsafe {
        with_array(a, |arr| {
            let i = arr.index(i, false);
            arr.slots[i] = Slot::new(value, tag);
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn push(a: ArrayPtr, value: Word, tag: c_int) {
    unsafe { with_array(a, |arr| arr.slots.push(Slot::new(value, tag))) }
}

/// Removes the last element and returns its value word; 0 on an empty array.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pop(a: ArrayPtr) -> Word {
    unsafe { with_array(a, |arr| arr.slots.pop().map_or(0, |s| s.value)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn shift(a: ArrayPtr) -> Word {
    unsafe {
        with_array(a, |arr| {
            if arr.slots.is_empty() {
                0
            } else {
                arr.slots.remove(0).value
            }
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn unshift(a: ArrayPtr, value: Word, tag: c_int) -> c_int {
    unsafe {
        with_array(a, |arr| {
            arr.slots.insert(0, Slot::new(value, tag));
            arr.slots.len() as c_int
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn insert(a: ArrayPtr, i: c_int, value: Word, tag: c_int) {
    unsafe {
        with_array(a, |arr| {
            let i = arr.index(i, true);
            arr.slots.insert(i, Slot::new(value, tag));
        })
    }
}

/// Drops the element at `i` from the array without releasing it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn remove_at(a: ArrayPtr, i: c_int) {
    unsafe {
        with_array(a, |arr| {
            let i = arr.index(i, false);
            arr.slots.remove(i);
        })
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn reverse(a: ArrayPtr) {
    unsafe { with_array(a, |arr| arr.slots.reverse()) }
}

/// Stable ascending sort by value word.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sort(a: ArrayPtr) {
    unsafe { with_array(a, |arr| arr.slots.sort_by_key(|s| s.value)) }
}

unsafe fn element(a: ArrayPtr, i: c_int) -> Slot {
    // SAFETY: the caller passes null or a live array.
    let arr = match unsafe { a.as_ref() } {
        Some(arr) => arr,
        None => fail(RuntimeError::IndexOutOfRange { index: i, size: 0 }),
    };
    arr.slots[arr.index(i, false)]
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn get(a: ArrayPtr, i: c_int) -> Word {
    unsafe { element(a, i) }.value
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_type(a: ArrayPtr, i: c_int) -> *const c_char {
    let name: &'static CStr = match unsafe { element(a, i) }.tag {
        ElementTag::Int => c"INT",
        ElementTag::String => c"STRING",
        ElementTag::Array => c"ARRAY",
    };
    name.as_ptr()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn size(a: ArrayPtr) -> c_int {
    unsafe { slots(a) }.len() as c_int
}

/// `[1, 2, abc, [3]]`, with `[...]` for an array reached again while it is being
/// rendered.
unsafe fn render(a: ArrayPtr, out: &mut Vec<u8>, path: &mut Vec<ArrayPtr>) {
    if path.contains(&a) {
        out.extend_from_slice(b"[...]");
        return;
    }
    path.push(a);
    out.push(b'[');
    for (i, slot) in unsafe { slots(a) }.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(b", ");
        }
        match slot.tag {
            ElementTag::Int => out.extend_from_slice(&format_decimal(slot.value as i32)),
            ElementTag::String => out.extend_from_slice(unsafe { text(slot.value as *const c_char) }),
            ElementTag::Array => unsafe { render(slot.value as ArrayPtr, out, path) },
        }
    }
    out.push(b']');
    path.pop();
}

unsafe fn rendering(a: ArrayPtr) -> Vec<u8> {
    let mut out = Vec::new();
    unsafe { render(a, &mut out, &mut Vec::new()) };
    out
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn stringify(a: ArrayPtr) -> *mut c_char {
    into_raw(unsafe { rendering(a) })
}

/// Writes through to stdout a byte at a time, so it interleaves with the program's own
/// `write` system calls.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn print_array(a: ArrayPtr) {
    let bytes = unsafe { rendering(a) };
    let mut sink = WriteSink::new(io::stdout().lock());
    if let Err(err) = toy_rt::print_str(&mut sink, &bytes) {
        fail(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::{Concat, String as new_string};

    const INT: c_int = 0;
    const STRING: c_int = 1;
    const ARRAY: c_int = 2;

    fn read(s: *const c_char) -> std::string::String {
        std::string::String::from_utf8_lossy(unsafe { text(s) }).into_owned()
    }

    fn shown(a: ArrayPtr) -> std::string::String {
        let s = unsafe { stringify(a) };
        let out = read(s);
        unsafe { free_str(s) };
        out
    }

    #[test]
    fn stack_and_queue_operations() {
        unsafe {
            let a = Array_new(0);
            for n in [3, 1, 2] {
                push(a, n, INT);
            }
            assert_eq!(unshift(a, 9, INT), 4);
            insert(a, 4, 7, INT);
            assert_eq!(shown(a), "[9, 3, 1, 2, 7]");

            sort(a);
            assert_eq!(shown(a), "[1, 2, 3, 7, 9]");
            assert_eq!(pop(a), 9);
            assert_eq!(shift(a), 1);
            reverse(a);
            remove_at(a, 0);
            assert_eq!(shown(a), "[3, 2]");
            assert_eq!(size(a), 2);
            put(a, 1, 5, INT);
            assert_eq!(get(a, 1), 5);

            let empty = Array_new(4);
            assert_eq!(pop(empty), 0);
            assert_eq!(shift(empty), 0);

            free_array(a);
            free_array(empty);
        }
    }

    #[test]
    fn elements_keep_their_tags() {
        unsafe {
            let inner = Array_new(1);
            push(inner, 3, INT);
            let a = Array_new(3);
            push(a, 1, INT);
            push(a, new_string(c"abc".as_ptr()) as Word, STRING);
            push(a, inner as Word, ARRAY);
            push(a, 0, STRING);

            assert_eq!(shown(a), "[1, abc, [3], 0]");
            let kinds: Vec<_> = (0..4)
                .map(|i| CStr::from_ptr(get_type(a, i)).to_str().unwrap())
                .collect();
            assert_eq!(kinds, ["INT", "STRING", "ARRAY", "INT"]);

            free_array(a);
        }
    }

    #[test]
    fn copy_is_shallow_and_slice_clamps() {
        unsafe {
            let inner = Array_new(1);
            let a = Array_new(3);
            push(a, 1, INT);
            push(a, inner as Word, ARRAY);
            push(a, 3, INT);

            let c = Copy(a);
            assert_eq!(get(c, 1), inner as Word);
            let s = Slice(a, -5, 99);
            assert_eq!(size(s), 3);
            let s2 = Slice(a, 2, 1);
            assert_eq!(size(s2), 0);

            // The copies share `inner`, so only the original releases it.
            drop(Box::from_raw(c));
            drop(Box::from_raw(s));
            free_array(s2);
            free_array(a);
        }
    }

    #[test]
    fn tail_copies_nested_values() {
        unsafe {
            let inner = Array_new(1);
            push(inner, new_string(c"b".as_ptr()) as Word, STRING);
            let a = Array_new(3);
            push(a, new_string(c"a".as_ptr()) as Word, STRING);
            push(a, inner as Word, ARRAY);
            push(a, 3, INT);

            let t = Tail(a);
            assert_eq!(shown(t), "[[b], 3]");
            assert_ne!(get(t, 0), inner as Word);

            free_array(a);
            assert_eq!(shown(t), "[[b], 3]");
            free_array(t);

            let short = Array_new(1);
            let empty = Tail(short);
            assert_eq!(size(empty), 0);
            free_array(short);
            free_array(empty);
        }
    }

    #[test]
    fn cycles_render_copy_and_free_once() {
        unsafe {
            let a = Array_new(2);
            push(a, 1, INT);
            push(a, a as Word, ARRAY);
            assert_eq!(shown(a), "[1, [...]]");

            let shared = Concat(c"x".as_ptr(), c"y".as_ptr());
            let b = Array_new(2);
            push(b, 0, INT);
            push(b, a as Word, ARRAY);
            push(b, shared as Word, STRING);

            let t = Tail(b);
            assert_eq!(shown(t), "[[1, [...]], xy]");
            let copied = get(t, 0) as ArrayPtr;
            assert_eq!(get(copied, 1), copied as Word);

            free_array(t);
            free_array(b);
        }
    }
}
