//! String entry points. Each result is a fresh `CString` given to the caller, and
//! `free_str` and `append` take one back.

use std::ffi::{CStr, CString, c_char, c_int};

use toy_rt::{clamp_range, format_decimal};

/// The bytes of a NUL-terminated string. Undef (null) reads as empty.
///
/// # Safety
/// `s` is null or points to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn text<'a>(s: *const c_char) -> &'a [u8] {
    if s.is_null() {
        return &[];
    }
    // SAFETY: non-null, and the caller vouches for termination and lifetime.
    unsafe { CStr::from_ptr(s) }.to_bytes()
}

/// Gives `bytes` to the caller as a new string. Anything after an interior NUL is
/// unreachable through a `char*` and is dropped.
pub(crate) fn into_raw(mut bytes: Vec<u8>) -> *mut c_char {
    if let Some(nul) = bytes.iter().position(|&b| b == 0) {
        bytes.truncate(nul);
    }
    CString::new(bytes).unwrap_or_default().into_raw()
}

pub(crate) unsafe fn duplicate(s: *const c_char) -> *mut c_char {
    into_raw(unsafe { text(s) }.to_vec())
}

fn map_range(src: &[u8], begin: c_int, end: c_int, f: fn(&u8) -> u8) -> *mut c_char {
    let mut bytes = src.to_vec();
    let (b, e) = clamp_range(begin, end, bytes.len());
    for byte in &mut bytes[b..e] {
        *byte = f(byte);
    }
    into_raw(bytes)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn String(s: *const c_char) -> *mut c_char {
    unsafe { duplicate(s) }
}

#[unsafe(no_mangle)]
pub extern "C" fn Int2str(n: c_int) -> *mut c_char {
    into_raw(format_decimal(n))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Concat(a: *const c_char, b: *const c_char) -> *mut c_char {
    let mut bytes = unsafe { text(a) }.to_vec();
    bytes.extend_from_slice(unsafe { text(b) });
    into_raw(bytes)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Substr(s: *const c_char, begin: c_int, end: c_int) -> *mut c_char {
    let src = unsafe { text(s) };
    let (b, e) = clamp_range(begin, end, src.len());
    into_raw(src[b..e].to_vec())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Revstr(s: *const c_char) -> *mut c_char {
    let mut bytes = unsafe { text(s) }.to_vec();
    bytes.reverse();
    into_raw(bytes)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Upper(s: *const c_char, begin: c_int, end: c_int) -> *mut c_char {
    map_range(unsafe { text(s) }, begin, end, u8::to_ascii_uppercase)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn Lower(s: *const c_char, begin: c_int, end: c_int) -> *mut c_char {
    map_range(unsafe { text(s) }, begin, end, u8::to_ascii_lowercase)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_str(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    // SAFETY: `s` came from `into_raw` and the caller gives up ownership.
    drop(unsafe { CString::from_raw(s) });
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn len(s: *const c_char) -> c_int {
    unsafe { text(s) }.len() as c_int
}

/// Consumes `s` and returns the string that now holds `s` followed by `s2`. `s2` may be
/// `s` itself.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn append(s: *mut c_char, s2: *const c_char) -> *mut c_char {
    let extra = unsafe { text(s2) }.to_vec();
    if s.is_null() {
        return into_raw(extra);
    }
    // SAFETY: `s` came from `into_raw`; ownership moves in here.
    let mut bytes = unsafe { CString::from_raw(s) }.into_bytes();
    bytes.extend_from_slice(&extra);
    into_raw(bytes)
}
