#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use crate::error::RuntimeError;
use crate::heap::{Element, Handle, Heap, Object};
use crate::output::format_decimal;
use crate::string::{RtString, clamp_range};

/// Dynamic array of tagged elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtArray {
    elems: Vec<Element>,
    capacity: usize,
}

impl RtArray {
    fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RtArray {
            elems: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn from_elems(elems: Vec<Element>) -> Self {
        let capacity = elems.len().max(1);
        RtArray { elems, capacity }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elems
    }

    pub fn size(&self) -> usize {
        self.elems.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn grow_for_one(&mut self) {
        if self.elems.len() == self.capacity {
            self.capacity *= 2;
        }
    }

    fn index(&self, i: i32, inclusive_end: bool) -> Result<usize, RuntimeError> {
        let size = self.elems.len();
        let limit = if inclusive_end { size + 1 } else { size };
        usize::try_from(i)
            .ok()
            .filter(|&i| i < limit)
            .ok_or(RuntimeError::IndexOutOfRange { index: i, size })
    }
}

impl Heap {
    /// `Array_new(n)`: empty, with room for `max(n, 1)` elements.
    pub fn array_new(&mut self, capacity: i32) -> Result<Handle, RuntimeError> {
        let capacity = usize::try_from(capacity).unwrap_or(0);
        self.alloc(Object::Array(RtArray::with_capacity(capacity)))
    }

    /// Shallow copy: string and array elements alias the originals.
    pub fn copy(&mut self, a: Handle) -> Result<Handle, RuntimeError> {
        let elems = self.array(a)?.elems.clone();
        self.alloc(Object::Array(RtArray::from_elems(elems)))
    }

    /// Shallow copy of `[begin, end)`, clamped.
    pub fn slice(&mut self, a: Handle, begin: i32, end: i32) -> Result<Handle, RuntimeError> {
        let src = self.array(a)?;
        let (b, e) = clamp_range(begin, end, src.size());
        let elems = src.elems[b..e].to_vec();
        self.alloc(Object::Array(RtArray::from_elems(elems)))
    }

    /// Releases the array and every string or array it owns. An element leading back to
    /// an array this call already released is skipped.
    pub fn free_array(&mut self, a: Handle) -> Result<(), RuntimeError> {
        self.free_array_once(a, &mut HashSet::new())
    }

    fn free_array_once(
        &mut self,
        a: Handle,
        released: &mut HashSet<Handle>,
    ) -> Result<(), RuntimeError> {
        let Object::Array(arr) = self.release(a, |o| matches!(o, Object::Array(_)), "an array")?
        else {
            return Ok(());
        };
        released.insert(a);
        let mut first_err = None;
        for elem in arr.elems {
            let result = match elem {
                Element::Int(_) => Ok(()),
                Element::Str(h) => self.free_str(h),
                Element::Array(h) if released.contains(&h) => Ok(()),
                Element::Array(h) => self.free_array_once(h, released),
            };
            if let Err(e) = result {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// `tail(l)`: every element after the first, in a fresh array that shares nothing
    /// with `l`. Nested strings and arrays are copied all the way down.
    pub fn tail(&mut self, a: Handle) -> Result<Handle, RuntimeError> {
        let rest = self.array(a)?.elems.get(1..).unwrap_or_default().to_vec();
        let copy = self.alloc(Object::Array(RtArray::with_capacity(rest.len())))?;
        let mut copies = HashMap::from([(a, copy)]);
        self.fill_deep(copy, rest, &mut copies)?;
        Ok(copy)
    }

    /// Pushes deep copies of `elems` onto `into`. `copies` maps each source array already
    /// copied to its copy, so cycles close onto the new arrays.
    fn fill_deep(
        &mut self,
        into: Handle,
        elems: Vec<Element>,
        copies: &mut HashMap<Handle, Handle>,
    ) -> Result<(), RuntimeError> {
        for elem in elems {
            let elem = match elem {
                Element::Int(_) => elem,
                Element::Str(h) => {
                    let bytes = self.string_bytes(h)?.to_vec();
                    Element::Str(self.alloc(Object::String(RtString::new(bytes)))?)
                }
                Element::Array(h) => match copies.get(&h) {
                    Some(&c) => Element::Array(c),
                    None => {
                        let inner = self.array(h)?.elems.clone();
                        let c = self.alloc(Object::Array(RtArray::with_capacity(inner.len())))?;
                        copies.insert(h, c);
                        self.fill_deep(c, inner, copies)?;
                        Element::Array(c)
                    }
                },
            };
            self.array_mut(into)?.elems.push(elem);
        }
        Ok(())
    }

    pub fn array_elements(&self, a: Handle) -> Result<&[Element], RuntimeError> {
        Ok(self.array(a)?.elements())
    }

    pub fn array_capacity(&self, a: Handle) -> Result<usize, RuntimeError> {
        Ok(self.array(a)?.capacity())
    }

    pub fn put(&mut self, a: Handle, i: i32, elem: Element) -> Result<(), RuntimeError> {
        let arr = self.array_mut(a)?;
        let i = arr.index(i, false)?;
        arr.elems[i] = elem;
        Ok(())
    }

    pub fn push(&mut self, a: Handle, elem: Element) -> Result<(), RuntimeError> {
        let arr = self.array_mut(a)?;
        arr.grow_for_one();
        arr.elems.push(elem);
        Ok(())
    }

    /// Removes the last element; `None` on an empty array.
    pub fn pop(&mut self, a: Handle) -> Result<Option<Element>, RuntimeError> {
        Ok(self.array_mut(a)?.elems.pop())
    }

    /// Removes the first element, shifting the rest down; `None` on an empty array.
    pub fn shift(&mut self, a: Handle) -> Result<Option<Element>, RuntimeError> {
        let arr = self.array_mut(a)?;
        if arr.elems.is_empty() {
            return Ok(None);
        }
        Ok(Some(arr.elems.remove(0)))
    }

    /// Prepends an element and returns the new size.
    pub fn unshift(&mut self, a: Handle, elem: Element) -> Result<i32, RuntimeError> {
        let arr = self.array_mut(a)?;
        arr.grow_for_one();
        arr.elems.insert(0, elem);
        Ok(arr.elems.len() as i32)
    }

    /// Inserts before index `i`; `i == size` appends.
    pub fn insert(&mut self, a: Handle, i: i32, elem: Element) -> Result<(), RuntimeError> {
        let arr = self.array_mut(a)?;
        let i = arr.index(i, true)?;
        arr.grow_for_one();
        arr.elems.insert(i, elem);
        Ok(())
    }

    pub fn remove_at(&mut self, a: Handle, i: i32) -> Result<Element, RuntimeError> {
        let arr = self.array_mut(a)?;
        let i = arr.index(i, false)?;
        Ok(arr.elems.remove(i))
    }

    pub fn reverse(&mut self, a: Handle) -> Result<(), RuntimeError> {
        self.array_mut(a)?.elems.reverse();
        Ok(())
    }

    /// Stable ascending sort by raw value slot; tags travel with their values.
    pub fn sort(&mut self, a: Handle) -> Result<(), RuntimeError> {
        self.array_mut(a)?.elems.sort_by_key(|e| e.slot());
        Ok(())
    }

    pub fn get(&self, a: Handle, i: i32) -> Result<Element, RuntimeError> {
        let arr = self.array(a)?;
        let i = arr.index(i, false)?;
        Ok(arr.elems[i])
    }

    pub fn get_type(&self, a: Handle, i: i32) -> Result<&'static str, RuntimeError> {
        Ok(self.get(a, i)?.tag().name())
    }

    pub fn size(&self, a: Handle) -> Result<i32, RuntimeError> {
        Ok(self.array(a)?.size() as i32)
    }

    /// Renders `[1, 2, abc, [3]]`. Dead handles render as `<dangling>`, and an array
    /// reached again while it is being rendered as `[...]`.
    pub fn render_array(&self, a: Handle) -> Result<Vec<u8>, RuntimeError> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.array(a)?;
        self.render_into(a, &mut out, &mut path);
        Ok(out)
    }

    fn render_into(&self, a: Handle, out: &mut Vec<u8>, path: &mut Vec<Handle>) {
        if path.contains(&a) {
            out.extend_from_slice(b"[...]");
            return;
        }
        let Ok(arr) = self.array(a) else {
            out.extend_from_slice(b"<dangling>");
            return;
        };
        path.push(a);
        out.push(b'[');
        for (i, elem) in arr.elems.iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(b", ");
            }
            match *elem {
                Element::Int(n) => out.extend_from_slice(&format_decimal(n)),
                Element::Str(h) => match self.string_bytes(h) {
                    Ok(bytes) => out.extend_from_slice(bytes),
                    Err(_) => out.extend_from_slice(b"<dangling>"),
                },
                Element::Array(h) => self.render_into(h, out, path),
            }
        }
        out.push(b']');
        path.pop();
    }

    /// `stringify(a)`: the rendering as a fresh heap string.
    pub fn stringify(&mut self, a: Handle) -> Result<Handle, RuntimeError> {
        let bytes = self.render_array(a)?;
        self.alloc(Object::String(RtString::new(bytes)))
    }
}
