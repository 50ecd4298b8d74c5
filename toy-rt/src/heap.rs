#![forbid(unsafe_code)]

use std::fmt;

use crate::array::RtArray;
use crate::error::RuntimeError;
use crate::string::RtString;

/// Reference to a heap object. Raw value 0 is the null handle (Undef) and is never
/// handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    pub fn from_raw(raw: u32) -> Option<Handle> {
        (raw != 0).then_some(Handle(raw))
    }

    /// Reinterprets a 32-bit value slot, as stored in an array, as a handle.
    pub fn from_slot(slot: i32) -> Option<Handle> {
        Handle::from_raw(slot as u32)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn slot(self) -> i32 {
        self.0 as i32
    }

    fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runtime discriminant of an array element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementTag {
    Int,
    String,
    Array,
}

impl ElementTag {
    pub fn from_raw(tag: i32) -> Option<ElementTag> {
        match tag {
            0 => Some(ElementTag::Int),
            1 => Some(ElementTag::String),
            2 => Some(ElementTag::Array),
            _ => None,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            ElementTag::Int => 0,
            ElementTag::String => 1,
            ElementTag::Array => 2,
        }
    }

    /// The text `get_type` returns.
    pub fn name(self) -> &'static str {
        match self {
            ElementTag::Int => "INT",
            ElementTag::String => "STRING",
            ElementTag::Array => "ARRAY",
        }
    }
}

/// One array slot: a value together with its tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Element {
    Int(i32),
    Str(Handle),
    Array(Handle),
}

impl Element {
    /// Builds an element from the (value, tag) pair the native ABI passes. A zero handle
    /// becomes the integer 0.
    pub fn from_parts(slot: i32, tag: ElementTag) -> Element {
        match (tag, Handle::from_slot(slot)) {
            (ElementTag::String, Some(h)) => Element::Str(h),
            (ElementTag::Array, Some(h)) => Element::Array(h),
            _ => Element::Int(slot),
        }
    }

    pub fn tag(self) -> ElementTag {
        match self {
            Element::Int(_) => ElementTag::Int,
            Element::Str(_) => ElementTag::String,
            Element::Array(_) => ElementTag::Array,
        }
    }

    /// The raw 32-bit value slot.
    pub fn slot(self) -> i32 {
        match self {
            Element::Int(n) => n,
            Element::Str(h) | Element::Array(h) => h.slot(),
        }
    }

    pub fn handle(self) -> Option<Handle> {
        match self {
            Element::Int(_) => None,
            Element::Str(h) | Element::Array(h) => Some(h),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Object {
    String(RtString),
    Array(RtArray),
    Released,
}

/// Owner of every runtime string and array.
///
/// Slots are never reused, so a released handle stays recognisably dead: touching it
/// is a [`RuntimeError::DanglingHandle`], releasing it again a
/// [`RuntimeError::DoubleFree`].
///
/// The price is that storage only grows. Releasing an object drops its contents but
/// leaves a tombstone slot behind, so a heap serving one `toyc run` ends up holding one
/// slot per allocation the program ever made ([`Heap::slots`]), however much of it was
/// freed. Handle space runs out after `u32::MAX` allocations
/// ([`RuntimeError::HeapExhausted`]).
#[derive(Clone, Debug, Default)]
pub struct Heap {
    objects: Vec<Object>,
    live: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects allocated and not yet released.
    pub fn live_objects(&self) -> usize {
        self.live
    }

    /// Slots in use, live or released. Never shrinks.
    pub fn slots(&self) -> usize {
        self.objects.len()
    }

    pub fn is_live(&self, h: Handle) -> bool {
        matches!(
            self.objects.get(h.index()),
            Some(Object::String(_) | Object::Array(_))
        )
    }

    pub(crate) fn alloc(&mut self, obj: Object) -> Result<Handle, RuntimeError> {
        self.objects.push(obj);
        let raw = u32::try_from(self.objects.len()).map_err(|_| RuntimeError::HeapExhausted)?;
        self.live += 1;
        Ok(Handle(raw))
    }

    fn object(&self, h: Handle) -> Result<&Object, RuntimeError> {
        match self.objects.get(h.index()) {
            Some(Object::Released) | None => Err(RuntimeError::DanglingHandle(h)),
            Some(obj) => Ok(obj),
        }
    }

    fn object_mut(&mut self, h: Handle) -> Result<&mut Object, RuntimeError> {
        match self.objects.get_mut(h.index()) {
            Some(Object::Released) | None => Err(RuntimeError::DanglingHandle(h)),
            Some(obj) => Ok(obj),
        }
    }

    pub(crate) fn string(&self, h: Handle) -> Result<&RtString, RuntimeError> {
        match self.object(h)? {
            Object::String(s) => Ok(s),
            _ => Err(RuntimeError::WrongObject {
                handle: h,
                expected: "a string",
            }),
        }
    }

    pub(crate) fn string_mut(&mut self, h: Handle) -> Result<&mut RtString, RuntimeError> {
        match self.object_mut(h)? {
            Object::String(s) => Ok(s),
            _ => Err(RuntimeError::WrongObject {
                handle: h,
                expected: "a string",
            }),
        }
    }

    pub(crate) fn array(&self, h: Handle) -> Result<&RtArray, RuntimeError> {
        match self.object(h)? {
            Object::Array(a) => Ok(a),
            _ => Err(RuntimeError::WrongObject {
                handle: h,
                expected: "an array",
            }),
        }
    }

    pub(crate) fn array_mut(&mut self, h: Handle) -> Result<&mut RtArray, RuntimeError> {
        match self.object_mut(h)? {
            Object::Array(a) => Ok(a),
            _ => Err(RuntimeError::WrongObject {
                handle: h,
                expected: "an array",
            }),
        }
    }

    /// Releases one object, checking it is the expected kind.
    pub(crate) fn release(
        &mut self,
        h: Handle,
        is_expected: fn(&Object) -> bool,
        expected: &'static str,
    ) -> Result<Object, RuntimeError> {
        let Some(slot) = self.objects.get_mut(h.index()) else {
            return Err(RuntimeError::DanglingHandle(h));
        };
        if matches!(slot, Object::Released) {
            return Err(RuntimeError::DoubleFree(h));
        }
        if !is_expected(slot) {
            return Err(RuntimeError::WrongObject {
                handle: h,
                expected,
            });
        }
        let old = std::mem::replace(slot, Object::Released);
        self.live -= 1;
        Ok(old)
    }
}
