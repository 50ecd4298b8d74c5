#![forbid(unsafe_code)]

use std::fmt;
use std::rc::Rc;

use toy_rt::{Element, Handle};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    /// A string literal.
    Str(Rc<str>),
    String(Handle),
    Array(Handle),
    Undef,
}

impl Value {
    /// The machine word compiled code would hold. Literals have no address here.
    pub fn word(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i32::from(*b)),
            Value::Undef => Some(0),
            Value::String(h) | Value::Array(h) => Some(h.slot()),
            Value::Str(_) => None,
        }
    }

    pub fn handle(&self) -> Option<Handle> {
        match self {
            Value::String(h) | Value::Array(h) => Some(*h),
            _ => None,
        }
    }

    /// The array slot this value occupies once pushed.
    pub(crate) fn element(&self) -> Element {
        match self {
            Value::String(h) => Element::Str(*h),
            Value::Array(h) => Element::Array(*h),
            other => Element::Int(other.word().unwrap_or(0)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            Value::Str(s) => write!(f, "'{s}'"),
            Value::String(h) => write!(f, "String({h})"),
            Value::Array(h) => write!(f, "Array({h})"),
            Value::Undef => f.write_str("Undef"),
        }
    }
}
