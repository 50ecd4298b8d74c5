#![forbid(unsafe_code)]

//! Signatures of every call the language knows without a user definition.
//!
//! The parser uses the table for name and arity checks; the checker, the code
//! generator and the evaluator use the argument modes to decide who owns a heap
//! value after the call returns.

/// What a call does with the value it is handed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgMode {
    /// The callee only reads the value. A heap temporary is released after the call.
    Read,
    /// Ownership moves into the callee (an array slot, or `append`'s receiver).
    Consume,
    /// The callee frees the value.
    Release,
}

/// Which value kinds an argument position accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accepts {
    /// Int, Bool or Undef.
    Int,
    /// A string literal or an owned string.
    Text,
    /// An owned heap string.
    OwnedString,
    Array,
    /// `len` works on both strings and arrays.
    TextOrArray,
    /// An array element. Its tag is derived from the argument's kind.
    Element,
    Any,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Returns {
    Int,
    /// A pointer into static data (`get_type`).
    Str,
    String,
    Array,
    Undef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamSpec {
    pub mode: ArgMode,
    pub accepts: Accepts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
    pub returns: Returns,
}

impl Builtin {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Number of machine words pushed for a call, counting the implicit element tag.
    pub fn native_arg_count(&self) -> usize {
        self.params.len()
            + self
                .params
                .iter()
                .filter(|p| p.accepts == Accepts::Element)
                .count()
    }
}

const fn read(accepts: Accepts) -> ParamSpec {
    ParamSpec {
        mode: ArgMode::Read,
        accepts,
    }
}

const fn consume(accepts: Accepts) -> ParamSpec {
    ParamSpec {
        mode: ArgMode::Consume,
        accepts,
    }
}

const fn release(accepts: Accepts) -> ParamSpec {
    ParamSpec {
        mode: ArgMode::Release,
        accepts,
    }
}

const fn builtin(name: &'static str, params: &'static [ParamSpec], returns: Returns) -> Builtin {
    Builtin {
        name,
        params,
        returns,
    }
}

use Accepts as A;
use Returns as R;

pub const BUILTINS: &[Builtin] = &[
    // Output
    builtin("print", &[read(A::Any)], R::Undef),
    builtin("print_i", &[read(A::Int)], R::Undef),
    builtin("print_array", &[read(A::Array)], R::Undef),
    builtin("println", &[read(A::Any)], R::Undef),
    builtin("println_i", &[read(A::Int)], R::Undef),
    // Ends the program with the given status.
    builtin("exit", &[read(A::Int)], R::Undef),
    // Strings
    builtin("String", &[read(A::Text)], R::String),
    builtin("Int2str", &[read(A::Int)], R::String),
    builtin("Concat", &[read(A::Text), read(A::Text)], R::String),
    builtin(
        "Substr",
        &[read(A::Text), read(A::Int), read(A::Int)],
        R::String,
    ),
    builtin("Revstr", &[read(A::Text)], R::String),
    builtin(
        "Upper",
        &[read(A::Text), read(A::Int), read(A::Int)],
        R::String,
    ),
    builtin(
        "Lower",
        &[read(A::Text), read(A::Int), read(A::Int)],
        R::String,
    ),
    builtin("free_str", &[release(A::OwnedString)], R::Undef),
    builtin("len", &[read(A::TextOrArray)], R::Int),
    builtin(
        "append",
        &[consume(A::OwnedString), read(A::Text)],
        R::String,
    ),
    // Arrays
    builtin("Array_new", &[read(A::Int)], R::Array),
    builtin("Copy", &[read(A::Array)], R::Array),
    builtin(
        "Slice",
        &[read(A::Array), read(A::Int), read(A::Int)],
        R::Array,
    ),
    builtin("free_array", &[release(A::Array)], R::Undef),
    builtin(
        "put",
        &[read(A::Array), read(A::Int), consume(A::Element)],
        R::Undef,
    ),
    builtin("push", &[read(A::Array), consume(A::Element)], R::Undef),
    builtin("pop", &[read(A::Array)], R::Int),
    builtin("shift", &[read(A::Array)], R::Int),
    builtin("unshift", &[read(A::Array), consume(A::Element)], R::Int),
    builtin(
        "insert",
        &[read(A::Array), read(A::Int), consume(A::Element)],
        R::Undef,
    ),
    builtin("remove_at", &[read(A::Array), read(A::Int)], R::Undef),
    builtin("reverse", &[read(A::Array)], R::Undef),
    builtin("sort", &[read(A::Array)], R::Undef),
    builtin("get", &[read(A::Array), read(A::Int)], R::Int),
    builtin("get_type", &[read(A::Array), read(A::Int)], R::Str),
    builtin("size", &[read(A::Array)], R::Int),
    builtin("stringify", &[read(A::Array)], R::String),
];

/// Calls parsed into dedicated nodes rather than [`ExprKind::Call`](crate::ExprKind::Call).
pub const SPECIAL_FORMS: &[(&str, usize)] = &[("var", 2), ("head", 1), ("tail", 1)];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

pub fn is_reserved(name: &str) -> bool {
    lookup(name).is_some() || SPECIAL_FORMS.iter().any(|(n, _)| *n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_positions_carry_an_extra_tag_word() {
        let push = lookup("push").unwrap();
        assert_eq!(push.arity(), 2);
        assert_eq!(push.native_arg_count(), 3);
        assert_eq!(lookup("get").unwrap().native_arg_count(), 2);
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in BUILTINS.iter().enumerate() {
            assert!(
                BUILTINS[i + 1..].iter().all(|b| b.name != a.name),
                "duplicate builtin {}",
                a.name
            );
        }
    }

    #[test]
    fn special_forms_are_reserved() {
        assert!(is_reserved("var"));
        assert!(is_reserved("free_str"));
        assert!(is_reserved("exit"));
        assert!(!is_reserved("fac"));
    }
}
