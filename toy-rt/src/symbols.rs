#![forbid(unsafe_code)]

//! Names of the native entry points generated code links against.

/// Every routine the runtime library exports, in the order the library documents them.
pub const ALL: &[&str] = &[
    // Strings
    "String",
    "Int2str",
    "Concat",
    "Substr",
    "Revstr",
    "Upper",
    "Lower",
    "free_str",
    "len",
    "append",
    // Arrays
    "Array_new",
    "Copy",
    "Slice",
    "Tail",
    "free_array",
    "put",
    "push",
    "pop",
    "shift",
    "unshift",
    "insert",
    "remove_at",
    "reverse",
    "sort",
    "get",
    "get_type",
    "size",
    "stringify",
    // Output
    "print_array",
];

/// Entry points whose names are also x86 mnemonics.
const MNEMONICS: &[&str] = &["push", "pop"];

pub fn is_native(name: &str) -> bool {
    ALL.contains(&name)
}

/// The symbol as NASM must spell it. A `$` prefix forces a name that collides with an
/// instruction to be read as an identifier.
pub fn asm_name(name: &str) -> String {
    if MNEMONICS.contains(&name) {
        format!("${name}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_names_are_escaped() {
        assert_eq!(asm_name("push"), "$push");
        assert_eq!(asm_name("Concat"), "Concat");
    }

    #[test]
    fn output_helpers_are_not_native() {
        assert!(is_native("print_array"));
        assert!(!is_native("print_i"));
        assert!(!is_native("print"));
    }
}
