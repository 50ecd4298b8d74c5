use toy_backend_x86::{EmitOptions, compile_source, emit_program};

fn asm(src: &str) -> String {
    compile_source(src, &EmitOptions::default()).expect("compile")
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

const FAC: &str = "fac(n: Int) = (n < 0 -> Undef, n == 0 -> 1, True -> n * fac(n - 1))\nprint(fac(5))";

#[test]
fn recursive_functions_get_a_uniform_frame() {
    let out = asm(FAC);
    assert!(out.starts_with("; generated by toyc\nbits 32\n"));
    assert!(out.contains("global _start\n"));
    assert!(out.contains("fn_fac:\n    push ebp\n    mov ebp, esp\n"));
    assert!(out.contains("    mov esp, ebp\n    pop ebp\n    ret\n"));
    assert!(out.contains("call fn_fac"));
    assert!(out.contains("mov eax, dword [ebp+8]"));
    assert!(out.contains("imul eax, ecx"));
    assert!(out.contains("setl al"));
}

#[test]
fn helpers_are_always_emitted_and_no_runtime_is_needed_for_ints() {
    let out = asm(FAC);
    for helper in ["print_char:", "print_i:", "print_str:", "str_eq:"] {
        assert!(out.contains(helper), "missing {helper}");
    }
    assert!(!out.contains("extern"));
    assert!(out.contains("call print_i"));
    // write(1, &c, 1) and exit(status)
    assert!(out.contains("mov eax, 4"));
    assert!(out.contains("mov ebx, eax\n    mov eax, 1\n    int 0x80\n"));
}

#[test]
fn print_i_divides_unsigned() {
    let out = asm("print(-2147483648)");
    assert!(out.contains("mov eax, -2147483648"));
    let print_i = out.split("print_i:").nth(1).unwrap();
    assert!(print_i.contains("neg eax"));
    assert!(print_i.contains("div ecx"));
    assert!(!print_i.split("print_str:").next().unwrap().contains("idiv"));
}

#[test]
fn read_temporaries_are_released_after_the_call() {
    let out = asm("print(Concat('a', 'b'))");
    assert!(out.contains("extern Concat\n"));
    assert!(out.contains("extern free_str\n"));
    assert!(out.contains("str_0: db \"a\", 0\n"));
    assert!(out.contains("str_1: db \"b\", 0\n"));

    let concat = out.find("call Concat").unwrap();
    let print = out.find("call print_str").unwrap();
    let free = out.find("call free_str").unwrap();
    assert!(concat < print && print < free);
}

#[test]
fn equal_literals_share_one_label() {
    let out = asm("print('x')\nprint('x')");
    assert_eq!(count(&out, ": db "), 1);
    assert_eq!(count(&out, "mov eax, str_0"), 2);
}

#[test]
fn list_literals_push_tagged_elements() {
    let out = asm("{ var(a, [1, 'x']); print_array(a); free_array(a) }");
    assert!(out.contains("extern $push\n"));
    assert!(out.contains("extern Array_new\n"));
    assert!(out.contains("extern print_array\n"));
    assert!(out.contains("push dword 2\n    call Array_new"));
    // The literal is copied to the heap before the array takes ownership of it.
    assert!(out.contains("call String"));
    assert!(out.contains("push dword 1\n    push eax\n"));
    assert_eq!(count(&out, "call $push"), 2);
}

#[test]
fn ranges_lower_to_a_push_loop() {
    let out = asm("{ var(a, [1 .. 10]); print_array(a); free_array(a) }");
    assert!(out.contains("call Array_new"));
    assert_eq!(count(&out, "call $push"), 1);
    assert!(out.contains("jg .L"));
}

#[test]
fn rebinding_releases_the_previous_value() {
    let out = asm("{ var(s, String('a')); var(s, String('b')); free_str(s) }");
    assert_eq!(count(&out, "call free_str"), 2);
}

#[test]
fn len_of_an_array_uses_size() {
    let out = asm("{ var(a, [1]); print(len(a)); free_array(a) }");
    assert!(out.contains("call size"));
    assert!(!out.contains("call len"));
}

#[test]
fn head_checks_size_and_tail_deep_copies() {
    let out = asm("{ var(a, [1, 2]); print(head(a)); var(t, tail(a)); free_array(t); free_array(a) }");
    assert!(out.contains("call get"));
    assert_eq!(count(&out, "call size"), 1);
    assert!(out.contains("extern Tail\n"));
    assert!(out.contains("    push eax\n    call Tail\n    add esp, 4\n"));
    assert!(!out.contains("call Slice"));
}

#[test]
fn heap_results_exit_with_zero() {
    let out = asm("[1, 2]");
    assert!(out.contains("xor ebx, ebx\n    mov eax, 1\n    int 0x80\n"));
}

#[test]
fn entry_label_is_configurable() {
    let options = EmitOptions {
        entry: "main".to_string(),
        ..EmitOptions::default()
    };
    let out = compile_source("main(n: Int) = n\nprint(main(3))", &options).unwrap();
    assert!(out.contains("global main\n"));
    assert!(out.contains("\nmain:\n"));
    assert!(out.contains("\nfn_main:\n"));
}

#[test]
fn non_x86_32_targets_are_refused() {
    let checked = toy_core::check_source("print(1)").unwrap();
    let options = EmitOptions {
        target: "x86_64-unknown-linux-gnu".to_string(),
        ..EmitOptions::default()
    };
    let err = emit_program(&checked, &options).unwrap_err();
    assert!(err.message.contains("not 32-bit x86"));
}

#[test]
fn clauses_fall_through_to_undef() {
    let out = asm("sign(n: Int) = (n < 0 -> 0 - 1, n > 0 -> 1)\nprint(sign(0))");
    let body = out.split("fn_sign:").nth(1).unwrap();
    assert_eq!(count(body.split("_start:").next().unwrap(), "jz .L"), 2);
    assert!(body.contains("xor eax, eax\n.L"));
}

#[test]
fn string_equality_compares_bytes_and_releases_temporaries() {
    let out = asm("{ var(s, String('a')); print(s == 'a'); print(Int2str(1) != s); free_str(s) }");
    assert_eq!(count(&out, "call str_eq"), 2);
    assert!(out.contains("call str_eq\n    add esp, 8\n"));
    assert!(out.contains("xor eax, 1"));

    // Only the Int2str result is a temporary; `s` is released once, by free_str.
    let second = out.rfind("call str_eq").unwrap();
    assert!(out[second..].contains("call free_str"));
    assert_eq!(count(&out, "call free_str"), 2);
}

#[test]
fn connectives_normalise_both_operands() {
    let out = asm("print(1 < 2 and 3 > 4 or not 0)");
    assert!(out.contains("setnz al\n    test ecx, ecx\n    setnz cl\n    and al, cl\n"));
    assert!(out.contains("or al, cl"));
    assert!(!out.contains("jz .L"));
}

#[test]
fn println_and_exit_need_no_runtime() {
    let out = asm("println('hi')\nprintln_i(3)\nexit(7)\n1");
    assert!(!out.contains("extern"));
    assert_eq!(count(&out, "push dword 10\n    call print_char\n"), 2);
    assert!(out.contains("mov eax, 7\n    mov ebx, eax\n    mov eax, 1\n    int 0x80\n"));
}
