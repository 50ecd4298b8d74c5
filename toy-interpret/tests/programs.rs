use proptest::prelude::*;
use toy_interpret::{EvalError, Interpreter, InterpreterConfig, Value, run_source};
use toy_rt::BufferSink;

const FAC: &str = "fac(n: Int) = (n < 0 -> Undef, n == 0 -> 1, True -> n * fac(n - 1))\n";
const FIB: &str =
    "fib(n: Int) = (n < 0 -> Undef, n == 0 -> 0, n == 1 -> 1, True -> fib(n - 1) + fib(n - 2))\n";
const MIN: &str = "min(a: Int, b: Int) = (a < b -> a, True -> b)\n";
const PRINT_LIST: &str = r#"
print_list(l: Array) = (
  size(l) == 0 -> free_array(l),
  True -> { print(head(l)); print_list(tail(l)); free_array(l) }
)
"#;

fn value_of(src: &str) -> Value {
    run_source(src).expect("program runs").0.value
}

fn output_of(src: &str) -> String {
    run_source(src).expect("program runs").1
}

fn fac_ref(n: i32) -> i32 {
    (1..=n).fold(1i32, |acc, k| acc.wrapping_mul(k))
}

fn fib_ref(n: i32) -> i32 {
    let (mut a, mut b) = (0i32, 1i32);
    for _ in 0..n {
        (a, b) = (b, a.wrapping_add(b));
    }
    a
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn fac_matches_the_wrapping_factorial(n in 0i32..40) {
        prop_assert_eq!(value_of(&format!("{FAC}fac({n})")), Value::Int(fac_ref(n)));
    }

    #[test]
    fn fib_matches_the_sequence(n in 0i32..18) {
        prop_assert_eq!(value_of(&format!("{FIB}fib({n})")), Value::Int(fib_ref(n)));
    }

    #[test]
    fn min_is_symmetric(a in any::<i32>(), b in any::<i32>()) {
        let ab = value_of(&format!("{MIN}min({a}, {b})"));
        let ba = value_of(&format!("{MIN}min({b}, {a})"));
        prop_assert_eq!(&ab, &ba);
        prop_assert_eq!(ab, Value::Int(a.min(b)));
    }

    #[test]
    fn print_matches_std_formatting(n in any::<i32>()) {
        prop_assert_eq!(output_of(&format!("print({n})")), n.to_string());
    }
}

#[test]
fn negative_arguments_fall_through_to_undef() {
    assert_eq!(value_of(&format!("{FAC}fac(0 - 1)")), Value::Undef);
    assert_eq!(value_of(&format!("{FIB}fib(0 - 1)")), Value::Undef);
}

#[test]
fn print_list_prints_a_range() {
    assert_eq!(output_of(&format!("{PRINT_LIST}print_list([1 .. 10])")), "12345678910");
}

#[test]
fn print_list_releases_everything() {
    let checked = toy_core::check_source(&format!("{PRINT_LIST}print_list([1 .. 4])")).unwrap();
    assert!(checked.warnings.is_empty(), "{:?}", checked.warnings);
    let mut interp = Interpreter::new(BufferSink::new());
    interp.run(&checked).unwrap();
    assert_eq!(interp.heap().live_objects(), 0);
}

#[test]
fn print_list_over_strings_frees_each_string_once() {
    let checked = toy_core::check_source(&format!("{PRINT_LIST}print_list(['a', 'b', 'c'])")).unwrap();
    assert!(checked.warnings.is_empty(), "{:?}", checked.warnings);
    let mut interp = Interpreter::new(BufferSink::new());
    interp.run(&checked).unwrap();
    assert_eq!(interp.heap().live_objects(), 0);
}

#[test]
fn tail_owns_its_own_copies() {
    let src = r#"
{
  var(l, ['a', ['b'], 3]);
  var(t, tail(l));
  print_array(t);
  free_array(t);
  print_array(l);
  free_array(l)
}
"#;
    let checked = toy_core::check_source(src).unwrap();
    let mut interp = Interpreter::new(BufferSink::new());
    interp.run(&checked).unwrap();
    assert_eq!(interp.sink().as_bytes(), b"[[b], 3][a, [b], 3]");
    assert_eq!(interp.heap().live_objects(), 0);
}

#[test]
fn exit_status_is_the_last_scalar() {
    let (outcome, _) = run_source("print(1)\n40 + 2").unwrap();
    assert_eq!(outcome.exit_status, 42);

    let (outcome, _) = run_source("3 > 2").unwrap();
    assert_eq!(outcome.exit_status, 1);

    let (outcome, _) = run_source("{ var(s, String('x')); free_str(s); 'done' }").unwrap();
    assert_eq!(outcome.exit_status, 0);
}

#[test]
fn string_operations_print_their_results() {
    let out = output_of(
        r#"
{
  var(s, String('Hello'));
  print(Concat(s, ', world'));
  print(Upper(s, 0, 99));
  print(Revstr(s));
  print(Substr(s, 1, 3));
  print(len(s));
  var(s, append(s, '!'));
  print(s);
  free_str(s)
}
"#,
    );
    assert_eq!(out, "Hello, worldHELLOolleHel5Hello!");
}

#[test]
fn temporaries_and_rebinding_leave_nothing_live() {
    let src = "{ var(s, Int2str(1)); var(s, Int2str(2)); print(Concat(s, Int2str(3))); free_str(s) }";
    let checked = toy_core::check_source(src).unwrap();
    let mut interp = Interpreter::new(BufferSink::new());
    interp.run(&checked).unwrap();
    assert_eq!(interp.sink().as_bytes(), b"23");
    assert_eq!(interp.heap().live_objects(), 0);
}

#[test]
fn arrays_hold_mixed_elements() {
    let out = output_of(
        r#"
{
  var(a, [3, 'two', [1]]);
  push(a, 0);
  print(get_type(a, 1));
  print(size(a));
  print_array(a);
  var(r, stringify(a));
  print(len(r));
  free_str(r);
  free_array(a)
}
"#,
    );
    assert_eq!(out, "STRING4[3, two, [1], 0]16");
}

#[test]
fn head_of_an_empty_list_is_undef() {
    assert_eq!(value_of("{ var(a, []); var(h, head(a)); free_array(a); h }"), Value::Undef);
    assert_eq!(output_of("{ var(t, tail([1])); print(size(t)); free_array(t) }"), "0");
}

#[test]
fn division_truncates_and_zero_is_an_error() {
    assert_eq!(value_of("0 - 7 / 2"), Value::Int(-3));
    assert_eq!(value_of("(0 - 7) / 2"), Value::Int(-3));
    let checked = toy_core::check_source("print(1 / (2 - 2))").unwrap();
    let err = Interpreter::new(BufferSink::new()).run(&checked).unwrap_err();
    assert!(matches!(err, EvalError::DivisionByZero { .. }));
}

#[test]
fn arithmetic_wraps() {
    assert_eq!(value_of("2147483647 + 1"), Value::Int(i32::MIN));
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    let checked = toy_core::check_source("loop(n: Int) = loop(n + 1)\nloop(0)").unwrap();
    let config = InterpreterConfig { max_depth: 64 };
    let err = Interpreter::with_config(BufferSink::new(), config)
        .run(&checked)
        .unwrap_err();
    assert!(matches!(err, EvalError::StackOverflow { depth: 64, .. }));
}

#[test]
fn shallow_copies_alias_their_strings() {
    let src = r#"
{
  var(a, ['x']);
  var(b, Copy(a));
  print(get_type(b, 0));
  free_array(b);
  print_array(a)
}
"#;
    let checked = toy_core::check_source(src).unwrap();
    let mut interp = Interpreter::new(BufferSink::new());
    interp.run(&checked).unwrap();
    assert_eq!(interp.sink().as_bytes(), b"STRING[<dangling>]");
}

#[test]
fn string_equality_compares_content() {
    let src = r#"
{
  var(s, String('ab'));
  print(s == 'ab');
  print(s != Concat('a', 'b'));
  print('x' == 'y');
  print(get_type([1], 0) == 'INT');
  free_str(s)
}
"#;
    let checked = toy_core::check_source(src).unwrap();
    assert!(checked.warnings.is_empty(), "{:?}", checked.warnings);
    let mut interp = Interpreter::new(BufferSink::new());
    interp.run(&checked).unwrap();
    assert_eq!(interp.sink().as_bytes(), b"1001");
    assert_eq!(interp.heap().live_objects(), 0);
}

#[test]
fn connectives_in_guards() {
    let src = "\
inside(n: Int) = (n > 0 and n < 10 -> 1, n == 0 or n == 10 -> 2, not (n < 0) -> 3, True -> 4)
print(inside(5))
print(inside(0))
print(inside(10))
print(inside(11))
print(inside(0 - 1))
";
    assert_eq!(output_of(src), "12234");
}

#[test]
fn connectives_evaluate_both_operands() {
    let src = "\
noisy(n: Int) = { print(n); n }
print(noisy(0) and noisy(1))
";
    assert_eq!(output_of(src), "010");
}

#[test]
fn println_ends_the_line() {
    assert_eq!(output_of("println('hi')\nprintln_i(0 - 3)\nprintln(True)"), "hi\n-3\n1\n");
}

#[test]
fn exit_stops_the_program_with_its_status() {
    let src = "\
stop(n: Int) = { print(n); exit(n); print(99) }
print(1)
stop(7)
print(2)
0
";
    let (outcome, out) = run_source(src).unwrap();
    assert_eq!(out, "17");
    assert_eq!(outcome.exit_status, 7);
    assert_eq!(outcome.value, Value::Undef);
}
