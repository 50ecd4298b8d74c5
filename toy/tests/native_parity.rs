use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use miette::IntoDiagnostic;
use toy_backend_x86::EmitOptions;

fn have(tool: &str) -> bool {
    Command::new(tool).arg("--version").output().is_ok()
}

/// Programs that need no native runtime: integers, booleans and literal text only.
const PROGRAMS: &[(&str, &str)] = &[
    (
        "fac",
        "fac(n: Int) = (n == 0 -> 1, True -> n * fac(n - 1))\nprint(fac(10))\nfac(5)\n",
    ),
    (
        "fib",
        "fib(n: Int) = (n < 2 -> n, True -> fib(n - 1) + fib(n - 2))\nprint(fib(15))\nprint('\\n')\n",
    ),
    (
        "negatives",
        "print(0 - 2147483647 - 1)\nprint(' ')\nprint(7 / (0 - 2))\nprint(' ')\nprint(1 < 2)\n3\n",
    ),
    (
        "fall_through",
        "pick(n: Int) = (n > 0 -> 1)\nprint(pick(0 - 5))\nprint(pick(5))\npick(9) + 1\n",
    ),
];

/// Programs linked against `libtoy_rt_native.a`.
const RUNTIME_PROGRAMS: &[(&str, &str)] = &[
    (
        "strings",
        r#"
{
  var(s, String('Hello'));
  var(s, append(s, ', world'));
  println(s);
  print(Revstr(s));
  println_i(len(s));
  var(n, Int2str(0 - 42));
  print(n == '-42');
  print(Upper(n, 0, 99) != n);
  println(Substr(s, 7, 99));
  print(Lower('ABC', 1, 2));
  free_str(n);
  free_str(s);
  len('abc')
}
"#,
    ),
    (
        "arrays",
        r#"
print_list(l: Array) = (
  size(l) == 0 -> free_array(l),
  True -> { print(head(l)); print_list(tail(l)); free_array(l) }
)
kinds(l: Array) = (
  size(l) == 0 -> free_array(l),
  True -> { print(get_type(l, 0)); print(' '); kinds(tail(l)); free_array(l) }
)
print_list([1 .. 10])
print('\n')
kinds([1, 'two', [3]])
{
  var(a, [5, 3, 9]);
  push(a, 1);
  reverse(a);
  print_array(a);
  sort(a);
  var(r, stringify(a));
  println(r);
  print(len(r));
  free_str(r);
  print(pop(a) + shift(a));
  print(size(a));
  var(b, Copy(a));
  free_array(b);
  free_array(a);
  size([1, 2]) + 40
}
"#,
    ),
];

fn scratch_dir() -> miette::Result<PathBuf> {
    let dir = std::env::temp_dir()
        .join("toyc-native-parity")
        .join(std::process::id().to_string());
    fs::create_dir_all(&dir).into_diagnostic()?;
    Ok(dir)
}

/// Assembles `src` into `<dir>/<name>.o`.
fn assemble(dir: &Path, name: &str, src: &str, options: &EmitOptions) -> miette::Result<PathBuf> {
    let asm = toy_backend_x86::compile_source(src, options)?;
    let asm_path = dir.join(format!("{name}.asm"));
    let obj = dir.join(format!("{name}.o"));
    fs::write(&asm_path, asm).into_diagnostic()?;

    let status = Command::new("nasm")
        .args(["-f", "elf32", "-o"])
        .arg(&obj)
        .arg(&asm_path)
        .status()
        .into_diagnostic()?;
    if !status.success() {
        return Err(miette::miette!("nasm rejected {name}.asm: {status}"));
    }
    Ok(obj)
}

/// Runs `exe` and compares it with the interpreter. `false` when the host cannot run it.
fn matches_interpreter(name: &str, src: &str, exe: &Path) -> miette::Result<bool> {
    let (outcome, expected) = toy_interpret::run_source(src)?;
    let Ok(output) = Command::new(exe).output() else {
        return Ok(false);
    };
    assert_eq!(String::from_utf8_lossy(&output.stdout), expected, "{name}");
    assert_eq!(
        output.status.code(),
        Some(outcome.exit_status & 0xff),
        "{name}"
    );
    Ok(true)
}

/// The 32-bit runtime archive: `TOY_RT_NATIVE_LIB` when set, else a fresh build.
fn native_runtime() -> Option<PathBuf> {
    if let Some(lib) = std::env::var_os("TOY_RT_NATIVE_LIB") {
        return Some(PathBuf::from(lib));
    }
    let cargo = std::env::var_os("CARGO")?;
    let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("rt-native");
    let built = Command::new(cargo)
        .args(["build", "--quiet", "--release", "-p", "toy-rt-native"])
        .args(["--target", "i686-unknown-linux-gnu", "--target-dir"])
        .arg(&target_dir)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .status()
        .ok()?;
    let lib = target_dir.join("i686-unknown-linux-gnu/release/libtoy_rt_native.a");
    (built.success() && lib.exists()).then_some(lib)
}

#[test]
fn native_programs_match_the_interpreter() -> miette::Result<()> {
    if !(have("nasm") && have("ld")) {
        eprintln!("skipping native parity: nasm or ld not in PATH");
        return Ok(());
    }
    let out_dir = scratch_dir()?;

    for (name, src) in PROGRAMS {
        let obj = assemble(&out_dir, name, src, &EmitOptions::default())?;
        let exe = out_dir.join(name);

        let linked = Command::new("ld")
            .args(["-m", "elf_i386", "-o"])
            .arg(&exe)
            .arg(&obj)
            .status()
            .into_diagnostic()?;
        if !linked.success() {
            eprintln!("skipping native parity: ld cannot link elf_i386 objects");
            return Ok(());
        }
        if !matches_interpreter(name, src, &exe)? {
            eprintln!("skipping native parity: host cannot execute 32-bit binaries");
            return Ok(());
        }
    }
    Ok(())
}

#[test]
fn runtime_programs_match_the_interpreter() -> miette::Result<()> {
    if !(have("nasm") && have("gcc")) {
        eprintln!("skipping runtime parity: nasm or gcc not in PATH");
        return Ok(());
    }
    let Some(runtime) = native_runtime() else {
        eprintln!("skipping runtime parity: no i686 build of toy-rt-native");
        return Ok(());
    };
    let out_dir = scratch_dir()?;
    let options = EmitOptions {
        entry: "main".into(),
        ..EmitOptions::default()
    };

    for (name, src) in RUNTIME_PROGRAMS {
        let obj = assemble(&out_dir, name, src, &options)?;
        let exe = out_dir.join(name);

        let linked = Command::new("gcc")
            .args(["-m32", "-no-pie", "-o"])
            .arg(&exe)
            .arg(&obj)
            .arg(&runtime)
            .args(["-lpthread", "-ldl", "-lm"])
            .status()
            .into_diagnostic()?;
        if !linked.success() {
            eprintln!("skipping runtime parity: gcc cannot link 32-bit programs");
            return Ok(());
        }
        if !matches_interpreter(name, src, &exe)? {
            eprintln!("skipping runtime parity: host cannot execute 32-bit binaries");
            return Ok(());
        }
    }
    Ok(())
}
